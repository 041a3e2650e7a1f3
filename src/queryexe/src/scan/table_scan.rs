use super::{Scan, UpdateScan};
use crate::materialize::TempTable;
use crate::plan::ExecContext;
use common::ids::{ContainerId, PageId, Permissions, ValueId};
use common::storage_trait::StorageTrait;
use common::{Constant, CrustyError, DataType, TableSchema, Tuple};
use std::collections::VecDeque;
use std::convert::TryFrom;

/// Scan over every record of a container, one block at a time.
pub struct TableScan {
    ctx: ExecContext,
    container_id: ContainerId,
    schema: TableSchema,
    /// The record the scan is on.
    current: Option<(ValueId, Tuple)>,
    /// Records of the block being read that come after `current`.
    pending: VecDeque<(ValueId, Vec<u8>)>,
    next_block: usize,
    /// Keeps a temp table alive while it is being scanned.
    owner: Option<TempTable>,
}

impl TableScan {
    pub fn new(ctx: ExecContext, container_id: ContainerId, schema: TableSchema) -> Self {
        TableScan {
            ctx,
            container_id,
            schema,
            current: None,
            pending: VecDeque::new(),
            next_block: 0,
            owner: None,
        }
    }

    /// Scan over a temp table that holds a handle on it until closed.
    pub(crate) fn over_temp(temp: TempTable) -> Self {
        let mut scan = TableScan::new(
            temp.ctx().clone(),
            temp.container_id(),
            temp.schema().clone(),
        );
        scan.owner = Some(temp);
        scan
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Appends a complete record and makes it current.
    pub fn insert_tuple(&mut self, tuple: Tuple) -> Result<ValueId, CrustyError> {
        let rid = self
            .ctx
            .sm
            .insert_value(self.container_id, tuple.get_bytes()?, self.ctx.tid)?;
        self.current = Some((rid, tuple));
        Ok(rid)
    }

    /// The current record.
    pub fn current(&self) -> Result<&Tuple, CrustyError> {
        self.current
            .as_ref()
            .map(|(_, t)| t)
            .ok_or_else(not_positioned)
    }

    fn load_block(&mut self, block: usize) -> Result<(), CrustyError> {
        let page_id = PageId::try_from(block)
            .map_err(|_| CrustyError::IOError(format!("Block {} out of range", block)))?;
        let records = self.ctx.sm.read_block(
            self.container_id,
            page_id,
            self.ctx.tid,
            Permissions::ReadWrite,
        )?;
        self.pending = records.into();
        self.next_block = block + 1;
        Ok(())
    }
}

fn not_positioned() -> CrustyError {
    CrustyError::ExecutionError(String::from("Scan is not positioned on a record"))
}

impl Scan for TableScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.current = None;
        self.pending.clear();
        self.next_block = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        loop {
            if let Some((rid, bytes)) = self.pending.pop_front() {
                self.current = Some((rid, Tuple::from_bytes(&bytes)?));
                return Ok(true);
            }
            let blocks = self.ctx.sm.num_blocks(self.container_id)? as usize;
            if self.next_block >= blocks {
                self.current = None;
                return Ok(false);
            }
            self.load_block(self.next_block)?;
        }
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        let i = self.schema.field_index(field)?;
        let tuple = self.current()?;
        tuple.get_field(i).cloned().ok_or_else(|| {
            CrustyError::ExecutionError(format!("Record has no value for {}", field))
        })
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.contains(field)
    }

    fn close(&mut self) {
        self.current = None;
        self.pending.clear();
        self.owner = None;
    }
}

impl UpdateScan for TableScan {
    fn set_val(&mut self, field: &str, val: Constant) -> Result<(), CrustyError> {
        let i = self.schema.field_index(field)?;
        let matches_type = match (self.schema.get_attribute(i).map(|a| a.dtype()), &val) {
            (Some(DataType::Int), Constant::Int(_)) => true,
            (Some(DataType::String(_)), Constant::String(_)) => true,
            _ => false,
        };
        if !matches_type {
            return Err(CrustyError::ExecutionError(format!(
                "Value {} does not fit field {}",
                val, field
            )));
        }
        let (rid, tuple) = self.current.as_mut().ok_or_else(not_positioned)?;
        tuple.set_field(i, val)?;
        self.ctx
            .sm
            .update_value(tuple.get_bytes()?, *rid, self.ctx.tid)?;
        Ok(())
    }

    fn insert(&mut self) -> Result<(), CrustyError> {
        let blank = self.schema.blank_tuple();
        self.insert_tuple(blank)?;
        Ok(())
    }

    fn delete(&mut self) -> Result<(), CrustyError> {
        let (rid, _) = self.current.take().ok_or_else(not_positioned)?;
        self.ctx.sm.delete_value(rid, self.ctx.tid)
    }

    fn get_rid(&self) -> Result<ValueId, CrustyError> {
        self.current
            .as_ref()
            .map(|(rid, _)| *rid)
            .ok_or_else(not_positioned)
    }

    fn move_to_rid(&mut self, rid: ValueId) -> Result<(), CrustyError> {
        if rid.container_id != self.container_id {
            return Err(CrustyError::ExecutionError(format!(
                "Record {:?} is not in container {}",
                rid, self.container_id
            )));
        }
        self.load_block(rid.page_id as usize)?;
        while let Some((id, bytes)) = self.pending.pop_front() {
            if id == rid {
                self.current = Some((id, Tuple::from_bytes(&bytes)?));
                return Ok(());
            }
        }
        self.current = None;
        Err(CrustyError::ExecutionError(format!(
            "Record ID not found {:?}",
            rid
        )))
    }
}
