use crate::materialize::TempTable;
use crate::scan::Scan;
use common::ids::{PageId, Permissions};
use common::storage_trait::StorageTrait;
use common::{Constant, CrustyError, TableSchema, Tuple};
use std::convert::TryFrom;

/// The records of a contiguous range of blocks of a temp table, held in
/// memory so they can be reread without block accesses.
pub struct ChunkScan {
    schema: TableSchema,
    records: Vec<Tuple>,
    pos: Option<usize>,
}

impl ChunkScan {
    /// Loads blocks `start..=end`.
    pub fn new(temp: &TempTable, start: usize, end: usize) -> Result<Self, CrustyError> {
        let ctx = temp.ctx();
        let mut records = Vec::new();
        for block in start..=end {
            let page_id = PageId::try_from(block)
                .map_err(|_| CrustyError::IOError(format!("Block {} out of range", block)))?;
            for (_, bytes) in ctx.sm.read_block(
                temp.container_id(),
                page_id,
                ctx.tid,
                Permissions::ReadOnly,
            )? {
                records.push(Tuple::from_bytes(&bytes)?);
            }
        }
        debug!(
            "Chunk of {} holds blocks {}..={} ({} records)",
            temp.name(),
            start,
            end,
            records.len()
        );
        Ok(ChunkScan {
            schema: temp.schema().clone(),
            records,
            pos: None,
        })
    }

    fn current(&self) -> Result<&Tuple, CrustyError> {
        self.pos.and_then(|p| self.records.get(p)).ok_or_else(|| {
            CrustyError::ExecutionError(String::from("Chunk scan is not positioned on a record"))
        })
    }
}

impl Scan for ChunkScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.pos = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        let next = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(next.min(self.records.len()));
        Ok(next < self.records.len())
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        let i = self.schema.field_index(field)?;
        self.current()?
            .get_field(i)
            .cloned()
            .ok_or_else(|| CrustyError::ExecutionError(format!("Record has no value for {}", field)))
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.contains(field)
    }

    fn close(&mut self) {
        self.records.clear();
        self.pos = None;
    }
}
