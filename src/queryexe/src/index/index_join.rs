use crate::cost;
use crate::metadata::IndexInfo;
use crate::plan::{Plan, TablePlan};
use crate::scan::{Scan, TableScan, UpdateScan};
use common::index::Index;
use common::{Constant, CrustyError, TableSchema};
use std::sync::Arc;

/// Probes an index on the right table once per record of the left side.
pub struct IndexJoinPlan {
    lhs: Arc<dyn Plan>,
    rhs: Arc<TablePlan>,
    info: IndexInfo,
    join_field: String,
    schema: TableSchema,
}

impl IndexJoinPlan {
    /// `join_field` is the left field compared with the indexed field.
    pub fn new(
        lhs: Arc<dyn Plan>,
        rhs: Arc<TablePlan>,
        info: IndexInfo,
        join_field: &str,
    ) -> Result<Self, CrustyError> {
        lhs.schema().field_index(join_field)?;
        let schema = lhs.schema().merge(rhs.schema());
        Ok(IndexJoinPlan {
            lhs,
            rhs,
            info,
            join_field: join_field.to_string(),
            schema,
        })
    }

    pub fn estimate_blocks(lhs_blocks: usize, lhs_records: usize, info: &IndexInfo) -> usize {
        cost::index_join_cost(lhs_blocks, lhs_records, info.probe_cost())
    }
}

impl Plan for IndexJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        debug!(
            "Index join probing {} with {}",
            self.info.index_name(),
            self.join_field
        );
        let lhs = self.lhs.open()?;
        let ts = self.rhs.open_update();
        let idx = self.info.open()?;
        Ok(Box::new(IndexJoinScan::new(
            lhs,
            idx,
            &self.join_field,
            ts,
        )?))
    }

    fn blocks_accessed(&self) -> usize {
        Self::estimate_blocks(
            self.lhs.blocks_accessed(),
            self.lhs.records_output(),
            &self.info,
        )
    }

    fn records_output(&self) -> usize {
        self.lhs
            .records_output()
            .saturating_mul(self.info.records_output())
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.lhs.schema().contains(field) {
            self.lhs.distinct_values(field)
        } else {
            self.rhs.distinct_values(field)
        }
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

pub struct IndexJoinScan {
    lhs: Box<dyn Scan>,
    idx: Box<dyn Index>,
    join_field: String,
    rhs: TableScan,
    lhs_on_record: bool,
}

impl IndexJoinScan {
    pub fn new(
        lhs: Box<dyn Scan>,
        idx: Box<dyn Index>,
        join_field: &str,
        rhs: TableScan,
    ) -> Result<Self, CrustyError> {
        let mut scan = IndexJoinScan {
            lhs,
            idx,
            join_field: join_field.to_string(),
            rhs,
            lhs_on_record: false,
        };
        scan.before_first()?;
        Ok(scan)
    }

    fn reset_index(&mut self) -> Result<(), CrustyError> {
        let key = self.lhs.get_val(&self.join_field)?;
        self.idx.before_first(&key)
    }
}

impl Scan for IndexJoinScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.lhs.before_first()?;
        self.lhs_on_record = self.lhs.next()?;
        if self.lhs_on_record {
            self.reset_index()?;
        }
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        while self.lhs_on_record {
            if self.idx.next()? {
                let rid = self.idx.get_data_rid()?;
                self.rhs.move_to_rid(rid)?;
                return Ok(true);
            }
            self.lhs_on_record = self.lhs.next()?;
            if self.lhs_on_record {
                self.reset_index()?;
            }
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        if self.rhs.has_field(field) {
            self.rhs.get_val(field)
        } else {
            self.lhs.get_val(field)
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.rhs.has_field(field) || self.lhs.has_field(field)
    }

    fn close(&mut self) {
        self.lhs.close();
        self.idx.close();
        self.rhs.close();
    }
}
