use crate::cost;
use crate::metadata::IndexInfo;
use crate::plan::{Plan, TablePlan};
use crate::scan::{Scan, TableScan, UpdateScan};
use common::index::Index;
use common::{Constant, CrustyError, TableSchema};
use std::sync::Arc;

/// Reads the records of a table whose indexed field equals a constant.
pub struct IndexSelectPlan {
    table: Arc<TablePlan>,
    info: IndexInfo,
    key: Constant,
}

impl IndexSelectPlan {
    pub fn new(table: Arc<TablePlan>, info: IndexInfo, key: Constant) -> Self {
        IndexSelectPlan { table, info, key }
    }
}

impl Plan for IndexSelectPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        debug!(
            "Index select on {} using {} = {}",
            self.table.table_name(),
            self.info.index_name(),
            self.key
        );
        let ts = self.table.open_update();
        let idx = self.info.open()?;
        Ok(Box::new(IndexSelectScan::new(ts, idx, self.key.clone())?))
    }

    fn blocks_accessed(&self) -> usize {
        cost::index_select_cost(self.info.probe_cost(), self.records_output())
    }

    fn records_output(&self) -> usize {
        self.info.records_output()
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.info.distinct_values(field)
    }

    fn schema(&self) -> &TableSchema {
        self.table.schema()
    }
}

pub struct IndexSelectScan {
    ts: TableScan,
    idx: Box<dyn Index>,
    key: Constant,
}

impl IndexSelectScan {
    pub fn new(ts: TableScan, idx: Box<dyn Index>, key: Constant) -> Result<Self, CrustyError> {
        let mut scan = IndexSelectScan { ts, idx, key };
        scan.before_first()?;
        Ok(scan)
    }
}

impl Scan for IndexSelectScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.idx.before_first(&self.key)
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        if !self.idx.next()? {
            return Ok(false);
        }
        let rid = self.idx.get_data_rid()?;
        self.ts.move_to_rid(rid)?;
        Ok(true)
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        self.ts.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.ts.has_field(field)
    }

    fn close(&mut self) {
        self.idx.close();
        self.ts.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::index::IndexKind;
    use common::testutil::*;

    #[test]
    fn test_index_select() {
        init();
        let (md, ctx) = test_env(128, 10);
        let schema = get_int_string_schema("id", "name", 4);
        let rows = int_string_tuples(&[(1, "a"), (2, "b"), (1, "c"), (3, "d"), (1, "e")]);
        let table = Arc::new(stored_table(&md, &ctx, "t", &schema, &rows));
        md.create_index(&ctx, "t_id", "t", "id", IndexKind::Hash)
            .unwrap();
        let info = md.index_info("t").unwrap().remove("id").unwrap();
        let plan = IndexSelectPlan::new(Arc::clone(&table), info.clone(), Constant::Int(1));
        let expected = int_string_tuples(&[(1, "a"), (1, "c"), (1, "e")]);
        assert!(compare_unordered_tuples(&expected, run_plan(&plan)));
        let none = IndexSelectPlan::new(table, info, Constant::Int(7));
        assert!(run_plan(&none).is_empty());
    }
}
