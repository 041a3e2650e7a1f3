use super::{ExecContext, Plan};
use crate::metadata::{MetadataManager, StatInfo};
use crate::scan::{Scan, TableScan};
use common::ids::ContainerId;
use common::{CrustyError, TableSchema};

/// Leaf plan reading a stored table.
pub struct TablePlan {
    ctx: ExecContext,
    table_name: String,
    container_id: ContainerId,
    schema: TableSchema,
    stats: StatInfo,
}

impl TablePlan {
    pub fn new(
        ctx: ExecContext,
        table_name: &str,
        md: &MetadataManager,
    ) -> Result<Self, CrustyError> {
        let table = md.get_table(table_name)?;
        let stats = md.stat_info(table_name)?;
        Ok(TablePlan {
            ctx,
            table_name: table_name.to_string(),
            container_id: table.container_id,
            schema: table.schema,
            stats,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn ctx(&self) -> &ExecContext {
        &self.ctx
    }

    /// Opens the table for modification.
    pub fn open_update(&self) -> TableScan {
        TableScan::new(self.ctx.clone(), self.container_id, self.schema.clone())
    }
}

impl Plan for TablePlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        Ok(Box::new(self.open_update()))
    }

    fn blocks_accessed(&self) -> usize {
        self.stats.blocks
    }

    fn records_output(&self) -> usize {
        self.stats.records
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.stats.distinct_values(field)
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}
