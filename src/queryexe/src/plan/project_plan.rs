use super::Plan;
use crate::scan::{ProjectScan, Scan};
use common::{CrustyError, TableSchema};
use std::sync::Arc;

/// Keeps only the named fields of its child, in the given order.
pub struct ProjectPlan {
    child: Arc<dyn Plan>,
    schema: TableSchema,
}

impl ProjectPlan {
    /// Fails with `FieldNotFound` if the child lacks one of the fields.
    pub fn new(child: Arc<dyn Plan>, fields: &[String]) -> Result<Self, CrustyError> {
        let schema = child.schema().project(fields)?;
        Ok(ProjectPlan { child, schema })
    }
}

impl Plan for ProjectPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let child = self.child.open()?;
        Ok(Box::new(ProjectScan::new(child, self.schema.field_names())))
    }

    fn blocks_accessed(&self) -> usize {
        self.child.blocks_accessed()
    }

    fn records_output(&self) -> usize {
        self.child.records_output()
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.child.distinct_values(field)
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}
