use crate::scan::Scan;
use crate::StorageManager;
use common::ids::TransactionId;
use common::storage_trait::StorageTrait;
use common::{CrustyError, TableSchema};
use std::sync::Arc;
use txn_manager::transactions::Transaction;

mod project_plan;
mod select_plan;
mod table_plan;

pub use project_plan::ProjectPlan;
pub use select_plan::SelectPlan;
pub use table_plan::TablePlan;

/// A node of a query plan tree.
///
/// Plans only estimate; all work happens in the scan `open` returns. The
/// estimates are used to compare candidate plans and are not exact.
pub trait Plan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError>;

    /// Estimated block accesses needed to produce every output record.
    fn blocks_accessed(&self) -> usize;

    fn records_output(&self) -> usize;

    /// Estimated number of distinct values of `field` in the output.
    fn distinct_values(&self, field: &str) -> usize;

    fn schema(&self) -> &TableSchema;
}

/// The storage manager and transaction a plan tree runs under.
#[derive(Clone)]
pub struct ExecContext {
    pub sm: Arc<StorageManager>,
    pub tid: TransactionId,
}

impl ExecContext {
    pub fn new(sm: Arc<StorageManager>, tid: TransactionId) -> Self {
        ExecContext { sm, tid }
    }

    pub fn for_txn(sm: &Arc<StorageManager>, txn: &Transaction) -> Self {
        ExecContext::new(Arc::clone(sm), txn.tid())
    }

    /// Records of `schema` that fit in one block.
    pub fn records_per_block(&self, schema: &TableSchema) -> usize {
        (self.sm.page_size() / schema.slot_size().max(1)).max(1)
    }
}
