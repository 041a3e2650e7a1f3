use crate::planner::Planner;
use common::database::Database;
use common::ids::TransactionId;
use common::storage_trait::StorageTrait;
use common::{TableSchema, Tuple};
use memstore::storage_manager::StorageManager;
use queryexe::metadata::MetadataManager;
use queryexe::plan::{ExecContext, Plan};
use queryexe::query::Executor;
use std::sync::Arc;

/// Metadata manager and context over a fresh storage manager.
pub fn test_env(page_size: usize, buffers: usize) -> (Arc<MetadataManager>, ExecContext) {
    let sm = Arc::new(StorageManager::new_test_sm_with(page_size, buffers));
    let db = Arc::new(Database::new(String::from("testdb")));
    let md = Arc::new(MetadataManager::new(db, Arc::clone(&sm)));
    (md, ExecContext::new(sm, TransactionId::new()))
}

pub fn test_planner(page_size: usize, buffers: usize) -> Planner {
    let (md, _) = test_env(page_size, buffers);
    Planner::new(md)
}

pub fn create_table_with(
    md: &MetadataManager,
    ctx: &ExecContext,
    name: &str,
    schema: &TableSchema,
    rows: &[Tuple],
) {
    md.create_table(name, schema).unwrap();
    let container_id = md.get_table(name).unwrap().container_id;
    for row in rows {
        ctx.sm
            .insert_value(container_id, row.get_bytes().unwrap(), ctx.tid)
            .unwrap();
    }
}

/// Runs a plan to completion.
pub fn run(plan: Arc<dyn Plan>) -> Vec<Tuple> {
    let mut executor = Executor::new_ref();
    executor.configure_query(plan);
    executor.collect().unwrap()
}
