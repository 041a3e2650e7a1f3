use crate::materialize::TempTable;
use crate::metadata::MetadataManager;
use crate::plan::{ExecContext, Plan, TablePlan};
use crate::scan::{current_tuple, Scan};
use crate::StorageManager;
use common::database::Database;
use common::ids::TransactionId;
use common::storage_trait::StorageTrait;
use common::{TableSchema, Tuple};
use std::sync::Arc;

/// Context over a fresh storage manager with the given block size and buffers.
pub fn test_ctx(page_size: usize, buffers: usize) -> ExecContext {
    let sm = Arc::new(StorageManager::new_test_sm_with(page_size, buffers));
    ExecContext::new(sm, TransactionId::new())
}

/// Metadata manager and context sharing one storage manager.
pub fn test_env(page_size: usize, buffers: usize) -> (Arc<MetadataManager>, ExecContext) {
    let ctx = test_ctx(page_size, buffers);
    let db = Arc::new(Database::new(String::from("testdb")));
    let md = Arc::new(MetadataManager::new(db, Arc::clone(&ctx.sm)));
    (md, ctx)
}

pub fn temp_table_with(ctx: &ExecContext, schema: &TableSchema, rows: &[Tuple]) -> TempTable {
    let temp = TempTable::new(ctx, schema).unwrap();
    for row in rows {
        ctx.sm
            .insert_value(temp.container_id(), row.get_bytes().unwrap(), ctx.tid)
            .unwrap();
    }
    temp
}

/// Creates a stored table holding `rows` and returns a plan over it.
pub fn table_plan_with(
    md: &MetadataManager,
    ctx: &ExecContext,
    name: &str,
    schema: &TableSchema,
    rows: &[Tuple],
) -> Arc<dyn Plan> {
    Arc::new(stored_table(md, ctx, name, schema, rows))
}

pub fn stored_table(
    md: &MetadataManager,
    ctx: &ExecContext,
    name: &str,
    schema: &TableSchema,
    rows: &[Tuple],
) -> TablePlan {
    md.create_table(name, schema).unwrap();
    let container_id = md.get_table(name).unwrap().container_id;
    for row in rows {
        ctx.sm
            .insert_value(container_id, row.get_bytes().unwrap(), ctx.tid)
            .unwrap();
    }
    TablePlan::new(ctx.clone(), name, md).unwrap()
}

/// Reads the rest of a scan as tuples laid out by `schema`.
pub fn drain(scan: &mut dyn Scan, schema: &TableSchema) -> Vec<Tuple> {
    let mut tuples = Vec::new();
    while scan.next().unwrap() {
        tuples.push(current_tuple(scan, schema).unwrap());
    }
    tuples
}

/// Opens a plan and reads every record.
pub fn run_plan(plan: &dyn Plan) -> Vec<Tuple> {
    let mut scan = plan.open().unwrap();
    let tuples = drain(scan.as_mut(), plan.schema());
    scan.close();
    tuples
}
