use crate::plan::ExecContext;
use crate::scan::TableScan;
use common::ids::ContainerId;
use common::storage_trait::StorageTrait;
use common::{CrustyError, TableSchema};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_TEMP: AtomicUsize = AtomicUsize::new(0);

struct Inner {
    name: String,
    container_id: ContainerId,
    schema: TableSchema,
    ctx: ExecContext,
}

impl Drop for Inner {
    fn drop(&mut self) {
        debug!("Removing temp table {}", self.name);
        if let Err(e) = self.ctx.sm.remove_container(self.container_id) {
            warn!("Could not remove temp table {}: {}", self.name, e);
        }
    }
}

/// A materialized intermediate result.
///
/// Handles are shared. The backing container is removed once the last
/// handle, including those held by open scans, is gone.
#[derive(Clone)]
pub struct TempTable {
    inner: Arc<Inner>,
}

impl TempTable {
    pub fn new(ctx: &ExecContext, schema: &TableSchema) -> Result<Self, CrustyError> {
        let container_id = ctx.sm.create_container(schema.slot_size())?;
        let name = format!("temp{}", NEXT_TEMP.fetch_add(1, Ordering::SeqCst));
        debug!("Created temp table {} in container {}", name, container_id);
        Ok(TempTable {
            inner: Arc::new(Inner {
                name,
                container_id,
                schema: schema.clone(),
                ctx: ctx.clone(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.inner.schema
    }

    pub fn container_id(&self) -> ContainerId {
        self.inner.container_id
    }

    pub fn ctx(&self) -> &ExecContext {
        &self.inner.ctx
    }

    pub fn open(&self) -> TableScan {
        TableScan::over_temp(self.clone())
    }

    pub fn num_blocks(&self) -> Result<usize, CrustyError> {
        Ok(self.inner.ctx.sm.num_blocks(self.inner.container_id)? as usize)
    }
}
