use crate::plan::ExecContext;
use crate::StorageManager;
use common::catalog::{Catalog, IndexDesc};
use common::database::Database;
use common::ids::{ContainerId, Permissions};
use common::index::{Index, IndexKind};
use common::storage_trait::StorageTrait;
use common::table::Table;
use common::{CrustyError, TableSchema, Tuple};
use std::collections::HashMap;
use std::sync::Arc;

/// Size statistics of a stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    pub blocks: usize,
    pub records: usize,
}

impl StatInfo {
    /// Estimated distinct values of any field. No histograms are kept.
    pub fn distinct_values(&self, _field: &str) -> usize {
        1 + self.records / 3
    }
}

/// What the planner knows about one index.
#[derive(Clone)]
pub struct IndexInfo {
    index_name: String,
    field_name: String,
    kind: IndexKind,
    stats: StatInfo,
    sm: Arc<StorageManager>,
}

impl IndexInfo {
    pub fn open(&self) -> Result<Box<dyn Index>, CrustyError> {
        debug!("Opening {} index {}", self.kind, self.index_name);
        self.sm.open_index(&self.index_name)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Block accesses of one equality probe.
    pub fn probe_cost(&self) -> usize {
        1
    }

    /// Records one probe is expected to match.
    pub fn records_output(&self) -> usize {
        self.stats.records / self.distinct_values(&self.field_name)
    }

    pub fn distinct_values(&self, field: &str) -> usize {
        if field == self.field_name {
            self.stats.distinct_values(field)
        } else {
            self.stats.distinct_values(field).min(self.records_per_key())
        }
    }

    fn records_per_key(&self) -> usize {
        (self.stats.records / self.stats.distinct_values(&self.field_name)).max(1)
    }
}

/// Tables, views and indexes, backed by the catalog and the storage manager.
pub struct MetadataManager {
    db: Arc<Database>,
    sm: Arc<StorageManager>,
}

impl MetadataManager {
    pub fn new(db: Arc<Database>, sm: Arc<StorageManager>) -> Self {
        MetadataManager { db, sm }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn storage_manager(&self) -> &Arc<StorageManager> {
        &self.sm
    }

    /// Creates an empty table.
    pub fn create_table(&self, name: &str, schema: &TableSchema) -> Result<(), CrustyError> {
        let container_id = self.sm.create_container(schema.slot_size())?;
        let table = Table::new(name.to_string(), schema.clone(), container_id);
        if let Err(e) = self.db.add_table(table) {
            self.sm.remove_container(container_id)?;
            return Err(e);
        }
        info!("Created table {} in container {}", name, container_id);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<Table, CrustyError> {
        let table_ptr = self
            .db
            .get_table_ptr(Table::get_table_id(name))
            .map_err(|_| CrustyError::ValidationError(format!("Unknown table {}", name)))?;
        let table = table_ptr
            .read()
            .map_err(|_| CrustyError::CrustyError(String::from("Catalog lock poisoned")))?;
        Ok(table.clone())
    }

    pub fn create_view(&self, name: &str, definition: &str) -> Result<(), CrustyError> {
        self.db.add_view(name, definition)?;
        info!("Created view {}", name);
        Ok(())
    }

    pub fn view_def(&self, name: &str) -> Result<Option<String>, CrustyError> {
        self.db.view_def(name)
    }

    /// Creates an index and fills it with the table's current records.
    pub fn create_index(
        &self,
        ctx: &ExecContext,
        index_name: &str,
        table_name: &str,
        field_name: &str,
        kind: IndexKind,
    ) -> Result<usize, CrustyError> {
        let table = self.get_table(table_name)?;
        let pos = table.schema.field_index(field_name)?;
        self.sm.create_index(index_name, kind)?;
        let desc = IndexDesc {
            index_name: index_name.to_string(),
            table_name: table_name.to_string(),
            field_name: field_name.to_string(),
            kind,
        };
        if let Err(e) = self.db.add_index(desc) {
            self.sm.remove_index(index_name)?;
            return Err(e);
        }
        let mut index = self.sm.open_index(index_name)?;
        let mut count = 0;
        for (rid, bytes) in
            self.sm
                .get_iterator(table.container_id, ctx.tid, Permissions::ReadOnly)?
        {
            let tuple = Tuple::from_bytes(&bytes)?;
            if let Some(key) = tuple.get_field(pos) {
                index.insert(key, rid)?;
                count += 1;
            }
        }
        index.close();
        info!(
            "Created {} index {} on {}.{} with {} entries",
            kind, index_name, table_name, field_name, count
        );
        Ok(count)
    }

    /// Indexes of a table keyed by the indexed field.
    pub fn index_info(&self, table_name: &str) -> Result<HashMap<String, IndexInfo>, CrustyError> {
        let stats = self.stat_info(table_name)?;
        let mut infos = HashMap::new();
        for desc in self.db.index_descs(table_name)? {
            infos.insert(
                desc.field_name.clone(),
                IndexInfo {
                    index_name: desc.index_name,
                    field_name: desc.field_name,
                    kind: desc.kind,
                    stats,
                    sm: Arc::clone(&self.sm),
                },
            );
        }
        Ok(infos)
    }

    pub fn stat_info(&self, table_name: &str) -> Result<StatInfo, CrustyError> {
        let table = self.get_table(table_name)?;
        self.container_stats(table.container_id)
    }

    fn container_stats(&self, container_id: ContainerId) -> Result<StatInfo, CrustyError> {
        Ok(StatInfo {
            blocks: self.sm.num_blocks(container_id)? as usize,
            records: self.sm.num_records(container_id)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;
    use common::Constant;

    #[test]
    fn test_create_table_and_stats() {
        init();
        let (md, ctx) = test_env(128, 10);
        let schema = get_int_table_schema(vec!["a", "b"]);
        table_plan_with(&md, &ctx, "t", &schema, &create_tuple_list(vec![vec![1, 2]; 30]));
        let stats = md.stat_info("t").unwrap();
        assert_eq!(30, stats.records);
        // 128 / (4 + 8) = 10 records per block
        assert_eq!(3, stats.blocks);
        assert_eq!(11, stats.distinct_values("a"));
        assert!(md.create_table("t", &schema).is_err());
        assert!(md.get_table("nope").is_err());
    }

    #[test]
    fn test_index_is_populated() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let schema = get_int_table_schema(vec!["a", "b"]);
        let rows = create_tuple_list(vec![vec![1, 2], vec![1, 3], vec![2, 4]]);
        table_plan_with(&md, &ctx, "t", &schema, &rows);
        assert_eq!(
            3,
            md.create_index(&ctx, "t_a", "t", "a", IndexKind::BTree)
                .unwrap()
        );
        assert!(md
            .create_index(&ctx, "t_a", "t", "b", IndexKind::Hash)
            .is_err());
        assert!(md
            .create_index(&ctx, "t_z", "t", "z", IndexKind::Hash)
            .is_err());
        let infos = md.index_info("t").unwrap();
        let info = infos.get("a").unwrap();
        assert_eq!(1, info.probe_cost());
        let mut idx = info.open().unwrap();
        idx.before_first(&Constant::Int(1)).unwrap();
        let mut hits = 0;
        while idx.next().unwrap() {
            hits += 1;
        }
        assert_eq!(2, hits);
    }
}
