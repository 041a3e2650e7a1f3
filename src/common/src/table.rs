use crate::ids::ContainerId;
use crate::TableSchema;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Table implementation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Table id.
    pub id: u64,
    /// Table schema.
    pub schema: TableSchema,
    /// Storage container holding the table's records.
    pub container_id: ContainerId,
}

impl Table {
    /// Creates a new table stored in the given container.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table.
    /// * `schema` - Schema of the table's records.
    /// * `container_id` - Container the storage manager allocated for it.
    pub fn new(name: String, schema: TableSchema, container_id: ContainerId) -> Self {
        let table_id = Table::get_table_id(&name);

        Table {
            name,
            id: table_id,
            schema,
            container_id,
        }
    }

    /// Creates table id of the table by hashing the table name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to get the id for.
    pub fn get_table_id(name: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }
}
