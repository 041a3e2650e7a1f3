use crate::ids::ContainerId;
use crate::index::IndexKind;
use crate::table::*;
use crate::{CrustyError, TableSchema};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub type TableMap = Arc<RwLock<HashMap<u64, Arc<RwLock<Table>>>>>;
pub type ViewMap = Arc<RwLock<HashMap<String, String>>>;
pub type IndexMap = Arc<RwLock<HashMap<String, Vec<IndexDesc>>>>;

/// Catalog entry for a secondary index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IndexDesc {
    pub index_name: String,
    pub table_name: String,
    pub field_name: String,
    pub kind: IndexKind,
}

pub(crate) fn poisoned<T>(_: PoisonError<T>) -> CrustyError {
    CrustyError::CrustyError(String::from("Catalog lock poisoned"))
}

/// Functions needed to implement a catalog. It keeps track of all available
/// tables, views and indexes in the database.
pub trait Catalog {
    /// Get tables from catalog.
    fn get_tables(&self) -> TableMap;

    /// View name to defining query text.
    fn get_views(&self) -> ViewMap;

    /// Table name to the indexes defined on it.
    fn get_indexes(&self) -> IndexMap;

    /// Get the table pointer for the catalog.
    ///
    /// # Arguments
    ///
    /// * `table_id` - Id of table to get the pointer for.
    fn get_table_ptr(&self, table_id: u64) -> Result<Arc<RwLock<Table>>, CrustyError> {
        let tables = self.get_tables();
        let tables_ref = tables.read().map_err(poisoned)?;
        match tables_ref.get(&table_id) {
            Some(table_ptr) => Ok(Arc::clone(table_ptr)),
            _ => Err(CrustyError::CrustyError(String::from("Table not found"))),
        }
    }

    /// Checks if the table id is valid in the catalog.
    ///
    /// # Arguments
    ///
    /// * `table_id` - Id of table to check if it is valid.
    fn is_valid_table(&self, table_id: u64) -> bool {
        let tables = self.get_tables();
        let valid = match tables.read() {
            Ok(tables_ref) => tables_ref.contains_key(&table_id),
            Err(_) => false,
        };
        valid
    }

    /// Checks if the column is valid for the given table.
    ///
    /// # Arguments
    ///
    /// * `table_id` - Id of table to look for the column name in.
    /// * `col_name` - Name of column to look for in the table.
    fn is_valid_column(&self, table_id: u64, col_name: &str) -> bool {
        self.get_table_schema(table_id)
            .map(|schema| schema.contains(col_name))
            .unwrap_or(false)
    }

    /// Gets the table schema from the catalog.
    ///
    /// # Arguments
    ///
    /// * `table_id` - Id of table to get the schema for.
    fn get_table_schema(&self, table_id: u64) -> Result<TableSchema, CrustyError> {
        let table_ptr = self.get_table_ptr(table_id)?;
        let table = table_ptr.read().map_err(poisoned)?;
        Ok(table.schema.clone())
    }

    /// Gets the table name from the catalog.
    ///
    /// # Arguments
    ///
    /// * `table_id` - Id of table to get the name for.
    fn get_table_name(&self, table_id: u64) -> Result<String, CrustyError> {
        let table_ptr = self.get_table_ptr(table_id)?;
        let table = table_ptr.read().map_err(poisoned)?;
        Ok(table.name.clone())
    }

    /// Gets the container holding the table's records.
    fn get_container_id(&self, table_id: u64) -> Result<ContainerId, CrustyError> {
        let table_ptr = self.get_table_ptr(table_id)?;
        let table = table_ptr.read().map_err(poisoned)?;
        Ok(table.container_id)
    }

    /// Registers a new table.
    fn add_table(&self, table: Table) -> Result<(), CrustyError> {
        if self.is_valid_table(table.id) || self.view_def(&table.name)?.is_some() {
            return Err(CrustyError::ValidationError(format!(
                "Relation {} already exists",
                table.name
            )));
        }
        let tables = self.get_tables();
        let mut tables_ref = tables.write().map_err(poisoned)?;
        tables_ref.insert(table.id, Arc::new(RwLock::new(table)));
        Ok(())
    }

    /// Returns the defining query of a view, or None if `name` is not a view.
    fn view_def(&self, name: &str) -> Result<Option<String>, CrustyError> {
        let views = self.get_views();
        let views_ref = views.read().map_err(poisoned)?;
        Ok(views_ref.get(name).cloned())
    }

    /// Registers a view.
    fn add_view(&self, name: &str, definition: &str) -> Result<(), CrustyError> {
        if self.is_valid_table(Table::get_table_id(name)) || self.view_def(name)?.is_some() {
            return Err(CrustyError::ValidationError(format!(
                "Relation {} already exists",
                name
            )));
        }
        let views = self.get_views();
        let mut views_ref = views.write().map_err(poisoned)?;
        views_ref.insert(name.to_string(), definition.to_string());
        Ok(())
    }

    /// Indexes defined on a table.
    fn index_descs(&self, table_name: &str) -> Result<Vec<IndexDesc>, CrustyError> {
        let indexes = self.get_indexes();
        let indexes_ref = indexes.read().map_err(poisoned)?;
        Ok(indexes_ref.get(table_name).cloned().unwrap_or_default())
    }

    /// Registers an index on an existing column.
    fn add_index(&self, desc: IndexDesc) -> Result<(), CrustyError> {
        if !self.is_valid_column(Table::get_table_id(&desc.table_name), &desc.field_name) {
            return Err(CrustyError::ValidationError(format!(
                "Cannot index {}.{}: no such column",
                desc.table_name, desc.field_name
            )));
        }
        let indexes = self.get_indexes();
        let mut indexes_ref = indexes.write().map_err(poisoned)?;
        let entry = indexes_ref.entry(desc.table_name.clone()).or_default();
        if entry.iter().any(|d| d.index_name == desc.index_name) {
            return Err(CrustyError::ValidationError(format!(
                "Index {} already exists",
                desc.index_name
            )));
        }
        entry.push(desc);
        Ok(())
    }
}
