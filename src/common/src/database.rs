use crate::catalog;
use catalog::{Catalog, IndexMap, TableMap, ViewMap};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The actual database.
#[derive(Clone, Serialize, Deserialize)]
pub struct Database {
    /// Name of the database.
    pub name: String,
    /// Locks for the tables.
    #[serde(skip)]
    pub tables: TableMap,
    /// View definitions, kept as query text and re-planned on each use.
    #[serde(skip)]
    pub views: ViewMap,
    #[serde(skip)]
    pub indexes: IndexMap,
}

impl Database {
    /// Initialize a new database with a given name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name for the new database.
    pub fn new(name: String) -> Self {
        Database {
            name,
            tables: Arc::new(RwLock::new(HashMap::new())),
            views: Arc::new(RwLock::new(HashMap::new())),
            indexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Catalog for Database {
    /// Gets the tables from the catalog of the database.
    fn get_tables(&self) -> TableMap {
        self.tables.clone()
    }

    fn get_views(&self) -> ViewMap {
        self.views.clone()
    }

    fn get_indexes(&self) -> IndexMap {
        self.indexes.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::IndexDesc;
    use crate::index::IndexKind;
    use crate::table::Table;
    use crate::testutil::*;

    #[test]
    fn test_tables_and_views_share_namespace() {
        init();
        let db = Database::new(String::from("db"));
        let schema = get_int_table_schema(vec!["a", "b"]);
        db.add_table(Table::new(String::from("t"), schema.clone(), 0))
            .unwrap();
        assert!(db.is_valid_table(Table::get_table_id("t")));
        assert!(db.is_valid_column(Table::get_table_id("t"), "b"));
        assert!(!db.is_valid_column(Table::get_table_id("t"), "c"));
        assert!(db.add_view("t", "select a from t").is_err());

        db.add_view("v", "select a from t").unwrap();
        assert_eq!(Some(String::from("select a from t")), db.view_def("v").unwrap());
        assert!(db.add_table(Table::new(String::from("v"), schema, 1)).is_err());
        assert_eq!(None, db.view_def("t").unwrap());
    }

    #[test]
    fn test_indexes() {
        init();
        let db = Database::new(String::from("db"));
        db.add_table(Table::new(
            String::from("t"),
            get_int_table_schema(vec!["a"]),
            0,
        ))
        .unwrap();
        let desc = IndexDesc {
            index_name: String::from("t_a"),
            table_name: String::from("t"),
            field_name: String::from("a"),
            kind: IndexKind::Hash,
        };
        db.add_index(desc.clone()).unwrap();
        assert!(db.add_index(desc.clone()).is_err());
        let mut bad = desc.clone();
        bad.field_name = String::from("zz");
        bad.index_name = String::from("t_zz");
        assert!(db.add_index(bad).is_err());
        assert_eq!(vec![desc], db.index_descs("t").unwrap());
        assert!(db.index_descs("u").unwrap().is_empty());
    }
}
