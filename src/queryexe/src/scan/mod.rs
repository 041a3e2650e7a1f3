use common::ids::ValueId;
use common::{Constant, CrustyError, TableSchema, Tuple};

mod project_scan;
mod select_scan;
mod table_scan;

pub use project_scan::ProjectScan;
pub use select_scan::SelectScan;
pub use table_scan::TableScan;

/// A stateful forward cursor over the records of a relation.
///
/// A freshly opened scan is positioned before the first record. Every field
/// of the producing plan's schema can be read while the scan is on a record.
pub trait Scan {
    /// Positions the scan before the first record.
    fn before_first(&mut self) -> Result<(), CrustyError>;

    /// Moves to the next record. Returns false once the scan is exhausted.
    fn next(&mut self) -> Result<bool, CrustyError>;

    /// Value of the field in the current record.
    fn get_val(&self, field: &str) -> Result<Constant, CrustyError>;

    fn get_int(&self, field: &str) -> Result<i32, CrustyError> {
        self.get_val(field)?.as_int()
    }

    fn get_string(&self, field: &str) -> Result<String, CrustyError> {
        Ok(self.get_val(field)?.as_str()?.to_string())
    }

    fn has_field(&self, field: &str) -> bool;

    /// Releases the scan's children and temp tables. A closed scan must be
    /// positioned with `before_first` before it is read again.
    fn close(&mut self);
}

/// A scan whose records can be modified in place.
pub trait UpdateScan: Scan {
    fn set_val(&mut self, field: &str, val: Constant) -> Result<(), CrustyError>;

    /// Adds a blank record and makes it current.
    fn insert(&mut self) -> Result<(), CrustyError>;

    /// Deletes the current record. The scan stays between its neighbours.
    fn delete(&mut self) -> Result<(), CrustyError>;

    fn get_rid(&self) -> Result<ValueId, CrustyError>;

    /// Makes the record stored at `rid` current.
    fn move_to_rid(&mut self, rid: ValueId) -> Result<(), CrustyError>;
}

/// Reads the current record of a scan as a tuple laid out by `schema`.
pub fn current_tuple(scan: &dyn Scan, schema: &TableSchema) -> Result<Tuple, CrustyError> {
    let mut vals = Vec::with_capacity(schema.size());
    for attr in schema.attributes() {
        vals.push(scan.get_val(attr.name())?);
    }
    Ok(Tuple::new(vals))
}
