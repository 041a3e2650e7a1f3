use super::Scan;
use common::{Constant, CrustyError};

/// Exposes a subset of its child's fields.
pub struct ProjectScan {
    child: Box<dyn Scan>,
    fields: Vec<String>,
}

impl ProjectScan {
    pub fn new(child: Box<dyn Scan>, fields: Vec<String>) -> Self {
        ProjectScan { child, fields }
    }
}

impl Scan for ProjectScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.child.before_first()
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        self.child.next()
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        if self.has_field(field) {
            self.child.get_val(field)
        } else {
            Err(CrustyError::FieldNotFound(field.to_string()))
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    fn close(&mut self) {
        self.child.close();
    }
}
