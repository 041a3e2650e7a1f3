use super::Scan;
use crate::query::Predicate;
use common::{Constant, CrustyError};

/// Passes on the records of its child that satisfy a predicate.
pub struct SelectScan {
    child: Box<dyn Scan>,
    pred: Predicate,
}

impl SelectScan {
    pub fn new(child: Box<dyn Scan>, pred: Predicate) -> Self {
        SelectScan { child, pred }
    }
}

impl Scan for SelectScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.child.before_first()
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        while self.child.next()? {
            if self.pred.is_satisfied(self.child.as_ref())? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        self.child.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.child.has_field(field)
    }

    fn close(&mut self) {
        self.child.close();
    }
}
