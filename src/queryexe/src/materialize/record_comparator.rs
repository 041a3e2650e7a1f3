use crate::scan::Scan;
use common::CrustyError;
use std::cmp::Ordering;
use std::fmt;

/// A field to order by and its direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub field: String,
    pub ascending: bool,
}

impl SortField {
    pub fn new(field: &str, ascending: bool) -> Self {
        SortField {
            field: field.to_string(),
            ascending,
        }
    }

    pub fn asc(field: &str) -> Self {
        SortField::new(field, true)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "asc" } else { "desc" };
        write!(f, "{} {}", self.field, dir)
    }
}

/// Orders the current records of two scans field by field.
#[derive(Debug, Clone)]
pub struct RecordComparator {
    fields: Vec<SortField>,
}

impl RecordComparator {
    pub fn new(fields: Vec<SortField>) -> Self {
        RecordComparator { fields }
    }

    /// Ascending on every field.
    pub fn ascending(fields: &[String]) -> Self {
        RecordComparator::new(fields.iter().map(|f| SortField::asc(f)).collect())
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn compare(&self, s1: &dyn Scan, s2: &dyn Scan) -> Result<Ordering, CrustyError> {
        for sf in &self.fields {
            let ord = s1.get_val(&sf.field)?.cmp(&s2.get_val(&sf.field)?);
            let ord = if sf.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }
}
