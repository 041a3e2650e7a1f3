use crate::ids::ValueId;
use crate::{Constant, CrustyError};
use std::fmt;

/// Physical organisation of a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Hash,
    BTree,
}

impl IndexKind {
    /// Parses the `using` clause of `create index`.
    pub fn from_name(name: &str) -> Option<Self> {
        match &name.to_lowercase()[..] {
            "hash" => Some(IndexKind::Hash),
            "btree" => Some(IndexKind::BTree),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Hash => write!(f, "hash"),
            IndexKind::BTree => write!(f, "btree"),
        }
    }
}

/// Probe interface of a secondary index mapping key values to record ids.
///
/// A probe starts with `before_first(key)`; each successful `next` makes
/// `get_data_rid` return one more record whose indexed field equals `key`.
pub trait Index {
    fn before_first(&mut self, search_key: &Constant) -> Result<(), CrustyError>;

    fn next(&mut self) -> Result<bool, CrustyError>;

    fn get_data_rid(&self) -> Result<ValueId, CrustyError>;

    fn insert(&mut self, key: &Constant, rid: ValueId) -> Result<(), CrustyError>;

    fn delete(&mut self, key: &Constant, rid: ValueId) -> Result<(), CrustyError>;

    fn close(&mut self);
}
