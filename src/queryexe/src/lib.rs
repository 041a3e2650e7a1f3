#[macro_use]
extern crate log;

pub use memstore::storage_manager::StorageManager;

pub mod cost;
pub mod index;
pub mod materialize;
pub mod metadata;
pub mod multibuffer;
pub mod plan;
pub mod query;
pub mod scan;

#[cfg(test)]
pub(crate) mod testutil;
