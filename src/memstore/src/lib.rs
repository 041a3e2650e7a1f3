#[macro_use]
extern crate log;

pub mod index;
pub mod storage_manager;
