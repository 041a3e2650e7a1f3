#[macro_use]
extern crate log;

pub mod cost;
pub mod planner;
pub mod query_planner;
pub mod table_planner;
pub mod update_planner;

#[cfg(test)]
pub(crate) mod testutil;
