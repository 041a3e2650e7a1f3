mod index_join;
mod index_select;

pub use index_join::{IndexJoinPlan, IndexJoinScan};
pub use index_select::{IndexSelectPlan, IndexSelectScan};
