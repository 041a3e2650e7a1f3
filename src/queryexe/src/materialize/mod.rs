//! Operators that write intermediate results to temp tables.

pub mod aggregation;
mod distinct;
mod group_by;
mod hash_join;
mod materialize_plan;
mod merge_join;
mod nested_join;
mod record_comparator;
mod sort;
mod temp_table;

pub use distinct::DistinctPlan;
pub use group_by::{GroupByPlan, GroupByScan, GroupValue};
pub use hash_join::{partition_of, HashJoinPlan, HashJoinScan};
pub use materialize_plan::MaterializePlan;
pub use merge_join::{MergeJoinPlan, MergeJoinScan};
pub use nested_join::NestedJoinPlan;
pub use record_comparator::{RecordComparator, SortField};
pub use sort::{SortPlan, SortPosition, SortScan};
pub use temp_table::TempTable;
