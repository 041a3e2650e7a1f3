use super::sort::{SortPosition, SortScan};
use super::{SortField, SortPlan};
use crate::cost;
use crate::plan::{ExecContext, Plan};
use crate::scan::Scan;
use common::{Constant, CrustyError, TableSchema};
use std::sync::Arc;

/// Equi-join of two inputs sorted on their join fields.
pub struct MergeJoinPlan {
    p1: Arc<SortPlan>,
    p2: Arc<SortPlan>,
    field1: String,
    field2: String,
    schema: TableSchema,
}

impl MergeJoinPlan {
    pub fn new(
        ctx: ExecContext,
        p1: Arc<dyn Plan>,
        p2: Arc<dyn Plan>,
        field1: &str,
        field2: &str,
    ) -> Result<Self, CrustyError> {
        p1.schema().field_index(field1)?;
        p2.schema().field_index(field2)?;
        let schema = p1.schema().merge(p2.schema());
        let p1 = SortPlan::new(ctx.clone(), p1, vec![SortField::asc(field1)]);
        let p2 = SortPlan::new(ctx, p2, vec![SortField::asc(field2)]);
        Ok(MergeJoinPlan {
            p1: Arc::new(p1),
            p2: Arc::new(p2),
            field1: field1.to_string(),
            field2: field2.to_string(),
            schema,
        })
    }

    /// Block estimate given the sizes of the two sorted inputs.
    pub fn estimate_blocks(sorted_blocks1: usize, sorted_blocks2: usize) -> usize {
        cost::merge_cost(sorted_blocks1, sorted_blocks2)
    }
}

impl Plan for MergeJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let s1 = self.p1.open()?;
        let s2 = self.p2.open_sorted()?;
        Ok(Box::new(MergeJoinScan::new(
            s1,
            s2,
            &self.field1,
            &self.field2,
        )?))
    }

    fn blocks_accessed(&self) -> usize {
        Self::estimate_blocks(self.p1.blocks_accessed(), self.p2.blocks_accessed())
    }

    fn records_output(&self) -> usize {
        cost::join_records(
            self.p1.records_output(),
            self.p2.records_output(),
            self.p1.distinct_values(&self.field1),
            self.p2.distinct_values(&self.field2),
        )
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.p1.schema().contains(field) {
            self.p1.distinct_values(field)
        } else {
            self.p2.distinct_values(field)
        }
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

/// Merges two sorted scans. The right side is rewound to the start of its
/// group whenever the left side repeats a join value.
pub struct MergeJoinScan {
    s1: Box<dyn Scan>,
    s2: SortScan,
    field1: String,
    field2: String,
    join_val: Option<Constant>,
    group_start: Option<SortPosition>,
}

impl MergeJoinScan {
    pub fn new(
        s1: Box<dyn Scan>,
        s2: SortScan,
        field1: &str,
        field2: &str,
    ) -> Result<Self, CrustyError> {
        let mut scan = MergeJoinScan {
            s1,
            s2,
            field1: field1.to_string(),
            field2: field2.to_string(),
            join_val: None,
            group_start: None,
        };
        scan.before_first()?;
        Ok(scan)
    }
}

impl Scan for MergeJoinScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.s1.before_first()?;
        self.s2.before_first()?;
        self.join_val = None;
        self.group_start = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        let mut hasmore2 = self.s2.next()?;
        if let Some(jv) = &self.join_val {
            if hasmore2 && self.s2.get_val(&self.field2)? == *jv {
                return Ok(true);
            }
        }
        let mut hasmore1 = self.s1.next()?;
        if let (Some(jv), Some(pos)) = (&self.join_val, &self.group_start) {
            if hasmore1 && self.s1.get_val(&self.field1)? == *jv {
                self.s2.restore_position(pos)?;
                return Ok(true);
            }
        }
        while hasmore1 && hasmore2 {
            let v1 = self.s1.get_val(&self.field1)?;
            let v2 = self.s2.get_val(&self.field2)?;
            if v1 < v2 {
                hasmore1 = self.s1.next()?;
            } else if v1 > v2 {
                hasmore2 = self.s2.next()?;
            } else {
                self.group_start = Some(self.s2.save_position()?);
                self.join_val = Some(v2);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        if self.s1.has_field(field) {
            self.s1.get_val(field)
        } else {
            self.s2.get_val(field)
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.s1.has_field(field) || self.s2.has_field(field)
    }

    fn close(&mut self) {
        self.s1.close();
        self.s2.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;

    #[test]
    fn test_merge_join_duplicate_keys() {
        init();
        let (md, ctx) = test_env(128, 4);
        let lhs_rows = create_tuple_list(gen_random_int_rows(70, 2, 12));
        let rhs_rows = create_tuple_list(gen_random_int_rows(50, 2, 12));
        let lhs = table_plan_with(&md, &ctx, "l", &get_int_table_schema(vec!["a", "b"]), &lhs_rows);
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["c", "d"]), &rhs_rows);
        let plan = MergeJoinPlan::new(ctx.clone(), lhs, rhs, "a", "c").unwrap();
        let mut expected = Vec::new();
        for l in &lhs_rows {
            for r in &rhs_rows {
                if l.field_vals[0] == r.field_vals[0] {
                    expected.push(l.merge(r));
                }
            }
        }
        assert!(compare_unordered_tuples(&expected, run_plan(&plan)));
        assert_eq!(2, ctx.sm.container_count());
    }

    #[test]
    fn test_merge_join_small() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let lhs_rows = create_tuple_list(vec![vec![1, 10], vec![2, 20], vec![2, 21], vec![5, 50]]);
        let rhs_rows = create_tuple_list(vec![vec![2, 7], vec![2, 8], vec![3, 9], vec![5, 1]]);
        let lhs = table_plan_with(&md, &ctx, "l", &get_int_table_schema(vec!["a", "b"]), &lhs_rows);
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["c", "d"]), &rhs_rows);
        let plan = MergeJoinPlan::new(ctx, lhs, rhs, "a", "c").unwrap();
        let expected = create_tuple_list(vec![
            vec![2, 20, 2, 7],
            vec![2, 20, 2, 8],
            vec![2, 21, 2, 7],
            vec![2, 21, 2, 8],
            vec![5, 50, 5, 1],
        ]);
        assert!(compare_unordered_tuples(&expected, run_plan(&plan)));
    }
}
