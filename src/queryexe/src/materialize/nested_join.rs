use super::MaterializePlan;
use crate::cost;
use crate::multibuffer::buffer_needs::best_factor;
use crate::multibuffer::ProductScan;
use crate::plan::{ExecContext, Plan};
use crate::query::Predicate;
use crate::scan::Scan;
use common::{CrustyError, TableSchema};
use std::sync::Arc;

/// Block nested loop join.
///
/// The side expected to output fewer records is materialized and read in
/// chunks sized to the buffer budget. The other side is scanned once per
/// chunk and every pair is tested against the join predicate, so any
/// comparison operator works.
pub struct NestedJoinPlan {
    ctx: ExecContext,
    outer: Arc<dyn Plan>,
    inner: Arc<dyn Plan>,
    pred: Predicate,
    available: usize,
    schema: TableSchema,
}

impl NestedJoinPlan {
    pub fn new(
        ctx: ExecContext,
        lhs: Arc<dyn Plan>,
        rhs: Arc<dyn Plan>,
        pred: Predicate,
        available: usize,
    ) -> Self {
        let schema = lhs.schema().merge(rhs.schema());
        let (outer, inner) = if rhs.records_output() < lhs.records_output() {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };
        NestedJoinPlan {
            ctx,
            outer,
            inner,
            pred,
            available,
            schema,
        }
    }

    /// Block estimate for a join whose outer side materializes into
    /// `outer_blocks` blocks.
    pub fn estimate_blocks(outer_blocks: usize, inner_blocks: usize, available: usize) -> usize {
        let chunk = best_factor(available, outer_blocks);
        cost::nested_cost(outer_blocks, inner_blocks, chunk)
    }

    fn outer_blocks(&self) -> usize {
        cost::materialized_blocks(
            self.outer.records_output(),
            self.ctx.records_per_block(self.outer.schema()),
        )
    }
}

impl Plan for NestedJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let temp = MaterializePlan::new(self.ctx.clone(), Arc::clone(&self.outer)).materialize()?;
        let chunk_size = best_factor(self.available, temp.num_blocks()?);
        let inner = self.inner.open()?;
        Ok(Box::new(ProductScan::new(
            inner,
            temp,
            chunk_size,
            self.pred.clone(),
        )?))
    }

    fn blocks_accessed(&self) -> usize {
        Self::estimate_blocks(
            self.outer_blocks(),
            self.inner.blocks_accessed(),
            self.available,
        )
    }

    fn records_output(&self) -> usize {
        let both = self
            .outer
            .records_output()
            .saturating_mul(self.inner.records_output());
        match self.pred.equi_join_fields(self.outer.schema(), self.inner.schema()) {
            Some((f1, f2)) => cost::join_records(
                self.outer.records_output(),
                self.inner.records_output(),
                self.outer.distinct_values(&f1),
                self.inner.distinct_values(&f2),
            ),
            None => both,
        }
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.outer.schema().contains(field) {
            self.outer.distinct_values(field)
        } else {
            self.inner.distinct_values(field)
        }
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::{Expression, Term};
    use crate::testutil::*;
    use common::testutil::*;
    use common::PredicateOp;

    fn term(l: &str, op: PredicateOp, r: &str) -> Predicate {
        Predicate::new(vec![Term::new(
            Expression::Field(l.to_string()),
            op,
            Expression::Field(r.to_string()),
        )])
    }

    #[test]
    fn test_nested_equi_join() {
        init();
        let (md, ctx) = test_env(128, 4);
        let lhs_rows = create_tuple_list(gen_random_int_rows(80, 2, 20));
        let rhs_rows = create_tuple_list(gen_random_int_rows(30, 2, 20));
        let lhs = table_plan_with(&md, &ctx, "l", &get_int_table_schema(vec!["a", "b"]), &lhs_rows);
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["c", "d"]), &rhs_rows);
        let plan = NestedJoinPlan::new(
            ctx.clone(),
            lhs,
            rhs,
            term("a", PredicateOp::Equals, "c"),
            4,
        );
        assert_eq!(vec!["a", "b", "c", "d"], plan.schema().field_names());
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
    fn test_nested_range_join() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let lhs_rows = create_tuple_list(vec![vec![1], vec![5], vec![9]]);
        let rhs_rows = create_tuple_list(vec![vec![4], vec![6]]);
        let lhs = table_plan_with(&md, &ctx, "l", &get_int_table_schema(vec!["a"]), &lhs_rows);
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["c"]), &rhs_rows);
        let plan = NestedJoinPlan::new(ctx, lhs, rhs, term("a", PredicateOp::LessThan, "c"), 10);
        let expected = create_tuple_list(vec![vec![1, 4], vec![1, 6], vec![5, 6]]);
        assert!(compare_unordered_tuples(&expected, run_plan(&plan)));
    }

    #[test]
    fn test_estimate() {
        // 10 outer blocks in chunks of 5 with 7 buffers
        assert_eq!(10 + 2 * 4, NestedJoinPlan::estimate_blocks(10, 4, 7));
    }
}
