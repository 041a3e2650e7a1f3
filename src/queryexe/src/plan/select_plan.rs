use super::Plan;
use crate::query::Predicate;
use crate::scan::{Scan, SelectScan};
use common::{CrustyError, TableSchema};
use std::sync::Arc;

/// Filters the output of its child by a predicate.
pub struct SelectPlan {
    child: Arc<dyn Plan>,
    pred: Predicate,
}

impl SelectPlan {
    pub fn new(child: Arc<dyn Plan>, pred: Predicate) -> Self {
        SelectPlan { child, pred }
    }

    pub fn pred(&self) -> &Predicate {
        &self.pred
    }
}

impl Plan for SelectPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let child = self.child.open()?;
        Ok(Box::new(SelectScan::new(child, self.pred.clone())))
    }

    fn blocks_accessed(&self) -> usize {
        self.child.blocks_accessed()
    }

    fn records_output(&self) -> usize {
        self.child.records_output() / self.pred.reduction_factor(self.child.as_ref())
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.pred.equates_with_constant(field).is_some() {
            1
        } else if let Some(other) = self.pred.equates_with_field(field) {
            self.child
                .distinct_values(field)
                .min(self.child.distinct_values(other))
        } else {
            self.child.distinct_values(field)
        }
    }

    fn schema(&self) -> &TableSchema {
        self.child.schema()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::{Expression, Term};
    use crate::scan::current_tuple;
    use crate::testutil::*;
    use common::testutil::*;
    use common::{Constant, PredicateOp};

    #[test]
    fn test_select_filters_and_estimates() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let schema = get_int_table_schema(vec!["a", "b"]);
        let rows = create_tuple_list((0..30).map(|i| vec![i % 5, i]).collect());
        let table = table_plan_with(&md, &ctx, "t", &schema, &rows);
        let pred = Predicate::new(vec![Term::new(
            Expression::Field(String::from("a")),
            PredicateOp::Equals,
            Expression::Constant(Constant::Int(2)),
        )]);
        let plan = SelectPlan::new(table, pred);
        // 30 records, 1 + 30 / 3 distinct values of a
        assert_eq!(2, plan.records_output());
        assert_eq!(1, plan.distinct_values("a"));
        assert_eq!(11, plan.distinct_values("b"));
        let mut scan = plan.open().unwrap();
        let mut seen = Vec::new();
        while scan.next().unwrap() {
            seen.push(current_tuple(scan.as_ref(), plan.schema()).unwrap());
        }
        scan.close();
        assert_eq!(6, seen.len());
        assert!(seen.iter().all(|t| t.get_field(0) == Some(&Constant::Int(2))));
    }
}
