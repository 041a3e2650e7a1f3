use super::aggregation::{make_aggregation_fn, output_type, AggregationFn};
use super::{SortField, SortPlan};
use crate::plan::{ExecContext, Plan};
use crate::query::AggField;
use crate::scan::Scan;
use common::{Attribute, Constant, CrustyError, TableSchema};
use std::sync::Arc;

/// Groups its child on the group fields and computes aggregates per group.
///
/// Output records hold the group fields followed by one field per aggregate.
pub struct GroupByPlan {
    src: Arc<dyn Plan>,
    group_fields: Vec<String>,
    aggs: Vec<AggField>,
    schema: TableSchema,
}

impl GroupByPlan {
    pub fn new(
        ctx: ExecContext,
        src: Arc<dyn Plan>,
        group_fields: Vec<String>,
        aggs: Vec<AggField>,
    ) -> Result<Self, CrustyError> {
        let mut schema = TableSchema::default();
        for f in &group_fields {
            schema.add_from(f, src.schema())?;
        }
        for agg in &aggs {
            let dtype = output_type(agg, src.schema())?;
            schema.add_attribute(Attribute::new(agg.output_name(), dtype));
        }
        let src: Arc<dyn Plan> = if group_fields.is_empty() {
            src
        } else {
            let sort_fields = group_fields.iter().map(|f| SortField::asc(f)).collect();
            Arc::new(SortPlan::new(ctx, src, sort_fields))
        };
        Ok(GroupByPlan {
            src,
            group_fields,
            aggs,
            schema,
        })
    }
}

impl Plan for GroupByPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let src = self.src.open()?;
        let fns = self.aggs.iter().map(make_aggregation_fn).collect();
        Ok(Box::new(GroupByScan::new(
            src,
            self.group_fields.clone(),
            fns,
        )?))
    }

    fn blocks_accessed(&self) -> usize {
        self.src.blocks_accessed()
    }

    fn records_output(&self) -> usize {
        let groups = self.group_fields.iter().fold(1usize, |acc, f| {
            acc.saturating_mul(self.src.distinct_values(f))
        });
        groups.min(self.src.records_output().max(1))
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.group_fields.iter().any(|f| f == field) {
            self.src.distinct_values(field)
        } else {
            self.records_output()
        }
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

/// Group field values of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupValue {
    vals: Vec<(String, Constant)>,
}

impl GroupValue {
    pub fn new(scan: &dyn Scan, fields: &[String]) -> Result<Self, CrustyError> {
        let mut vals = Vec::with_capacity(fields.len());
        for f in fields {
            vals.push((f.clone(), scan.get_val(f)?));
        }
        Ok(GroupValue { vals })
    }

    pub fn get_val(&self, field: &str) -> Option<&Constant> {
        self.vals.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }
}

/// Reads a child sorted on the group fields one group at a time.
pub struct GroupByScan {
    src: Box<dyn Scan>,
    group_fields: Vec<String>,
    aggfns: Vec<Box<dyn AggregationFn>>,
    group_val: Option<GroupValue>,
    more_groups: bool,
}

impl GroupByScan {
    pub fn new(
        src: Box<dyn Scan>,
        group_fields: Vec<String>,
        aggfns: Vec<Box<dyn AggregationFn>>,
    ) -> Result<Self, CrustyError> {
        let mut scan = GroupByScan {
            src,
            group_fields,
            aggfns,
            group_val: None,
            more_groups: false,
        };
        scan.before_first()?;
        Ok(scan)
    }
}

impl Scan for GroupByScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.src.before_first()?;
        self.group_val = None;
        self.more_groups = self.src.next()?;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        if !self.more_groups {
            self.group_val = None;
            return Ok(false);
        }
        for f in self.aggfns.iter_mut() {
            f.process_first(self.src.as_ref())?;
        }
        let group_val = GroupValue::new(self.src.as_ref(), &self.group_fields)?;
        loop {
            self.more_groups = self.src.next()?;
            if !self.more_groups {
                break;
            }
            if GroupValue::new(self.src.as_ref(), &self.group_fields)? != group_val {
                break;
            }
            for f in self.aggfns.iter_mut() {
                f.process_next(self.src.as_ref())?;
            }
        }
        self.group_val = Some(group_val);
        Ok(true)
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        if self.group_fields.iter().any(|f| f == field) {
            return self
                .group_val
                .as_ref()
                .and_then(|g| g.get_val(field))
                .cloned()
                .ok_or_else(|| {
                    CrustyError::ExecutionError(String::from(
                        "Group scan is not positioned on a group",
                    ))
                });
        }
        match self.aggfns.iter().find(|f| f.field_name() == field) {
            Some(f) => f.value(),
            None => Err(CrustyError::FieldNotFound(field.to_string())),
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.group_fields.iter().any(|f| f == field)
            || self.aggfns.iter().any(|f| f.field_name() == field)
    }

    fn close(&mut self) {
        self.src.close();
        self.group_val = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;
    use common::{AggOp, DataType, Tuple};

    #[test]
    fn test_group_and_aggregate() {
        init();
        let (md, ctx) = test_env(128, 5);
        let schema = get_int_table_schema(vec!["g", "x"]);
        let rows = create_tuple_list(vec![
            vec![2, 10],
            vec![1, 1],
            vec![2, 20],
            vec![1, 2],
            vec![3, 7],
            vec![1, 6],
        ]);
        let table = table_plan_with(&md, &ctx, "t", &schema, &rows);
        let plan = GroupByPlan::new(
            ctx,
            table,
            vec![String::from("g")],
            vec![
                AggField::new(AggOp::Count, "x"),
                AggField::new(AggOp::Avg, "x"),
                AggField::new(AggOp::Max, "x"),
            ],
        )
        .unwrap();
        assert_eq!(
            vec!["g", "countofx", "avgofx", "maxofx"],
            plan.schema().field_names()
        );
        let expected = create_tuple_list(vec![
            vec![1, 3, 3, 6],
            vec![2, 2, 15, 20],
            vec![3, 1, 7, 7],
        ]);
        assert_eq!(expected, run_plan(&plan));
    }

    #[test]
    fn test_aggregate_without_groups() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let schema = get_int_string_schema("id", "name", 8);
        let rows = int_string_tuples(&[(4, "dd"), (9, "aa"), (1, "zz")]);
        let table = table_plan_with(&md, &ctx, "t", &schema, &rows);
        let aggs = vec![
            AggField::new(AggOp::Sum, "id"),
            AggField::new(AggOp::Min, "name"),
        ];
        let plan = GroupByPlan::new(ctx.clone(), table, vec![], aggs.clone()).unwrap();
        assert_eq!(
            &DataType::String(8),
            plan.schema().get_attribute(1).unwrap().dtype()
        );
        assert_eq!(
            vec![Tuple::new(vec![Constant::Int(14), Constant::from("aa")])],
            run_plan(&plan)
        );

        let empty = table_plan_with(&md, &ctx, "e", &schema, &[]);
        let plan = GroupByPlan::new(ctx, empty, vec![], aggs).unwrap();
        assert!(run_plan(&plan).is_empty());
    }

    #[test]
    fn test_unknown_group_field() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let table = table_plan_with(&md, &ctx, "t", &get_int_table_schema(vec!["a"]), &[]);
        assert!(matches!(
            GroupByPlan::new(ctx, table, vec![String::from("b")], vec![]),
            Err(CrustyError::FieldNotFound(_))
        ));
    }
}
