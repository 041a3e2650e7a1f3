use crate::table_planner::TablePlanner;
use common::storage_trait::StorageTrait;
use common::{CrustyError, TableSchema};
use queryexe::materialize::{DistinctPlan, GroupByPlan, SortPlan};
use queryexe::metadata::MetadataManager;
use queryexe::plan::{ExecContext, Plan, ProjectPlan};
use queryexe::query::{QueryData, TranslateAndValidate};
use queryexe::StorageManager;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a plan tree for a query.
///
/// Each source gets a `TablePlanner`. The source whose selection outputs
/// the fewest records starts the tree; the remaining sources are added one
/// at a time, each round taking the join with the smallest output, or the
/// smallest product when no source shares a predicate term with the tree.
/// Projection, grouping, duplicate removal and ordering are layered on top.
pub struct QueryPlanner {
    md: Arc<MetadataManager>,
}

impl QueryPlanner {
    pub fn new(md: Arc<MetadataManager>) -> Self {
        QueryPlanner { md }
    }

    /// Plans `data` under `ctx`. The buffer budget is read once here and
    /// handed to every operator of the tree.
    pub fn create_plan(
        &self,
        data: &QueryData,
        ctx: &ExecContext,
    ) -> Result<Arc<dyn Plan>, CrustyError> {
        let available = self.storage_manager().available_buffers();
        let mut views = Vec::new();
        self.plan_query(data, ctx, available, &mut views)
    }

    fn storage_manager(&self) -> &StorageManager {
        self.md.storage_manager()
    }

    fn plan_query(
        &self,
        data: &QueryData,
        ctx: &ExecContext,
        available: usize,
        views: &mut Vec<String>,
    ) -> Result<Arc<dyn Plan>, CrustyError> {
        debug!("Planning {}", data);
        let mut planners = Vec::with_capacity(data.tables().len());
        for name in data.tables() {
            planners.push(self.source_planner(name, data, ctx, available, views)?);
        }

        let sources = planners
            .iter()
            .fold(TableSchema::default(), |acc, tp| acc.merge(tp.schema()));
        if let Some(field) = data.pred().unresolved_field(&sources) {
            return Err(CrustyError::FieldNotFound(field.to_string()));
        }

        let mut current = lowest_select_plan(&mut planners)?;
        while !planners.is_empty() {
            current = match lowest_join_plan(&mut planners, &current)? {
                Some(plan) => plan,
                None => lowest_product_plan(&mut planners, &current)?,
            };
        }

        let fields = if data.all_fields() {
            sources.field_names()
        } else if data.is_grouped() {
            data.input_fields()
        } else {
            data.fields().to_vec()
        };
        let mut plan: Arc<dyn Plan> = Arc::new(ProjectPlan::new(current, &fields)?);

        if data.is_grouped() {
            let grouped = GroupByPlan::new(
                ctx.clone(),
                plan,
                data.group_fields().to_vec(),
                data.aggs().to_vec(),
            )?;
            plan = Arc::new(ProjectPlan::new(Arc::new(grouped), data.fields())?);
        }
        if data.is_distinct() {
            plan = Arc::new(DistinctPlan::on_all_fields(ctx.clone(), plan)?);
        }
        if !data.sort_fields().is_empty() {
            for sf in data.sort_fields() {
                plan.schema().field_index(&sf.field)?;
            }
            plan = Arc::new(SortPlan::new(
                ctx.clone(),
                plan,
                data.sort_fields().to_vec(),
            ));
        }
        Ok(plan)
    }

    /// Planner for one FROM entry. A view's definition is parsed and
    /// planned again on every reference.
    fn source_planner(
        &self,
        name: &str,
        data: &QueryData,
        ctx: &ExecContext,
        available: usize,
        views: &mut Vec<String>,
    ) -> Result<TablePlanner, CrustyError> {
        let definition = match self.md.view_def(name)? {
            Some(def) => def,
            None => {
                return TablePlanner::for_table(
                    name,
                    &self.md,
                    data.pred().clone(),
                    ctx.clone(),
                    available,
                )
            }
        };
        if views.iter().any(|v| v == name) {
            return Err(CrustyError::ValidationError(format!(
                "View {} is defined in terms of itself ({} -> {})",
                name,
                views.join(" -> "),
                name
            )));
        }
        debug!("Expanding view {}: {}", name, definition);
        let view_data = self.parse_view(name, &definition)?;
        views.push(name.to_string());
        let plan = self.plan_query(&view_data, ctx, available, views);
        views.pop();
        Ok(TablePlanner::new(
            name,
            plan?,
            None,
            data.pred().clone(),
            HashMap::new(),
            ctx.clone(),
            available,
        ))
    }

    fn parse_view(&self, name: &str, definition: &str) -> Result<QueryData, CrustyError> {
        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, definition.to_string()).map_err(|e| {
            CrustyError::ValidationError(format!("Bad definition of view {}: {:?}", name, e))
        })?;
        match statements.first() {
            Some(Statement::Query(query)) if statements.len() == 1 => {
                TranslateAndValidate::from_query(query, self.md.database())
            }
            _ => Err(CrustyError::ValidationError(format!(
                "Definition of view {} is not a single query",
                name
            ))),
        }
    }
}

/// Index of the plan with the fewest output records. Ties keep the first.
fn lowest(plans: &[Option<Arc<dyn Plan>>]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, plan) in plans.iter().enumerate() {
        if let Some(p) = plan {
            let records = p.records_output();
            match best {
                Some((_, b)) if b <= records => {}
                _ => best = Some((i, records)),
            }
        }
    }
    best.map(|(i, _)| i)
}

fn lowest_select_plan(planners: &mut Vec<TablePlanner>) -> Result<Arc<dyn Plan>, CrustyError> {
    let plans: Vec<Option<Arc<dyn Plan>>> =
        planners.iter().map(|tp| Some(tp.make_select_plan())).collect();
    take_lowest(planners, plans)?
        .ok_or_else(|| CrustyError::ValidationError(String::from("Query has no tables")))
}

fn lowest_join_plan(
    planners: &mut Vec<TablePlanner>,
    current: &Arc<dyn Plan>,
) -> Result<Option<Arc<dyn Plan>>, CrustyError> {
    let mut plans = Vec::with_capacity(planners.len());
    for tp in planners.iter() {
        plans.push(tp.make_join_plan(Arc::clone(current))?);
    }
    take_lowest(planners, plans)
}

fn lowest_product_plan(
    planners: &mut Vec<TablePlanner>,
    current: &Arc<dyn Plan>,
) -> Result<Arc<dyn Plan>, CrustyError> {
    let mut plans = Vec::with_capacity(planners.len());
    for tp in planners.iter() {
        plans.push(Some(tp.make_product_plan(Arc::clone(current))?));
    }
    take_lowest(planners, plans)?
        .ok_or_else(|| CrustyError::ExecutionError(String::from("No table left to join")))
}

/// Removes the planner whose candidate outputs the fewest records and
/// returns that candidate.
fn take_lowest(
    planners: &mut Vec<TablePlanner>,
    mut plans: Vec<Option<Arc<dyn Plan>>>,
) -> Result<Option<Arc<dyn Plan>>, CrustyError> {
    match lowest(&plans) {
        Some(i) => {
            let tp = planners.remove(i);
            debug!("Adding {} to the plan", tp.name());
            Ok(plans.swap_remove(i))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::index::IndexKind;
    use common::testutil::*;
    use common::{Constant, Tuple};

    fn plan_sql(
        md: &Arc<MetadataManager>,
        ctx: &ExecContext,
        sql: &str,
    ) -> Result<Vec<Tuple>, CrustyError> {
        let data = match TranslateAndValidate::parse(sql, md.database())? {
            queryexe::query::Command::Query(data) => data,
            other => panic!("not a query: {:?}", other),
        };
        let plan = QueryPlanner::new(Arc::clone(md)).create_plan(&data, ctx)?;
        Ok(run(plan))
    }

    fn setup() -> (Arc<MetadataManager>, ExecContext) {
        let (md, ctx) = test_env(256, 6);
        let student = get_int_table_schema(vec!["sid", "majorid", "gradyear"]);
        let dept = get_int_table_schema(vec!["did", "budget"]);
        let mut rows = Vec::new();
        for sid in 0..40 {
            rows.push(vec![sid, sid % 4, 2020 + sid % 3]);
        }
        create_table_with(&md, &ctx, "student", &student, &create_tuple_list(rows));
        let depts = create_tuple_list(vec![vec![0, 100], vec![1, 200], vec![2, 300]]);
        create_table_with(&md, &ctx, "dept", &dept, &depts);
        (md, ctx)
    }

    #[test]
    fn test_join_select_project() {
        init();
        let (md, ctx) = setup();
        let rows = plan_sql(
            &md,
            &ctx,
            "select sid, budget from student, dept where majorid = did and sid < 8",
        )
        .unwrap();
        let expected = create_tuple_list(vec![
            vec![0, 100],
            vec![1, 200],
            vec![2, 300],
            vec![4, 100],
            vec![5, 200],
            vec![6, 300],
        ]);
        assert!(compare_unordered_tuples(&expected, rows));
    }

    #[test]
    fn test_join_with_index() {
        init();
        let (md, ctx) = setup();
        md.create_index(&ctx, "dept_did", "dept", "did", IndexKind::BTree)
            .unwrap();
        let rows = plan_sql(
            &md,
            &ctx,
            "select sid from student join dept on majorid = did where did = 2",
        )
        .unwrap();
        let expected: Vec<Tuple> = (0..40)
            .filter(|s| s % 4 == 2)
            .map(|s| Tuple::new(vec![Constant::Int(s)]))
            .collect();
        assert!(compare_unordered_tuples(&expected, rows));
    }

    #[test]
    fn test_group_order_distinct() {
        init();
        let (md, ctx) = setup();
        let rows = plan_sql(
            &md,
            &ctx,
            "select majorid, count(sid), max(sid) from student group by majorid order by majorid desc",
        )
        .unwrap();
        assert_eq!(
            create_tuple_list(vec![
                vec![3, 10, 39],
                vec![2, 10, 38],
                vec![1, 10, 37],
                vec![0, 10, 36]
            ]),
            rows
        );
        let years = plan_sql(
            &md,
            &ctx,
            "select distinct gradyear from student order by gradyear",
        )
        .unwrap();
        assert_eq!(create_tuple_list(vec![vec![2020], vec![2021], vec![2022]]), years);
    }

    #[test]
    fn test_product_and_star() {
        init();
        let (md, ctx) = setup();
        let rows = plan_sql(&md, &ctx, "select * from dept, student where sid = 1").unwrap();
        assert_eq!(3, rows.len());
        // Fields follow the from clause.
        assert!(rows.contains(&int_vec_to_tuple(vec![1, 200, 1, 1, 2021])));
    }

    #[test]
    fn test_views() {
        init();
        let (md, ctx) = setup();
        md.create_view("rich", "select did from dept where budget > 150")
            .unwrap();
        let rows = plan_sql(
            &md,
            &ctx,
            "select sid from student, rich where majorid = did and sid < 4",
        )
        .unwrap();
        assert!(compare_unordered_tuples(
            &create_tuple_list(vec![vec![1], vec![2]]),
            rows
        ));

        md.create_view("v1", "select did from v2").unwrap();
        md.create_view("v2", "select did from v1").unwrap();
        match plan_sql(&md, &ctx, "select did from v1") {
            Err(CrustyError::ValidationError(msg)) => assert!(msg.contains("v1")),
            other => panic!("expected a cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_fields() {
        init();
        let (md, ctx) = setup();
        md.create_view("v", "select did from dept").unwrap();
        assert_eq!(
            Err(CrustyError::FieldNotFound(String::from("budget"))),
            plan_sql(&md, &ctx, "select did from v where budget = 3")
        );
        assert!(matches!(
            plan_sql(&md, &ctx, "select budget from v"),
            Err(CrustyError::FieldNotFound(_))
        ));
    }
}
