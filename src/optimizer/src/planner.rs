use crate::query_planner::QueryPlanner;
use crate::update_planner::UpdatePlanner;
use common::{CrustyError, QueryResult};
use queryexe::metadata::MetadataManager;
use queryexe::plan::{ExecContext, Plan};
use queryexe::query::{Command, Executor, TranslateAndValidate};
use std::sync::Arc;
use txn_manager::transactions::Transaction;

/// Entry point for SQL text: queries become plans, everything else is
/// executed through the update planner.
pub struct Planner {
    md: Arc<MetadataManager>,
    queries: QueryPlanner,
    updates: UpdatePlanner,
}

impl Planner {
    pub fn new(md: Arc<MetadataManager>) -> Self {
        Planner {
            queries: QueryPlanner::new(Arc::clone(&md)),
            updates: UpdatePlanner::new(Arc::clone(&md)),
            md,
        }
    }

    pub fn metadata(&self) -> &Arc<MetadataManager> {
        &self.md
    }

    fn ctx(&self, txn: &Transaction) -> ExecContext {
        ExecContext::for_txn(self.md.storage_manager(), txn)
    }

    fn translate(&self, sql: &str) -> Result<Command, CrustyError> {
        TranslateAndValidate::parse(sql, self.md.database())
    }

    /// Plans a SELECT.
    pub fn create_query_plan(
        &self,
        sql: &str,
        txn: &Transaction,
    ) -> Result<Arc<dyn Plan>, CrustyError> {
        match self.translate(sql)? {
            Command::Query(data) => self.queries.create_plan(&data, &self.ctx(txn)),
            _ => Err(CrustyError::ValidationError(String::from(
                "Statement is not a query",
            ))),
        }
    }

    /// Runs any statement other than a SELECT and returns the number of
    /// records it affected.
    pub fn execute_update(&self, sql: &str, txn: &Transaction) -> Result<usize, CrustyError> {
        let cmd = self.translate(sql)?;
        self.execute_command(cmd, txn)
    }

    fn execute_command(&self, cmd: Command, txn: &Transaction) -> Result<usize, CrustyError> {
        let ctx = self.ctx(txn);
        match cmd {
            Command::Query(_) => Err(CrustyError::ValidationError(String::from(
                "Queries do not modify the database",
            ))),
            Command::Insert {
                table,
                fields,
                rows,
            } => self.updates.execute_insert(&table, &fields, &rows, &ctx),
            Command::Delete { table, pred } => self.updates.execute_delete(&table, &pred, &ctx),
            Command::Modify {
                table,
                assignments,
                pred,
            } => self
                .updates
                .execute_modify(&table, &assignments, &pred, &ctx),
            Command::CreateTable { table, schema } => {
                self.updates.execute_create_table(&table, &schema)
            }
            Command::CreateView { view, definition } => {
                self.updates.execute_create_view(&view, &definition)
            }
            Command::CreateIndex {
                index,
                table,
                field,
                kind,
            } => self
                .updates
                .execute_create_index(&index, &table, &field, kind, &ctx),
        }
    }

    /// Appends a CSV file to a table.
    pub fn import_csv(
        &self,
        path: &str,
        table: &str,
        txn: &Transaction,
    ) -> Result<usize, CrustyError> {
        self.updates.import_csv(path, table, &self.ctx(txn))
    }

    /// Runs one statement of any kind. Query rows are formatted as a table.
    pub fn run(&self, sql: &str, txn: &Transaction) -> Result<QueryResult, CrustyError> {
        let cmd = self.translate(sql)?;
        match cmd {
            Command::Query(data) => {
                info!("Processing SQL query");
                let plan = self.queries.create_plan(&data, &self.ctx(txn))?;
                let mut executor = Executor::new_ref();
                executor.configure_query(plan);
                executor.execute()
            }
            cmd => {
                let count = self.execute_command(cmd, txn)?;
                Ok(QueryResult::new(&format!("{} rows affected", count)))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;
    use common::{Constant, Tuple};

    fn exec(planner: &Planner, sql: &str) -> usize {
        planner.execute_update(sql, &Transaction::new()).unwrap()
    }

    fn query(planner: &Planner, sql: &str) -> Vec<Tuple> {
        let plan = planner.create_query_plan(sql, &Transaction::new()).unwrap();
        run(plan)
    }

    #[test]
    fn test_sql_round_trip() {
        init();
        let planner = test_planner(4096, 10);
        exec(&planner, "create table emp (id int, name varchar(8), dept int)");
        exec(&planner, "create table dept (did int, dname varchar(8))");
        assert_eq!(
            3,
            exec(
                &planner,
                "insert into emp values (1, 'ann', 10), (2, 'bob', 20), (3, 'cy', 10)"
            )
        );
        exec(&planner, "insert into dept values (10, 'eng'), (20, 'ops')");
        assert_eq!(3, exec(&planner, "create index emp_dept on emp (dept) using btree"));

        let rows = query(
            &planner,
            "select name, dname from emp join dept on dept = did where dept = 10 order by name",
        );
        let expected = vec![
            Tuple::new(vec![Constant::from("ann"), Constant::from("eng")]),
            Tuple::new(vec![Constant::from("cy"), Constant::from("eng")]),
        ];
        assert_eq!(expected, rows);

        assert_eq!(1, exec(&planner, "update emp set dept = 20 where id = 3"));
        assert_eq!(1, exec(&planner, "delete from emp where name = 'ann'"));
        let rows = query(&planner, "select id from emp where dept = 20");
        assert!(compare_unordered_tuples(
            &create_tuple_list(vec![vec![2], vec![3]]),
            rows
        ));
    }

    #[test]
    fn test_run_formats_results() {
        init();
        let planner = test_planner(4096, 10);
        let txn = Transaction::new();
        let created = planner.run("create table t (a int)", &txn).unwrap();
        assert_eq!("0 rows affected", created.result());
        planner.run("insert into t values (4), (5)", &txn).unwrap();
        let out = planner.run("select sum(a) from t", &txn).unwrap();
        assert!(out.result().contains("sumofa"));
        assert!(out.result().contains('9'));
        assert!(planner.run("select b from t", &txn).is_err());
        assert!(planner.create_query_plan("delete from t", &txn).is_err());
        assert!(planner.execute_update("select a from t", &txn).is_err());
    }

    #[test]
    fn test_views_through_sql() {
        init();
        let planner = test_planner(4096, 10);
        exec(&planner, "create table t (a int, b int)");
        exec(&planner, "insert into t values (1, 1), (2, 1), (3, 2)");
        exec(&planner, "create view small as select a, b from t where a < 3");
        let rows = query(&planner, "select distinct b from small");
        assert_eq!(create_tuple_list(vec![vec![1]]), rows);
    }
}
