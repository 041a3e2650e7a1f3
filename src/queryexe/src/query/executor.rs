use crate::plan::Plan;
use crate::scan::{current_tuple, Scan};
use common::{CrustyError, QueryResult, Tuple};
use std::sync::Arc;

/// Runs a physical plan and hands out its records as tuples.
pub struct Executor {
    /// Executor state
    plan: Option<Arc<dyn Plan>>,
    scan: Option<Box<dyn Scan>>,
}

impl Executor {
    /// Initializes an executor with no plan.
    pub fn new_ref() -> Self {
        Self {
            plan: None,
            scan: None,
        }
    }

    /// Sets the plan the next `start` runs. Closes a running scan.
    pub fn configure_query(&mut self, plan: Arc<dyn Plan>) {
        if let Some(mut scan) = self.scan.take() {
            scan.close();
        }
        self.plan = Some(plan);
    }

    fn plan(&self) -> Result<&Arc<dyn Plan>, CrustyError> {
        self.plan
            .as_ref()
            .ok_or_else(|| CrustyError::ExecutionError(String::from("No plan configured")))
    }

    /// Opens the plan to begin execution.
    pub fn start(&mut self) -> Result<(), CrustyError> {
        let scan = self.plan()?.open()?;
        self.scan = Some(scan);
        Ok(())
    }

    /// Returns the next tuple or None if there is no such tuple.
    pub fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        let plan = Arc::clone(self.plan()?);
        let scan = self
            .scan
            .as_mut()
            .ok_or_else(|| CrustyError::ExecutionError(String::from("Executor not started")))?;
        if scan.next()? {
            Ok(Some(current_tuple(scan.as_ref(), plan.schema())?))
        } else {
            Ok(None)
        }
    }

    /// Closes the running scan.
    pub fn close(&mut self) -> Result<(), CrustyError> {
        match self.scan.take() {
            Some(mut scan) => {
                scan.close();
                Ok(())
            }
            None => Err(CrustyError::ExecutionError(String::from(
                "Executor not started",
            ))),
        }
    }

    /// Runs the plan to completion and returns every tuple.
    pub fn collect(&mut self) -> Result<Vec<Tuple>, CrustyError> {
        self.start()?;
        let mut tuples = Vec::new();
        let result = loop {
            match self.next() {
                Ok(Some(t)) => tuples.push(t),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.close()?;
        result.map(|_| tuples)
    }

    /// Consumes the plan and stores the result in a QueryResult.
    pub fn execute(&mut self) -> Result<QueryResult, CrustyError> {
        let schema = self.plan()?.schema().clone();
        let tuples = self.collect()?;
        let width = schema
            .attributes()
            .map(|a| a.name().len())
            .chain(tuples.iter().flat_map(|t| t.field_vals().map(|f| f.to_string().len())))
            .max()
            .unwrap_or(8)
            + 2;
        let mut res = String::new();
        for attr in schema.attributes() {
            res += &format!("{:width$}", attr.name(), width = width);
        }
        res += "\n";
        for t in &tuples {
            for f in t.field_vals() {
                res += &format!("{:width$}", f.to_string(), width = width);
            }
            res += "\n";
        }
        res += &format!("({} rows)\n", tuples.len());
        Ok(QueryResult::new(&res))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;

    #[test]
    fn test_next_not_started() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let plan = table_plan_with(&md, &ctx, "t", &get_int_table_schema(vec!["a"]), &[]);
        let mut executor = Executor::new_ref();
        assert!(executor.next().is_err());
        executor.configure_query(plan);
        assert!(executor.next().is_err());
        assert!(executor.close().is_err());
    }

    #[test]
    fn test_execute_formats_rows() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let rows = create_tuple_list(vec![vec![1, 10], vec![2, 20]]);
        let plan = table_plan_with(&md, &ctx, "t", &get_int_table_schema(vec!["a", "b"]), &rows);
        let mut executor = Executor::new_ref();
        executor.configure_query(plan);
        assert!(compare_unordered_tuples(&rows, executor.collect().unwrap()));
        let out = executor.execute().unwrap();
        let lines: Vec<&str> = out.result().lines().collect();
        assert_eq!(4, lines.len());
        assert!(lines[0].starts_with("a"));
        assert_eq!("(2 rows)", lines[3]);
    }
}
