use common::csv_utils;
use common::index::{Index, IndexKind};
use common::ids::ValueId;
use common::{Constant, CrustyError, TableSchema, Tuple};
use queryexe::metadata::{IndexInfo, MetadataManager};
use queryexe::plan::{ExecContext, TablePlan};
use queryexe::query::{check_fits, Expression, Predicate};
use queryexe::scan::{Scan, TableScan, UpdateScan};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes modifications and DDL. Every index of a modified table is kept
/// in step with its records. Returns the number of records affected.
pub struct UpdatePlanner {
    md: Arc<MetadataManager>,
}

/// The open indexes of one table, keyed by field.
struct OpenIndexes {
    indexes: Vec<(String, Box<dyn Index>)>,
}

impl OpenIndexes {
    fn open(infos: &HashMap<String, IndexInfo>) -> Result<Self, CrustyError> {
        let mut indexes = Vec::with_capacity(infos.len());
        for (field, info) in infos {
            indexes.push((field.clone(), info.open()?));
        }
        Ok(OpenIndexes { indexes })
    }

    fn insert_tuple(
        &mut self,
        schema: &TableSchema,
        tuple: &Tuple,
        rid: ValueId,
    ) -> Result<(), CrustyError> {
        for (field, idx) in self.indexes.iter_mut() {
            let key = tuple
                .get_field(schema.field_index(field)?)
                .ok_or_else(|| CrustyError::FieldNotFound(field.clone()))?;
            idx.insert(key, rid)?;
        }
        Ok(())
    }

    fn delete_record(&mut self, scan: &dyn Scan, rid: ValueId) -> Result<(), CrustyError> {
        for (field, idx) in self.indexes.iter_mut() {
            idx.delete(&scan.get_val(field)?, rid)?;
        }
        Ok(())
    }

    fn get_mut(&mut self, field: &str) -> Option<&mut Box<dyn Index>> {
        self.indexes
            .iter_mut()
            .find(|(f, _)| f == field)
            .map(|(_, idx)| idx)
    }

    fn close(&mut self) {
        for (_, idx) in self.indexes.iter_mut() {
            idx.close();
        }
    }
}

impl UpdatePlanner {
    pub fn new(md: Arc<MetadataManager>) -> Self {
        UpdatePlanner { md }
    }

    fn open_table(
        &self,
        table: &str,
        ctx: &ExecContext,
    ) -> Result<(TableScan, OpenIndexes), CrustyError> {
        let plan = TablePlan::new(ctx.clone(), table, &self.md)?;
        let indexes = OpenIndexes::open(&self.md.index_info(table)?)?;
        Ok((plan.open_update(), indexes))
    }

    /// Inserts rows whose values are listed for `fields`. Fields left out
    /// get their type's zero value. An empty `fields` means every field in
    /// schema order.
    pub fn execute_insert(
        &self,
        table: &str,
        fields: &[String],
        rows: &[Vec<Constant>],
        ctx: &ExecContext,
    ) -> Result<usize, CrustyError> {
        let schema = self.md.get_table(table)?.schema;
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            tuples.push(build_tuple(&schema, fields, row)?);
        }
        self.insert_tuples(table, tuples, ctx)
    }

    fn insert_tuples(
        &self,
        table: &str,
        tuples: Vec<Tuple>,
        ctx: &ExecContext,
    ) -> Result<usize, CrustyError> {
        let (mut scan, mut indexes) = self.open_table(table, ctx)?;
        let result = insert_all(&mut scan, &mut indexes, tuples);
        indexes.close();
        scan.close();
        let count = result?;
        info!("Inserted {} records into {}", count, table);
        Ok(count)
    }

    pub fn execute_delete(
        &self,
        table: &str,
        pred: &Predicate,
        ctx: &ExecContext,
    ) -> Result<usize, CrustyError> {
        let (mut scan, mut indexes) = self.open_table(table, ctx)?;
        let result = delete_matching(&mut scan, &mut indexes, pred);
        indexes.close();
        scan.close();
        let count = result?;
        info!("Deleted {} records from {}", count, table);
        Ok(count)
    }

    /// Sets fields of every matching record. Each new value is computed from
    /// the record as it was before the update.
    pub fn execute_modify(
        &self,
        table: &str,
        assignments: &[(String, Expression)],
        pred: &Predicate,
        ctx: &ExecContext,
    ) -> Result<usize, CrustyError> {
        let (mut scan, mut indexes) = self.open_table(table, ctx)?;
        let result = modify_matching(&mut scan, &mut indexes, assignments, pred);
        indexes.close();
        scan.close();
        let count = result?;
        info!("Modified {} records of {}", count, table);
        Ok(count)
    }

    pub fn execute_create_table(
        &self,
        table: &str,
        schema: &TableSchema,
    ) -> Result<usize, CrustyError> {
        self.md.create_table(table, schema)?;
        Ok(0)
    }

    pub fn execute_create_view(&self, view: &str, definition: &str) -> Result<usize, CrustyError> {
        self.md.create_view(view, definition)?;
        Ok(0)
    }

    /// Creates an index and returns the number of entries it starts with.
    pub fn execute_create_index(
        &self,
        index: &str,
        table: &str,
        field: &str,
        kind: IndexKind,
        ctx: &ExecContext,
    ) -> Result<usize, CrustyError> {
        self.md.create_index(ctx, index, table, field, kind)
    }

    /// Appends the rows of a headerless CSV file to a table.
    pub fn import_csv(
        &self,
        path: &str,
        table: &str,
        ctx: &ExecContext,
    ) -> Result<usize, CrustyError> {
        let schema = self.md.get_table(table)?.schema;
        let tuples = csv_utils::read_tuples_from_file(path, &schema)?;
        for tuple in &tuples {
            for (val, attr) in tuple.field_vals().zip(schema.attributes()) {
                check_fits(&schema, attr.name(), val)?;
            }
        }
        self.insert_tuples(table, tuples, ctx)
    }
}

fn build_tuple(
    schema: &TableSchema,
    fields: &[String],
    row: &[Constant],
) -> Result<Tuple, CrustyError> {
    if fields.is_empty() {
        if row.len() != schema.size() {
            return Err(CrustyError::ValidationError(format!(
                "Insert has {} values for {} fields",
                row.len(),
                schema.size()
            )));
        }
        for (val, attr) in row.iter().zip(schema.attributes()) {
            check_fits(schema, attr.name(), val)?;
        }
        return Ok(Tuple::new(row.to_vec()));
    }
    if fields.len() != row.len() {
        return Err(CrustyError::ValidationError(format!(
            "Insert has {} values for {} fields",
            row.len(),
            fields.len()
        )));
    }
    let mut tuple = schema.blank_tuple();
    for (field, val) in fields.iter().zip(row) {
        check_fits(schema, field, val)?;
        tuple.set_field(schema.field_index(field)?, val.clone())?;
    }
    Ok(tuple)
}

fn insert_all(
    scan: &mut TableScan,
    indexes: &mut OpenIndexes,
    tuples: Vec<Tuple>,
) -> Result<usize, CrustyError> {
    let mut count = 0;
    for tuple in tuples {
        let rid = scan.insert_tuple(tuple.clone())?;
        indexes.insert_tuple(scan.schema(), &tuple, rid)?;
        count += 1;
    }
    Ok(count)
}

fn delete_matching(
    scan: &mut TableScan,
    indexes: &mut OpenIndexes,
    pred: &Predicate,
) -> Result<usize, CrustyError> {
    let mut count = 0;
    while scan.next()? {
        if pred.is_satisfied(&*scan)? {
            let rid = scan.get_rid()?;
            indexes.delete_record(&*scan, rid)?;
            scan.delete()?;
            count += 1;
        }
    }
    Ok(count)
}

fn modify_matching(
    scan: &mut TableScan,
    indexes: &mut OpenIndexes,
    assignments: &[(String, Expression)],
    pred: &Predicate,
) -> Result<usize, CrustyError> {
    let mut count = 0;
    while scan.next()? {
        if !pred.is_satisfied(&*scan)? {
            continue;
        }
        let mut new_vals = Vec::with_capacity(assignments.len());
        for (field, expr) in assignments {
            let val = expr.evaluate(&*scan)?;
            check_fits(scan.schema(), field, &val)?;
            new_vals.push(val);
        }
        let rid = scan.get_rid()?;
        for ((field, _), val) in assignments.iter().zip(new_vals) {
            if let Some(idx) = indexes.get_mut(field) {
                idx.delete(&scan.get_val(field)?, rid)?;
                idx.insert(&val, rid)?;
            }
            scan.set_val(field, val)?;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;
    use common::PredicateOp;
    use queryexe::query::Term;
    use std::io::Write;

    fn a_is(op: PredicateOp, v: i32) -> Predicate {
        Predicate::new(vec![Term::new(
            Expression::Field(String::from("a")),
            op,
            Expression::Constant(Constant::Int(v)),
        )])
    }

    fn probe(md: &MetadataManager, table: &str, field: &str, key: i32) -> usize {
        let infos = md.index_info(table).unwrap();
        let mut idx = infos.get(field).unwrap().open().unwrap();
        idx.before_first(&Constant::Int(key)).unwrap();
        let mut hits = 0;
        while idx.next().unwrap() {
            hits += 1;
        }
        hits
    }

    fn setup() -> (Arc<MetadataManager>, ExecContext, UpdatePlanner) {
        let (md, ctx) = test_env(4096, 10);
        let up = UpdatePlanner::new(Arc::clone(&md));
        up.execute_create_table("t", &get_int_table_schema(vec!["a", "b"]))
            .unwrap();
        up.execute_create_index("t_a", "t", "a", IndexKind::Hash, &ctx)
            .unwrap();
        (md, ctx, up)
    }

    fn contents(md: &MetadataManager, ctx: &ExecContext) -> Vec<Tuple> {
        let plan = TablePlan::new(ctx.clone(), "t", md).unwrap();
        run(Arc::new(plan))
    }

    #[test]
    fn test_insert_maintains_index() {
        init();
        let (md, ctx, up) = setup();
        let rows = vec![
            vec![Constant::Int(1), Constant::Int(10)],
            vec![Constant::Int(1), Constant::Int(11)],
        ];
        assert_eq!(2, up.execute_insert("t", &[], &rows, &ctx).unwrap());
        let partial = vec![vec![Constant::Int(7)]];
        assert_eq!(
            1,
            up.execute_insert("t", &[String::from("b")], &partial, &ctx)
                .unwrap()
        );
        assert!(compare_unordered_tuples(
            &create_tuple_list(vec![vec![1, 10], vec![1, 11], vec![0, 7]]),
            contents(&md, &ctx)
        ));
        assert_eq!(2, probe(&md, "t", "a", 1));
        assert_eq!(1, probe(&md, "t", "a", 0));
        let bad = vec![vec![Constant::from("x"), Constant::Int(1)]];
        assert!(up.execute_insert("t", &[], &bad, &ctx).is_err());
    }

    #[test]
    fn test_delete_and_modify() {
        init();
        let (md, ctx, up) = setup();
        let rows: Vec<Vec<Constant>> = (0..6)
            .map(|i| vec![Constant::Int(i % 3), Constant::Int(i)])
            .collect();
        up.execute_insert("t", &[], &rows, &ctx).unwrap();

        let deleted = up
            .execute_delete("t", &a_is(PredicateOp::Equals, 0), &ctx)
            .unwrap();
        assert_eq!(2, deleted);
        assert_eq!(0, probe(&md, "t", "a", 0));

        let set_a = vec![(String::from("a"), Expression::Constant(Constant::Int(5)))];
        assert_eq!(
            2,
            up.execute_modify("t", &set_a, &a_is(PredicateOp::Equals, 2), &ctx)
                .unwrap()
        );
        assert_eq!(0, probe(&md, "t", "a", 2));
        assert_eq!(2, probe(&md, "t", "a", 5));

        let copy_b = vec![(String::from("b"), Expression::Field(String::from("a")))];
        assert_eq!(
            4,
            up.execute_modify("t", &copy_b, &Predicate::default(), &ctx)
                .unwrap()
        );
        assert!(compare_unordered_tuples(
            &create_tuple_list(vec![vec![1, 1], vec![1, 1], vec![5, 5], vec![5, 5]]),
            contents(&md, &ctx)
        ));
    }

    #[test]
    fn test_import_csv() {
        init();
        let (md, ctx, up) = setup();
        let mut path = gen_random_dir();
        std::fs::create_dir_all(&path).unwrap();
        path.push("rows.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "1,2\n3,4\n1,6").unwrap();
        let path = path.to_str().unwrap().to_string();
        assert_eq!(3, up.import_csv(&path, "t", &ctx).unwrap());
        assert_eq!(3, contents(&md, &ctx).len());
        assert_eq!(2, probe(&md, "t", "a", 1));
        assert!(up.import_csv("/no/such/file.csv", "t", &ctx).is_err());
    }
}
