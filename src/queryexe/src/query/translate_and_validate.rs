use super::{AggField, Command, Expression, Predicate, QueryData, Term};
use crate::materialize::SortField;
use common::catalog::Catalog;
use common::index::IndexKind;
use common::table::*;
use common::{
    get_attr, get_name, AggOp, Constant, CrustyError, DataType, PredicateOp, TableSchema,
};
use sqlparser::ast::{
    BinaryOperator, Expr, Function, JoinConstraint, JoinOperator, SelectItem, SetExpr, Statement,
    TableFactor, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Translates parsed SQL into `Command`s.
/// Validates the columns and tables referenced using the catalog.
/// Shares lifetime 'a with catalog.
pub struct TranslateAndValidate<'a, T: Catalog> {
    /// Catalog to validate the translations.
    catalog: &'a T,
    /// Tables and views named by the query being translated.
    tables: Vec<String>,
}

impl<'a, T: 'a + Catalog> TranslateAndValidate<'a, T> {
    /// Creates a new TranslateAndValidate object.
    fn new(catalog: &'a T) -> Self {
        Self {
            catalog,
            tables: Vec::new(),
        }
    }

    /// Parses and translates one SQL statement.
    ///
    /// `create index` is recognized here; everything else goes through the
    /// SQL parser.
    ///
    /// # Arguments
    ///
    /// * `sql` - Statement text.
    /// * `catalog` - Catalog for validation.
    pub fn parse(sql: &str, catalog: &T) -> Result<Command, CrustyError> {
        let sql = sql.trim().trim_end_matches(';');
        if let Some(cmd) = Self::parse_create_index(sql, catalog) {
            return cmd;
        }
        let dialect = GenericDialect {};
        let mut statements = Parser::parse_sql(&dialect, sql.to_string())
            .map_err(|e| CrustyError::ValidationError(format!("SQL parse error: {:?}", e)))?;
        if statements.len() != 1 {
            return Err(CrustyError::ValidationError(format!(
                "Expected one statement, found {}",
                statements.len()
            )));
        }
        let statement = statements.remove(0);
        Self::from_sql(&statement, catalog)
    }

    /// Translates a sqlparser statement.
    ///
    /// # Arguments
    ///
    /// * `statement` - AST to translate.
    /// * `catalog` - Catalog for validation.
    pub fn from_sql(statement: &Statement, catalog: &T) -> Result<Command, CrustyError> {
        let mut translator = TranslateAndValidate::new(catalog);
        match statement {
            Statement::Query(query) => Ok(Command::Query(translator.process_query(query)?)),
            Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => translator.process_insert(&get_name(table_name)?, columns, source),
            Statement::Delete {
                table_name,
                selection,
                ..
            } => {
                let table = translator.use_base_table(&get_name(table_name)?)?;
                let pred = translator.process_condition(selection.as_ref())?;
                Ok(Command::Delete { table, pred })
            }
            Statement::Update {
                table_name,
                assignments,
                selection,
                ..
            } => {
                let table = translator.use_base_table(&get_name(table_name)?)?;
                let mut sets = Vec::new();
                for a in assignments {
                    let field = translator.disambiguate_name(vec![a.id.as_str()])?;
                    sets.push((field, translator.expr_to_expression(&a.value)?));
                }
                let pred = translator.process_condition(selection.as_ref())?;
                Ok(Command::Modify {
                    table,
                    assignments: sets,
                    pred,
                })
            }
            Statement::CreateTable { name, columns, .. } => {
                let table = get_name(name)?;
                if columns.is_empty() {
                    return Err(CrustyError::ValidationError(format!(
                        "Table {} needs at least one column",
                        table
                    )));
                }
                let mut schema = TableSchema::default();
                for col in columns {
                    if schema.contains(&col.name) {
                        return Err(CrustyError::ValidationError(format!(
                            "Duplicate column {}",
                            col.name
                        )));
                    }
                    let dtype = get_attr(&col.data_type)?;
                    match dtype {
                        DataType::Int => schema.add_int_field(&col.name),
                        DataType::String(len) => schema.add_string_field(&col.name, len),
                    }
                }
                Ok(Command::CreateTable { table, schema })
            }
            Statement::CreateView { name, query, .. } => {
                let view = get_name(name)?;
                translator.process_query(query)?;
                Ok(Command::CreateView {
                    view,
                    definition: query.to_string(),
                })
            }
            _ => Err(CrustyError::ValidationError(String::from(
                "Unsupported statement",
            ))),
        }
    }

    /// Translates a SELECT into a `QueryData`.
    ///
    /// # Arguments
    ///
    /// * `query` - AST to translate.
    /// * `catalog` - Catalog for validation.
    pub fn from_query(query: &sqlparser::ast::Query, catalog: &T) -> Result<QueryData, CrustyError> {
        let mut translator = TranslateAndValidate::new(catalog);
        translator.process_query(query)
    }

    /// Recognizes `create index NAME on TABLE (FIELD) [using hash|btree]`.
    /// Returns None if `sql` is not a create index statement.
    fn parse_create_index(sql: &str, catalog: &T) -> Option<Result<Command, CrustyError>> {
        let cleaned = sql.replace('(', " ").replace(')', " ");
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        if tokens.len() < 2
            || !tokens[0].eq_ignore_ascii_case("create")
            || !tokens[1].eq_ignore_ascii_case("index")
        {
            return None;
        }
        let bad = || {
            CrustyError::ValidationError(String::from(
                "Expected: create index NAME on TABLE (FIELD) [using hash|btree]",
            ))
        };
        let parsed = match tokens.as_slice() {
            [_, _, index, on, table, field] if on.eq_ignore_ascii_case("on") => {
                Ok((*index, *table, *field, IndexKind::Hash))
            }
            [_, _, index, on, table, field, using, kind]
                if on.eq_ignore_ascii_case("on") && using.eq_ignore_ascii_case("using") =>
            {
                IndexKind::from_name(kind)
                    .map(|k| (*index, *table, *field, k))
                    .ok_or_else(|| {
                        CrustyError::ValidationError(format!("Unknown index kind {}", kind))
                    })
            }
            _ => Err(bad()),
        };
        Some(parsed.and_then(|(index, table, field, kind)| {
            let mut translator = TranslateAndValidate::new(catalog);
            let table = translator.use_base_table(table)?;
            let field = translator.disambiguate_name(vec![field])?;
            Ok(Command::CreateIndex {
                index: index.to_string(),
                table,
                field,
                kind,
            })
        }))
    }

    /// Records a table or view named in a FROM clause.
    fn use_relation(&mut self, name: &str) -> Result<String, CrustyError> {
        let is_table = self.catalog.is_valid_table(Table::get_table_id(name));
        if !is_table && self.catalog.view_def(name)?.is_none() {
            return Err(CrustyError::ValidationError(format!(
                "Invalid table name {}",
                name
            )));
        }
        if self.tables.iter().any(|t| t == name) {
            return Err(CrustyError::ValidationError(format!(
                "Table {} is listed twice",
                name
            )));
        }
        self.tables.push(name.to_string());
        Ok(name.to_string())
    }

    /// Like `use_relation`, but views are rejected.
    fn use_base_table(&mut self, name: &str) -> Result<String, CrustyError> {
        if !self.catalog.is_valid_table(Table::get_table_id(name)) {
            return Err(CrustyError::ValidationError(format!(
                "Invalid table name {}",
                name
            )));
        }
        self.use_relation(name)
    }

    fn base_schema(&self, table: &str) -> Option<TableSchema> {
        self.catalog
            .get_table_schema(Table::get_table_id(table))
            .ok()
    }

    /// Resolves a possibly qualified column name to a field name.
    ///
    /// Field names are not qualified downstream, so a name may belong to at
    /// most one table of the query. Names that no base table holds are
    /// accepted when the query reads a view; the planner checks them.
    ///
    /// # Arguments
    ///
    /// * `identifiers` - a list of elements in a multi-part identifier e.g. table.column would be vec!["table", "column"]
    fn disambiguate_name(&self, identifiers: Vec<&str>) -> Result<String, CrustyError> {
        let orig = identifiers.join(".");
        let (qualifier, column) = match identifiers.as_slice() {
            [column] => (None, *column),
            [table, column] => (Some(*table), *column),
            _ => {
                return Err(CrustyError::ValidationError(format!(
                    "No . table names supported in field {}",
                    orig
                )));
            }
        };
        if let Some(table) = qualifier {
            if !self.tables.iter().any(|t| t == table) {
                return Err(CrustyError::ValidationError(format!(
                    "Table {} in {} is not listed in the query",
                    table, orig
                )));
            }
        }
        let owners: Vec<&String> = self
            .tables
            .iter()
            .filter(|t| {
                self.base_schema(t)
                    .map(|s| s.contains(column))
                    .unwrap_or(false)
            })
            .collect();
        if owners.len() > 1 {
            return Err(CrustyError::ValidationError(format!(
                "The field {} could refer to more than one table listed in the query",
                orig
            )));
        }
        let has_view = self.tables.iter().any(|t| self.base_schema(t).is_none());
        match (owners.first(), qualifier) {
            (Some(owner), Some(table)) if *owner != table => Err(CrustyError::ValidationError(
                format!("The field {} is not present in table {}", orig, table),
            )),
            (Some(_), _) => Ok(column.to_string()),
            (None, _) if has_view => Ok(column.to_string()),
            (None, _) => Err(CrustyError::ValidationError(format!(
                "The field {} is not present in tables listed in the query",
                orig
            ))),
        }
    }

    /// Helper function to process sqlparser::ast::Query
    ///
    /// # Arguments
    ///
    /// * `query` - AST to process.
    fn process_query(&mut self, query: &sqlparser::ast::Query) -> Result<QueryData, CrustyError> {
        let select = match &query.body {
            SetExpr::Select(b) => &**b,
            SetExpr::Values(_) => {
                return Err(CrustyError::ValidationError(String::from(
                    "Value operation not supported outside insert",
                )));
            }
            _ => {
                return Err(CrustyError::ValidationError(String::from(
                    "Set operations and subqueries not supported",
                )));
            }
        };
        let data = self.process_select(select)?;

        let mut sort_fields = Vec::new();
        for ob in &query.order_by {
            let field = match &ob.expr {
                Expr::Function(_) => self.expr_to_agg(&ob.expr)?.output_name(),
                expr => self.expr_to_field(expr)?,
            };
            let ascending = ob.asc.unwrap_or(true);
            sort_fields.push(SortField::new(&field, ascending));
        }
        Ok(data.with_sort_fields(sort_fields))
    }

    /// Helper function to process sqlparser::ast::Select
    ///
    /// # Arguments
    ///
    /// * `select` - AST of a select query to process.
    fn process_select(&mut self, select: &sqlparser::ast::Select) -> Result<QueryData, CrustyError> {
        if select.from.is_empty() {
            return Err(CrustyError::ValidationError(String::from(
                "Select needs a from clause",
            )));
        }
        // From. Every source is registered before any name is resolved.
        for sel in &select.from {
            self.process_table_factor(&sel.relation)?;
            for join in &sel.joins {
                self.process_table_factor(&join.relation)?;
            }
        }

        // Join conditions and where are one conjunction.
        let mut pred = Predicate::default();
        for sel in &select.from {
            for join in &sel.joins {
                match &join.join_operator {
                    JoinOperator::Inner(JoinConstraint::On(expr)) => {
                        pred.conjoin_with(self.process_condition(Some(expr))?)
                    }
                    _ => {
                        return Err(CrustyError::ValidationError(String::from(
                            "Unsupported join type",
                        )));
                    }
                }
            }
        }
        pred.conjoin_with(self.process_condition(select.selection.as_ref())?);

        if select.having.is_some() {
            return Err(CrustyError::ValidationError(String::from(
                "Having not supported",
            )));
        }

        // Select
        let mut fields = Vec::new();
        let mut aggs = Vec::new();
        let mut wildcard = false;
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => {
                    if select.projection.len() > 1 {
                        return Err(CrustyError::ValidationError(String::from(
                            "Cannot select wildcard and exp in same select",
                        )));
                    }
                    wildcard = true;
                }
                SelectItem::UnnamedExpr(expr @ Expr::Function(_)) => {
                    let agg = self.expr_to_agg(expr)?;
                    fields.push(agg.output_name());
                    aggs.push(agg);
                }
                SelectItem::UnnamedExpr(expr) => fields.push(self.expr_to_field(expr)?),
                SelectItem::ExprWithAlias { .. } => {
                    return Err(CrustyError::ValidationError(String::from(
                        "Column aliases not supported",
                    )));
                }
                _ => {
                    return Err(CrustyError::ValidationError(String::from(
                        "Select unsupported expression",
                    )));
                }
            }
        }

        // Group by
        let mut group_fields = Vec::new();
        for expr in &select.group_by {
            let field = self.expr_to_field(expr)?;
            if !group_fields.contains(&field) {
                group_fields.push(field);
            }
        }
        if !aggs.is_empty() || !group_fields.is_empty() {
            if wildcard {
                return Err(CrustyError::ValidationError(String::from(
                    "Cannot select wildcard in an aggregate query",
                )));
            }
            // Checks that only aggregates and group by fields are projected out
            let agg_names: Vec<String> = aggs.iter().map(|a: &AggField| a.output_name()).collect();
            for f in &fields {
                if !agg_names.contains(f) && !group_fields.contains(f) {
                    return Err(CrustyError::ValidationError(format!(
                        "The expression '{}' must be part of an aggregate function or group by",
                        f
                    )));
                }
            }
        }

        let mut data = QueryData::new(self.tables.clone())
            .with_fields(fields)
            .with_aggs(aggs)
            .with_pred(pred)
            .with_group_fields(group_fields)
            .with_distinct(select.distinct);
        if wildcard {
            data = data.with_all_fields();
        }
        Ok(data)
    }

    /// Registers the table named by a FROM item.
    ///
    /// # Arguments
    ///
    /// * `tf` - Table to process.
    fn process_table_factor(&mut self, tf: &TableFactor) -> Result<String, CrustyError> {
        match tf {
            TableFactor::Table { name, .. } => {
                let name = get_name(&name)?;
                self.use_relation(&name)
            }
            _ => Err(CrustyError::ValidationError(String::from(
                "Nested joins and derived tables not supported",
            ))),
        }
    }

    /// Translates a where or on clause, splitting it on `and`.
    fn process_condition(&self, expr: Option<&Expr>) -> Result<Predicate, CrustyError> {
        let mut terms = Vec::new();
        if let Some(expr) = expr {
            self.collect_terms(expr, &mut terms)?;
        }
        Ok(Predicate::new(terms))
    }

    fn collect_terms(&self, expr: &Expr, terms: &mut Vec<Term>) -> Result<(), CrustyError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.collect_terms(left, terms)?;
                self.collect_terms(right, terms)
            }
            Expr::Nested(inner) => self.collect_terms(inner, terms),
            Expr::BinaryOp { left, op, right } => {
                terms.push(Term::new(
                    self.expr_to_expression(left)?,
                    Self::binary_operator_to_predicate(op)?,
                    self.expr_to_expression(right)?,
                ));
                Ok(())
            }
            _ => Err(CrustyError::ValidationError(String::from(
                "Unsupported condition; only comparisons joined by and",
            ))),
        }
    }

    /// Prases binary operator to predicate operators.
    ///
    /// # Arguments
    ///
    /// * `op` - Binary operator to parse.
    fn binary_operator_to_predicate(op: &BinaryOperator) -> Result<PredicateOp, CrustyError> {
        match op {
            BinaryOperator::Gt => Ok(PredicateOp::GreaterThan),
            BinaryOperator::Lt => Ok(PredicateOp::LessThan),
            BinaryOperator::GtEq => Ok(PredicateOp::GreaterThanOrEq),
            BinaryOperator::LtEq => Ok(PredicateOp::LessThanOrEq),
            BinaryOperator::Eq => Ok(PredicateOp::Equals),
            BinaryOperator::NotEq => Ok(PredicateOp::NotEq),
            _ => Err(CrustyError::ValidationError(String::from(
                "Unsupported binary operation",
            ))),
        }
    }

    fn expr_to_expression(&self, expr: &Expr) -> Result<Expression, CrustyError> {
        match expr {
            Expr::Value(val) => Ok(Expression::Constant(Self::value_to_constant(val)?)),
            Expr::Nested(inner) => self.expr_to_expression(inner),
            _ => Ok(Expression::Field(self.expr_to_field(expr)?)),
        }
    }

    fn value_to_constant(val: &Value) -> Result<Constant, CrustyError> {
        match val {
            Value::Number(s) => s.parse::<i32>().map(Constant::Int).map_err(|_| {
                CrustyError::ValidationError(format!("Unsupported literal {}", s))
            }),
            Value::SingleQuotedString(s) => Ok(Constant::String(s.to_string())),
            _ => Err(CrustyError::ValidationError(String::from(
                "Unsupported literal",
            ))),
        }
    }

    fn expr_to_field(&self, expr: &Expr) -> Result<String, CrustyError> {
        match expr {
            Expr::Identifier(name) => self.disambiguate_name(vec![name.as_str()]),
            Expr::CompoundIdentifier(names) => {
                self.disambiguate_name(names.iter().map(|s| s.as_ref()).collect())
            }
            _ => Err(CrustyError::ValidationError(String::from(
                "Unsupported expression",
            ))),
        }
    }

    /// Converts `op(field)` into an aggregate.
    fn expr_to_agg(&self, expr: &Expr) -> Result<AggField, CrustyError> {
        match expr {
            Expr::Function(Function { name, args, .. }) => {
                let fname = get_name(name)?;
                let op = AggOp::from_function_name(&fname).ok_or_else(|| {
                    CrustyError::ValidationError(format!("Unsupported SQL function {}", fname))
                })?;
                if args.len() != 1 {
                    return Err(CrustyError::ValidationError(format!(
                        "Wrong number of args in {} operation",
                        fname
                    )));
                }
                let field = match &args[0] {
                    Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                        self.expr_to_field(&args[0])?
                    }
                    _ => {
                        return Err(CrustyError::ValidationError(String::from(
                            "Aggregate over unsupported expression",
                        )));
                    }
                };
                let agg = AggField::new(op, &field);
                self.validate_aggregate(&agg)?;
                Ok(agg)
            }
            _ => Err(CrustyError::ValidationError(String::from(
                "Unsupported expression",
            ))),
        }
    }

    /// Validates that an aggregate operation is valid for the type of field.
    fn validate_aggregate(&self, agg: &AggField) -> Result<(), CrustyError> {
        let dtype = self.tables.iter().find_map(|t| {
            self.base_schema(t)
                .and_then(|s| s.get_attribute_by_name(&agg.field).map(|a| a.dtype().clone()))
        });
        match (dtype, agg.op) {
            (Some(DataType::String(_)), AggOp::Sum) | (Some(DataType::String(_)), AggOp::Avg) => {
                Err(CrustyError::ValidationError(format!(
                    "Cannot perform operation {} on field {}",
                    agg.op, agg.field,
                )))
            }
            _ => Ok(()),
        }
    }

    /// Translates `insert into TABLE [(FIELDS)] values (...), ...`.
    fn process_insert(
        &mut self,
        table_name: &str,
        columns: &[String],
        source: &sqlparser::ast::Query,
    ) -> Result<Command, CrustyError> {
        let table = self.use_base_table(table_name)?;
        let schema = self
            .base_schema(&table)
            .ok_or_else(|| CrustyError::ValidationError(format!("Invalid table {}", table)))?;
        let mut fields = Vec::new();
        for col in columns {
            let field = self.disambiguate_name(vec![col.as_str()])?;
            if fields.contains(&field) {
                return Err(CrustyError::ValidationError(format!(
                    "Field {} listed twice",
                    field
                )));
            }
            fields.push(field);
        }
        let targets: Vec<String> = if fields.is_empty() {
            schema.field_names()
        } else {
            fields.clone()
        };
        let values = match &source.body {
            SetExpr::Values(values) => &values.0,
            _ => {
                return Err(CrustyError::ValidationError(String::from(
                    "Only insert ... values is supported",
                )));
            }
        };
        let mut rows = Vec::new();
        for row in values {
            if row.len() != targets.len() {
                return Err(CrustyError::ValidationError(format!(
                    "Insert has {} values for {} fields",
                    row.len(),
                    targets.len()
                )));
            }
            let mut consts = Vec::new();
            for (expr, field) in row.iter().zip(targets.iter()) {
                let val = match expr {
                    Expr::Value(v) => Self::value_to_constant(v)?,
                    _ => {
                        return Err(CrustyError::ValidationError(String::from(
                            "Insert values must be literals",
                        )));
                    }
                };
                check_fits(&schema, field, &val)?;
                consts.push(val);
            }
            rows.push(consts);
        }
        Ok(Command::Insert {
            table,
            fields,
            rows,
        })
    }
}

/// Checks that `val` has the type and length `field` allows.
pub fn check_fits(schema: &TableSchema, field: &str, val: &Constant) -> Result<(), CrustyError> {
    let attr = schema
        .get_attribute_by_name(field)
        .ok_or_else(|| CrustyError::FieldNotFound(field.to_string()))?;
    match (attr.dtype(), val) {
        (DataType::Int, Constant::Int(_)) => Ok(()),
        (DataType::String(len), Constant::String(s)) if s.chars().count() <= *len => Ok(()),
        (DataType::String(len), Constant::String(_)) => Err(CrustyError::ValidationError(
            format!("Value for {} is longer than {} characters", field, len),
        )),
        _ => Err(CrustyError::ValidationError(format!(
            "Value {} has the wrong type for {}",
            val, field
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::database::Database;
    use common::testutil::*;

    fn test_catalog() -> Database {
        let db = Database::new(String::from("test"));
        db.add_table(Table::new(
            String::from("student"),
            TableSchema::from_vecs(
                vec!["sid", "sname", "majorid"],
                vec![DataType::Int, DataType::String(10), DataType::Int],
            ),
            0,
        ))
        .unwrap();
        db.add_table(Table::new(
            String::from("dept"),
            TableSchema::from_vecs(
                vec!["did", "dname"],
                vec![DataType::Int, DataType::String(8)],
            ),
            1,
        ))
        .unwrap();
        db
    }

    fn query(sql: &str, db: &Database) -> Result<QueryData, CrustyError> {
        match TranslateAndValidate::parse(sql, db)? {
            Command::Query(q) => Ok(q),
            other => panic!("not a query: {:?}", other),
        }
    }

    #[test]
    fn test_select_join_where() {
        init();
        let db = test_catalog();
        let q = query(
            "select sname, dname from student join dept on majorid = did where sid > 3",
            &db,
        )
        .unwrap();
        assert_eq!(&[String::from("student"), String::from("dept")], q.tables());
        assert_eq!(&[String::from("sname"), String::from("dname")], q.fields());
        assert_eq!("majorid = did and sid > 3", q.pred().to_string());
        assert!(!q.is_distinct());

        let q = query("select distinct * from student, dept where student.sid = 1", &db).unwrap();
        assert!(q.all_fields());
        assert!(q.is_distinct());
        assert_eq!("sid = 1", q.pred().to_string());
    }

    #[test]
    fn test_aggregates_and_order() {
        init();
        let db = test_catalog();
        let q = query(
            "select majorid, count(sid) from student group by majorid order by majorid desc",
            &db,
        )
        .unwrap();
        assert_eq!(
            &[String::from("majorid"), String::from("countofsid")],
            q.fields()
        );
        assert_eq!(&[AggField::new(AggOp::Count, "sid")], q.aggs());
        assert_eq!(&[SortField::new("majorid", false)], q.sort_fields());

        assert!(query("select sname, count(sid) from student group by majorid", &db).is_err());
        assert!(query("select sum(sname) from student", &db).is_err());
        assert!(query("select max(sname) from student", &db).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        init();
        let db = test_catalog();
        assert!(query("select sid from nope", &db).is_err());
        assert!(query("select zz from student", &db).is_err());
        assert!(query("select dept.sid from student, dept", &db).is_err());
        assert!(query("select sid from student, student", &db).is_err());
    }

    #[test]
    fn test_views_defer_field_checks() {
        init();
        let db = test_catalog();
        db.add_view("v", "select sid from student").unwrap();
        let q = query("select sid from v where sid = 2", &db).unwrap();
        assert_eq!(&[String::from("v")], q.tables());
    }

    #[test]
    fn test_updates() {
        init();
        let db = test_catalog();
        let cmd = TranslateAndValidate::parse(
            "insert into student (sid, sname) values (1, 'amy'), (2, 'bob');",
            &db,
        )
        .unwrap();
        assert_eq!(
            Command::Insert {
                table: String::from("student"),
                fields: vec![String::from("sid"), String::from("sname")],
                rows: vec![
                    vec![Constant::Int(1), Constant::from("amy")],
                    vec![Constant::Int(2), Constant::from("bob")],
                ],
            },
            cmd
        );
        assert!(TranslateAndValidate::parse(
            "insert into student values (1, 'a name too long', 3)",
            &db
        )
        .is_err());
        assert!(TranslateAndValidate::parse("insert into student values ('x', 'a', 3)", &db).is_err());

        match TranslateAndValidate::parse("update student set majorid = 7 where sid = 1", &db)
            .unwrap()
        {
            Command::Modify {
                table,
                assignments,
                pred,
            } => {
                assert_eq!("student", table);
                assert_eq!(
                    vec![(String::from("majorid"), Expression::Constant(Constant::Int(7)))],
                    assignments
                );
                assert_eq!("sid = 1", pred.to_string());
            }
            other => panic!("unexpected {:?}", other),
        }
        match TranslateAndValidate::parse("delete from student", &db).unwrap() {
            Command::Delete { pred, .. } => assert!(pred.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ddl() {
        init();
        let db = test_catalog();
        match TranslateAndValidate::parse("create table t (a int, b varchar(5))", &db).unwrap() {
            Command::CreateTable { table, schema } => {
                assert_eq!("t", table);
                assert_eq!(
                    TableSchema::from_vecs(vec!["a", "b"], vec![DataType::Int, DataType::String(5)]),
                    schema
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        match TranslateAndValidate::parse("create view v as select sid from student", &db).unwrap()
        {
            Command::CreateView { view, definition } => {
                assert_eq!("v", view);
                assert!(TranslateAndValidate::parse(&definition, &db).unwrap().is_query());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            Command::CreateIndex {
                index: String::from("sidx"),
                table: String::from("student"),
                field: String::from("majorid"),
                kind: IndexKind::BTree,
            },
            TranslateAndValidate::parse("create index sidx on student(majorid) using btree", &db)
                .unwrap()
        );
        assert!(TranslateAndValidate::parse("create index i on student (zz)", &db).is_err());
        assert!(TranslateAndValidate::parse("create index i on student (sid) using trie", &db).is_err());
    }
}
