use super::{Expression, Predicate};
use crate::materialize::SortField;
use common::index::IndexKind;
use common::{AggOp, Constant, TableSchema};
use std::fmt;

/// An aggregate requested by a query, e.g. `sum(x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggField {
    pub op: AggOp,
    pub field: String,
}

impl AggField {
    pub fn new(op: AggOp, field: &str) -> Self {
        AggField {
            op,
            field: field.to_string(),
        }
    }

    /// Name of the field holding the aggregate's result.
    pub fn output_name(&self) -> String {
        self.op.output_name(&self.field)
    }
}

/// A validated SELECT.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryData {
    /// Output fields in select order. Aggregates appear by output name.
    fields: Vec<String>,
    /// `select *`: output every field of the sources.
    all_fields: bool,
    aggs: Vec<AggField>,
    /// Tables and views in from order.
    tables: Vec<String>,
    pred: Predicate,
    group_fields: Vec<String>,
    sort_fields: Vec<SortField>,
    distinct: bool,
}

impl QueryData {
    pub fn new(tables: Vec<String>) -> Self {
        QueryData {
            tables,
            ..QueryData::default()
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_all_fields(mut self) -> Self {
        self.all_fields = true;
        self
    }

    pub fn with_aggs(mut self, aggs: Vec<AggField>) -> Self {
        self.aggs = aggs;
        self
    }

    pub fn with_pred(mut self, pred: Predicate) -> Self {
        self.pred = pred;
        self
    }

    pub fn with_group_fields(mut self, group_fields: Vec<String>) -> Self {
        self.group_fields = group_fields;
        self
    }

    pub fn with_sort_fields(mut self, sort_fields: Vec<SortField>) -> Self {
        self.sort_fields = sort_fields;
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn all_fields(&self) -> bool {
        self.all_fields
    }

    pub fn aggs(&self) -> &[AggField] {
        &self.aggs
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn pred(&self) -> &Predicate {
        &self.pred
    }

    pub fn group_fields(&self) -> &[String] {
        &self.group_fields
    }

    pub fn sort_fields(&self) -> &[SortField] {
        &self.sort_fields
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// True if the query groups or aggregates.
    pub fn is_grouped(&self) -> bool {
        !self.aggs.is_empty() || !self.group_fields.is_empty()
    }

    /// Source fields the query reads after selection: plain output fields,
    /// group fields and aggregate inputs, without repeats.
    pub fn input_fields(&self) -> Vec<String> {
        let agg_names: Vec<String> = self.aggs.iter().map(|a| a.output_name()).collect();
        let mut fields: Vec<String> = Vec::new();
        let candidates = self
            .fields
            .iter()
            .filter(|f| !agg_names.contains(f))
            .chain(self.group_fields.iter())
            .chain(self.aggs.iter().map(|a| &a.field));
        for f in candidates {
            if !fields.contains(f) {
                fields.push(f.clone());
            }
        }
        fields
    }
}

impl fmt::Display for QueryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        if self.distinct {
            write!(f, "distinct ")?;
        }
        if self.all_fields {
            write!(f, "*")?;
        } else {
            write!(f, "{}", self.fields.join(", "))?;
        }
        write!(f, " from {}", self.tables.join(", "))?;
        if !self.pred.is_empty() {
            write!(f, " where {}", self.pred)?;
        }
        if !self.group_fields.is_empty() {
            write!(f, " group by {}", self.group_fields.join(", "))?;
        }
        if !self.sort_fields.is_empty() {
            let sorts: Vec<String> = self.sort_fields.iter().map(|s| s.to_string()).collect();
            write!(f, " order by {}", sorts.join(", "))?;
        }
        Ok(())
    }
}

/// A translated SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query(QueryData),
    Insert {
        table: String,
        /// Target fields; empty means every field in schema order.
        fields: Vec<String>,
        rows: Vec<Vec<Constant>>,
    },
    Delete {
        table: String,
        pred: Predicate,
    },
    Modify {
        table: String,
        assignments: Vec<(String, Expression)>,
        pred: Predicate,
    },
    CreateTable {
        table: String,
        schema: TableSchema,
    },
    CreateView {
        view: String,
        definition: String,
    },
    CreateIndex {
        index: String,
        table: String,
        field: String,
        kind: IndexKind,
    },
}

impl Command {
    pub fn is_query(&self) -> bool {
        matches!(self, Command::Query(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_input_fields() {
        let q = QueryData::new(vec![String::from("t")])
            .with_fields(vec![String::from("b"), String::from("sumofa")])
            .with_aggs(vec![AggField::new(AggOp::Sum, "a")])
            .with_group_fields(vec![String::from("b")]);
        assert!(q.is_grouped());
        assert_eq!(vec![String::from("b"), String::from("a")], q.input_fields());
        assert_eq!("select b, sumofa from t group by b", q.to_string());
    }
}
