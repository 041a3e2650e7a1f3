use crate::plan::Plan;
use crate::scan::Scan;
use common::{Constant, CrustyError, PredicateOp, TableSchema};
use std::fmt;

/// One side of a comparison: a literal or a field reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Constant),
    Field(String),
}

impl Expression {
    /// Value of the expression for the scan's current record.
    pub fn evaluate(&self, scan: &dyn Scan) -> Result<Constant, CrustyError> {
        match self {
            Expression::Constant(c) => Ok(c.clone()),
            Expression::Field(f) => scan.get_val(f),
        }
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            Expression::Field(f) => Some(f),
            Expression::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Expression::Constant(c) => Some(c),
            Expression::Field(_) => None,
        }
    }

    /// True if every field the expression mentions is in `schema`.
    pub fn applies_to(&self, schema: &TableSchema) -> bool {
        match self {
            Expression::Constant(_) => true,
            Expression::Field(f) => schema.contains(f),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(Constant::String(s)) => write!(f, "'{}'", s),
            Expression::Constant(c) => write!(f, "{}", c),
            Expression::Field(name) => write!(f, "{}", name),
        }
    }
}

/// A comparison between two expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub lhs: Expression,
    pub op: PredicateOp,
    pub rhs: Expression,
}

impl Term {
    pub fn new(lhs: Expression, op: PredicateOp, rhs: Expression) -> Self {
        Term { lhs, op, rhs }
    }

    /// Values of different types never compare true.
    pub fn is_satisfied(&self, scan: &dyn Scan) -> Result<bool, CrustyError> {
        let l = self.lhs.evaluate(scan)?;
        let r = self.rhs.evaluate(scan)?;
        Ok(match (&l, &r) {
            (Constant::Int(_), Constant::Int(_)) | (Constant::String(_), Constant::String(_)) => {
                self.op.compare(&l, &r)
            }
            _ => false,
        })
    }

    /// How much the term shrinks the output of `plan`.
    pub fn reduction_factor(&self, plan: &dyn Plan) -> usize {
        let factor = match self.op {
            PredicateOp::Equals => match (&self.lhs, &self.rhs) {
                (Expression::Field(l), Expression::Field(r)) => {
                    plan.distinct_values(l).max(plan.distinct_values(r))
                }
                (Expression::Field(l), _) => plan.distinct_values(l),
                (_, Expression::Field(r)) => plan.distinct_values(r),
                (Expression::Constant(l), Expression::Constant(r)) => {
                    if l == r {
                        1
                    } else {
                        usize::MAX
                    }
                }
            },
            PredicateOp::NotEq => 1,
            _ => 3,
        };
        factor.max(1)
    }

    pub fn applies_to(&self, schema: &TableSchema) -> bool {
        self.lhs.applies_to(schema) && self.rhs.applies_to(schema)
    }

    /// Fields the term reads.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.lhs.as_field().into_iter().chain(self.rhs.as_field())
    }

    /// If the term is `field = constant`, the constant.
    pub fn equates_with_constant(&self, field: &str) -> Option<&Constant> {
        if self.op != PredicateOp::Equals {
            return None;
        }
        match (&self.lhs, &self.rhs) {
            (Expression::Field(f), Expression::Constant(c))
            | (Expression::Constant(c), Expression::Field(f))
                if f == field =>
            {
                Some(c)
            }
            _ => None,
        }
    }

    /// If the term is `field = other_field`, the other field.
    pub fn equates_with_field(&self, field: &str) -> Option<&str> {
        if self.op != PredicateOp::Equals {
            return None;
        }
        match (&self.lhs, &self.rhs) {
            (Expression::Field(l), Expression::Field(r)) if l == field => Some(r),
            (Expression::Field(l), Expression::Field(r)) if r == field => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// A conjunction of terms. The empty predicate is always true.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new(terms: Vec<Term>) -> Self {
        Predicate { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn conjoin_with(&mut self, other: Predicate) {
        self.terms.extend(other.terms);
    }

    pub fn is_satisfied(&self, scan: &dyn Scan) -> Result<bool, CrustyError> {
        for term in &self.terms {
            if !term.is_satisfied(scan)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn reduction_factor(&self, plan: &dyn Plan) -> usize {
        self.terms
            .iter()
            .fold(1usize, |acc, t| acc.saturating_mul(t.reduction_factor(plan)))
    }

    /// Terms that only read fields of `schema`, or None if there are none.
    pub fn select_sub_pred(&self, schema: &TableSchema) -> Option<Predicate> {
        let terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|t| t.applies_to(schema))
            .cloned()
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(Predicate::new(terms))
        }
    }

    /// Terms that need fields of both schemas, or None if there are none.
    pub fn join_sub_pred(&self, left: &TableSchema, right: &TableSchema) -> Option<Predicate> {
        let both = left.merge(right);
        let terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|t| !t.applies_to(left) && !t.applies_to(right) && t.applies_to(&both))
            .cloned()
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(Predicate::new(terms))
        }
    }

    pub fn equates_with_constant(&self, field: &str) -> Option<&Constant> {
        self.terms
            .iter()
            .find_map(|t| t.equates_with_constant(field))
    }

    pub fn equates_with_field(&self, field: &str) -> Option<&str> {
        self.terms.iter().find_map(|t| t.equates_with_field(field))
    }

    /// The first equality term linking a field of `left` to a field of
    /// `right`, as `(left field, right field)`.
    pub fn equi_join_fields(
        &self,
        left: &TableSchema,
        right: &TableSchema,
    ) -> Option<(String, String)> {
        self.terms.iter().find_map(|t| {
            if t.op != PredicateOp::Equals {
                return None;
            }
            match (t.lhs.as_field(), t.rhs.as_field()) {
                (Some(l), Some(r)) if left.contains(l) && right.contains(r) => {
                    Some((l.to_string(), r.to_string()))
                }
                (Some(l), Some(r)) if left.contains(r) && right.contains(l) => {
                    Some((r.to_string(), l.to_string()))
                }
                _ => None,
            }
        })
    }

    /// First field the predicate reads that `schema` lacks.
    pub fn unresolved_field(&self, schema: &TableSchema) -> Option<&str> {
        self.terms
            .iter()
            .flat_map(|t| t.fields())
            .find(|f| !schema.contains(f))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", terms.join(" and "))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::*;

    fn field(name: &str) -> Expression {
        Expression::Field(name.to_string())
    }

    fn int(i: i32) -> Expression {
        Expression::Constant(Constant::Int(i))
    }

    #[test]
    fn test_sub_predicates() {
        init();
        let left = get_int_table_schema(vec!["a", "b"]);
        let right = get_int_table_schema(vec!["c"]);
        let pred = Predicate::new(vec![
            Term::new(field("a"), PredicateOp::Equals, int(3)),
            Term::new(field("b"), PredicateOp::Equals, field("c")),
            Term::new(field("c"), PredicateOp::LessThan, int(9)),
        ]);
        assert_eq!("a = 3", pred.select_sub_pred(&left).unwrap().to_string());
        assert_eq!("c < 9", pred.select_sub_pred(&right).unwrap().to_string());
        assert_eq!(
            "b = c",
            pred.join_sub_pred(&left, &right).unwrap().to_string()
        );
        assert_eq!(
            Some((String::from("b"), String::from("c"))),
            pred.equi_join_fields(&left, &right)
        );
        assert_eq!(
            Some((String::from("c"), String::from("b"))),
            pred.equi_join_fields(&right, &left)
        );
        assert_eq!(Some(&Constant::Int(3)), pred.equates_with_constant("a"));
        assert_eq!(Some("c"), pred.equates_with_field("b"));
        assert_eq!(None, pred.equates_with_constant("b"));
        assert_eq!(Some("c"), pred.unresolved_field(&left));
        assert!(pred
            .join_sub_pred(&left, &get_int_table_schema(vec!["z"]))
            .is_none());
    }

    #[test]
    fn test_range_terms_do_not_equate() {
        init();
        let pred = Predicate::new(vec![Term::new(
            int(5),
            PredicateOp::GreaterThan,
            field("a"),
        )]);
        assert_eq!(None, pred.equates_with_constant("a"));
        assert_eq!("5 > a", pred.to_string());
    }
}
