use std::fmt;

/// Predicate operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEq,
}

impl PredicateOp {
    /// Do predicate comparison.
    ///
    /// # Arguments
    ///
    /// * `left_field` - Left field of the predicate.
    /// * `right_field` - Right field of the predicate.
    pub fn compare<T: Ord>(&self, left_field: &T, right_field: &T) -> bool {
        match self {
            PredicateOp::Equals => left_field == right_field,
            PredicateOp::GreaterThan => left_field > right_field,
            PredicateOp::LessThan => left_field < right_field,
            PredicateOp::LessThanOrEq => left_field <= right_field,
            PredicateOp::GreaterThanOrEq => left_field >= right_field,
            PredicateOp::NotEq => left_field != right_field,
        }
    }

    /// Flip the operator so that `a op b` holds iff `b op.flip() a` does.
    pub fn flip(&self) -> Self {
        match self {
            PredicateOp::GreaterThan => PredicateOp::LessThan,
            PredicateOp::LessThan => PredicateOp::GreaterThan,
            PredicateOp::LessThanOrEq => PredicateOp::GreaterThanOrEq,
            PredicateOp::GreaterThanOrEq => PredicateOp::LessThanOrEq,
            op => *op,
        }
    }

    /// Parses a comparison symbol. Both `<>` and `!=` mean not-equal.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(PredicateOp::Equals),
            ">" => Some(PredicateOp::GreaterThan),
            "<" => Some(PredicateOp::LessThan),
            "<=" => Some(PredicateOp::LessThanOrEq),
            ">=" => Some(PredicateOp::GreaterThanOrEq),
            "<>" | "!=" => Some(PredicateOp::NotEq),
            _ => None,
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            PredicateOp::Equals => "=",
            PredicateOp::GreaterThan => ">",
            PredicateOp::LessThan => "<",
            PredicateOp::LessThanOrEq => "<=",
            PredicateOp::GreaterThanOrEq => ">=",
            PredicateOp::NotEq => "<>",
        };
        write!(f, "{}", symbol)
    }
}

/// Aggregation operations.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggOp {
    /// Name of the output field an aggregate over `field` produces, e.g. `countofsid`.
    pub fn output_name(&self, field: &str) -> String {
        format!("{}of{}", self, field)
    }

    /// Parses a SQL function name, ignoring case.
    pub fn from_function_name(name: &str) -> Option<Self> {
        match &name.to_uppercase()[..] {
            "AVG" => Some(AggOp::Avg),
            "COUNT" => Some(AggOp::Count),
            "MAX" => Some(AggOp::Max),
            "MIN" => Some(AggOp::Min),
            "SUM" => Some(AggOp::Sum),
            _ => None,
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            AggOp::Avg => "avg",
            AggOp::Count => "count",
            AggOp::Max => "max",
            AggOp::Min => "min",
            AggOp::Sum => "sum",
        };
        write!(f, "{}", op_str)
    }
}
