use crate::query::AggField;
use crate::scan::Scan;
use common::{AggOp, Constant, CrustyError, DataType, TableSchema};
use std::convert::TryFrom;

/// A running aggregate over the records of one group.
///
/// `process_first` starts a new group; `process_next` adds a record to it.
pub trait AggregationFn {
    fn process_first(&mut self, scan: &dyn Scan) -> Result<(), CrustyError>;

    fn process_next(&mut self, scan: &dyn Scan) -> Result<(), CrustyError>;

    /// Name of the output field, e.g. `sumofx`.
    fn field_name(&self) -> String;

    fn value(&self) -> Result<Constant, CrustyError>;
}

pub fn make_aggregation_fn(agg: &AggField) -> Box<dyn AggregationFn> {
    let field = agg.field.clone();
    match agg.op {
        AggOp::Sum => Box::new(SumFn { field, sum: None }),
        AggOp::Count => Box::new(CountFn { field, count: 0 }),
        AggOp::Avg => Box::new(AvgFn {
            field,
            sum: 0,
            count: 0,
        }),
        AggOp::Min => Box::new(ExtremeFn {
            op: AggOp::Min,
            field,
            value: None,
        }),
        AggOp::Max => Box::new(ExtremeFn {
            op: AggOp::Max,
            field,
            value: None,
        }),
    }
}

/// Type of the value an aggregate produces from `schema`.
pub fn output_type(agg: &AggField, schema: &TableSchema) -> Result<DataType, CrustyError> {
    let input = schema
        .get_attribute_by_name(&agg.field)
        .ok_or_else(|| CrustyError::FieldNotFound(agg.field.clone()))?;
    match agg.op {
        AggOp::Min | AggOp::Max => Ok(input.dtype().clone()),
        _ => Ok(DataType::Int),
    }
}

fn degenerate(op: AggOp, field: &str) -> CrustyError {
    CrustyError::DegenerateAggregate(format!("{}({}) over no records", op, field))
}

fn to_int(v: i64, what: &str) -> Result<i32, CrustyError> {
    i32::try_from(v).map_err(|_| CrustyError::ExecutionError(format!("{} overflows", what)))
}

struct SumFn {
    field: String,
    sum: Option<i32>,
}

impl AggregationFn for SumFn {
    fn process_first(&mut self, scan: &dyn Scan) -> Result<(), CrustyError> {
        self.sum = Some(scan.get_int(&self.field)?);
        Ok(())
    }

    fn process_next(&mut self, scan: &dyn Scan) -> Result<(), CrustyError> {
        let v = scan.get_int(&self.field)?;
        let sum = self.sum.unwrap_or(0);
        self.sum = Some(sum.checked_add(v).ok_or_else(|| {
            CrustyError::ExecutionError(format!("sum({}) overflows", self.field))
        })?);
        Ok(())
    }

    fn field_name(&self) -> String {
        AggOp::Sum.output_name(&self.field)
    }

    fn value(&self) -> Result<Constant, CrustyError> {
        self.sum
            .map(Constant::Int)
            .ok_or_else(|| degenerate(AggOp::Sum, &self.field))
    }
}

struct CountFn {
    field: String,
    count: usize,
}

impl AggregationFn for CountFn {
    fn process_first(&mut self, _scan: &dyn Scan) -> Result<(), CrustyError> {
        self.count = 1;
        Ok(())
    }

    fn process_next(&mut self, _scan: &dyn Scan) -> Result<(), CrustyError> {
        self.count += 1;
        Ok(())
    }

    fn field_name(&self) -> String {
        AggOp::Count.output_name(&self.field)
    }

    fn value(&self) -> Result<Constant, CrustyError> {
        Ok(Constant::Int(to_int(self.count as i64, "count")?))
    }
}

/// Integer average; the quotient is truncated.
struct AvgFn {
    field: String,
    sum: i64,
    count: i64,
}

impl AggregationFn for AvgFn {
    fn process_first(&mut self, scan: &dyn Scan) -> Result<(), CrustyError> {
        self.sum = i64::from(scan.get_int(&self.field)?);
        self.count = 1;
        Ok(())
    }

    fn process_next(&mut self, scan: &dyn Scan) -> Result<(), CrustyError> {
        self.sum += i64::from(scan.get_int(&self.field)?);
        self.count += 1;
        Ok(())
    }

    fn field_name(&self) -> String {
        AggOp::Avg.output_name(&self.field)
    }

    fn value(&self) -> Result<Constant, CrustyError> {
        if self.count == 0 {
            return Err(degenerate(AggOp::Avg, &self.field));
        }
        Ok(Constant::Int(to_int(self.sum / self.count, "avg")?))
    }
}

/// Min or max under `Constant` ordering.
struct ExtremeFn {
    op: AggOp,
    field: String,
    value: Option<Constant>,
}

impl AggregationFn for ExtremeFn {
    fn process_first(&mut self, scan: &dyn Scan) -> Result<(), CrustyError> {
        self.value = Some(scan.get_val(&self.field)?);
        Ok(())
    }

    fn process_next(&mut self, scan: &dyn Scan) -> Result<(), CrustyError> {
        let v = scan.get_val(&self.field)?;
        let replace = match &self.value {
            None => true,
            Some(cur) if self.op == AggOp::Min => v < *cur,
            Some(cur) => v > *cur,
        };
        if replace {
            self.value = Some(v);
        }
        Ok(())
    }

    fn field_name(&self) -> String {
        self.op.output_name(&self.field)
    }

    fn value(&self) -> Result<Constant, CrustyError> {
        self.value
            .clone()
            .ok_or_else(|| degenerate(self.op, &self.field))
    }
}
