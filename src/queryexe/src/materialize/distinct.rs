use super::sort::split_into_runs;
use super::{RecordComparator, TempTable};
use crate::cost;
use crate::plan::{ExecContext, Plan};
use crate::scan::{current_tuple, Scan, TableScan};
use common::{Constant, CrustyError, TableSchema};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

type Seen = HashSet<Vec<Constant>>;

/// Removes records that agree on every distinct field with an earlier one.
///
/// Input order is not assumed. The child is split into sorted runs which
/// are merged pairwise, dropping duplicates on the way, until one remains.
pub struct DistinctPlan {
    ctx: ExecContext,
    src: Arc<dyn Plan>,
    fields: Vec<String>,
    comp: RecordComparator,
}

impl DistinctPlan {
    pub fn new(
        ctx: ExecContext,
        src: Arc<dyn Plan>,
        fields: Vec<String>,
    ) -> Result<Self, CrustyError> {
        for f in &fields {
            src.schema().field_index(f)?;
        }
        let comp = RecordComparator::ascending(&fields);
        Ok(DistinctPlan {
            ctx,
            src,
            fields,
            comp,
        })
    }

    /// Distinct on every field of the child.
    pub fn on_all_fields(ctx: ExecContext, src: Arc<dyn Plan>) -> Result<Self, CrustyError> {
        let fields = src.schema().field_names();
        DistinctPlan::new(ctx, src, fields)
    }

    fn key(&self, scan: &dyn Scan) -> Result<Vec<Constant>, CrustyError> {
        self.fields.iter().map(|f| scan.get_val(f)).collect()
    }

    /// Copies the current record unless its key was already written.
    fn write_unseen(
        &self,
        src: &dyn Scan,
        dest: &mut TableScan,
        seen: &mut Seen,
    ) -> Result<(), CrustyError> {
        if seen.insert(self.key(src)?) {
            dest.insert_tuple(current_tuple(src, self.src.schema())?)?;
        }
        Ok(())
    }

    fn dedup_run(&self, run: &TempTable) -> Result<TempTable, CrustyError> {
        let result = TempTable::new(&self.ctx, self.src.schema())?;
        let mut dest = result.open();
        let mut src = run.open();
        let mut seen = Seen::new();
        while src.next()? {
            self.write_unseen(&src, &mut dest, &mut seen)?;
        }
        Ok(result)
    }

    fn merge_pass(&self, runs: Vec<TempTable>) -> Result<Vec<TempTable>, CrustyError> {
        let mut seen = Seen::new();
        let mut merged = Vec::with_capacity(runs.len() / 2 + 1);
        let mut runs = runs.into_iter();
        while let Some(p1) = runs.next() {
            match runs.next() {
                Some(p2) => merged.push(self.merge_two(&p1, &p2, &mut seen)?),
                None => merged.push(p1),
            }
        }
        Ok(merged)
    }

    fn merge_two(
        &self,
        p1: &TempTable,
        p2: &TempTable,
        seen: &mut Seen,
    ) -> Result<TempTable, CrustyError> {
        let result = TempTable::new(&self.ctx, self.src.schema())?;
        let mut dest = result.open();
        let mut s1 = p1.open();
        let mut s2 = p2.open();
        let mut hasmore1 = s1.next()?;
        let mut hasmore2 = s2.next()?;
        while hasmore1 && hasmore2 {
            match self.comp.compare(&s1, &s2)? {
                Ordering::Greater => {
                    self.write_unseen(&s2, &mut dest, seen)?;
                    hasmore2 = s2.next()?;
                }
                ord => {
                    self.write_unseen(&s1, &mut dest, seen)?;
                    if ord == Ordering::Equal {
                        hasmore2 = s2.next()?;
                    }
                    hasmore1 = s1.next()?;
                }
            }
        }
        while hasmore1 {
            self.write_unseen(&s1, &mut dest, seen)?;
            hasmore1 = s1.next()?;
        }
        while hasmore2 {
            self.write_unseen(&s2, &mut dest, seen)?;
            hasmore2 = s2.next()?;
        }
        Ok(result)
    }

    fn distinct_table(&self) -> Result<TempTable, CrustyError> {
        let schema = self.src.schema();
        let mut src = self.src.open()?;
        let runs = split_into_runs(&self.ctx, src.as_mut(), schema, &self.comp);
        src.close();
        let mut runs = runs?;
        debug!("Distinct on {:?} over {} runs", self.fields, runs.len());
        match runs.len() {
            0 => TempTable::new(&self.ctx, schema),
            1 => self.dedup_run(&runs[0]),
            _ => {
                while runs.len() > 1 {
                    runs = self.merge_pass(runs)?;
                }
                runs.pop().ok_or_else(|| {
                    CrustyError::ExecutionError(String::from("Distinct lost its runs"))
                })
            }
        }
    }
}

impl Plan for DistinctPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        Ok(Box::new(self.distinct_table()?.open()))
    }

    fn blocks_accessed(&self) -> usize {
        cost::materialized_blocks(
            self.src.records_output(),
            self.ctx.records_per_block(self.src.schema()),
        )
    }

    fn records_output(&self) -> usize {
        let keys = self
            .fields
            .iter()
            .fold(1usize, |acc, f| acc.saturating_mul(self.src.distinct_values(f)));
        keys.min(self.src.records_output())
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.src.distinct_values(field).min(self.records_output())
    }

    fn schema(&self) -> &TableSchema {
        self.src.schema()
    }
}
