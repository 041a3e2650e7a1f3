use super::{RecordComparator, SortField, TempTable};
use crate::cost;
use crate::plan::{ExecContext, Plan};
use crate::scan::{current_tuple, Scan, TableScan, UpdateScan};
use common::ids::ValueId;
use common::{Constant, CrustyError, TableSchema};
use std::cmp::Ordering;
use std::sync::Arc;

/// Sorts the output of its child.
///
/// The child is split into sorted runs, runs are merged two at a time until
/// at most two remain, and the scan merges the last two while reading.
pub struct SortPlan {
    ctx: ExecContext,
    src: Arc<dyn Plan>,
    comp: RecordComparator,
}

impl SortPlan {
    pub fn new(ctx: ExecContext, src: Arc<dyn Plan>, sort_fields: Vec<SortField>) -> Self {
        SortPlan {
            ctx,
            src,
            comp: RecordComparator::new(sort_fields),
        }
    }

    pub fn open_sorted(&self) -> Result<SortScan, CrustyError> {
        let schema = self.src.schema();
        let mut src = self.src.open()?;
        let runs = split_into_runs(&self.ctx, src.as_mut(), schema, &self.comp);
        src.close();
        let mut runs = runs?;
        debug!("Sort produced {} initial runs", runs.len());
        while runs.len() > 2 {
            runs = self.merge_pass(runs)?;
        }
        SortScan::new(runs, self.comp.clone())
    }

    fn merge_pass(&self, runs: Vec<TempTable>) -> Result<Vec<TempTable>, CrustyError> {
        let mut merged = Vec::with_capacity(runs.len() / 2 + 1);
        let mut runs = runs.into_iter();
        while let Some(p1) = runs.next() {
            match runs.next() {
                Some(p2) => merged.push(self.merge_two(&p1, &p2)?),
                None => merged.push(p1),
            }
        }
        Ok(merged)
    }

    fn merge_two(&self, p1: &TempTable, p2: &TempTable) -> Result<TempTable, CrustyError> {
        let schema = self.src.schema();
        let result = TempTable::new(&self.ctx, schema)?;
        let mut dest = result.open();
        let mut s1 = p1.open();
        let mut s2 = p2.open();
        let mut hasmore1 = s1.next()?;
        let mut hasmore2 = s2.next()?;
        while hasmore1 && hasmore2 {
            if self.comp.compare(&s1, &s2)? != Ordering::Greater {
                dest.insert_tuple(current_tuple(&s1, schema)?)?;
                hasmore1 = s1.next()?;
            } else {
                dest.insert_tuple(current_tuple(&s2, schema)?)?;
                hasmore2 = s2.next()?;
            }
        }
        while hasmore1 {
            dest.insert_tuple(current_tuple(&s1, schema)?)?;
            hasmore1 = s1.next()?;
        }
        while hasmore2 {
            dest.insert_tuple(current_tuple(&s2, schema)?)?;
            hasmore2 = s2.next()?;
        }
        Ok(result)
    }
}

/// Splits a scan into maximal runs that are non-decreasing under `comp`.
pub(crate) fn split_into_runs(
    ctx: &ExecContext,
    src: &mut dyn Scan,
    schema: &TableSchema,
    comp: &RecordComparator,
) -> Result<Vec<TempTable>, CrustyError> {
    let mut runs = Vec::new();
    if !src.next()? {
        return Ok(runs);
    }
    let temp = TempTable::new(ctx, schema)?;
    let mut current = temp.open();
    runs.push(temp);
    current.insert_tuple(current_tuple(src, schema)?)?;
    while src.next()? {
        if comp.compare(src, &current)? == Ordering::Less {
            let temp = TempTable::new(ctx, schema)?;
            current = temp.open();
            runs.push(temp);
        }
        current.insert_tuple(current_tuple(src, schema)?)?;
    }
    Ok(runs)
}

impl Plan for SortPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        Ok(Box::new(self.open_sorted()?))
    }

    /// Blocks of the sorted output. The cost of sorting is not counted.
    fn blocks_accessed(&self) -> usize {
        cost::materialized_blocks(
            self.src.records_output(),
            self.ctx.records_per_block(self.src.schema()),
        )
    }

    fn records_output(&self) -> usize {
        self.src.records_output()
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.src.distinct_values(field)
    }

    fn schema(&self) -> &TableSchema {
        self.src.schema()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    First,
    Second,
}

/// Where a `SortScan` was, for `restore_position`.
#[derive(Debug, Clone, Copy)]
pub struct SortPosition {
    rid1: Option<ValueId>,
    rid2: Option<ValueId>,
    current: Option<Side>,
    hasmore1: bool,
    hasmore2: bool,
}

/// Merges up to two sorted runs while reading.
pub struct SortScan {
    s1: Option<TableScan>,
    s2: Option<TableScan>,
    current: Option<Side>,
    hasmore1: bool,
    hasmore2: bool,
    comp: RecordComparator,
}

impl SortScan {
    pub fn new(runs: Vec<TempTable>, comp: RecordComparator) -> Result<Self, CrustyError> {
        let mut runs = runs.into_iter();
        let mut scan = SortScan {
            s1: runs.next().map(|t| t.open()),
            s2: runs.next().map(|t| t.open()),
            current: None,
            hasmore1: false,
            hasmore2: false,
            comp,
        };
        scan.before_first()?;
        Ok(scan)
    }

    fn current_scan(&self) -> Result<&TableScan, CrustyError> {
        let scan = match self.current {
            Some(Side::First) => self.s1.as_ref(),
            Some(Side::Second) => self.s2.as_ref(),
            None => None,
        };
        scan.ok_or_else(|| {
            CrustyError::ExecutionError(String::from("Sort scan is not positioned on a record"))
        })
    }

    pub fn save_position(&self) -> Result<SortPosition, CrustyError> {
        let rid_of = |s: &Option<TableScan>, hasmore: bool| -> Result<Option<ValueId>, CrustyError> {
            match s {
                Some(s) if hasmore => Ok(Some(s.get_rid()?)),
                _ => Ok(None),
            }
        };
        Ok(SortPosition {
            rid1: rid_of(&self.s1, self.hasmore1)?,
            rid2: rid_of(&self.s2, self.hasmore2)?,
            current: self.current,
            hasmore1: self.hasmore1,
            hasmore2: self.hasmore2,
        })
    }

    pub fn restore_position(&mut self, pos: &SortPosition) -> Result<(), CrustyError> {
        if let (Some(s1), Some(rid)) = (self.s1.as_mut(), pos.rid1) {
            s1.move_to_rid(rid)?;
        }
        if let (Some(s2), Some(rid)) = (self.s2.as_mut(), pos.rid2) {
            s2.move_to_rid(rid)?;
        }
        self.current = pos.current;
        self.hasmore1 = pos.hasmore1;
        self.hasmore2 = pos.hasmore2;
        Ok(())
    }
}

impl Scan for SortScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.current = None;
        self.hasmore1 = match self.s1.as_mut() {
            Some(s1) => {
                s1.before_first()?;
                s1.next()?
            }
            None => false,
        };
        self.hasmore2 = match self.s2.as_mut() {
            Some(s2) => {
                s2.before_first()?;
                s2.next()?
            }
            None => false,
        };
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        match self.current {
            Some(Side::First) => {
                if let Some(s1) = self.s1.as_mut() {
                    self.hasmore1 = s1.next()?;
                }
            }
            Some(Side::Second) => {
                if let Some(s2) = self.s2.as_mut() {
                    self.hasmore2 = s2.next()?;
                }
            }
            None => {}
        }
        self.current = match (self.hasmore1, self.hasmore2, &self.s1, &self.s2) {
            (true, true, Some(s1), Some(s2)) => {
                if self.comp.compare(s1, s2)? != Ordering::Greater {
                    Some(Side::First)
                } else {
                    Some(Side::Second)
                }
            }
            (true, _, _, _) => Some(Side::First),
            (_, true, _, _) => Some(Side::Second),
            _ => None,
        };
        Ok(self.current.is_some())
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        self.current_scan()?.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.s1.as_ref().map_or(false, |s| s.has_field(field))
    }

    fn close(&mut self) {
        if let Some(s1) = self.s1.as_mut() {
            s1.close();
        }
        if let Some(s2) = self.s2.as_mut() {
            s2.close();
        }
        self.current = None;
        self.hasmore1 = false;
        self.hasmore2 = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;
    use common::Tuple;

    fn letters() -> Vec<Tuple> {
        int_string_tuples(&[(3, "c"), (1, "a"), (2, "b")])
    }

    #[test]
    fn test_sort_both_directions() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let schema = get_int_string_schema("id", "name", 4);
        let table = table_plan_with(&md, &ctx, "t", &schema, &letters());
        let asc = SortPlan::new(ctx.clone(), Arc::clone(&table), vec![SortField::asc("id")]);
        let expected = int_string_tuples(&[(1, "a"), (2, "b"), (3, "c")]);
        assert_eq!(expected, run_plan(&asc));
        let desc = SortPlan::new(ctx, table, vec![SortField::new("id", false)]);
        let mut reversed = expected;
        reversed.reverse();
        assert_eq!(reversed, run_plan(&desc));
    }

    #[test]
    fn test_sort_many_runs() {
        init();
        let (md, ctx) = test_env(128, 5);
        let schema = get_int_table_schema(vec!["a", "b"]);
        let rows = create_tuple_list(gen_random_int_rows(300, 2, 50));
        let table = table_plan_with(&md, &ctx, "t", &schema, &rows);
        let plan = SortPlan::new(
            ctx.clone(),
            table,
            vec![SortField::asc("a"), SortField::new("b", false)],
        );
        let sorted = run_plan(&plan);
        assert!(compare_unordered_tuples(&rows, sorted.clone()));
        for pair in sorted.windows(2) {
            let (a0, a1) = (&pair[0].field_vals[0], &pair[1].field_vals[0]);
            assert!(a0 <= a1);
            if a0 == a1 {
                assert!(pair[0].field_vals[1] >= pair[1].field_vals[1]);
            }
        }
        // only the table itself is left once the scan is closed
        assert_eq!(1, ctx.sm.container_count());
    }

    #[test]
    fn test_empty_input() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let schema = get_int_table_schema(vec!["a"]);
        let table = table_plan_with(&md, &ctx, "t", &schema, &[]);
        let plan = SortPlan::new(ctx, table, vec![SortField::asc("a")]);
        assert!(run_plan(&plan).is_empty());
    }

    #[test]
    fn test_save_and_restore() {
        init();
        let (md, ctx) = test_env(128, 10);
        let schema = get_int_table_schema(vec!["a"]);
        let rows = create_tuple_list(vec![vec![5], vec![1], vec![4], vec![2], vec![3], vec![0]]);
        let table = table_plan_with(&md, &ctx, "t", &schema, &rows);
        let plan = SortPlan::new(ctx, table, vec![SortField::asc("a")]);
        let mut scan = plan.open_sorted().unwrap();
        let mut seen = Vec::new();
        let mut saved = None;
        while scan.next().unwrap() {
            let a = scan.get_int("a").unwrap();
            if a == 2 {
                saved = Some(scan.save_position().unwrap());
            }
            seen.push(a);
        }
        assert_eq!(vec![0, 1, 2, 3, 4, 5], seen);
        scan.restore_position(&saved.unwrap()).unwrap();
        assert_eq!(2, scan.get_int("a").unwrap());
        assert!(scan.next().unwrap());
        assert_eq!(3, scan.get_int("a").unwrap());
        scan.close();
    }
}
