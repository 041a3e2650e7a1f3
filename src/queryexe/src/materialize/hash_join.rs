use crate::cost;
use crate::plan::Plan;
use crate::scan::{current_tuple, Scan};
use common::{Constant, CrustyError, TableSchema, Tuple};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Partition a join key falls in.
///
/// Both sides use this function, so matching keys always share a partition.
pub fn partition_of(key: &Constant, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Equi-join that builds an in-memory hash table over one partition of the
/// left side at a time and probes it with the right side.
///
/// There is a single partitioning pass. A partition whose left records do
/// not fit in memory is not split further.
pub struct HashJoinPlan {
    lhs: Arc<dyn Plan>,
    rhs: Arc<dyn Plan>,
    lhs_field: String,
    rhs_field: String,
    available: usize,
    schema: TableSchema,
}

impl HashJoinPlan {
    pub fn new(
        lhs: Arc<dyn Plan>,
        rhs: Arc<dyn Plan>,
        lhs_field: &str,
        rhs_field: &str,
        available: usize,
    ) -> Result<Self, CrustyError> {
        lhs.schema().field_index(lhs_field)?;
        rhs.schema().field_index(rhs_field)?;
        let schema = lhs.schema().merge(rhs.schema());
        Ok(HashJoinPlan {
            lhs,
            rhs,
            lhs_field: lhs_field.to_string(),
            rhs_field: rhs_field.to_string(),
            available,
            schema,
        })
    }

    pub fn estimate_blocks(lhs_blocks: usize, rhs_blocks: usize) -> usize {
        cost::hash_cost(lhs_blocks, rhs_blocks)
    }

    fn partitions(&self) -> usize {
        self.available.saturating_sub(1).max(1)
    }
}

impl Plan for HashJoinPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let lhs = self.lhs.open()?;
        let rhs = self.rhs.open()?;
        Ok(Box::new(HashJoinScan::new(
            lhs,
            rhs,
            self.lhs.schema().clone(),
            &self.lhs_field,
            &self.rhs_field,
            self.partitions(),
        )?))
    }

    fn blocks_accessed(&self) -> usize {
        Self::estimate_blocks(self.lhs.blocks_accessed(), self.rhs.blocks_accessed())
    }

    fn records_output(&self) -> usize {
        cost::join_records(
            self.lhs.records_output(),
            self.rhs.records_output(),
            self.lhs.distinct_values(&self.lhs_field),
            self.rhs.distinct_values(&self.rhs_field),
        )
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.lhs.schema().contains(field) {
            self.lhs.distinct_values(field)
        } else {
            self.rhs.distinct_values(field)
        }
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

pub struct HashJoinScan {
    lhs: Box<dyn Scan>,
    rhs: Box<dyn Scan>,
    lhs_schema: TableSchema,
    lhs_field: String,
    rhs_field: String,
    partitions: usize,
    /// Partition the table currently holds.
    partition: usize,
    table: HashMap<Constant, Vec<Tuple>>,
    /// Key of the current right record and the left record paired with it.
    matched: Option<(Constant, usize)>,
    done: bool,
}

impl HashJoinScan {
    pub fn new(
        lhs: Box<dyn Scan>,
        rhs: Box<dyn Scan>,
        lhs_schema: TableSchema,
        lhs_field: &str,
        rhs_field: &str,
        partitions: usize,
    ) -> Result<Self, CrustyError> {
        let mut scan = HashJoinScan {
            lhs,
            rhs,
            lhs_schema,
            lhs_field: lhs_field.to_string(),
            rhs_field: rhs_field.to_string(),
            partitions: partitions.max(1),
            partition: 0,
            table: HashMap::new(),
            matched: None,
            done: false,
        };
        scan.before_first()?;
        Ok(scan)
    }

    /// Builds the table for the first non-empty partition at or after
    /// `start` and rewinds the right side. False if there is none.
    fn load_partition(&mut self, start: usize) -> Result<bool, CrustyError> {
        for p in start..self.partitions {
            self.table.clear();
            self.lhs.before_first()?;
            while self.lhs.next()? {
                let key = self.lhs.get_val(&self.lhs_field)?;
                if partition_of(&key, self.partitions) == p {
                    let tuple = current_tuple(self.lhs.as_ref(), &self.lhs_schema)?;
                    self.table.entry(key).or_default().push(tuple);
                }
            }
            if !self.table.is_empty() {
                debug!(
                    "Hash join partition {} of {} holds {} keys",
                    p,
                    self.partitions,
                    self.table.len()
                );
                self.partition = p;
                self.rhs.before_first()?;
                return Ok(true);
            }
        }
        self.table.clear();
        Ok(false)
    }

    fn matched_tuple(&self) -> Option<&Tuple> {
        let (key, idx) = self.matched.as_ref()?;
        self.table.get(key)?.get(*idx)
    }
}

impl Scan for HashJoinScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.matched = None;
        self.done = !self.load_partition(0)?;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        loop {
            if self.done {
                return Ok(false);
            }
            if let Some((key, idx)) = self.matched.take() {
                let bucket_len = self.table.get(&key).map_or(0, |b| b.len());
                if idx + 1 < bucket_len {
                    self.matched = Some((key, idx + 1));
                    return Ok(true);
                }
            }
            while self.rhs.next()? {
                let key = self.rhs.get_val(&self.rhs_field)?;
                if partition_of(&key, self.partitions) == self.partition
                    && self.table.contains_key(&key)
                {
                    self.matched = Some((key, 0));
                    return Ok(true);
                }
            }
            let next = self.partition + 1;
            self.done = !self.load_partition(next)?;
        }
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        if self.rhs.has_field(field) {
            return self.rhs.get_val(field);
        }
        let i = self.lhs_schema.field_index(field)?;
        self.matched_tuple()
            .and_then(|t| t.get_field(i))
            .cloned()
            .ok_or_else(|| {
                CrustyError::ExecutionError(String::from("Hash join is not positioned on a match"))
            })
    }

    fn has_field(&self, field: &str) -> bool {
        self.rhs.has_field(field) || self.lhs_schema.contains(field)
    }

    fn close(&mut self) {
        self.lhs.close();
        self.rhs.close();
        self.table.clear();
        self.matched = None;
        self.done = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;

    #[test]
    fn test_join_with_duplicates() {
        init();
        let (md, ctx) = test_env(128, 4);
        let lhs_rows = create_tuple_list(gen_random_int_rows(60, 2, 15));
        let rhs_rows = create_tuple_list(gen_random_int_rows(40, 2, 15));
        let lhs = table_plan_with(&md, &ctx, "l", &get_int_table_schema(vec!["a", "b"]), &lhs_rows);
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["c", "d"]), &rhs_rows);
        let plan = HashJoinPlan::new(lhs, rhs, "a", "c", 4).unwrap();
        let mut expected = Vec::new();
        for l in &lhs_rows {
            for r in &rhs_rows {
                if l.field_vals[0] == r.field_vals[0] {
                    expected.push(l.merge(r));
                }
            }
        }
        assert!(compare_unordered_tuples(&expected, run_plan(&plan)));
    }

    #[test]
    fn test_matches_share_partition() {
        for n in 1..8 {
            for i in -20..20 {
                let key = Constant::Int(i);
                let p = partition_of(&key, n);
                assert!(p < n);
                assert_eq!(p, partition_of(&key.clone(), n));
            }
        }
        assert_eq!(0, partition_of(&Constant::from("x"), 0));
    }

    #[test]
    fn test_bad_fields_and_empty_side() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let lhs = table_plan_with(
            &md,
            &ctx,
            "l",
            &get_int_table_schema(vec!["a"]),
            &create_tuple_list(vec![vec![1]]),
        );
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["c"]), &[]);
        assert!(HashJoinPlan::new(Arc::clone(&lhs), Arc::clone(&rhs), "c", "c", 10).is_err());
        let plan = HashJoinPlan::new(lhs, rhs, "a", "c", 10).unwrap();
        assert!(run_plan(&plan).is_empty());
        assert_eq!(3 * 2, HashJoinPlan::estimate_blocks(1, 1));
    }
}
