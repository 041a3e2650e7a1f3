use super::buffer_needs::best_factor;
use super::ChunkScan;
use crate::cost;
use crate::materialize::{MaterializePlan, TempTable};
use crate::plan::{ExecContext, Plan};
use crate::query::Predicate;
use crate::scan::Scan;
use common::{Constant, CrustyError, TableSchema};
use std::sync::Arc;

/// Cartesian product that materializes the right side and reads it in
/// chunks, scanning the left side once per chunk.
pub struct MultibufferProductPlan {
    ctx: ExecContext,
    lhs: Arc<dyn Plan>,
    rhs: Arc<dyn Plan>,
    available: usize,
    schema: TableSchema,
}

impl MultibufferProductPlan {
    pub fn new(
        ctx: ExecContext,
        lhs: Arc<dyn Plan>,
        rhs: Arc<dyn Plan>,
        available: usize,
    ) -> Self {
        let schema = lhs.schema().merge(rhs.schema());
        MultibufferProductPlan {
            ctx,
            lhs,
            rhs,
            available,
            schema,
        }
    }

    /// Block estimate for a product whose right side materializes into
    /// `rhs_blocks` blocks.
    pub fn estimate_blocks(lhs_blocks: usize, rhs_blocks: usize, available: usize) -> usize {
        cost::product_cost(rhs_blocks, lhs_blocks, available)
    }
}

impl Plan for MultibufferProductPlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        let temp = MaterializePlan::new(self.ctx.clone(), Arc::clone(&self.rhs)).materialize()?;
        let chunk_size = best_factor(self.available, temp.num_blocks()?);
        let lhs = self.lhs.open()?;
        Ok(Box::new(ProductScan::new(
            lhs,
            temp,
            chunk_size,
            Predicate::default(),
        )?))
    }

    fn blocks_accessed(&self) -> usize {
        let rhs_blocks = cost::materialized_blocks(
            self.rhs.records_output(),
            self.ctx.records_per_block(self.rhs.schema()),
        );
        Self::estimate_blocks(self.lhs.blocks_accessed(), rhs_blocks, self.available)
    }

    fn records_output(&self) -> usize {
        self.lhs
            .records_output()
            .saturating_mul(self.rhs.records_output())
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

/// Pairs every record of a streamed scan with every record of a chunked
/// temp table, keeping the pairs that satisfy `pred`.
///
/// For each chunk the streamed side is rewound and read once; each of its
/// records is paired with the chunk's records in memory.
pub struct ProductScan {
    streamed: Box<dyn Scan>,
    chunked: Option<TempTable>,
    chunk_size: usize,
    total_blocks: usize,
    next_block: usize,
    chunk: Option<ChunkScan>,
    streamed_on_record: bool,
    pred: Predicate,
}

impl ProductScan {
    pub fn new(
        streamed: Box<dyn Scan>,
        chunked: TempTable,
        chunk_size: usize,
        pred: Predicate,
    ) -> Result<Self, CrustyError> {
        let total_blocks = chunked.num_blocks()?;
        debug!(
            "Chunking {} ({} blocks) {} blocks at a time",
            chunked.name(),
            total_blocks,
            chunk_size
        );
        let mut scan = ProductScan {
            streamed,
            chunked: Some(chunked),
            chunk_size: chunk_size.max(1),
            total_blocks,
            next_block: 0,
            chunk: None,
            streamed_on_record: false,
            pred,
        };
        scan.before_first()?;
        Ok(scan)
    }

    fn open_next_chunk(&mut self) -> Result<bool, CrustyError> {
        let temp = match &self.chunked {
            Some(t) if self.next_block < self.total_blocks => t,
            _ => return Ok(false),
        };
        let end = (self.next_block + self.chunk_size).min(self.total_blocks) - 1;
        self.chunk = Some(ChunkScan::new(temp, self.next_block, end)?);
        self.next_block = end + 1;
        self.streamed.before_first()?;
        self.streamed_on_record = false;
        Ok(true)
    }
}

impl Scan for ProductScan {
    fn before_first(&mut self) -> Result<(), CrustyError> {
        self.next_block = 0;
        self.chunk = None;
        self.streamed_on_record = false;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        loop {
            if self.chunk.is_none() && !self.open_next_chunk()? {
                return Ok(false);
            }
            if self.streamed_on_record {
                let advanced = match self.chunk.as_mut() {
                    Some(chunk) => chunk.next()?,
                    None => false,
                };
                if advanced {
                    if self.pred.is_satisfied(&*self)? {
                        return Ok(true);
                    }
                    continue;
                }
            }
            self.streamed_on_record = self.streamed.next()?;
            if !self.streamed_on_record {
                self.chunk = None;
            } else if let Some(chunk) = self.chunk.as_mut() {
                chunk.before_first()?;
            }
        }
    }

    fn get_val(&self, field: &str) -> Result<Constant, CrustyError> {
        match &self.chunk {
            Some(chunk) if chunk.has_field(field) => chunk.get_val(field),
            _ => self.streamed.get_val(field),
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.streamed.has_field(field)
            || self
                .chunked
                .as_ref()
                .map_or(false, |t| t.schema().contains(field))
    }

    fn close(&mut self) {
        self.streamed.close();
        self.chunk = None;
        self.chunked = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;
    use common::Tuple;

    #[test]
    fn test_product_all_pairs() {
        init();
        let (md, ctx) = test_env(128, 4);
        let lhs_rows = create_tuple_list((0..20).map(|i| vec![i]).collect());
        let rhs_rows = create_tuple_list((0..50).map(|i| vec![i, i * 2]).collect());
        let lhs = table_plan_with(&md, &ctx, "l", &get_int_table_schema(vec!["a"]), &lhs_rows);
        let rhs = table_plan_with(
            &md,
            &ctx,
            "r",
            &get_int_table_schema(vec!["b", "c"]),
            &rhs_rows,
        );
        let plan = MultibufferProductPlan::new(ctx.clone(), lhs, rhs, 4);
        let mut expected = Vec::new();
        for l in &lhs_rows {
            for r in &rhs_rows {
                expected.push(l.merge(r));
            }
        }
        assert_eq!(1000, plan.records_output());
        assert!(compare_unordered_tuples(&expected, run_plan(&plan)));
        assert_eq!(2, ctx.sm.container_count());
    }

    #[test]
    fn test_product_empty_side() {
        init();
        let (md, ctx) = test_env(4096, 10);
        let lhs = table_plan_with(
            &md,
            &ctx,
            "l",
            &get_int_table_schema(vec!["a"]),
            &create_tuple_list(vec![vec![1]]),
        );
        let rhs = table_plan_with(&md, &ctx, "r", &get_int_table_schema(vec!["b"]), &[]);
        let plan = MultibufferProductPlan::new(ctx.clone(), Arc::clone(&rhs), lhs.clone(), 10);
        assert_eq!(Vec::<Tuple>::new(), run_plan(&plan));
        let plan = MultibufferProductPlan::new(ctx, lhs, rhs, 10);
        assert_eq!(Vec::<Tuple>::new(), run_plan(&plan));
    }

    #[test]
    fn test_cost_uses_buffer_budget() {
        // 6 blocks of the right side, 3 buffers for chunks: two passes over the left
        assert_eq!(6 + 2 * 10, MultibufferProductPlan::estimate_blocks(10, 6, 5));
    }
}
