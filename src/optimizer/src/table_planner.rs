use crate::cost::{CostTable, JoinStrategy};
use common::{CrustyError, TableSchema};
use queryexe::cost;
use queryexe::index::{IndexJoinPlan, IndexSelectPlan};
use queryexe::materialize::{HashJoinPlan, MergeJoinPlan, NestedJoinPlan};
use queryexe::metadata::{IndexInfo, MetadataManager};
use queryexe::multibuffer::MultibufferProductPlan;
use queryexe::plan::{ExecContext, Plan, SelectPlan, TablePlan};
use queryexe::query::Predicate;
use std::collections::HashMap;
use std::sync::Arc;

/// Plans access to one table of a query and its joins with the tables
/// planned before it.
pub struct TablePlanner {
    name: String,
    plan: Arc<dyn Plan>,
    /// Set for stored tables. Views have no indexes.
    table: Option<Arc<TablePlan>>,
    pred: Predicate,
    indexes: HashMap<String, IndexInfo>,
    ctx: ExecContext,
    available: usize,
}

impl TablePlanner {
    /// # Arguments
    ///
    /// * `name` - Table or view name, for diagnostics.
    /// * `plan` - Plan producing the relation's records.
    /// * `table` - The stored table behind `plan`, if any.
    /// * `pred` - The whole query predicate.
    /// * `indexes` - Indexes of the stored table keyed by field.
    /// * `ctx` - Storage manager and transaction.
    /// * `available` - Buffers the query may use.
    pub fn new(
        name: &str,
        plan: Arc<dyn Plan>,
        table: Option<Arc<TablePlan>>,
        pred: Predicate,
        indexes: HashMap<String, IndexInfo>,
        ctx: ExecContext,
        available: usize,
    ) -> Self {
        TablePlanner {
            name: name.to_string(),
            plan,
            table,
            pred,
            indexes,
            ctx,
            available,
        }
    }

    /// Planner over a stored table and its indexes.
    pub fn for_table(
        name: &str,
        md: &MetadataManager,
        pred: Predicate,
        ctx: ExecContext,
        available: usize,
    ) -> Result<Self, CrustyError> {
        let table = Arc::new(TablePlan::new(ctx.clone(), name, md)?);
        let indexes = md.index_info(name)?;
        let plan: Arc<dyn Plan> = table.clone();
        Ok(TablePlanner::new(
            name,
            plan,
            Some(table),
            pred,
            indexes,
            ctx,
            available,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        self.plan.schema()
    }

    /// The table's records restricted by the terms of the predicate that
    /// only read this table. An index is used when one of those terms
    /// equates an indexed field with a constant.
    pub fn make_select_plan(&self) -> Arc<dyn Plan> {
        let plan = match self.make_index_select() {
            Some(p) => p,
            None => Arc::clone(&self.plan),
        };
        self.add_select_pred(plan)
    }

    /// Joins this table to `current` with the cheapest applicable strategy.
    /// Returns None if no predicate term links the two.
    pub fn make_join_plan(
        &self,
        current: Arc<dyn Plan>,
    ) -> Result<Option<Arc<dyn Plan>>, CrustyError> {
        let join_pred = match self.join_pred(current.schema()) {
            Some(p) => p,
            None => return Ok(None),
        };
        let mine = self.make_select_plan();
        let mut costs = CostTable::new();
        for strategy in JoinStrategy::ALL.iter() {
            costs.record(
                *strategy,
                self.estimate(*strategy, current.as_ref(), mine.as_ref(), &join_pred),
            );
        }
        let strategy = costs.choose_cheapest().unwrap_or(JoinStrategy::Product);
        info!("Join costs for {} on {}:\n{}", self.name, join_pred, costs);
        info!("Selected {} join for {}", strategy, self.name);
        self.build_or_product(strategy, current, mine, &join_pred)
            .map(Some)
    }

    /// Builds `strategy`, or a product filtered by the join predicate if
    /// that strategy cannot be built.
    fn build_or_product(
        &self,
        strategy: JoinStrategy,
        current: Arc<dyn Plan>,
        mine: Arc<dyn Plan>,
        join_pred: &Predicate,
    ) -> Result<Arc<dyn Plan>, CrustyError> {
        if let Some(plan) =
            self.build(strategy, Arc::clone(&current), Arc::clone(&mine), join_pred)?
        {
            return Ok(plan);
        }
        warn!("{} join unavailable for {}, using product", strategy, self.name);
        self.build(JoinStrategy::Product, current, mine, join_pred)?
            .ok_or_else(|| {
                CrustyError::ExecutionError(format!("No join plan for {}", self.name))
            })
    }

    /// Joins this table to `current` with the given strategy. Returns None
    /// if the strategy does not apply.
    pub fn make_join_plan_with(
        &self,
        current: Arc<dyn Plan>,
        strategy: JoinStrategy,
    ) -> Result<Option<Arc<dyn Plan>>, CrustyError> {
        match self.join_pred(current.schema()) {
            Some(join_pred) => {
                let mine = self.make_select_plan();
                self.build(strategy, current, mine, &join_pred)
            }
            None if strategy == JoinStrategy::Product => {
                self.make_product_plan(current).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Cartesian product of `current` with this table's selected records.
    pub fn make_product_plan(&self, current: Arc<dyn Plan>) -> Result<Arc<dyn Plan>, CrustyError> {
        let mine = self.make_select_plan();
        Ok(Arc::new(MultibufferProductPlan::new(
            self.ctx.clone(),
            current,
            mine,
            self.available,
        )))
    }

    fn join_pred(&self, current: &TableSchema) -> Option<Predicate> {
        self.pred.join_sub_pred(self.plan.schema(), current)
    }

    fn add_select_pred(&self, plan: Arc<dyn Plan>) -> Arc<dyn Plan> {
        match self.pred.select_sub_pred(self.plan.schema()) {
            Some(pred) => Arc::new(SelectPlan::new(plan, pred)),
            None => plan,
        }
    }

    fn add_join_pred(&self, plan: Arc<dyn Plan>, join_pred: &Predicate) -> Arc<dyn Plan> {
        Arc::new(SelectPlan::new(plan, join_pred.clone()))
    }

    /// Index fields in a fixed order so plans do not depend on hashing.
    fn index_fields(&self) -> Vec<&String> {
        let mut fields: Vec<&String> = self.indexes.keys().collect();
        fields.sort();
        fields
    }

    fn make_index_select(&self) -> Option<Arc<dyn Plan>> {
        let table = self.table.as_ref()?;
        for field in self.index_fields() {
            if let Some(val) = self.pred.equates_with_constant(field) {
                let info = self.indexes.get(field)?;
                debug!("Index on {}.{} used for {} = {}", self.name, field, field, val);
                return Some(Arc::new(IndexSelectPlan::new(
                    Arc::clone(table),
                    info.clone(),
                    val.clone(),
                )));
            }
        }
        None
    }

    /// An index of this table on a field the join predicate equates with a
    /// field of `current`, with that field of `current`. Indexes on the
    /// tables already in `current` are not considered.
    fn join_index(
        &self,
        current: &TableSchema,
        join_pred: &Predicate,
    ) -> Option<(String, &IndexInfo)> {
        self.table.as_ref()?;
        for field in self.index_fields() {
            if let Some(other) = join_pred.equates_with_field(field) {
                if current.contains(other) {
                    return self.indexes.get(field).map(|info| (other.to_string(), info));
                }
            }
        }
        None
    }

    fn materialized_blocks(&self, plan: &dyn Plan) -> usize {
        cost::materialized_blocks(
            plan.records_output(),
            self.ctx.records_per_block(plan.schema()),
        )
    }

    /// Block accesses the strategy would report, computed from statistics
    /// without building the plan.
    fn estimate(
        &self,
        strategy: JoinStrategy,
        current: &dyn Plan,
        mine: &dyn Plan,
        join_pred: &Predicate,
    ) -> Option<usize> {
        match strategy {
            JoinStrategy::Product => Some(MultibufferProductPlan::estimate_blocks(
                current.blocks_accessed(),
                self.materialized_blocks(mine),
                self.available,
            )),
            JoinStrategy::Nested => {
                let (outer, inner) = if mine.records_output() < current.records_output() {
                    (mine, current)
                } else {
                    (current, mine)
                };
                Some(NestedJoinPlan::estimate_blocks(
                    self.materialized_blocks(outer),
                    inner.blocks_accessed(),
                    self.available,
                ))
            }
            JoinStrategy::Index => self
                .join_index(current.schema(), join_pred)
                .map(|(_, info)| {
                    IndexJoinPlan::estimate_blocks(
                        current.blocks_accessed(),
                        current.records_output(),
                        info,
                    )
                }),
            JoinStrategy::Hash => join_pred
                .equi_join_fields(current.schema(), mine.schema())
                .map(|_| {
                    HashJoinPlan::estimate_blocks(current.blocks_accessed(), mine.blocks_accessed())
                }),
            JoinStrategy::Merge => join_pred
                .equi_join_fields(current.schema(), mine.schema())
                .map(|_| {
                    MergeJoinPlan::estimate_blocks(
                        self.materialized_blocks(current),
                        self.materialized_blocks(mine),
                    )
                }),
        }
    }

    /// Builds one candidate. Strategies that join on a single equality are
    /// followed by a select over the whole join predicate.
    fn build(
        &self,
        strategy: JoinStrategy,
        current: Arc<dyn Plan>,
        mine: Arc<dyn Plan>,
        join_pred: &Predicate,
    ) -> Result<Option<Arc<dyn Plan>>, CrustyError> {
        let equi = join_pred.equi_join_fields(current.schema(), mine.schema());
        let plan: Arc<dyn Plan> = match (strategy, equi) {
            (JoinStrategy::Product, _) => {
                let product =
                    MultibufferProductPlan::new(self.ctx.clone(), current, mine, self.available);
                self.add_join_pred(Arc::new(product), join_pred)
            }
            (JoinStrategy::Nested, _) => Arc::new(NestedJoinPlan::new(
                self.ctx.clone(),
                current,
                mine,
                join_pred.clone(),
                self.available,
            )),
            (JoinStrategy::Index, _) => {
                let (table, (outer_field, info)) =
                    match (self.table.as_ref(), self.join_index(current.schema(), join_pred)) {
                        (Some(t), Some(found)) => (t, found),
                        _ => return Ok(None),
                    };
                let join =
                    IndexJoinPlan::new(current, Arc::clone(table), info.clone(), &outer_field)?;
                let selected = self.add_select_pred(Arc::new(join));
                self.add_join_pred(selected, join_pred)
            }
            (JoinStrategy::Hash, Some((cf, mf))) => {
                let join = HashJoinPlan::new(current, mine, &cf, &mf, self.available)?;
                self.add_join_pred(Arc::new(join), join_pred)
            }
            (JoinStrategy::Merge, Some((cf, mf))) => {
                let join = MergeJoinPlan::new(self.ctx.clone(), current, mine, &cf, &mf)?;
                self.add_join_pred(Arc::new(join), join_pred)
            }
            (JoinStrategy::Hash, None) | (JoinStrategy::Merge, None) => return Ok(None),
        };
        Ok(Some(plan))
    }
}
