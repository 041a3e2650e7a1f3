use super::TempTable;
use crate::plan::{ExecContext, Plan};
use crate::scan::{current_tuple, Scan};
use common::storage_trait::StorageTrait;
use common::{CrustyError, TableSchema};
use std::sync::Arc;

/// Writes the output of its child into a temp table when opened.
pub struct MaterializePlan {
    ctx: ExecContext,
    src: Arc<dyn Plan>,
}

impl MaterializePlan {
    pub fn new(ctx: ExecContext, src: Arc<dyn Plan>) -> Self {
        MaterializePlan { ctx, src }
    }

    /// Runs the child to completion and returns the filled temp table.
    pub fn materialize(&self) -> Result<TempTable, CrustyError> {
        let schema = self.src.schema();
        let temp = TempTable::new(&self.ctx, schema)?;
        let mut src = self.src.open()?;
        let result = copy_into(src.as_mut(), schema, &temp);
        src.close();
        result?;
        Ok(temp)
    }
}

/// Appends every remaining record of `src` to `dest`.
pub(crate) fn copy_into(
    src: &mut dyn Scan,
    schema: &TableSchema,
    dest: &TempTable,
) -> Result<usize, CrustyError> {
    let ctx = dest.ctx();
    let mut count = 0;
    while src.next()? {
        let tuple = current_tuple(src, schema)?;
        ctx.sm
            .insert_value(dest.container_id(), tuple.get_bytes()?, ctx.tid)?;
        count += 1;
    }
    Ok(count)
}

impl Plan for MaterializePlan {
    fn open(&self) -> Result<Box<dyn Scan>, CrustyError> {
        Ok(Box::new(self.materialize()?.open()))
    }

    /// Blocks of the written temp table. Creating it is not counted.
    fn blocks_accessed(&self) -> usize {
        crate::cost::materialized_blocks(
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use common::testutil::*;

    #[test]
    fn test_materialize_copies_child() {
        init();
        let (md, ctx) = test_env(128, 10);
        let schema = get_int_table_schema(vec!["a", "b"]);
        let rows = create_tuple_list(gen_random_int_rows(25, 2, 100));
        let table = table_plan_with(&md, &ctx, "t", &schema, &rows);
        let plan = MaterializePlan::new(ctx.clone(), table);
        // ten records per block
        assert_eq!(3, plan.blocks_accessed());
        let temp = plan.materialize().unwrap();
        assert_eq!(3, temp.num_blocks().unwrap());
        assert!(compare_unordered_tuples(&rows, run_plan(&plan)));
    }
}
