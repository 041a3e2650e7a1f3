use common::database::Database;
use common::PredicateOp;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memstore::storage_manager::StorageManager;
use optimizer::cost::JoinStrategy;
use optimizer::planner::Planner;
use optimizer::table_planner::TablePlanner;
use queryexe::metadata::MetadataManager;
use queryexe::plan::{ExecContext, Plan, TablePlan};
use queryexe::query::{Executor, Expression, Predicate, Term};
use rand::{thread_rng, Rng};
use std::sync::Arc;
use txn_manager::transactions::Transaction;

const BUFFERS: usize = 20;

/// Two tables of `rows` random join keys each, with an index on `r.c`.
fn setup(rows: usize) -> Planner {
    let sm = Arc::new(StorageManager::new_test_sm_with(4096, BUFFERS));
    let db = Arc::new(Database::new(String::from("bench")));
    let planner = Planner::new(Arc::new(MetadataManager::new(db, sm)));
    let txn = Transaction::new();
    planner
        .execute_update("create table l (a int, b int)", &txn)
        .unwrap();
    planner
        .execute_update("create table r (c int, d int)", &txn)
        .unwrap();
    let mut rng = thread_rng();
    for table in &["l", "r"] {
        let values: Vec<String> = (0..rows)
            .map(|i| format!("({}, {})", rng.gen_range(0..rows as i32), i))
            .collect();
        let sql = format!("insert into {} values {}", table, values.join(", "));
        planner.execute_update(&sql, &txn).unwrap();
    }
    planner
        .execute_update("create index r_c on r (c)", &txn)
        .unwrap();
    planner
}

fn bench_join_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");
    for rows in &[100usize, 400] {
        let planner = setup(*rows);
        let txn = Transaction::new();
        let md = planner.metadata();
        let ctx = ExecContext::for_txn(md.storage_manager(), &txn);
        let pred = Predicate::new(vec![Term::new(
            Expression::Field(String::from("a")),
            PredicateOp::Equals,
            Expression::Field(String::from("c")),
        )]);
        let tp = TablePlanner::for_table("r", md, pred, ctx.clone(), BUFFERS).unwrap();
        let current: Arc<dyn Plan> = Arc::new(TablePlan::new(ctx, "l", md).unwrap());
        for strategy in JoinStrategy::ALL.iter() {
            let plan = tp
                .make_join_plan_with(Arc::clone(&current), *strategy)
                .unwrap()
                .unwrap();
            group.bench_with_input(BenchmarkId::new(strategy.name(), rows), &plan, |b, plan| {
                b.iter(|| {
                    let mut executor = Executor::new_ref();
                    executor.configure_query(Arc::clone(plan));
                    black_box(executor.collect().unwrap())
                })
            });
        }
    }
    group.finish();
}

criterion_group! {
    name = joinbench;
    config = Criterion::default().sample_size(10);
    targets = bench_join_strategies
}
criterion_main!(joinbench);
