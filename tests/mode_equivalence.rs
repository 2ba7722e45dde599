use std::sync::Arc;

use cpubench::bench::{fold_digests, run_task, PooledExecutor, Runner, SequentialExecutor};
use cpubench::config::{BenchmarkConfig, ExecutionMode, Mode};
use cpubench::models::RunResult;

const GOLDEN_SINK: u8 = 104;

#[test]
fn test_golden_scenario_every_mode() {
    let runner = Runner::new();

    let sequential = runner.run(&BenchmarkConfig::sequential(5, 1024)).unwrap();
    assert_eq!(sequential.sink, GOLDEN_SINK);

    for workers in [1, 2, 4, 8] {
        let pooled = runner.run(&BenchmarkConfig::pooled(5, 1024, workers)).unwrap();
        assert_eq!(pooled.sink, GOLDEN_SINK, "workers={}", workers);
    }
}

#[test]
fn test_sequential_equals_pooled_across_parameters() {
    let runner = Runner::new();

    for task_count in [0u64, 1, 3, 16, 65] {
        for block_size in [1usize, 33, 4096] {
            let expected = runner
                .run(&BenchmarkConfig::sequential(task_count, block_size))
                .unwrap();
            for workers in [1usize, 2, 5] {
                let pooled = runner
                    .run(&BenchmarkConfig::pooled(task_count, block_size, workers))
                    .unwrap();
                assert_eq!(
                    pooled.sink, expected.sink,
                    "tasks={} block={} workers={}",
                    task_count, block_size, workers
                );
                assert_eq!(pooled.tasks_completed, task_count);
            }
        }
    }
}

#[test]
fn test_runner_matches_direct_fold() {
    let digests: Vec<_> = (0..12).map(|id| run_task(id, 256)).collect();
    let expected = fold_digests(&digests);

    let result = Runner::new().run(&BenchmarkConfig::pooled(12, 256, 3)).unwrap();
    assert_eq!(result.sink, expected);
    assert_eq!(SequentialExecutor::new(256).run(12).value(), expected);
}

#[test]
fn test_zero_tasks_is_zero_sink() {
    let runner = Runner::new();
    for config in [
        BenchmarkConfig::sequential(0, 1024),
        BenchmarkConfig::pooled(0, 1024, 1),
        BenchmarkConfig::pooled(0, 1024, 16),
    ] {
        let result = runner.run(&config).unwrap();
        assert_eq!(result.sink, 0);
        assert_eq!(result.tasks_completed, 0);
        assert!(result.is_executed());
    }
}

#[test]
fn test_unrecognized_mode_runs_nothing() {
    let runner = Runner::new();
    for raw in ["", "parallel", "POOLS", "single-threaded"] {
        let config = BenchmarkConfig::pooled(5, 1024, 4).with_mode(Mode::from(raw));
        assert!(!config.mode.is_recognized(), "{:?}", raw);
        assert_eq!(runner.run(&config).unwrap(), RunResult::empty());
    }
}

#[test]
fn test_mode_aliases_dispatch() {
    let runner = Runner::new();
    let cases = [
        ("single", ExecutionMode::Sequential),
        ("Sequential", ExecutionMode::Sequential),
        (" pool ", ExecutionMode::Pooled),
        ("POOLED", ExecutionMode::Pooled),
    ];
    for (raw, expected) in cases {
        let config = BenchmarkConfig::pooled(5, 1024, 2).with_mode(Mode::from(raw));
        let result = runner.run(&config).unwrap();
        assert_eq!(result.executor, Some(expected), "{:?}", raw);
        assert_eq!(result.sink, GOLDEN_SINK);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pool_leaves_no_live_units() {
    let executor = PooledExecutor::new(512, 6).unwrap();
    for task_count in [0u64, 1, 6, 50] {
        executor.run(task_count).await.unwrap();
        assert_eq!(executor.live_units(), 0, "tasks={}", task_count);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_live_units_counted_during_run() {
    let workers = 3;
    let executor = Arc::new(PooledExecutor::new(64 * 1024, workers).unwrap());
    assert_eq!(executor.live_units(), 0);

    let running = Arc::clone(&executor);
    let handle = tokio::spawn(async move { running.run(200).await });

    let mut peak = 0;
    while !handle.is_finished() {
        peak = peak.max(executor.live_units());
        tokio::task::yield_now().await;
    }
    let sink = handle.await.unwrap().unwrap();

    // Workers plus the dispatcher and the join-waiter
    assert!(peak > 0, "no live units observed while running");
    assert!(peak <= workers + 2, "peak {} exceeds pool size", peak);
    assert_eq!(executor.live_units(), 0);
    assert_eq!(sink, SequentialExecutor::new(64 * 1024).run(200));
}

#[tokio::test]
async fn test_run_async_inside_runtime() {
    let runner = Runner::new();
    let sequential = runner
        .run_async(&BenchmarkConfig::sequential(40, 128))
        .await
        .unwrap();
    let pooled = runner
        .run_async(&BenchmarkConfig::pooled(40, 128, 4))
        .await
        .unwrap();
    assert_eq!(sequential.sink, pooled.sink);
}
