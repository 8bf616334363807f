mod test_harness;

use std::collections::HashSet;
use std::time::Duration;

use serde_json::json;
use tally_lite::analysis::questions::QUESTIONS_BEST_IS_MIN;
use tally_lite::analysis::{AnalysisKind, Parameters};
use tally_lite::config::PoolConfig;
use tally_lite::scheduler::JobStatus;
use tally_lite::service::{PollResponse, SubmitError};
use tally_lite::shutdown::DrainStatus;
use tally_lite::worker::WorkerPool;
use test_harness::{parts, sample_dataset, start_node, wait_for_idle, wait_for_job, IDLE_POLL};

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn test_pool_starts_exact_worker_count() {
    let (node, _dir) = start_node(3, sample_dataset());
    assert_eq!(node.pool_size(), 3);

    let executed = node.shutdown_and_join();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed.iter().sum::<usize>(), 0);
}

#[test]
fn test_submitted_job_completes_with_stored_result() {
    let (node, _dir) = start_node(2, sample_dataset());
    let service = node.service().clone();

    let id = service
        .submit(AnalysisKind::StatesMean, Parameters::question("Q1"))
        .unwrap();

    assert_eq!(
        wait_for_job(&service, id, TIMEOUT),
        PollResponse::Done {
            data: json!({"A": 10.0, "B": 20.0, "C": 30.0})
        }
    );
    assert_eq!(service.list_jobs().get(&id), Some(&JobStatus::Done));
    assert_eq!(service.outstanding_count(), 0);

    node.shutdown_and_join();
}

#[test]
fn test_single_worker_runs_jobs_in_fifo_order() {
    let parts = parts(sample_dataset());

    let ids: Vec<u64> = (0..3)
        .map(|_| {
            parts
                .service
                .submit(AnalysisKind::GlobalMean, Parameters::question("Q1"))
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // No worker has started yet: later jobs must still be running
    assert_eq!(parts.service.poll(2), PollResponse::Running);
    assert_eq!(parts.service.poll(3), PollResponse::Running);
    assert_eq!(parts.service.outstanding_count(), 3);

    let pool = WorkerPool::start(
        &PoolConfig::new(1).with_idle_poll(IDLE_POLL),
        parts.context.clone(),
    )
    .unwrap();

    assert!(wait_for_idle(&parts.service, TIMEOUT));
    let finished: Vec<_> = ids
        .iter()
        .map(|id| parts.registry.get(*id).unwrap().finished_at.unwrap())
        .collect();
    assert!(finished[0] <= finished[1]);
    assert!(finished[1] <= finished[2]);

    assert_eq!(parts.service.signal_shutdown(), DrainStatus::Done);
    assert_eq!(pool.join(), vec![3]);
}

#[test]
fn test_failed_job_is_done_with_error_and_worker_survives() {
    let (node, _dir) = start_node(1, sample_dataset());
    let service = node.service().clone();

    let bad = service
        .submit(AnalysisKind::Best5, Parameters::question("Q1"))
        .unwrap();
    let missing = service
        .submit(
            AnalysisKind::StateMean,
            Parameters::question("Q1").with_state("Nowhere"),
        )
        .unwrap();
    let good = service
        .submit(AnalysisKind::Best5, Parameters::question(QUESTIONS_BEST_IS_MIN[0]))
        .unwrap();

    match wait_for_job(&service, bad, TIMEOUT) {
        PollResponse::Error { reason } => assert!(reason.contains("invalid question")),
        other => panic!("expected error, got {:?}", other),
    }
    match wait_for_job(&service, missing, TIMEOUT) {
        PollResponse::Error { reason } => assert!(reason.contains("no data")),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(
        wait_for_job(&service, good, TIMEOUT),
        PollResponse::Done {
            data: json!({"S1": 1.0, "S2": 2.0, "S3": 3.0, "S4": 4.0, "S5": 5.0})
        }
    );

    assert_eq!(node.shutdown_and_join(), vec![3]);
}

#[test]
fn test_shutdown_drains_queued_jobs_and_rejects_new_ones() {
    let parts = parts(sample_dataset());

    let ids: Vec<u64> = (0..20)
        .map(|_| {
            parts
                .service
                .submit(AnalysisKind::MeanByCategory, Parameters::question("Q2"))
                .unwrap()
        })
        .collect();

    assert_eq!(parts.service.signal_shutdown(), DrainStatus::Running);
    assert_eq!(
        parts
            .service
            .submit(AnalysisKind::GlobalMean, Parameters::question("Q1")),
        Err(SubmitError::ShuttingDown)
    );

    // Workers started after the signal still drain everything queued before it
    let pool = WorkerPool::start(
        &PoolConfig::new(4).with_idle_poll(IDLE_POLL),
        parts.context.clone(),
    )
    .unwrap();
    let executed = pool.join();

    assert_eq!(executed.iter().sum::<usize>(), 20);
    assert!(parts.queue.is_empty());
    assert_eq!(parts.service.signal_shutdown(), DrainStatus::Done);
    for id in ids {
        assert!(matches!(parts.service.poll(id), PollResponse::Done { .. }));
    }
    assert_eq!(parts.registry.count_total(), 20);
    assert_eq!(parts.registry.count_done(), 20);
}

#[test]
fn test_concurrent_submitters_all_jobs_complete() {
    let (node, _dir) = start_node(4, sample_dataset());
    let service = node.service().clone();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            std::thread::spawn(move || {
                (0..25)
                    .map(|_| {
                        service
                            .submit(AnalysisKind::DiffFromMean, Parameters::question("Q1"))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: HashSet<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(ids.len(), 100);

    assert!(wait_for_idle(&service, TIMEOUT));
    let executed = node.shutdown_and_join();
    assert_eq!(executed.len(), 4);
    assert_eq!(executed.iter().sum::<usize>(), 100);
}

#[test]
fn test_idle_workers_exit_promptly_after_shutdown() {
    let (node, _dir) = start_node(2, sample_dataset());
    let started = std::time::Instant::now();
    node.shutdown_and_join();
    assert!(started.elapsed() < TIMEOUT);
}
