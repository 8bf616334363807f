mod test_harness;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use tally_lite::analysis::{Analysis, AnalysisKind, Parameters};
use tally_lite::scheduler::{JobOutcome, JobRegistry, JobStatus};
use tally_lite::service::{PollResponse, SubmitError};
use test_harness::{parts, sample_dataset};

#[test]
fn test_concurrent_allocation_yields_dense_unique_ids() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 250;

    let registry = Arc::new(JobRegistry::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| {
                        registry.allocate(Analysis::GlobalMean {
                            question: "Q1".into(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: HashSet<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(ids.len() as u64, THREADS * PER_THREAD);
    assert_eq!(ids, (1..=THREADS * PER_THREAD).collect::<HashSet<u64>>());
    assert_eq!(registry.count_total(), THREADS * PER_THREAD);
    assert_eq!(registry.outstanding(), THREADS * PER_THREAD);
}

#[test]
fn test_concurrent_mark_done_counts_each_job_once() {
    let registry = Arc::new(JobRegistry::new());
    for _ in 0..100 {
        registry.allocate(Analysis::StatesMean {
            question: "Q1".into(),
        });
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                (1..=100)
                    .filter(|id| registry.mark_done(*id, JobOutcome::Stored).is_ok())
                    .count()
            })
        })
        .collect();

    let transitions: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(transitions, 100);
    assert_eq!(registry.count_done(), 100);
    assert_eq!(registry.outstanding(), 0);
    assert!(registry
        .statuses()
        .values()
        .all(|status| *status == JobStatus::Done));
}

#[test]
fn test_rejected_submissions_consume_no_ids() {
    let parts = parts(sample_dataset());

    assert!(matches!(
        parts
            .service
            .submit(AnalysisKind::StateMean, Parameters::question("Q1")),
        Err(SubmitError::InvalidParameters(_))
    ));
    assert!(matches!(
        parts
            .service
            .submit(AnalysisKind::StatesMean, Parameters::default()),
        Err(SubmitError::InvalidParameters(_))
    ));
    assert_eq!(parts.registry.count_total(), 0);

    let id = parts
        .service
        .submit(AnalysisKind::StatesMean, Parameters::question("Q1"))
        .unwrap();
    assert_eq!(id, 1);
    assert_eq!(parts.queue.len(), 1);
}

#[test]
fn test_poll_unknown_job() {
    let parts = parts(sample_dataset());
    assert_eq!(
        parts.service.poll(7),
        PollResponse::Error {
            reason: "Invalid job_id".into()
        }
    );
}
