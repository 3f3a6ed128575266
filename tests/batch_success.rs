//! A valid batch of unique operations moves every source and leaves nothing
//! behind.

use batch_move::{BatchProcessor, BatchRequest, BatchStatus, EngineConfig, NullSink, OperationSpec};
use std::time::Duration;

#[test]
fn every_source_moves_and_none_remain() {
    let temp = assert_fs::TempDir::new().unwrap();
    let incoming = temp.path().join("incoming");
    let sorted = temp.path().join("sorted");
    std::fs::create_dir_all(&incoming).unwrap();

    let mut operations = Vec::new();
    for i in 0..8 {
        let src = incoming.join(format!("file{i}.txt"));
        std::fs::write(&src, format!("content {i}")).unwrap();
        operations.push(OperationSpec {
            source: src.display().to_string(),
            destination: sorted.join(format!("file{i}.txt")).display().to_string(),
            kind: Default::default(),
        });
    }

    let cfg = EngineConfig {
        recovery_dir: temp.path().join("recovery"),
        verify_base_delay: Duration::from_millis(5),
        ..EngineConfig::default()
    };
    let sink = NullSink;
    let report = BatchProcessor::new(&cfg, &sink)
        .run(&BatchRequest { operations })
        .unwrap();

    assert!(report.success);
    assert_eq!(report.status, BatchStatus::Completed);
    assert_eq!(report.success_count, 8);
    assert_eq!(report.fail_count, 0);
    assert_eq!(report.completed_operations, 8);
    assert!(!report.rolled_back);

    for i in 0..8 {
        let src = incoming.join(format!("file{i}.txt"));
        let dst = sorted.join(format!("file{i}.txt"));
        assert!(!src.exists(), "source {i} should be gone");
        assert_eq!(
            std::fs::read_to_string(&dst).unwrap(),
            format!("content {i}")
        );
    }

    // The global lock does not outlive the batch.
    assert!(!cfg.lock_path().exists());
}
