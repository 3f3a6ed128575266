//! Submitting the same (source, destination) pair twice in one batch results
//! in exactly one physical move and one result marked skipped: duplicate.

use batch_move::{BatchProcessor, BatchRequest, EngineConfig, NullSink, OperationSpec};

#[test]
fn duplicate_pair_moves_once() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.path().join("in").join("doc.pdf");
    let dst = temp.path().join("out").join("doc.pdf");
    std::fs::create_dir_all(src.parent().unwrap()).unwrap();
    std::fs::write(&src, b"pdf bytes").unwrap();

    let op = OperationSpec {
        source: src.display().to_string(),
        destination: dst.display().to_string(),
        kind: Default::default(),
    };
    let request = BatchRequest {
        operations: vec![op.clone(), op],
    };

    let cfg = EngineConfig {
        recovery_dir: temp.path().join("recovery"),
        ..EngineConfig::default()
    };
    let sink = NullSink;
    let report = BatchProcessor::new(&cfg, &sink).run(&request).unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(report.fail_count, 0);
    assert_eq!(report.completed_operations, 1, "only one physical move");

    let skipped: Vec<_> = report.results.iter().filter(|r| r.skipped).collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].skip_reason.as_deref(), Some("duplicate"));

    assert!(!src.exists());
    assert_eq!(std::fs::read(&dst).unwrap(), b"pdf bytes");
    // No numbered copy from the duplicate submission.
    assert!(!temp.path().join("out").join("doc_1.pdf").exists());
}
