//! A destination directory that already contains a byte-identical copy of
//! the source yields skipped: duplicate, removes the source and never
//! creates a numbered copy.

use batch_move::{BatchProcessor, BatchRequest, EngineConfig, NullSink, OperationSpec};

#[test]
fn identical_content_at_destination_is_skipped() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.path().join("in").join("song.mp3");
    let out = temp.path().join("out");
    std::fs::create_dir_all(src.parent().unwrap()).unwrap();
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(&src, b"identical audio bytes").unwrap();
    // A prior partial run already landed the same content there.
    std::fs::write(out.join("song.mp3"), b"identical audio bytes").unwrap();

    let request = BatchRequest {
        operations: vec![OperationSpec {
            source: src.display().to_string(),
            destination: out.join("song.mp3").display().to_string(),
            kind: Default::default(),
        }],
    };

    let cfg = EngineConfig {
        recovery_dir: temp.path().join("recovery"),
        ..EngineConfig::default()
    };
    let sink = NullSink;
    let report = BatchProcessor::new(&cfg, &sink).run(&request).unwrap();

    let result = &report.results[0];
    assert!(result.skipped);
    assert_eq!(result.skip_reason.as_deref(), Some("duplicate"));
    assert!(!src.exists(), "duplicate source is deleted");
    assert!(out.join("song.mp3").exists());
    assert!(!out.join("song_1.mp3").exists(), "no numbered copy");
    // Nothing physically moved, so nothing to roll back later.
    assert_eq!(report.completed_operations, 0);
}
