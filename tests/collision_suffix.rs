//! Two different files aimed at the same destination path end up as
//! name.ext and name_1.ext, never overwriting each other.

use batch_move::{BatchProcessor, BatchRequest, EngineConfig, NullSink, OperationSpec};

#[test]
fn colliding_destinations_get_numeric_suffixes() {
    let temp = assert_fs::TempDir::new().unwrap();
    let a = temp.path().join("in").join("a").join("notes.txt");
    let b = temp.path().join("in").join("b").join("notes.txt");
    let out = temp.path().join("out");
    std::fs::create_dir_all(a.parent().unwrap()).unwrap();
    std::fs::create_dir_all(b.parent().unwrap()).unwrap();
    std::fs::write(&a, b"first notes").unwrap();
    std::fs::write(&b, b"second notes, different").unwrap();

    let dest = out.join("notes.txt").display().to_string();
    let request = BatchRequest {
        operations: vec![
            OperationSpec {
                source: a.display().to_string(),
                destination: dest.clone(),
                kind: Default::default(),
            },
            OperationSpec {
                source: b.display().to_string(),
                destination: dest,
                kind: Default::default(),
            },
        ],
    };

    // Single worker makes the winner deterministic: input order.
    let cfg = EngineConfig {
        recovery_dir: temp.path().join("recovery"),
        concurrency: 1,
        ..EngineConfig::default()
    };
    let sink = NullSink;
    let report = BatchProcessor::new(&cfg, &sink).run(&request).unwrap();

    assert!(report.success);
    assert_eq!(report.success_count, 2);
    assert_eq!(std::fs::read(out.join("notes.txt")).unwrap(), b"first notes");
    assert_eq!(
        std::fs::read(out.join("notes_1.txt")).unwrap(),
        b"second notes, different"
    );
    assert!(!a.exists());
    assert!(!b.exists());
}
