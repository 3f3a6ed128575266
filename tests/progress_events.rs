//! The processor reports progress after every settled operation.

use batch_move::progress::{ProgressEvent, ProgressSink, ResultChunk};
use batch_move::{BatchProcessor, BatchRequest, EngineConfig, OperationSpec};
use std::sync::Mutex;

#[derive(Default)]
struct CollectingSink {
    progress: Mutex<Vec<ProgressEvent>>,
    chunks: Mutex<Vec<ResultChunk>>,
}

impl ProgressSink for CollectingSink {
    fn progress(&self, event: ProgressEvent) {
        self.progress.lock().unwrap().push(event);
    }
    fn result_chunk(&self, chunk: ResultChunk) {
        self.chunks.lock().unwrap().push(chunk);
    }
}

#[test]
fn one_progress_event_per_settled_operation() {
    let temp = assert_fs::TempDir::new().unwrap();
    let incoming = temp.path().join("in");
    let out = temp.path().join("out");
    std::fs::create_dir_all(&incoming).unwrap();

    let operations: Vec<OperationSpec> = (0..4)
        .map(|i| {
            let src = incoming.join(format!("f{i}"));
            std::fs::write(&src, format!("{i}")).unwrap();
            OperationSpec {
                source: src.display().to_string(),
                destination: out.join(format!("f{i}")).display().to_string(),
                kind: Default::default(),
            }
        })
        .collect();

    let cfg = EngineConfig {
        recovery_dir: temp.path().join("recovery"),
        ..EngineConfig::default()
    };
    let sink = CollectingSink::default();
    let report = BatchProcessor::new(&cfg, &sink)
        .run(&BatchRequest { operations })
        .unwrap();
    assert!(report.success);

    let events = sink.progress.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.total == 4));
    assert!(events.iter().all(|e| e.kind == "batch_organize"));
    // `current` values are a permutation of 1..=4 regardless of worker order.
    let mut currents: Vec<usize> = events.iter().map(|e| e.current).collect();
    currents.sort_unstable();
    assert_eq!(currents, vec![1, 2, 3, 4]);

    // Four results stay under the chunking threshold.
    assert!(sink.chunks.lock().unwrap().is_empty());
    assert!(report.chunked_results.is_none());
}
