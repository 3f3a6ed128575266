//! Progress and result-chunk emission.
//! Stateless: the processor pushes events into a caller-provided sink; large
//! result sets are split into fixed-size chunks so no single message grows
//! unbounded.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::OperationResult;

/// Results are chunked once the set grows past this many entries; each chunk
/// carries at most this many results.
pub const CHUNK_SIZE: usize = 50;

/// Incremental progress, emitted after each operation settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

impl ProgressEvent {
    pub fn new(current: usize, total: usize, current_file: &str) -> Self {
        Self {
            kind: "batch_organize".to_string(),
            current,
            total,
            current_file: current_file.to_string(),
        }
    }
}

/// One slice of a chunked result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultChunk {
    pub batch_id: String,
    pub chunk: Vec<OperationResult>,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub is_last: bool,
}

/// Notification seam between the engine and its caller.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, _event: ProgressEvent) {}
    fn result_chunk(&self, _chunk: ResultChunk) {}
}

/// Sink for callers that don't subscribe to events.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Sink that narrates progress through tracing; used by the CLI.
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn progress(&self, event: ProgressEvent) {
        info!(
            current = event.current,
            total = event.total,
            file = %event.current_file,
            "progress"
        );
    }

    fn result_chunk(&self, chunk: ResultChunk) {
        info!(
            batch_id = %chunk.batch_id,
            chunk_index = chunk.chunk_index,
            total_chunks = chunk.total_chunks,
            results = chunk.chunk.len(),
            "result chunk"
        );
    }
}

/// Split `results` into chunks and emit them sequentially, yielding between
/// chunks. Returns the chunk count when chunking applied, None when the set
/// was small enough to travel whole.
pub fn emit_chunked(
    sink: &dyn ProgressSink,
    batch_id: &str,
    results: &[OperationResult],
) -> Option<usize> {
    if results.len() <= CHUNK_SIZE {
        return None;
    }
    let total_chunks = results.len().div_ceil(CHUNK_SIZE);
    for (chunk_index, window) in results.chunks(CHUNK_SIZE).enumerate() {
        sink.result_chunk(ResultChunk {
            batch_id: batch_id.to_string(),
            chunk: window.to_vec(),
            chunk_index,
            total_chunks,
            is_last: chunk_index + 1 == total_chunks,
        });
        std::thread::yield_now();
    }
    Some(total_chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        chunks: Mutex<Vec<ResultChunk>>,
    }

    impl ProgressSink for CollectingSink {
        fn result_chunk(&self, chunk: ResultChunk) {
            self.chunks.lock().unwrap().push(chunk);
        }
    }

    fn results(n: usize) -> Vec<OperationResult> {
        (0..n)
            .map(|i| OperationResult::ok(&format!("/src/{i}"), format!("/dst/{i}")))
            .collect()
    }

    #[test]
    fn small_result_sets_are_not_chunked() {
        let sink = CollectingSink::default();
        assert_eq!(emit_chunked(&sink, "b", &results(CHUNK_SIZE)), None);
        assert!(sink.chunks.lock().unwrap().is_empty());
    }

    #[test]
    fn large_result_sets_chunk_with_last_marker() {
        let sink = CollectingSink::default();
        let total = emit_chunked(&sink, "b", &results(120)).unwrap();
        assert_eq!(total, 3);

        let chunks = sink.chunks.lock().unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chunk.len(), 50);
        assert_eq!(chunks[2].chunk.len(), 20);
        assert!(!chunks[0].is_last);
        assert!(chunks[2].is_last);
        assert!(chunks.iter().all(|c| c.total_chunks == 3));
        assert_eq!(
            chunks.iter().map(|c| c.chunk.len()).sum::<usize>(),
            120
        );
    }

    #[test]
    fn progress_event_wire_shape() {
        let ev = ProgressEvent::new(2, 10, "/a/b.txt");
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "batch_organize");
        assert_eq!(v["currentFile"], "/a/b.txt");
        assert_eq!(v["current"], 2);
    }
}
