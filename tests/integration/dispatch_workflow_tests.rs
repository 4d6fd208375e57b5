/*!
 * Integration tests for chunked processing through fallback providers
 */

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use subclean::app_config::Config;
use subclean::errors::{DispatchError, ProcessingError};
use subclean::processing::chunker::split_text;
use subclean::processing::{ChunkedProcessor, Dispatcher, GenerationParams, PauseReason, PromptTemplate, RateWindow, RecordingPacer, RetryPolicy};
use subclean::providers::mock::MockProvider;
use crate::common;

fn processor_from_config(max_retries: u32, max_chunk_size: usize, pacer: Arc<RecordingPacer>) -> ChunkedProcessor {
    let mut config = Config::default();
    config.rate_limit.max_retries = max_retries;
    config.processing.max_chunk_size = max_chunk_size;
    config.processing.prompt = "{content}".to_string();
    ChunkedProcessor::from_config(&config, pacer).unwrap()
}

/// A 30,000 character transcript with a dead primary provider is cleaned entirely by the backup
#[tokio::test]
async fn test_processText_withFailingPrimary_shouldUseBackupForEveryChunk() {
    common::init_test_logging();
    let pacer = Arc::new(RecordingPacer::new());
    let processor = processor_from_config(3, 12_000, pacer.clone());
    let primary = MockProvider::failing("primary");
    let backup = MockProvider::working("backup");
    let primary_calls = primary.call_counter();
    let backup_calls = backup.call_counter();
    let providers = common::boxed(vec![primary, backup]);
    let text = common::sentences(300, 100);

    let result = processor.process_text(&providers, &text).await.unwrap();

    let expected_chunks = split_text(&text, 12_000);
    assert_eq!(expected_chunks.len(), 3);
    assert_eq!(result.chunk_count, 3);
    assert_eq!(result.provider, "backup");
    let expected_text = expected_chunks
        .iter()
        .map(|c| format!("[backup] {}", c.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    assert_eq!(result.text, expected_text);

    // Three attempts on the primary for each chunk, then one on the backup
    assert_eq!(primary_calls.load(Ordering::SeqCst), 9);
    assert_eq!(backup_calls.load(Ordering::SeqCst), 3);
    assert_eq!(pacer.count(PauseReason::Retry), 6);
    assert_eq!(pacer.count(PauseReason::RateWindow), 2);
}

/// Whitespace-only input never reaches a provider
#[tokio::test]
async fn test_processText_withBlankInput_shouldSkipProviders() {
    let pacer = Arc::new(RecordingPacer::new());
    let processor = processor_from_config(3, 12_000, pacer.clone());
    let provider = MockProvider::working("a");
    let calls = provider.call_counter();
    let providers = common::boxed(vec![provider]);

    let err = processor.process_text(&providers, " \n \t\n").await.unwrap_err();

    assert!(matches!(err, ProcessingError::EmptyInput));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(pacer.pauses().is_empty());
}

/// The prompt template wraps each chunk, not the whole text
#[tokio::test]
async fn test_processText_shouldRenderTemplatePerChunk() {
    let pacer = Arc::new(RecordingPacer::new());
    let dispatcher = Dispatcher::with_pacer(RetryPolicy::default(), GenerationParams::default(), pacer);
    let processor = ChunkedProcessor::new(
        dispatcher,
        PromptTemplate::new("<<{content}>>").unwrap(),
        15,
        RateWindow::none(),
    );
    let provider = MockProvider::working("a");
    let prompts = provider.prompt_log();
    let providers = common::boxed(vec![provider]);

    processor.process_text(&providers, "One sentence. Two sentence.").await.unwrap();

    assert_eq!(
        *prompts.lock().unwrap(),
        vec!["<<One sentence.>>".to_string(), "<<Two sentence.>>".to_string()]
    );
}

/// When every provider fails a chunk, the error names that chunk and every provider tried
#[tokio::test]
async fn test_processText_whenAllProvidersFail_shouldReportChunkAndProviders() {
    let pacer = Arc::new(RecordingPacer::new());
    let processor = processor_from_config(2, 150, pacer.clone());
    let providers = common::boxed(vec![MockProvider::failing("a"), MockProvider::failing("b")]);
    let text = common::sentences(4, 100);

    let err = processor.process_text(&providers, &text).await.unwrap_err();

    match err {
        ProcessingError::ChunkFailed { index, total, source } => {
            assert_eq!(index, 0);
            assert_eq!(total, 4);
            assert_eq!(source.attempted_providers(), vec!["a", "b"]);
            assert!(matches!(source, DispatchError::AllProvidersExhausted { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(pacer.count(PauseReason::RateWindow), 0);
    assert!(pacer.pauses().iter().all(|(d, _)| *d == Duration::from_secs(2)));
}
