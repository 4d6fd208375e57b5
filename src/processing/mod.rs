/*!
 * Transcript processing engine.
 *
 * This module turns extracted transcript text into cleaned prose by way of
 * one or more providers. It is split into several submodules:
 *
 * - `chunker`: Sentence-aware splitting of long texts
 * - `dispatcher`: Ordered provider fallback with bounded retries
 * - `orchestrator`: Chunking, pacing and reassembly for one document
 * - `policy`: Retry policy, rate window and the pacer abstraction
 * - `prompts`: Prompt template rendering
 */

// Re-export main types for easier usage
pub use self::chunker::{Chunk, SentenceChunker, TextSplitter, split_text};
pub use self::dispatcher::{DispatchSuccess, Dispatcher, GenerationParams};
pub use self::orchestrator::{ChunkedProcessor, ProcessedText};
pub use self::policy::{Pacer, PauseReason, RateWindow, RecordingPacer, RetryPolicy, TokioPacer};
pub use self::prompts::PromptTemplate;

// Submodules
pub mod chunker;
pub mod dispatcher;
pub mod orchestrator;
pub mod policy;
pub mod prompts;
