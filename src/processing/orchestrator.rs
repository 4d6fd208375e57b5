/*!
 * Chunked processing of one document.
 *
 * Short texts go to the dispatcher as a single prompt. Longer texts are
 * split into chunks, dispatched one after another with the rate window
 * between them, and the chunk results are joined with a blank line.
 */

use log::{debug, error, info};
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::ProcessingError;
use crate::providers::Provider;
use super::chunker::{char_len, SentenceChunker, TextSplitter};
use super::dispatcher::{Dispatcher, GenerationParams};
use super::policy::{Pacer, PauseReason, RateWindow};
use super::prompts::PromptTemplate;

/// Separator placed between chunk results
pub const CHUNK_JOINER: &str = "\n\n";

/// Cleaned text for one document
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedText {
    /// Reassembled output
    pub text: String,
    /// Provider that produced the last chunk
    pub provider: String,
    /// Number of prompts the text was sent as
    pub chunk_count: usize,
}

/// Splits, dispatches and reassembles one text at a time
pub struct ChunkedProcessor<S: TextSplitter = SentenceChunker> {
    dispatcher: Dispatcher,
    template: PromptTemplate,
    splitter: S,
    max_chunk_size: usize,
    rate_window: RateWindow,
}

impl ChunkedProcessor<SentenceChunker> {
    /// Create a processor using the sentence chunker
    pub fn new(dispatcher: Dispatcher, template: PromptTemplate, max_chunk_size: usize, rate_window: RateWindow) -> Self {
        Self {
            dispatcher,
            template,
            splitter: SentenceChunker::new(),
            max_chunk_size,
            rate_window,
        }
    }

    /// Build the processor and its dispatcher from configuration
    pub fn from_config(config: &Config, pacer: Arc<dyn Pacer>) -> Result<Self, ProcessingError> {
        let template = PromptTemplate::new(&config.processing.prompt)?;
        let params = GenerationParams {
            temperature: config.processing.temperature,
            max_tokens: config.processing.max_tokens,
        };
        let dispatcher = Dispatcher::with_pacer(config.rate_limit.retry_policy(), params, pacer);
        Ok(Self::new(
            dispatcher,
            template,
            config.processing.max_chunk_size,
            config.rate_limit.rate_window(),
        ))
    }
}

impl<S: TextSplitter> ChunkedProcessor<S> {
    /// Swap in a different splitter
    pub fn with_splitter<T: TextSplitter>(self, splitter: T) -> ChunkedProcessor<T> {
        ChunkedProcessor {
            dispatcher: self.dispatcher,
            template: self.template,
            splitter,
            max_chunk_size: self.max_chunk_size,
            rate_window: self.rate_window,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn rate_window(&self) -> RateWindow {
        self.rate_window
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Clean `text` through the providers, chunking it when it is too long
    pub async fn process_text(&self, providers: &[Box<dyn Provider>], text: &str) -> Result<ProcessedText, ProcessingError> {
        if text.trim().is_empty() {
            return Err(ProcessingError::EmptyInput);
        }

        if char_len(text) <= self.max_chunk_size {
            let prompt = self.template.render(text);
            let success = self.dispatcher.dispatch(providers, &prompt).await?;
            return Ok(ProcessedText {
                text: success.text,
                provider: success.provider,
                chunk_count: 1,
            });
        }

        let chunks = self.splitter.split(text, self.max_chunk_size);
        let total = chunks.len();
        if total == 0 {
            return Err(ProcessingError::EmptyInput);
        }
        info!(
            "Text has {} characters, processing in {} chunks of at most {}",
            char_len(text),
            total,
            self.max_chunk_size
        );

        let pacer = self.dispatcher.pacer();
        let mut results = Vec::with_capacity(total);
        let mut last_provider = String::new();

        for (position, chunk) in chunks.iter().enumerate() {
            debug!("Processing chunk {}/{} ({} chars)", position + 1, total, chunk.len());
            let prompt = self.template.render(&chunk.text);

            let success = match self.dispatcher.dispatch(providers, &prompt).await {
                Ok(success) => success,
                Err(source) => {
                    error!("Chunk {}/{} failed, discarding {} finished chunk(s)", position + 1, total, results.len());
                    return Err(ProcessingError::ChunkFailed {
                        index: chunk.index,
                        total,
                        source,
                    });
                }
            };

            results.push(success.text);
            last_provider = success.provider;

            if position + 1 < total {
                pacer.pause(self.rate_window.delay(), PauseReason::RateWindow).await;
            }
        }

        Ok(ProcessedText {
            text: results.join(CHUNK_JOINER),
            provider: last_provider,
            chunk_count: total,
        })
    }
}
