use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::processing::{ChunkedProcessor, Pacer, PauseReason, TokioPacer};
use crate::providers::ProviderSet;
use crate::subtitle_processor;

// @module: Application controller for batch transcript cleanup

/// One subtitle file loaded into memory
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    // @field: Title used for logging and the optional heading (file stem)
    pub title: String,
    // @field: Raw SRT content
    pub content: String,
}

impl SourceDocument {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// What happened to one document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    /// Cleaned text was produced
    Processed {
        provider: String,
        chunk_count: usize,
        output: String,
    },
    /// Nothing was sent to a provider
    Skipped(String),
    /// Every provider failed for this document
    Failed(String),
}

/// Outcome of one document in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub title: String,
    pub outcome: DocumentOutcome,
}

impl DocumentReport {
    /// Final output text, if the document was processed
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            DocumentOutcome::Processed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Per-document outcomes of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Processed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed(_)))
    }

    /// Report entry for a document title
    pub fn get(&self, title: &str) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.title == title)
    }

    fn count(&self, predicate: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.documents.iter().filter(|d| predicate(&d.outcome)).count()
    }

    fn summary(&self) -> String {
        format!(
            "{} processed, {} skipped, {} failed",
            self.processed(),
            self.skipped(),
            self.failed()
        )
    }
}

/// A file in `run_folder`, either already settled or waiting on its processed report
enum Slot {
    Settled(DocumentReport),
    Pending(PathBuf),
}

/// Main application controller for transcript cleanup
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Chunking, dispatch and reassembly
    processor: ChunkedProcessor,
    // @field: Pause source for the rate window between documents
    pacer: Arc<dyn Pacer>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Self::with_pacer(config, Arc::new(TokioPacer))
    }

    /// Create a controller with a custom pacer for retry and rate pauses
    pub fn with_pacer(config: Config, pacer: Arc<dyn Pacer>) -> Result<Self> {
        let processor = ChunkedProcessor::from_config(&config, Arc::clone(&pacer))?;
        Ok(Self {
            config,
            processor,
            pacer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the final file text, with the title heading when enabled
    pub fn build_output(&self, title: &str, cleaned: &str) -> String {
        if self.config.processing.include_filename_as_title {
            format!("# {}\n\n{}", title, cleaned)
        } else {
            cleaned.to_string()
        }
    }

    /// Clean every document in order through the provider set
    pub async fn process_documents(&self, providers: &ProviderSet, documents: Vec<SourceDocument>) -> Result<BatchReport> {
        self.process_documents_with_progress(providers, documents, |_, _| {}).await
    }

    /// Same as `process_documents`, calling `on_progress(done, total)` after each document
    pub async fn process_documents_with_progress<F>(
        &self,
        providers: &ProviderSet,
        documents: Vec<SourceDocument>,
        mut on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(usize, usize),
    {
        if providers.is_empty() {
            return Err(anyhow!("No available providers. Check your API keys."));
        }

        let total = documents.len();
        let mut report = BatchReport::default();

        for (i, document) in documents.into_iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, document.title);

            let text = subtitle_processor::extract_text(&document.content);
            let outcome = if text.trim().is_empty() {
                warn!("Skipping {}: No text content found", document.title);
                DocumentOutcome::Skipped("No text content found".to_string())
            } else {
                let outcome = match self.processor.process_text(providers.as_slice(), &text).await {
                    Ok(processed) => {
                        info!("Done via {} -> {}", processed.provider, document.title);
                        DocumentOutcome::Processed {
                            output: self.build_output(&document.title, &processed.text),
                            provider: processed.provider,
                            chunk_count: processed.chunk_count,
                        }
                    }
                    Err(e) => {
                        error!("Failed {}: {}", document.title, e);
                        DocumentOutcome::Failed(e.to_string())
                    }
                };

                // Skipped documents never reach a provider, so only these are paced
                if i + 1 < total {
                    self.pacer
                        .pause(self.processor.rate_window().delay(), PauseReason::RateWindow)
                        .await;
                }
                outcome
            };

            report.documents.push(DocumentReport {
                title: document.title,
                outcome,
            });
            on_progress(i + 1, total);
        }

        info!("Batch complete: {}", report.summary());
        Ok(report)
    }

    /// Clean every `.srt` file in `input_dir` into `output_dir` using the configured providers
    pub async fn run(&self, input_dir: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<BatchReport> {
        let providers = ProviderSet::from_config(&self.config);
        self.run_with_providers(providers, input_dir, output_dir, force_overwrite).await
    }

    /// Same as `run` with an already built provider set, which is closed before returning
    pub async fn run_with_providers(
        &self,
        providers: ProviderSet,
        input_dir: PathBuf,
        output_dir: PathBuf,
        force_overwrite: bool,
    ) -> Result<BatchReport> {
        let result = self.run_folder(&providers, &input_dir, &output_dir, force_overwrite).await;
        providers.close();
        result
    }

    async fn run_folder(
        &self,
        providers: &ProviderSet,
        input_dir: &Path,
        output_dir: &Path,
        force_overwrite: bool,
    ) -> Result<BatchReport> {
        if providers.is_empty() {
            return Err(anyhow!("No available providers. Check your API keys."));
        }
        info!("Available providers: {:?}", providers.names());

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }
        FileManager::ensure_dir(output_dir)?;

        let srt_files = FileManager::find_files(input_dir, "srt")?;
        if srt_files.is_empty() {
            warn!("No .srt files found in {:?}", input_dir);
            return Ok(BatchReport::default());
        }
        info!("Processing {} SRT file(s)", srt_files.len());

        // One slot per input file, so the report keeps input order
        let mut slots = Vec::new();
        let mut documents = Vec::new();
        for path in srt_files {
            let title = FileManager::title_for(&path);
            let output_path = FileManager::generate_output_path(&path, output_dir);
            if FileManager::file_exists(&output_path) && !force_overwrite {
                info!("Skipping {}: output already exists at {:?} (use -f to overwrite)", title, output_path);
                slots.push(Slot::Settled(DocumentReport {
                    title,
                    outcome: DocumentOutcome::Skipped("Output already exists".to_string()),
                }));
                continue;
            }
            match FileManager::read_to_string(&path) {
                Ok(content) => {
                    documents.push(SourceDocument::new(title, content));
                    slots.push(Slot::Pending(output_path));
                }
                Err(e) => {
                    error!("Failed {}: {:#}", title, e);
                    slots.push(Slot::Settled(DocumentReport {
                        title,
                        outcome: DocumentOutcome::Failed(format!("{:#}", e)),
                    }));
                }
            }
        }

        let progress_bar = ProgressBar::new(documents.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        let pb = progress_bar.clone();

        let processed = self
            .process_documents_with_progress(providers, documents, move |done, _total| {
                pb.set_position(done as u64);
            })
            .await?;
        progress_bar.finish_and_clear();

        let mut processed = processed.documents.into_iter();
        let mut report = BatchReport::default();
        for slot in slots {
            let (mut document, output_path) = match slot {
                Slot::Settled(document) => {
                    report.documents.push(document);
                    continue;
                }
                Slot::Pending(output_path) => match processed.next() {
                    Some(document) => (document, output_path),
                    None => continue,
                },
            };
            if let Some(output) = document.output() {
                match FileManager::write_to_file(&output_path, output) {
                    Ok(()) => debug!("Wrote {:?}", output_path),
                    Err(e) => {
                        error!("Failed to write {:?}: {:#}", output_path, e);
                        document.outcome = DocumentOutcome::Failed(format!("{:#}", e));
                    }
                }
            }
            report.documents.push(document);
        }

        Ok(report)
    }
}
