/*!
 * Integration tests for batch processing of subtitle directories
 */

use std::sync::atomic::Ordering;
use std::sync::Arc;
use anyhow::Result;

use subclean::app_config::Config;
use subclean::app_controller::{BatchReport, Controller, DocumentOutcome, SourceDocument};
use subclean::errors::ProviderError;
use subclean::file_utils::FileManager;
use subclean::processing::{PauseReason, RecordingPacer};
use subclean::providers::mock::MockProvider;
use subclean::providers::ProviderSet;
use crate::common;

fn test_controller(pacer: Arc<RecordingPacer>) -> Result<Controller> {
    let mut config = Config::default();
    config.processing.prompt = "{content}".to_string();
    Controller::with_pacer(config, pacer)
}

/// Rejects any prompt mentioning the word "cursed"
fn picky(prompt: &str) -> Result<String, ProviderError> {
    if prompt.contains("cursed") {
        Err(ProviderError::ApiError {
            status_code: 400,
            message: "content rejected".to_string(),
        })
    } else {
        Ok(prompt.replace('\n', " "))
    }
}

fn picky_providers() -> ProviderSet {
    ProviderSet::new(common::boxed(vec![
        MockProvider::working("siliconflow").with_custom_response(picky),
        MockProvider::working("alibaba").with_custom_response(picky),
    ]))
}

/// One document that every provider rejects does not stop the other two
#[tokio::test]
async fn test_processDocuments_withOneFailingDocument_shouldProcessTheOthers() -> Result<()> {
    common::init_test_logging();
    let pacer = Arc::new(RecordingPacer::new());
    let controller = test_controller(pacer.clone())?;
    let providers = picky_providers();
    let documents = vec![
        SourceDocument::new("first", common::srt_from_lines(&["Hello.", "World."])),
        SourceDocument::new("second", common::srt_from_lines(&["A cursed line."])),
        SourceDocument::new("third", common::srt_from_lines(&["Goodbye."])),
    ];

    let report = controller.process_documents(&providers, documents).await?;

    assert_eq!(report.processed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.get("first").and_then(|d| d.output()), Some("# first\n\nHello. World."));
    assert_eq!(report.get("third").and_then(|d| d.output()), Some("# third\n\nGoodbye."));
    match &report.get("second").map(|d| d.outcome.clone()) {
        Some(DocumentOutcome::Failed(message)) => {
            assert!(message.contains("siliconflow"));
            assert!(message.contains("alibaba"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    // Between first/second and second/third, never after the last document
    assert_eq!(pacer.count(PauseReason::RateWindow), 2);
    Ok(())
}

/// A file with no dialogue is skipped without contacting a provider
#[tokio::test]
async fn test_processDocuments_withNoDialogue_shouldSkip() -> Result<()> {
    let pacer = Arc::new(RecordingPacer::new());
    let controller = test_controller(pacer.clone())?;
    let provider = MockProvider::working("a");
    let calls = provider.call_counter();
    let providers = ProviderSet::new(common::boxed(vec![provider]));
    let documents = vec![SourceDocument::new("blank", "1\n00:00:01,000 --> 00:00:02,000\n\n")];

    let report = controller.process_documents(&providers, documents).await?;

    assert_eq!(report.skipped(), 1);
    assert_eq!(
        report.documents[0].outcome,
        DocumentOutcome::Skipped("No text content found".to_string())
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(pacer.pauses().is_empty());
    Ok(())
}

/// Files on disk become `<stem>.txt` outputs and the provider set is closed afterwards
#[tokio::test]
async fn test_runWithProviders_shouldWriteOutputsAndCloseProviders() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_subtitle(input.path(), "lecture.srt")?;
    common::create_test_file(input.path(), "broken.srt", &common::srt_from_lines(&["So cursed."]))?;
    common::create_test_file(input.path(), "readme.md", "not a subtitle")?;

    let provider = MockProvider::working("a").with_custom_response(picky);
    let closed = provider.close_counter();
    let providers = ProviderSet::new(common::boxed(vec![provider]));
    let controller = test_controller(Arc::new(RecordingPacer::new()))?;

    let report = controller
        .run_with_providers(providers, input.path().to_path_buf(), output.path().to_path_buf(), false)
        .await?;

    assert_eq!(report.processed(), 1);
    assert_eq!(report.failed(), 1);
    let written = FileManager::read_to_string(output.path().join("lecture.txt"))?;
    assert_eq!(
        written,
        "# lecture\n\nThis is a test subtitle. It contains multiple entries. For testing purposes."
    );
    assert!(!FileManager::file_exists(output.path().join("broken.txt")));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Existing outputs are left alone unless overwriting is forced
#[tokio::test]
async fn test_runWithProviders_withExistingOutput_shouldRespectForceFlag() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_subtitle(input.path(), "episode.srt")?;
    let existing = common::create_test_file(output.path(), "episode.txt", "old")?;
    let controller = test_controller(Arc::new(RecordingPacer::new()))?;

    let provider = MockProvider::working("a");
    let calls = provider.call_counter();
    let report = controller
        .run_with_providers(
            ProviderSet::new(common::boxed(vec![provider])),
            input.path().to_path_buf(),
            output.path().to_path_buf(),
            false,
        )
        .await?;
    assert_eq!(report.skipped(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(FileManager::read_to_string(&existing)?, "old");

    let report = controller
        .run_with_providers(
            ProviderSet::new(common::boxed(vec![MockProvider::working("a")])),
            input.path().to_path_buf(),
            output.path().to_path_buf(),
            true,
        )
        .await?;
    assert_eq!(report.processed(), 1);
    assert!(FileManager::read_to_string(&existing)?.starts_with("# episode\n\n[a] "));
    Ok(())
}

/// An input directory without subtitles yields an empty report
#[tokio::test]
async fn test_runWithProviders_withNoSrtFiles_shouldReturnEmptyReport() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    let controller = test_controller(Arc::new(RecordingPacer::new()))?;

    let report = controller
        .run_with_providers(
            ProviderSet::new(common::boxed(vec![MockProvider::working("a")])),
            input.path().to_path_buf(),
            output.path().to_path_buf(),
            false,
        )
        .await?;

    assert!(report.documents.is_empty());
    Ok(())
}

/// Without any provider the run fails before reading input, and still closes the set
#[test]
fn test_runWithProviders_withNoProviders_shouldFail() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_subtitle(input.path(), "episode.srt")?;
    let controller = test_controller(Arc::new(RecordingPacer::new()))?;

    let result = tokio_test::block_on(controller.run_with_providers(
        ProviderSet::new(Vec::new()),
        input.path().to_path_buf(),
        output.path().to_path_buf(),
        false,
    ));

    assert!(result.is_err());
    assert!(!FileManager::file_exists(output.path().join("episode.txt")));
    Ok(())
}

fn report_titles(report: &BatchReport) -> Vec<&str> {
    report.documents.iter().map(|d| d.title.as_str()).collect()
}

/// A file that is not valid UTF-8 is reported as failed and the rest of the folder still runs
#[tokio::test]
async fn test_runWithProviders_withUnreadableFile_shouldProcessTheOthers() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_subtitle(input.path(), "a_good.srt")?;
    std::fs::write(input.path().join("b_bad.srt"), [0xff, 0xfe, 0x00, 0x41])?;
    common::create_test_subtitle(input.path(), "c_good.srt")?;
    let controller = test_controller(Arc::new(RecordingPacer::new()))?;

    let report = controller
        .run_with_providers(
            ProviderSet::new(common::boxed(vec![MockProvider::working("a")])),
            input.path().to_path_buf(),
            output.path().to_path_buf(),
            false,
        )
        .await?;

    assert_eq!(report.processed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report_titles(&report), vec!["a_good", "b_bad", "c_good"]);
    match report.get("b_bad").map(|d| &d.outcome) {
        Some(DocumentOutcome::Failed(message)) => assert!(message.contains("b_bad.srt")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(FileManager::file_exists(output.path().join("a_good.txt")));
    assert!(FileManager::file_exists(output.path().join("c_good.txt")));
    assert!(!FileManager::file_exists(output.path().join("b_bad.txt")));
    Ok(())
}

/// Skipped outputs keep their place in the report instead of moving to the end
#[tokio::test]
async fn test_runWithProviders_withExistingOutputInMiddle_shouldKeepInputOrder() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    for name in ["one.srt", "two.srt", "three.srt"] {
        common::create_test_subtitle(input.path(), name)?;
    }
    common::create_test_file(output.path(), "three.txt", "old")?;
    let controller = test_controller(Arc::new(RecordingPacer::new()))?;

    let report = controller
        .run_with_providers(
            ProviderSet::new(common::boxed(vec![MockProvider::working("a")])),
            input.path().to_path_buf(),
            output.path().to_path_buf(),
            false,
        )
        .await?;

    // find_files sorts by path: one, three, two
    assert_eq!(report_titles(&report), vec!["one", "three", "two"]);
    assert_eq!(
        report.documents[1].outcome,
        DocumentOutcome::Skipped("Output already exists".to_string())
    );
    assert_eq!(report.processed(), 2);
    Ok(())
}
