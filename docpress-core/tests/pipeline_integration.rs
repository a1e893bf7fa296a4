mod common;

use std::fs;

use chrono::NaiveDate;
use common::{add_draft, paragraph, post, workspace, write_docx, ScriptedGenerator};
use docpress_core::contract::MockTextGenerator;
use docpress_core::deploy::GitDeploymentNotifier;
use docpress_core::error::{ConfigurationError, GenerationError, Stage};
use docpress_core::extract::DocxReader;
use docpress_core::metadata::MetadataFallback;
use docpress_core::pipeline::{
    publish_batch, BatchRun, DocumentOutcome, DocumentState, DocumentWarning,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_publishes_relocates_and_archives_single_draft() {
    let (_dir, config) = workspace();
    let draft = add_draft(&config, "hello.docx", "Rough notes about saying hello.");
    fs::write(config.drafts_folder.join("wave.png"), b"png-bytes").unwrap();
    fs::write(config.drafts_folder.join("smile.JPG"), b"jpg-bytes").unwrap();

    let mut generator = MockTextGenerator::new();
    generator.expect_generate().times(1).returning(|prompt: &str| {
        assert!(prompt.contains("Rough notes about saying hello."));
        assert!(prompt.contains("Short, punchy paragraphs."));
        assert!(prompt.contains("- images/wave.png"));
        Ok(common::post(
            "Hello, World!",
            "2025-01-05",
            "![wave](images/wave.png)\n\nText.\n\n![smile](images/smile.JPG)",
        ))
    });
    let notifier = GitDeploymentNotifier::from_site(&config.site);

    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .expect("batch should run");

    assert_eq!(report.documents.len(), 1);
    let doc = &report.documents[0];
    let processed = match &doc.outcome {
        DocumentOutcome::Processed(p) => p,
        other => panic!("expected processed draft, got {other:?}"),
    };
    assert_eq!(processed.post.slug, "2025-01-05-hello-world");
    assert_eq!(processed.state, DocumentState::Archived);

    // Identical content in staging and site.
    let staging = fs::read_to_string(config.final_draft_folder.join("2025-01-05-hello-world.md")).unwrap();
    let site = fs::read_to_string(config.site.content_folder.join("2025-01-05-hello-world.md")).unwrap();
    assert_eq!(staging, site);

    // Images copied into the date partition and every reference rewritten.
    let partition = config.site.static_folder.join("2025").join("01");
    assert_eq!(fs::read(partition.join("wave.png")).unwrap(), b"png-bytes");
    assert_eq!(fs::read(partition.join("smile.JPG")).unwrap(), b"jpg-bytes");
    assert_eq!(site.matches("/img/2025/01/").count(), 2);
    assert!(!site.contains("images/wave.png"));
    assert!(!site.contains("images/smile.JPG"));
    assert!(site.starts_with("+++\ntitle = \"Hello, World!\""));
    assert!(site.contains("# source: hello.docx\n+++"));

    // Source archived, never deleted; images left in place.
    assert!(!draft.exists());
    assert!(config.drafts_folder.join("hello.published").exists());
    assert!(config.drafts_folder.join("wave.png").exists());

    let plan = report.deployment.as_ref().expect("deployment plan");
    assert!(plan.commands.iter().any(|c| c.contains("2025-01-05-hello-world")));
    assert!(doc.warnings.is_empty(), "unexpected warnings: {:?}", doc.warnings);
}

#[tokio::test]
async fn test_generation_timeout_fails_only_that_document() {
    let (_dir, config) = workspace();
    add_draft(&config, "a.docx", "FIRST DRAFT");
    add_draft(&config, "b.docx", "SECOND DRAFT");
    add_draft(&config, "c.docx", "THIRD DRAFT");

    let generator = ScriptedGenerator::new(|prompt: &str| {
        let title = if prompt.contains("FIRST DRAFT") { "First" } else { "Third" };
        Ok(post(title, "2025-02-01", "body"))
    })
    .stalling_on("SECOND DRAFT");
    let notifier = GitDeploymentNotifier::from_site(&config.site);

    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .expect("batch should run");

    let states: Vec<DocumentState> = report.documents.iter().map(|d| d.state()).collect();
    assert_eq!(
        states,
        vec![DocumentState::Archived, DocumentState::Pending, DocumentState::Archived]
    );

    match &report.documents[1].outcome {
        DocumentOutcome::Failed { stage, error, partial_outputs } => {
            assert_eq!(*stage, Stage::Transform);
            assert!(error.contains("timed out"), "got: {error}");
            assert!(partial_outputs.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // The stalled draft is neither published nor archived.
    assert!(config.drafts_folder.join("b.docx").exists());
    assert!(!config.drafts_folder.join("b.published").exists());
    let published: Vec<_> = fs::read_dir(&config.site.content_folder)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(published.len(), 2);
    assert!(published.contains(&"2025-02-01-first.md".to_string()));
    assert!(published.contains(&"2025-02-01-third.md".to_string()));

    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.archived().count(), 2);
}

#[tokio::test]
async fn test_empty_generation_fails_document_without_publishing() {
    let (_dir, config) = workspace();
    add_draft(&config, "empty.docx", "anything");

    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(|_: &str| Ok(String::new()));
    let notifier = GitDeploymentNotifier::from_site(&config.site);

    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();
    match &report.documents[0].outcome {
        DocumentOutcome::Failed { stage, .. } => assert_eq!(*stage, Stage::Transform),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.deployment.is_none());
    assert!(!config.site.content_folder.exists());
}

#[tokio::test]
async fn test_failed_site_write_blocks_archival() {
    let (_dir, mut config) = workspace();
    add_draft(&config, "post.docx", "text");
    // A file where the content folder should be makes the site write fail.
    let blocked = config.site.root.join("content-file");
    fs::create_dir_all(&config.site.root).unwrap();
    fs::write(&blocked, "occupied").unwrap();
    config.site.content_folder = blocked;

    let generator = ScriptedGenerator::new(|_: &str| Ok(post("Blocked", "2025-03-03", "body")));
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();

    match &report.documents[0].outcome {
        DocumentOutcome::Failed { stage, partial_outputs, .. } => {
            assert_eq!(*stage, Stage::Write);
            assert_eq!(
                partial_outputs,
                &vec![config.final_draft_folder.join("2025-03-03-blocked.md")]
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(config.drafts_folder.join("post.docx").exists());
    assert!(!config.drafts_folder.join("post.published").exists());
}

#[tokio::test]
async fn test_archival_failure_is_a_distinct_warning() {
    let (_dir, config) = workspace();
    let draft = add_draft(&config, "stuck.docx", "text");

    // The draft disappears mid-run, so the rename after publishing fails.
    let generator = ScriptedGenerator::new(move |_: &str| {
        fs::remove_file(&draft).unwrap();
        Ok(post("Stuck", "2025-04-04", "body"))
    });
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();

    let doc = &report.documents[0];
    match &doc.outcome {
        DocumentOutcome::Processed(p) => {
            assert_eq!(p.state, DocumentState::Published);
            assert!(p.archived_to.is_none());
            assert!(p.site_path.exists());
        }
        other => panic!("expected published draft, got {other:?}"),
    }
    assert!(doc
        .warnings
        .iter()
        .any(|w| matches!(w, DocumentWarning::Archival(_))));
    assert!(!config.drafts_folder.join("stuck.published").exists());
    assert!(report.to_string().contains("NOT archived"));
}

#[tokio::test]
async fn test_revised_draft_is_archived_beside_earlier_archive() {
    let (_dir, config) = workspace();
    let earlier = config.drafts_folder.join("post.published");
    fs::write(&earlier, b"first version of the draft").unwrap();
    add_draft(&config, "post.docx", "second version");

    let generator = ScriptedGenerator::new(|_: &str| Ok(post("Post", "2025-04-05", "body")));
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();

    match &report.documents[0].outcome {
        DocumentOutcome::Processed(p) => {
            assert_eq!(p.state, DocumentState::Archived);
            assert_eq!(p.archived_to, Some(config.drafts_folder.join("post.1.published")));
        }
        other => panic!("expected archived draft, got {other:?}"),
    }
    assert_eq!(fs::read(&earlier).unwrap(), b"first version of the draft");
}

#[tokio::test]
async fn test_missing_frontmatter_uses_run_date_and_file_name() {
    let (_dir, config) = workspace();
    add_draft(&config, "Weekend Trip.docx", "We went hiking.");

    let generator = ScriptedGenerator::new(|_: &str| Ok("A post with no header at all.".to_string()));
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let reader = DocxReader::new();
    let today = date("2026-10-17");

    let run = BatchRun::prepare(&config, &reader, today).unwrap();
    let report = run.execute(&reader, &generator, &notifier).await;

    let doc = &report.documents[0];
    match &doc.outcome {
        DocumentOutcome::Processed(p) => {
            assert_eq!(p.post.publish_date, today);
            assert_eq!(p.post.slug, "2026-10-17-weekend-trip");
        }
        other => panic!("expected published draft, got {other:?}"),
    }
    assert!(doc.warnings.contains(&DocumentWarning::MetadataFallback(MetadataFallback::Date)));
    assert!(doc.warnings.contains(&DocumentWarning::MetadataFallback(MetadataFallback::Title)));
}

#[tokio::test]
async fn test_unreadable_draft_continues_with_placeholder() {
    let (_dir, config) = workspace();
    fs::write(config.drafts_folder.join("broken.docx"), b"this is not a zip file").unwrap();

    let generator = ScriptedGenerator::new(|prompt: &str| {
        assert!(prompt.contains("Error extracting content"));
        Ok(post("Recovered", "2025-05-05", "body"))
    });
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();

    let doc = &report.documents[0];
    assert_eq!(doc.state(), DocumentState::Archived);
    assert!(doc
        .warnings
        .iter()
        .any(|w| matches!(w, DocumentWarning::Extraction(_))));
}

#[tokio::test]
async fn test_same_slug_twice_in_one_run_is_flagged() {
    let (_dir, config) = workspace();
    add_draft(&config, "one.docx", "one");
    add_draft(&config, "two.docx", "two");

    let generator = ScriptedGenerator::new(|prompt: &str| {
        let body = if prompt.contains("--- DRAFT ---\none") { "first body" } else { "second body" };
        Ok(post("Same Title", "2025-06-06", body))
    });
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();

    assert_eq!(report.published().count(), 2);
    let second = &report.documents[1];
    assert!(second.warnings.iter().any(|w| matches!(
        w,
        DocumentWarning::SlugCollision { previous: Some(p), .. } if p.ends_with("one.docx")
    )));
    let site = fs::read_to_string(config.site.content_folder.join("2025-06-06-same-title.md")).unwrap();
    assert!(site.contains("second body"));
}

#[tokio::test]
async fn test_tables_reach_the_generator_fenced() {
    let (_dir, config) = workspace();
    let body = format!(
        "{}{}",
        paragraph("Prices below."),
        common::table(&[&["Item", "Cost"], &["Tea", "3"]])
    );
    write_docx(&config.drafts_folder.join("prices.docx"), &body);

    let generator = ScriptedGenerator::new(|prompt: &str| {
        assert!(prompt.contains("Prices below.\n\n[TABLE CONTENT]\nItem | Cost\nTea | 3\n[/TABLE]"));
        Ok(post("Prices", "2025-07-07", "| Item | Cost |"))
    });
    let notifier = GitDeploymentNotifier::from_site(&config.site);
    let report = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap();
    assert_eq!(report.archived().count(), 1);
}

#[tokio::test]
async fn test_missing_drafts_folder_aborts_batch() {
    let (_dir, mut config) = workspace();
    config.drafts_folder = config.drafts_folder.join("does-not-exist");
    let generator = MockTextGenerator::new();
    let notifier = GitDeploymentNotifier::from_site(&config.site);

    let err = publish_batch(&config, &DocxReader::new(), &generator, &notifier)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingDraftsFolder(_)));
}

#[tokio::test]
async fn test_republishing_same_draft_is_idempotent() {
    let (_dir, config) = workspace();
    let respond = |_: &str| -> Result<String, GenerationError> {
        Ok(post("Again", "2025-08-08", "![x](images/x.png)"))
    };
    fs::write(config.drafts_folder.join("x.png"), b"image").unwrap();
    let notifier = GitDeploymentNotifier::from_site(&config.site);

    add_draft(&config, "again.docx", "v1");
    publish_batch(&config, &DocxReader::new(), &ScriptedGenerator::new(respond), &notifier)
        .await
        .unwrap();
    let first = fs::read(config.site.content_folder.join("2025-08-08-again.md")).unwrap();

    // The operator restores the draft and runs again.
    fs::rename(
        config.drafts_folder.join("again.published"),
        config.drafts_folder.join("again.docx"),
    )
    .unwrap();
    let report = publish_batch(&config, &DocxReader::new(), &ScriptedGenerator::new(respond), &notifier)
        .await
        .unwrap();
    let second = fs::read(config.site.content_folder.join("2025-08-08-again.md")).unwrap();

    assert_eq!(first, second);
    assert_eq!(report.archived().count(), 1);
    assert!(report.documents[0].warnings.is_empty());
}

#[tokio::test]
async fn test_reworded_republish_of_same_draft_is_not_a_collision() {
    let (_dir, config) = workspace();
    let notifier = GitDeploymentNotifier::from_site(&config.site);

    add_draft(&config, "again.docx", "v1");
    let first = ScriptedGenerator::new(|_: &str| Ok(post("Again", "2025-08-08", "first wording")));
    publish_batch(&config, &DocxReader::new(), &first, &notifier)
        .await
        .unwrap();

    fs::rename(
        config.drafts_folder.join("again.published"),
        config.drafts_folder.join("again.docx"),
    )
    .unwrap();
    let second = ScriptedGenerator::new(|_: &str| Ok(post("Again", "2025-08-08", "second wording")));
    let report = publish_batch(&config, &DocxReader::new(), &second, &notifier)
        .await
        .unwrap();

    let site = fs::read_to_string(config.site.content_folder.join("2025-08-08-again.md")).unwrap();
    assert!(site.contains("second wording"));
    assert!(report.documents[0].warnings.is_empty(), "unexpected warnings: {:?}", report.documents[0].warnings);
}
