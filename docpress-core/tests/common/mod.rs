#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docpress_core::config::PipelineConfig;
use docpress_core::contract::TextGenerator;
use docpress_core::error::GenerationError;
use tempfile::TempDir;
use zip::write::FileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// `<w:p>` holding `text` in a single run.
pub fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

/// `<w:tbl>` with one `<w:tr>` per row.
pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in *row {
            xml.push_str("<w:tc>");
            xml.push_str(&paragraph(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

/// Writes a minimal but valid `.docx` whose body is `body_xml`.
pub fn write_docx(path: &Path, body_xml: &str) {
    let file = File::create(path).expect("create docx");
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}<w:sectPr/></w:body></w:document>"#
    );
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// A workspace with drafts/template/final/site folders and a config pointing
/// at them. Generation times out after one second.
pub fn workspace() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = PipelineConfig::rooted_at(dir.path());
    config.generation.timeout_secs = 1;
    fs::create_dir_all(&config.drafts_folder).unwrap();
    fs::create_dir_all(&config.template_folder).unwrap();
    fs::write(config.template_folder.join("style.md"), "# Example\n\nShort, punchy paragraphs.").unwrap();
    (dir, config)
}

/// Writes `draft.docx` in the drafts folder with one paragraph of `text`.
pub fn add_draft(config: &PipelineConfig, name: &str, text: &str) -> PathBuf {
    let path = config.drafts_folder.join(name);
    write_docx(&path, &paragraph(text));
    path
}

/// Frontmatter plus body, the shape the generator is asked for.
pub fn post(title: &str, date: &str, body: &str) -> String {
    format!(
        "+++\ntitle = \"{title}\"\ndate = \"{date}\"\nauthor = \"Tester\"\ntags = [\"test\"]\n+++\n\n{body}\n"
    )
}

/// Generator that answers through `respond`, and never answers prompts
/// containing `stall_on`.
pub struct ScriptedGenerator<F> {
    pub respond: F,
    pub stall_on: Option<&'static str>,
}

impl<F> ScriptedGenerator<F>
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            stall_on: None,
        }
    }

    pub fn stalling_on(mut self, marker: &'static str) -> Self {
        self.stall_on = Some(marker);
        self
    }
}

#[async_trait]
impl<F> TextGenerator for ScriptedGenerator<F>
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Some(marker) = self.stall_on {
            if prompt.contains(marker) {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        }
        (self.respond)(prompt)
    }
}
