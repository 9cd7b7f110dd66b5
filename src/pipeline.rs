//! Pipeline – ties together validation, layout, rendering and storage into
//! a single request → response call.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::columns::ColumnWarning;
use crate::document::{build_layout, Layout};
use crate::error::{Error, Result};
use crate::fonts::FontManager;
use crate::job::{JobHandle, JobState};
use crate::render::{render_with_timeouts, PdfRenderer, RenderTimeouts, Renderer};
use crate::settings::ManuscriptSettings;
use crate::storage::{check_filename, OutputStore};

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory generated PDFs are written to (default: `generated-pdfs`).
    pub output_dir: PathBuf,
    /// Launch and conversion bounds (default: 15 s / 10 s).
    pub timeouts: RenderTimeouts,
    /// TTF/OTF file used by the bundled renderer for every family.
    pub font_path: Option<PathBuf>,
    /// Prefix of the download reference returned to callers.
    pub download_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated-pdfs"),
            timeouts: RenderTimeouts::default(),
            font_path: None,
            download_prefix: "/api/download/".to_string(),
        }
    }
}

/// Request body: settings plus an optional output name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub settings: ManuscriptSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
}

impl GenerationRequest {
    pub fn new(settings: ManuscriptSettings) -> Self {
        Self {
            settings,
            output_filename: None,
        }
    }
}

/// Response body, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ColumnWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// A successfully stored manuscript.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub filename: String,
    pub download_url: String,
    pub file_size: u64,
    pub estimated_pages: u32,
    pub warnings: Vec<ColumnWarning>,
}

impl From<Result<GenerationOutcome>> for GenerationResponse {
    fn from(result: Result<GenerationOutcome>) -> Self {
        match result {
            Ok(o) => Self {
                success: true,
                filename: Some(o.filename),
                download_url: Some(o.download_url),
                file_size: Some(o.file_size),
                page_count: Some(o.estimated_pages),
                warnings: o.warnings,
                error: None,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Generation pipeline over a renderer backend.
pub struct Pipeline<R: Renderer> {
    renderer: Arc<R>,
    store: OutputStore,
    config: PipelineConfig,
}

impl Pipeline<PdfRenderer> {
    /// Pipeline using the bundled printpdf renderer.
    pub fn with_pdf_renderer(config: PipelineConfig) -> Result<Self> {
        let mut fonts = FontManager::new();
        if let Some(path) = &config.font_path {
            fonts.load_fallback_file(path)?;
        }
        Ok(Self::new(PdfRenderer::new(fonts), config))
    }
}

impl<R: Renderer> Pipeline<R> {
    pub fn new(renderer: R, config: PipelineConfig) -> Self {
        Self {
            renderer: Arc::new(renderer),
            store: OutputStore::new(config.output_dir.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Layout only; no renderer, no files.
    pub fn layout(&self, settings: &ManuscriptSettings) -> Result<Layout> {
        build_layout(settings)
    }

    /// Validate, lay out, render and store one manuscript.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        self.generate_tracked(request, None)
    }

    fn generate_tracked(
        &self,
        request: &GenerationRequest,
        tracker: Option<&crate::job::JobTracker>,
    ) -> Result<GenerationOutcome> {
        let layout = build_layout(&request.settings)?;
        // An empty name means "not given".
        let filename = request.output_filename.as_deref().filter(|n| !n.is_empty());
        if let Some(name) = filename {
            check_filename(name)?;
        }
        log::info!(
            "generating {}: {} paragraphs, ~{} pages",
            filename.unwrap_or("<generated name>"),
            layout.document.paragraphs.len(),
            layout.estimated_pages
        );

        if let Some(t) = tracker {
            t.set(JobState::Rendering);
        }
        let bytes = render_with_timeouts(
            Arc::clone(&self.renderer),
            layout.document,
            layout.directive,
            self.config.timeouts,
        )?;

        let stored = match filename {
            Some(name) => self.store.write(name, &bytes)?,
            None => self.store.write_generated(&bytes)?,
        };
        Ok(GenerationOutcome {
            download_url: format!("{}{}", self.config.download_prefix, stored.filename),
            filename: stored.filename,
            file_size: stored.size,
            estimated_pages: layout.estimated_pages,
            warnings: layout.warnings,
        })
    }

    /// Run a request and fold any error into the response.
    pub fn handle(&self, request: &GenerationRequest) -> GenerationResponse {
        let result = self.generate(request);
        if let Err(e) = &result {
            log_failure(e);
        }
        result.into()
    }

    /// Parse a JSON request body and answer with a JSON response body.
    pub fn handle_json(&self, body: &str) -> String {
        let response = match serde_json::from_str::<GenerationRequest>(body) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                let err = Error::from(e);
                log_failure(&err);
                GenerationResponse::failure(err.to_string())
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"failed to encode response: {e}"}}"#)
        })
    }

    /// Bytes of a stored PDF, by bare file name.
    pub fn download(&self, filename: &str) -> Result<Vec<u8>> {
        self.store.open(filename)
    }
}

impl<R: Renderer> Pipeline<R> {
    /// Start a request in the background and return its job handle.
    pub fn submit(self: &Arc<Self>, request: GenerationRequest) -> JobHandle {
        let pipeline = Arc::clone(self);
        JobHandle::spawn(move |tracker| {
            let result = pipeline.generate_tracked(&request, Some(tracker));
            if let Err(e) = &result {
                log_failure(e);
            }
            result.into()
        })
    }
}

fn log_failure(err: &Error) {
    if err.is_client_error() {
        log::warn!("request rejected: {err}");
    } else {
        log::error!("generation failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(dir: &std::path::Path) -> Pipeline<PdfRenderer> {
        Pipeline::with_pdf_renderer(PipelineConfig {
            output_dir: dir.to_path_buf(),
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn pipeline_basic() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let mut request = GenerationRequest::new(ManuscriptSettings::with_content("Hello 12"));
        request.output_filename = Some("hello.pdf".into());
        let outcome = p.generate(&request).unwrap();
        assert_eq!(outcome.filename, "hello.pdf");
        assert_eq!(outcome.download_url, "/api/download/hello.pdf");
        assert_eq!(outcome.estimated_pages, 1);
        let bytes = p.download("hello.pdf").unwrap();
        assert_eq!(bytes.len() as u64, outcome.file_size);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn failures_become_responses() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let response = p.handle(&GenerationRequest::new(ManuscriptSettings::default()));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("manuscript content is empty"));

        let mut request = GenerationRequest::new(ManuscriptSettings::with_content("x"));
        request.output_filename = Some("../escape.pdf".into());
        let response = p.handle(&request);
        assert!(!response.success);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn json_request_response() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let body = r#"{"settings":{"content":"今日は5月3日です。","pageSize":"B6"},"outputFilename":"b6.pdf"}"#;
        let response: GenerationResponse = serde_json::from_str(&p.handle_json(body)).unwrap();
        assert!(response.success, "{response:?}");
        assert_eq!(response.filename.as_deref(), Some("b6.pdf"));
        assert_eq!(response.page_count, Some(1));

        let response: GenerationResponse =
            serde_json::from_str(&p.handle_json("{not json")).unwrap();
        assert!(!response.success);
    }

    #[test]
    fn empty_output_name_gets_a_generated_one() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let body = r#"{"settings":{"content":"本文"},"outputFilename":""}"#;
        let response: GenerationResponse = serde_json::from_str(&p.handle_json(body)).unwrap();
        assert!(response.success, "{response:?}");
        let name = response.filename.unwrap();
        assert!(name.starts_with("manuscript_") && name.ends_with(".pdf"), "{name}");
        assert!(dir.path().join(&name).is_file());
        // Downloads still refuse an empty name.
        assert!(matches!(p.download(""), Err(Error::UnsafeFilename(_))));
    }

    #[test]
    fn concurrent_submissions_keep_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = Arc::new(pipeline(dir.path()));
        let jobs: Vec<_> = (0..4)
            .map(|i| {
                let settings = ManuscriptSettings::with_content(format!("本文{i}"));
                p.submit(GenerationRequest::new(settings))
            })
            .collect();
        let mut names: Vec<String> = jobs
            .into_iter()
            .map(|j| j.wait().filename.unwrap())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn submit_returns_a_job_handle() {
        let dir = tempfile::tempdir().unwrap();
        let p = Arc::new(pipeline(dir.path()));
        let job = p.submit(GenerationRequest::new(ManuscriptSettings::with_content("本文")));
        let response = job.wait();
        assert!(response.success);
    }
}
