//! Conversion of documentation files to HTML

use crate::markdown::CommonMarkRenderer;
use repocat_core::{
    conversion_error, DocumentCandidate, DocumentConfig, DocumentType, ErrorContext,
    ExternalCommand, MarkdownRenderer, RepocatError, RepocatResult,
};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Converts plain text, Markdown and POD documents to HTML
#[derive(Clone)]
pub struct ContentConverter {
    renderer: Arc<dyn MarkdownRenderer>,
    pod_converter: ExternalCommand,
    max_document_bytes: Option<u64>,
}

impl ContentConverter {
    /// Create a converter using the pulldown-cmark renderer
    pub fn new(config: &DocumentConfig) -> Self {
        Self::with_renderer(config, Arc::new(CommonMarkRenderer::new()))
    }

    /// Create a converter with a custom Markdown renderer
    pub fn with_renderer(config: &DocumentConfig, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        Self {
            renderer,
            pod_converter: config.pod_converter.clone(),
            max_document_bytes: config.max_document_bytes,
        }
    }

    /// Convert a located document to HTML
    pub async fn convert(&self, candidate: &DocumentCandidate) -> RepocatResult<String> {
        let raw = self.read_document(&candidate.path).await?;

        debug!(
            path = %candidate.path.display(),
            doc_type = %candidate.doc_type,
            bytes = raw.len(),
            "🔄 Converting document"
        );

        match candidate.doc_type {
            DocumentType::PlainText => Ok(text_to_html(&String::from_utf8_lossy(&raw))),
            DocumentType::Markdown => Ok(self.markdown_to_html(&String::from_utf8_lossy(&raw))),
            DocumentType::PlainOldDocumentation => self.pod_to_html(&raw).await,
        }
    }

    /// Convert an arbitrary file, inferring its type from the extension when not given
    pub async fn convert_path<P: AsRef<Path>>(
        &self,
        path: P,
        doc_type: Option<DocumentType>,
    ) -> RepocatResult<String> {
        let path = path.as_ref();
        let doc_type = match doc_type {
            Some(doc_type) => doc_type,
            None => DocumentType::from_path(path)?,
        };

        self.convert(&DocumentCandidate {
            path: path.to_path_buf(),
            doc_type,
        })
        .await
    }

    /// Render Markdown with the configured renderer
    pub fn markdown_to_html(&self, markdown: &str) -> String {
        self.renderer.render(markdown)
    }

    /// Convert Plain Old Documentation to HTML through the external POD converter
    pub async fn pod_to_html(&self, pod: &[u8]) -> RepocatResult<String> {
        let markdown = self.pod_to_markdown(pod).await?;
        Ok(self.markdown_to_html(&markdown))
    }

    async fn pod_to_markdown(&self, pod: &[u8]) -> RepocatResult<String> {
        let program = &self.pod_converter.program;

        let mut child = Command::new(program)
            .args(&self.pod_converter.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RepocatError::Conversion {
                message: format!("Failed to execute {}: {}", program, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("content_converter")
                    .with_operation("pod_to_markdown")
                    .with_suggestion("Ensure the POD converter is installed and accessible"),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            conversion_error!(format!("Failed to open stdin of {}", program), "content_converter")
        })?;

        // Feed stdin while draining stdout so large documents cannot fill both pipes
        let write_input = async move {
            let result = stdin.write_all(pod).await;
            drop(stdin);
            result
        };
        let (write_result, output) = tokio::join!(write_input, child.wait_with_output());

        let output = output.map_err(|e| RepocatError::Conversion {
            message: format!("Failed to wait for {}: {}", program, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("content_converter").with_operation("pod_to_markdown"),
        })?;

        if let Err(e) = write_result {
            warn!(program = %program, error = %e, "⚠️ Failed to write document to POD converter");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepocatError::Conversion {
                message: format!("{} failed with {}: {}", program, output.status, stderr.trim()),
                source: None,
                context: ErrorContext::new("content_converter")
                    .with_operation("pod_to_markdown")
                    .with_metadata("status", &output.status.to_string()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn read_document(&self, path: &Path) -> RepocatResult<Vec<u8>> {
        if let Some(limit) = self.max_document_bytes {
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|e| read_error(path, e))?;

            if metadata.len() > limit {
                return Err(RepocatError::Conversion {
                    message: format!(
                        "{} is {} bytes, above the limit of {} bytes",
                        path.display(),
                        metadata.len(),
                        limit
                    ),
                    source: None,
                    context: ErrorContext::new("content_converter")
                        .with_operation("read_document")
                        .with_suggestion("Raise documents.max_document_bytes"),
                });
            }
        }

        tokio::fs::read(path).await.map_err(|e| read_error(path, e))
    }
}

fn read_error(path: &Path, e: std::io::Error) -> RepocatError {
    conversion_error!(
        format!("Failed to read {}: {}", path.display(), e),
        "content_converter",
        e
    )
}

/// Escape text and wrap it in a preformatted block
pub fn text_to_html(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
