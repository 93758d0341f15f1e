//! Documentation file lookup inside a checkout

use repocat_core::{DocumentCandidate, DocumentType};
use std::path::Path;
use tracing::debug;

/// Extensions appended to each basename.
/// Order matters here! The highest priority file types come first.
pub const DOCUMENT_EXTENSIONS: [(&str, DocumentType); 5] = [
    ("", DocumentType::PlainText),
    (".txt", DocumentType::PlainText),
    (".md", DocumentType::Markdown),
    (".markdown", DocumentType::Markdown),
    (".pod", DocumentType::PlainOldDocumentation),
];

/// Find the highest priority documentation file for the given basenames.
///
/// Basenames are tried in order, and for each basename every extension of
/// [`DOCUMENT_EXTENSIONS`]; the first regular file wins.
pub fn locate<P, S>(root: P, basenames: &[S]) -> Option<DocumentCandidate>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let root = root.as_ref();

    for basename in basenames {
        for (extension, doc_type) in DOCUMENT_EXTENSIONS {
            let path = root.join(format!("{}{}", basename.as_ref(), extension));
            if path.is_file() {
                debug!(
                    path = %path.display(),
                    doc_type = %doc_type,
                    "📄 Found document"
                );
                return Some(DocumentCandidate { path, doc_type });
            }
        }
    }

    None
}
