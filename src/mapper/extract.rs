//! Text extraction from attachments.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::mapper::entity::Attachment;

/// Turns attachment content into indexable text.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor understands a MIME type.
    fn handles(&self, mime: &str) -> bool;

    /// Extract text; `None` leaves the field out of the document.
    fn extract(&self, attachment: &Attachment) -> Result<Option<String>>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Guesses the MIME type of an attachment.
pub trait MimeGuesser: Send + Sync {
    fn guess(&self, attachment: &Attachment) -> Option<String>;
}

/// Guesses MIME types from the file name extension.
#[derive(Clone, Debug)]
pub struct ExtensionGuesser {
    extensions: HashMap<String, String>,
}

impl ExtensionGuesser {
    /// A guesser knowing common document extensions.
    pub fn new() -> Self {
        let extensions = [
            ("pdf", "application/pdf"),
            ("txt", "text/plain"),
            ("text", "text/plain"),
            ("log", "text/plain"),
            ("md", "text/markdown"),
            ("csv", "text/csv"),
            ("htm", "text/html"),
            ("html", "text/html"),
            ("xml", "application/xml"),
            ("json", "application/json"),
        ]
        .into_iter()
        .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
        .collect();

        ExtensionGuesser { extensions }
    }

    /// Map an extension to a MIME type.
    pub fn with_extension<E: Into<String>, M: Into<String>>(mut self, extension: E, mime: M) -> Self {
        self.extensions
            .insert(extension.into().to_ascii_lowercase(), mime.into());
        self
    }
}

impl Default for ExtensionGuesser {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeGuesser for ExtensionGuesser {
    fn guess(&self, attachment: &Attachment) -> Option<String> {
        let (_, extension) = attachment.filename.rsplit_once('.')?;
        self.extensions
            .get(&extension.to_ascii_lowercase())
            .cloned()
    }
}

/// Extractor for `text/*` content, decoded as UTF-8.
#[derive(Clone, Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn handles(&self, mime: &str) -> bool {
        mime.starts_with("text/")
    }

    fn extract(&self, attachment: &Attachment) -> Result<Option<String>> {
        Ok(Some(String::from_utf8_lossy(&attachment.data).into_owned()))
    }

    fn name(&self) -> &'static str {
        "plain_text"
    }
}

/// Dispatches to the first registered extractor handling the guessed type.
pub struct ExtractorRegistry {
    guesser: Box<dyn MimeGuesser>,
    extractors: Vec<Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// A registry with the extension guesser and no extractors.
    pub fn empty() -> Self {
        ExtractorRegistry {
            guesser: Box::new(ExtensionGuesser::new()),
            extractors: Vec::new(),
        }
    }

    /// A registry with the extension guesser and the plain text extractor.
    pub fn new() -> Self {
        Self::empty().with_extractor(Arc::new(PlainTextExtractor))
    }

    /// Replace the MIME guesser.
    pub fn with_guesser(mut self, guesser: Box<dyn MimeGuesser>) -> Self {
        self.guesser = guesser;
        self
    }

    /// Register an extractor after those already present.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether no extractor is registered.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.extractors.iter().map(|e| e.name()).collect();
        f.debug_struct("ExtractorRegistry")
            .field("extractors", &names)
            .finish()
    }
}

impl TextExtractor for ExtractorRegistry {
    fn handles(&self, mime: &str) -> bool {
        self.extractors.iter().any(|e| e.handles(mime))
    }

    fn extract(&self, attachment: &Attachment) -> Result<Option<String>> {
        let mime = self.guesser.guess(attachment);
        let extractor = mime
            .as_deref()
            .and_then(|mime| self.extractors.iter().find(|e| e.handles(mime)));

        match extractor {
            Some(extractor) => {
                tracing::debug!(
                    target: "pavise::mapper",
                    extractor = extractor.name(),
                    file = %attachment.filename,
                    mime = ?mime,
                    "Extracting attachment text"
                );
                extractor.extract(attachment)
            }
            None => {
                tracing::warn!(
                    target: "pavise::mapper",
                    file = %attachment.filename,
                    mime = ?mime,
                    "No text extractor handles attachment"
                );
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "registry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_guesser() {
        let guesser = ExtensionGuesser::new().with_extension("RST", "text/x-rst");
        let guess = |name: &str| guesser.guess(&Attachment::new(name, Vec::new()));

        assert_eq!(guess("report.PDF").as_deref(), Some("application/pdf"));
        assert_eq!(guess("notes.rst").as_deref(), Some("text/x-rst"));
        assert_eq!(guess("archive.tar.gz"), None);
        assert_eq!(guess("README"), None);
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ExtractorRegistry::new();
        let text = Attachment::new("notes.txt", b"hello attachment".to_vec());
        assert_eq!(
            registry.extract(&text).unwrap().as_deref(),
            Some("hello attachment")
        );

        let pdf = Attachment::new("paper.pdf", vec![0x25, 0x50]);
        assert_eq!(registry.extract(&pdf).unwrap(), None);
        assert!(registry.handles("text/csv"));
        assert!(!registry.handles("application/pdf"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ExtractorRegistry::empty();
        assert!(registry.is_empty());
        let text = Attachment::new("notes.txt", b"x".to_vec());
        assert_eq!(registry.extract(&text).unwrap(), None);
    }
}
