//! Extractor dispatch by path extension

use std::path::Path;

use crate::error::{ExtractorError, ExtractorResult};
use crate::markdown::MarkdownExtractor;
use crate::plaintext::PlainTextExtractor;
use crate::ContentExtractor;

/// Registry of available extractors, asked in registration order
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn ContentExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorRegistry {
    /// Registry with the built-in extractors
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(MarkdownExtractor),
                Box::new(PlainTextExtractor),
            ],
        }
    }

    /// Find the extractor for a path
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Unsupported`] when no extractor claims the
    /// path; such files are out of scope for indexing.
    pub fn get_extractor_for(&self, path: &Path) -> ExtractorResult<&dyn ContentExtractor> {
        self.extractors
            .iter()
            .map(AsRef::as_ref)
            .find(|extractor| extractor.can_handle(path))
            .ok_or_else(|| ExtractorError::Unsupported(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_extension() {
        let registry = ExtractorRegistry::new();
        assert!(registry.get_extractor_for(Path::new("notes.md")).is_ok());
        assert!(registry.get_extractor_for(Path::new("notes.txt")).is_ok());
    }

    #[test]
    fn unknown_extensions_are_out_of_scope() {
        let registry = ExtractorRegistry::new();
        let err = registry
            .get_extractor_for(Path::new("binary.exe"))
            .unwrap_err();
        assert!(matches!(err, ExtractorError::Unsupported(_)));
    }
}
