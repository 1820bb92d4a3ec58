//! Shared file-type vocabulary
//!
//! The file type is derived from the path extension at observation time and
//! persisted on the file row; extractors report it back from the same mapping.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Broad classification of an indexed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Text,
    Markdown,
    Code,
    Pdf,
    Unknown,
}

impl FileType {
    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Self {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Unknown;
        };
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" => Self::Text,
            "md" | "markdown" => Self::Markdown,
            "pdf" => Self::Pdf,
            "rs" | "py" | "js" | "ts" | "go" | "c" | "h" | "cpp" | "hpp" | "java" | "rb"
            | "sh" | "toml" | "yaml" | "yml" | "json" => Self::Code,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::Markdown => "Markdown",
            Self::Code => "Code",
            Self::Pdf => "PDF",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Text" => Ok(Self::Text),
            "Markdown" => Ok(Self::Markdown),
            "Code" => Ok(Self::Code),
            "PDF" => Ok(Self::Pdf),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid file type: {s}")),
        }
    }
}
