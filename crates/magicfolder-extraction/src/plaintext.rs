//! Plain-text extractor
//!
//! Splits on one-or-more blank lines (paragraph boundaries); the split lands
//! after the blank run so paragraphs keep their trailing separators.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use magicfolder_common::{FileType, hash_content};

use crate::chunking::{Chunk, assemble_chunks};
use crate::error::ExtractorResult;
use crate::{ContentExtractor, ExtractedContent, read_text_content};

#[allow(clippy::expect_used)]
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// Extractor for `.txt` files
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl ContentExtractor for PlainTextExtractor {
    fn can_handle(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("txt")
    }

    fn extract_with_hash(&self, path: &Path) -> ExtractorResult<ExtractedContent> {
        let content = read_text_content(path)?;
        if content.is_empty() {
            return Ok(ExtractedContent {
                content_hash: String::new(),
                chunks: Vec::new(),
                file_type: FileType::Text,
            });
        }
        Ok(ExtractedContent {
            content_hash: hash_content(&content),
            chunks: chunk_plaintext(&content),
            file_type: FileType::Text,
        })
    }
}

fn chunk_plaintext(content: &str) -> Vec<Chunk> {
    let mut split_points = vec![0];
    for separator in PARAGRAPH_BREAK.find_iter(content) {
        split_points.push(separator.end());
    }
    split_points.push(content.len());

    let sections = split_points
        .windows(2)
        .filter(|pair| pair[1] > pair[0])
        .map(|pair| content[pair[0]..pair[1]].to_string())
        .collect::<Vec<_>>();
    assemble_chunks(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let para = "sentence after sentence ".repeat(10);
        let content = format!("{para}\n\n{para}\n\n{para}");
        let chunks = chunk_plaintext(&content);
        assert!(!chunks.is_empty());
        assert_eq!(
            chunks.iter().map(|c| c.content.len()).sum::<usize>(),
            content.len(),
            "no text lost at paragraph boundaries"
        );
    }

    #[test]
    fn blank_lines_with_whitespace_also_separate() {
        let para = "text ".repeat(50);
        let content = format!("{para}\n   \n{para}");
        let chunks = chunk_plaintext(&content);
        assert_eq!(
            chunks.iter().map(|c| c.content.len()).sum::<usize>(),
            content.len()
        );
    }

    #[test]
    fn single_paragraph_yields_one_chunk() {
        let content = "just one short paragraph";
        let chunks = chunk_plaintext(content);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, content);
    }
}
