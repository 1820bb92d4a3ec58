//! Markdown extractor
//!
//! Splits at heading lines of any level, then merges sections under the
//! shared sizing policy so small sections ride along with their neighbors.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use magicfolder_common::{FileType, hash_content};

use crate::chunking::{Chunk, assemble_chunks};
use crate::error::ExtractorResult;
use crate::{ContentExtractor, ExtractedContent, read_text_content};

#[allow(clippy::expect_used)]
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s.*").expect("heading pattern is valid"));

/// Extractor for `.md` files
#[derive(Debug, Default)]
pub struct MarkdownExtractor;

impl ContentExtractor for MarkdownExtractor {
    fn can_handle(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("md")
    }

    fn extract_with_hash(&self, path: &Path) -> ExtractorResult<ExtractedContent> {
        let content = read_text_content(path)?;
        if content.is_empty() {
            return Ok(ExtractedContent {
                content_hash: String::new(),
                chunks: Vec::new(),
                file_type: FileType::Markdown,
            });
        }
        Ok(ExtractedContent {
            content_hash: hash_content(&content),
            chunks: chunk_markdown(&content),
            file_type: FileType::Markdown,
        })
    }
}

/// Split at headings, sections running up to the next heading
fn chunk_markdown(content: &str) -> Vec<Chunk> {
    let mut split_points = vec![0];
    for heading in HEADING.find_iter(content) {
        split_points.push(heading.start());
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
    use crate::chunking::MIN_CHUNK_SIZE;

    #[test]
    fn splits_at_headings_of_any_level() {
        let filler = "lorem ipsum dolor sit amet ".repeat(20);
        let content = format!("# One\n{filler}\n## Two\n{filler}\n### Three\n{filler}\n");
        let chunks = chunk_markdown(&content);
        assert!(chunks.len() >= 3);
        assert!(chunks[0].content.starts_with("# One"));
        assert!(chunks[1].content.starts_with("## Two"));
    }

    #[test]
    fn preamble_before_the_first_heading_is_kept() {
        let body = "intro text ".repeat(30);
        let content = format!("{body}\n# Heading\n{body}");
        let chunks = chunk_markdown(&content);
        assert!(chunks[0].content.starts_with("intro text"));
    }

    #[test]
    fn small_sections_merge_into_one_chunk() {
        let content = "# A\na\n# B\nb\n# C\nc\n";
        assert!(content.len() < MIN_CHUNK_SIZE);
        let chunks = chunk_markdown(content);
        assert_eq!(chunks.len(), 1, "short sections coalesce");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn last_short_section_is_not_dropped() {
        let filler = "word ".repeat(100);
        let content = format!("# Big\n{filler}\n# Tail\ntiny\n");
        let chunks = chunk_markdown(&content);
        let last = chunks.last().expect("chunks");
        assert!(last.content.contains("tiny"));
    }
}
