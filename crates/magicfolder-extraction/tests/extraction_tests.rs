//! Extractor behavior through the public API: single-read extract+hash,
//! hash stability across line endings, dense chunk indices

use std::io::Write;
use std::path::Path;

use magicfolder_common::FileType;
use magicfolder_extraction::{ContentExtractor, ExtractorRegistry, MarkdownExtractor};

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create");
    file.write_all(contents).expect("write");
    path
}

#[test]
fn markdown_extraction_reports_hash_chunks_and_type() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "notes.md", b"# Title\n\nbody\n");

    let extracted = MarkdownExtractor
        .extract_with_hash(&path)
        .expect("extract");
    assert_eq!(extracted.file_type, FileType::Markdown);
    assert_eq!(extracted.content_hash.len(), 64);
    assert_eq!(extracted.chunks.len(), 1);
    assert_eq!(extracted.chunks[0].chunk_index, 0);
    assert!(extracted.chunks[0].content.contains("body"));
}

#[test]
fn hash_covers_decoded_text_so_line_endings_do_not_matter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let unix = write_file(&dir, "unix.md", b"# Title\n\nbody\n");
    let windows = write_file(&dir, "windows.md", b"# Title\r\n\r\nbody\r\n");

    let a = MarkdownExtractor.extract_with_hash(&unix).expect("unix");
    let b = MarkdownExtractor.extract_with_hash(&windows).expect("windows");
    assert_eq!(a.content_hash, b.content_hash);
}

#[test]
fn same_content_hashes_identically_different_content_does_not() {
    let dir = tempfile::tempdir().expect("tempdir");
    let one = write_file(&dir, "one.md", b"# Same\n\ncontent\n");
    let two = write_file(&dir, "two.md", b"# Same\n\ncontent\n");
    let three = write_file(&dir, "three.md", b"# Different\n\ncontent\n");

    let registry = ExtractorRegistry::new();
    let hash = |p: &Path| {
        registry
            .get_extractor_for(p)
            .expect("extractor")
            .extract_with_hash(p)
            .expect("extract")
            .content_hash
    };
    assert_eq!(hash(&one), hash(&two));
    assert_ne!(hash(&one), hash(&three));
}

#[test]
fn empty_file_yields_no_chunks_and_an_empty_hash() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "empty.txt", b"");

    let registry = ExtractorRegistry::new();
    let extracted = registry
        .get_extractor_for(&path)
        .expect("extractor")
        .extract_with_hash(&path)
        .expect("extract");
    assert!(extracted.chunks.is_empty());
    assert!(extracted.content_hash.is_empty());
    assert_eq!(extracted.file_type, FileType::Text);
}

#[test]
fn long_documents_produce_dense_indices() {
    let dir = tempfile::tempdir().expect("tempdir");
    let section = format!("## Section\n{}\n", "paragraph text ".repeat(60));
    let path = write_file(&dir, "long.md", section.repeat(20).as_bytes());

    let extracted = MarkdownExtractor
        .extract_with_hash(&path)
        .expect("extract");
    assert!(extracted.chunks.len() > 1);
    for (expected, chunk) in extracted.chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, expected);
        assert!(!chunk.content.is_empty());
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = MarkdownExtractor
        .extract_with_hash(Path::new("/nonexistent/notes.md"))
        .unwrap_err();
    assert!(matches!(
        err,
        magicfolder_extraction::ExtractorError::Io { .. }
    ));
}
