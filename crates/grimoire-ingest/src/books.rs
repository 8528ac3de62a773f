//! Plain-text rulebook ingestion: heading-aware sectioning, chunking, and
//! provenance headers.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use grimoire_core::chunker::Chunker;
use grimoire_core::config::ChunkingConfig;
use grimoire_core::sections::{SectionDetector, UppercaseHeadingDetector};
use grimoire_core::types::{Fragment, Meta};

use crate::records::slug;

pub struct BookChunker {
    chunker: Chunker,
    detector: Box<dyn SectionDetector>,
}

impl BookChunker {
    pub fn new(cfg: &ChunkingConfig) -> Self {
        Self::with_detector(cfg, Box::new(UppercaseHeadingDetector::default()))
    }

    pub fn with_detector(cfg: &ChunkingConfig, detector: Box<dyn SectionDetector>) -> Self {
        Self { chunker: Chunker::new(cfg.clone()), detector }
    }

    /// Chunk one book. Every chunk gets a provenance header (book title,
    /// plus the section label where one was detected) prefixed onto its
    /// content so both indexes capture where a rule lives; the un-prefixed
    /// text is kept in metadata for display.
    pub fn chunk_book(&self, title: &str, text: &str) -> Vec<Fragment> {
        let book_slug = slug(title);
        let mut fragments = Vec::new();
        let mut counter = 0usize;
        for section in self.detector.sections(text) {
            let header = if section.label.is_empty() {
                title.to_string()
            } else {
                format!("{title} - {}", section.label)
            };
            for chunk in self.chunker.split(&text[section.start..section.end]) {
                let mut metadata = Meta::new();
                metadata.insert("source".to_string(), title.to_string());
                if !section.label.is_empty() {
                    metadata.insert("section".to_string(), section.label.clone());
                }
                metadata.insert("text".to_string(), chunk.clone());
                fragments.push(Fragment {
                    id: format!("book:{book_slug}:{counter}"),
                    content: format!("{header}\n\n{chunk}"),
                    metadata,
                    ordinal: 0,
                });
                counter += 1;
            }
        }
        tracing::debug!(book = title, fragments = fragments.len(), "book chunked");
        fragments
    }

    /// Walk a directory of .txt books in sorted order and chunk each one.
    /// The book title is derived from the file stem.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::new();
        for path in list_txt_files(dir) {
            let content = read_file_content(&path)?;
            let title = book_title(&path);
            fragments.extend(self.chunk_book(&title, &content));
        }
        Ok(fragments)
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

fn book_title(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    grimoire_core::sections::title_case(&stem.replace(['_', '-'], " "))
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            txt_files.push(path.to_path_buf());
        }
    }
    txt_files.sort();
    txt_files
}
