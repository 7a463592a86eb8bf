//! Document loaders keyed by file extension
//!
//! A loader turns the raw bytes of one file into text. The [`LoaderRegistry`] maps
//! lower-cased extensions to loaders and ships with plain text, Markdown and PDF
//! support; callers can register more.

use crate::error::LoadError;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// Text extracted from a file. A loader may return several per file; the ingestor
/// joins them with blank lines before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub text: String,
}

impl LoadedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Converts file contents into text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Lower-case extensions (without the dot) this loader handles
    fn extensions(&self) -> &[&'static str];

    /// Extract text from file bytes already read by the caller
    async fn parse(&self, bytes: Vec<u8>) -> Result<Vec<LoadedDocument>, LoadError>;

    /// Read `path` and extract its text
    async fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>, LoadError> {
        let bytes = tokio::fs::read(path).await?;
        self.parse(bytes).await
    }
}

/// Plain UTF-8 text.
#[derive(Debug, Default)]
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    async fn parse(&self, bytes: Vec<u8>) -> Result<Vec<LoadedDocument>, LoadError> {
        Ok(vec![LoadedDocument::new(String::from_utf8(bytes)?)])
    }
}

static MARKDOWN_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?m)^#{1,6}[ \t]+", ""),        // heading markers
        (r"(?m)^[ \t]*>[ \t]?", ""),       // blockquotes
        (r"!\[([^\]]*)\]\([^)]*\)", "$1"), // images
        (r"\[([^\]]+)\]\([^)]*\)", "$1"),  // links
        (r"\*\*([^*\n]+)\*\*", "$1"),      // bold
        (r"__([^_\n]+)__", "$1"),
        (r"\*([^*\n]+)\*", "$1"),          // italics
        (r"`([^`\n]+)`", "$1"),            // inline code
        (r"\n{3,}", "\n\n"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("markdown rule is a valid regex"),
            replacement,
        )
    })
    .collect()
});

/// Reduce Markdown to readable text by dropping markup and keeping content.
///
/// Code fences are left in place so the Markdown chunker can cut at block boundaries.
pub fn strip_markdown(markdown: &str) -> String {
    MARKDOWN_RULES
        .iter()
        .fold(markdown.to_string(), |text, (rule, replacement)| {
            rule.replace_all(&text, *replacement).into_owned()
        })
        .trim()
        .to_string()
}

/// Markdown with markup stripped.
#[derive(Debug, Default)]
pub struct MarkdownLoader;

#[async_trait]
impl DocumentLoader for MarkdownLoader {
    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    async fn parse(&self, bytes: Vec<u8>) -> Result<Vec<LoadedDocument>, LoadError> {
        let markdown = String::from_utf8(bytes)?;
        Ok(vec![LoadedDocument::new(strip_markdown(&markdown))])
    }
}

/// PDF text extraction.
#[derive(Debug, Default)]
pub struct PdfLoader;

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    async fn parse(&self, bytes: Vec<u8>) -> Result<Vec<LoadedDocument>, LoadError> {
        // Extraction is CPU-bound and can be slow on large files
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await?
            .map_err(|e| LoadError::Pdf {
                message: e.to_string(),
            })?;

        Ok(vec![LoadedDocument::new(text)])
    }
}

/// Maps file extensions to loaders.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("extensions", &self.supported_extensions())
            .finish()
    }
}

impl LoaderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `.txt`, `.md`/`.markdown` and `.pdf` loaders
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextLoader));
        registry.register(Arc::new(MarkdownLoader));
        registry.register(Arc::new(PdfLoader));
        registry
    }

    /// Register a loader for all of its extensions, replacing earlier registrations
    pub fn register(&mut self, loader: Arc<dyn DocumentLoader>) {
        for ext in loader.extensions() {
            self.loaders.insert(ext.to_ascii_lowercase(), Arc::clone(&loader));
        }
    }

    /// Loader for a lower-case extension without the dot
    pub fn get(&self, extension: &str) -> Option<Arc<dyn DocumentLoader>> {
        self.loaders.get(extension).cloned()
    }

    /// Loader for the extension of `path`, compared case-insensitively
    pub fn loader_for(&self, path: &Path) -> Option<Arc<dyn DocumentLoader>> {
        extension_of(path).and_then(|ext| self.get(&ext))
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.loader_for(path).is_some()
    }

    /// Sorted list of supported extensions
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.loaders.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

/// Lower-cased extension of `path`, without the dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
