pub mod text;

// Re-export the chunking API for the ingestion pipeline
pub use text::{
    ChunkError, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextChunk, TextSplitter,
    delimiters_for_path, split,
};
