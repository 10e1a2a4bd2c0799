//! Core data models used throughout codetalk.
//!
//! These types are the plain records that flow between the collector,
//! chunker, vector index, and answer composer. None of them hold handles
//! to other components.

use serde::{Deserialize, Serialize};

/// A file read from a repository checkout, before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path with `/` separators (e.g. `src/main.rs`).
    pub path: String,
    pub content: String,
}

/// Citation metadata attached to every chunk and stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub chunk_index: usize,
}

/// A bounded slice of one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub file_path: String,
    /// Zero-based position of this chunk within its file.
    pub chunk_index: usize,
}

impl Chunk {
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            file_path: self.file_path.clone(),
            chunk_index: self.chunk_index,
        }
    }
}

/// A chunk together with its embedding, as persisted by a [`VectorStore`](crate::store::VectorStore).
#[derive(Debug, Clone)]
pub struct IndexedVector {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// A ranked passage returned from a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity between the query and the stored vector.
    pub score: f32,
}

/// Speaker of a conversation turn.
///
/// Chat frontends commonly tag model replies as `"ai"` or `"bot"`; both are
/// accepted on input and serialize back as `"assistant"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "ai", alias = "bot")]
    Assistant,
}

/// One prior message supplied by the caller alongside a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Outcome of pushing a set of chunks through the embed-and-store loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Number of chunks handed to the index.
    pub attempted: usize,
    /// Number of chunks whose vectors were actually written.
    pub stored: usize,
    /// Batches dropped because embedding or storage failed.
    pub failed_batches: usize,
}

/// Result of ingesting a whole repository or directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files_processed: usize,
    pub chunks_attempted: usize,
    pub chunks_stored: usize,
}

/// A grounded answer with one citation per retrieved chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ChunkMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(
            serde_json::to_string(&ConversationTurn::user("q")).unwrap(),
            r#"{"role":"user","content":"q"}"#
        );
    }

    #[test]
    fn test_assistant_role_aliases() {
        for tag in ["assistant", "ai", "bot"] {
            let json = format!(r#"{{"role":"{}","content":"x"}}"#, tag);
            let turn: ConversationTurn = serde_json::from_str(&json).unwrap();
            assert_eq!(turn.role, Role::Assistant, "{}", tag);
        }
        let out = serde_json::to_string(&ConversationTurn::assistant("x")).unwrap();
        assert!(out.contains(r#""role":"assistant""#));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed: Result<ConversationTurn, _> =
            serde_json::from_str(r#"{"role":"system","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_chunk_metadata() {
        let chunk = Chunk {
            content: "fn main() {}".to_string(),
            file_path: "src/main.rs".to_string(),
            chunk_index: 3,
        };
        assert_eq!(
            chunk.metadata(),
            ChunkMetadata {
                file_path: "src/main.rs".to_string(),
                chunk_index: 3
            }
        );
    }
}
