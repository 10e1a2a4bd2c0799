//! Language-aware recursive text chunker.
//!
//! Splits a [`SourceFile`] into overlapping [`Chunk`]s of at most
//! `chunk_size` characters. Each file is classified into a [`Language`],
//! and each language carries an ordered list of separators: structural
//! boundaries first (`"\nclass "`, `"\nfn "`, ...), then blank lines, line
//! breaks, spaces, and finally single characters.
//!
//! # Algorithm
//!
//! 1. Pick the first separator that occurs in the text.
//! 2. Cut the text before every occurrence, so the separator stays at the
//!    start of the piece that follows it.
//! 3. Merge consecutive pieces while they fit in `chunk_size`. When a chunk
//!    is emitted, trailing pieces totalling at most `chunk_overlap`
//!    characters are carried into the next chunk.
//! 4. A piece that alone reaches `chunk_size` is split again with the
//!    remaining separators.
//! 5. Chunks are trimmed; whitespace-only chunks are dropped.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text can't be
//! cut inside a code point. The output is fully deterministic.
//!
//! # Example
//!
//! ```rust
//! use codetalk::chunk::Chunker;
//! use codetalk::config::ChunkingConfig;
//! use codetalk::models::SourceFile;
//!
//! let chunker = Chunker::new(ChunkingConfig::default());
//! let file = SourceFile {
//!     path: "src/a.py".to_string(),
//!     content: "def hello():\n    return 1\n".to_string(),
//! };
//! let chunks = chunker.chunk_file(&file);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! assert_eq!(chunks[0].file_path, "src/a.py");
//! ```

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, SourceFile};

/// Splitting category of a file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Java,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Kotlin,
    Swift,
    Scala,
    Html,
    /// Documentation, config, and anything not listed above.
    Generic,
}

const GENERIC_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

const PYTHON_SEPARATORS: &[&str] = &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""];

const JAVASCRIPT_SEPARATORS: &[&str] = &[
    "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ", "\nwhile ",
    "\nswitch ", "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
];

const TYPESCRIPT_SEPARATORS: &[&str] = &[
    "\nenum ", "\ninterface ", "\nnamespace ", "\ntype ", "\nclass ", "\nfunction ", "\nconst ",
    "\nlet ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nswitch ", "\ncase ", "\ndefault ",
    "\n\n", "\n", " ", "",
];

const RUST_SEPARATORS: &[&str] = &[
    "\nfn ", "\npub fn ", "\nimpl ", "\nstruct ", "\npub struct ", "\nenum ", "\ntrait ",
    "\nconst ", "\nlet ", "\nif ", "\nwhile ", "\nfor ", "\nloop ", "\nmatch ", "\n\n", "\n", " ",
    "",
];

const GO_SEPARATORS: &[&str] = &[
    "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ", "\ncase ", "\n\n",
    "\n", " ", "",
];

const JAVA_SEPARATORS: &[&str] = &[
    "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ", "\nfor ",
    "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
];

const CPP_SEPARATORS: &[&str] = &[
    "\nclass ", "\nstruct ", "\nnamespace ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ",
    "\nif ", "\nfor ", "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
];

const CSHARP_SEPARATORS: &[&str] = &[
    "\ninterface ", "\nenum ", "\nimplements ", "\ndelegate ", "\nevent ", "\nclass ",
    "\nabstract ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nreturn ", "\nif ",
    "\ncontinue ", "\nfor ", "\nforeach ", "\nwhile ", "\nswitch ", "\nbreak ", "\ncase ",
    "\nelse ", "\ntry ", "\nthrow ", "\nfinally ", "\ncatch ", "\n\n", "\n", " ", "",
];

const RUBY_SEPARATORS: &[&str] = &[
    "\ndef ", "\nclass ", "\nmodule ", "\nif ", "\nunless ", "\nwhile ", "\nfor ", "\ndo ",
    "\nbegin ", "\nrescue ", "\n\n", "\n", " ", "",
];

const PHP_SEPARATORS: &[&str] = &[
    "\nfunction ", "\nclass ", "\nif ", "\nforeach ", "\nwhile ", "\ndo ", "\nswitch ",
    "\ncase ", "\n\n", "\n", " ", "",
];

const KOTLIN_SEPARATORS: &[&str] = &[
    "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\ninternal ", "\ncompanion ",
    "\nfun ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nwhen ", "\ncase ", "\nelse ",
    "\n\n", "\n", " ", "",
];

const SWIFT_SEPARATORS: &[&str] = &[
    "\nfunc ", "\nclass ", "\nstruct ", "\nenum ", "\nif ", "\nfor ", "\nwhile ", "\ndo ",
    "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
];

const SCALA_SEPARATORS: &[&str] = &[
    "\nclass ", "\nobject ", "\ndef ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\nwhile ",
    "\nmatch ", "\ncase ", "\n\n", "\n", " ", "",
];

const HTML_SEPARATORS: &[&str] = &[
    "<body", "<div", "<p", "<br", "<li", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6", "<span",
    "<table", "<tr", "<td", "<th", "<ul", "<ol", "<header", "<footer", "<nav", "<head",
    "<style", "<script", "<meta", "<title", "",
];

impl Language {
    /// Classify a path by its (case-insensitive) extension.
    pub fn from_path(path: &str) -> Self {
        let ext = match path.rsplit_once('.') {
            Some((stem, ext)) if !stem.ends_with('/') && !ext.contains('/') => {
                ext.to_ascii_lowercase()
            }
            _ => return Language::Generic,
        };

        match ext.as_str() {
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "hh" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            "scala" => Language::Scala,
            "html" | "htm" => Language::Html,
            _ => Language::Generic,
        }
    }

    /// Separators tried in order, from structural boundaries down to
    /// single characters (`""`).
    pub fn separators(self) -> &'static [&'static str] {
        match self {
            Language::Python => PYTHON_SEPARATORS,
            Language::JavaScript => JAVASCRIPT_SEPARATORS,
            Language::TypeScript => TYPESCRIPT_SEPARATORS,
            Language::Rust => RUST_SEPARATORS,
            Language::Go => GO_SEPARATORS,
            Language::Java => JAVA_SEPARATORS,
            Language::Cpp => CPP_SEPARATORS,
            Language::CSharp => CSHARP_SEPARATORS,
            Language::Ruby => RUBY_SEPARATORS,
            Language::Php => PHP_SEPARATORS,
            Language::Kotlin => KOTLIN_SEPARATORS,
            Language::Swift => SWIFT_SEPARATORS,
            Language::Scala => SCALA_SEPARATORS,
            Language::Html => HTML_SEPARATORS,
            Language::Generic => GENERIC_SEPARATORS,
        }
    }
}

/// Splits files into overlapping, citation-tagged chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Build a chunker. `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(config: ChunkingConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: config.chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk every file in order. Chunks of one file are contiguous in the
    /// output and indexed from 0.
    pub fn chunk_files(&self, files: &[SourceFile]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = files.iter().flat_map(|f| self.chunk_file(f)).collect();
        tracing::info!(files = files.len(), chunks = chunks.len(), "chunked files");
        chunks
    }

    pub fn chunk_file(&self, file: &SourceFile) -> Vec<Chunk> {
        let language = Language::from_path(&file.path);
        self.split_text(&file.content, language)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content: content.to_string(),
                file_path: file.path.clone(),
                chunk_index,
            })
            .collect()
    }

    /// Split raw text into chunk bodies using `language`'s separators.
    ///
    /// Empty or whitespace-only text yields no chunks; text of at most
    /// `chunk_size` characters is returned whole and untrimmed.
    pub fn split_text<'a>(&self, text: &'a str, language: Language) -> Vec<&'a str> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text];
        }

        let mut out = Vec::new();
        self.split_recursive(text, language.separators(), &mut out);
        out
    }

    fn split_recursive<'a>(&self, text: &'a str, separators: &[&str], out: &mut Vec<&'a str>) {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];
        for (i, &sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut good: Vec<Range<usize>> = Vec::new();
        for piece in split_keep_start(text, separator) {
            if char_len(&text[piece.clone()]) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                self.merge_pieces(text, &good, out);
                good.clear();
            }
            if remaining.is_empty() {
                push_trimmed(&text[piece], out);
            } else {
                self.split_recursive(&text[piece], remaining, out);
            }
        }
        if !good.is_empty() {
            self.merge_pieces(text, &good, out);
        }
    }

    /// Merge adjacent pieces of `text` into chunks, carrying up to
    /// `chunk_overlap` characters of trailing pieces into the next chunk.
    fn merge_pieces<'a>(&self, text: &'a str, pieces: &[Range<usize>], out: &mut Vec<&'a str>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&text[piece.clone()]);
            if total + len > self.chunk_size && !window.is_empty() {
                emit_window(text, &window, out);
                while let Some((_, front_len)) = window.front() {
                    let over_overlap = total > self.chunk_overlap;
                    let no_room = total + len > self.chunk_size;
                    if !(over_overlap || no_room) {
                        break;
                    }
                    total -= front_len;
                    window.pop_front();
                }
            }
            window.push_back((piece.clone(), len));
            total += len;
        }
        emit_window(text, &window, out);
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

fn emit_window<'a>(text: &'a str, window: &VecDeque<(Range<usize>, usize)>, out: &mut Vec<&'a str>) {
    if let (Some((first, _)), Some((last, _))) = (window.front(), window.back()) {
        push_trimmed(&text[first.start..last.end], out);
    }
}

fn push_trimmed<'a>(segment: &'a str, out: &mut Vec<&'a str>) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

/// Byte ranges of `text` cut before every occurrence of `separator`.
/// An empty separator cuts between every character.
fn split_keep_start(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect();
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            ranges.push(start..pos);
        }
        start = pos;
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }
    ranges
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
