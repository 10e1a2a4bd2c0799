//! File collector: walk a checkout and read every indexable file.
//!
//! Files are kept when their extension or exact file name is on a fixed
//! allow-list of source, markup, config, build-script and documentation
//! types. `.git` directories are pruned from the walk. Content is decoded as
//! UTF-8 with invalid byte sequences dropped, and a file that cannot be read
//! is logged and skipped instead of failing the whole walk.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::models::SourceFile;

/// File extensions (lowercase, without the dot) that are collected.
const ALLOWED_EXTENSIONS: &[&str] = &[
    // source code
    "py", "pyi", "js", "jsx", "mjs", "cjs", "ts", "tsx", "rs", "go", "java", "kt", "kts", "scala",
    "swift", "c", "h", "cc", "cpp", "cxx", "hpp", "hh", "cs", "rb", "php", "sh", "bash", "zsh",
    "sql", "lua", "dart", "ex", "exs", "hs", "r", "vue", "svelte",
    // markup and styles
    "html", "htm", "css", "scss", "sass", "less", "xml", "svg",
    // config
    "json", "toml", "yaml", "yml", "ini", "cfg", "conf", "env", "properties", "gradle",
    // build scripts
    "cmake", "mk", "bazel", "bzl",
    // documentation
    "md", "markdown", "rst", "txt", "adoc",
];

/// Exact file names collected regardless of extension.
const ALLOWED_FILE_NAMES: &[&str] = &[
    "Makefile",
    "makefile",
    "GNUmakefile",
    "Dockerfile",
    "Containerfile",
    "CMakeLists.txt",
    "Rakefile",
    "Gemfile",
    "Procfile",
    "Justfile",
    "justfile",
    "BUILD",
    "WORKSPACE",
    "LICENSE",
    "README",
    ".gitignore",
    ".dockerignore",
    ".editorconfig",
];

/// Returns `true` if a file with this name should be collected.
pub fn is_allowed_file(file_name: &str) -> bool {
    if ALLOWED_FILE_NAMES.contains(&file_name) {
        return true;
    }
    match Path::new(file_name).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Walk `root` and return every allowed file, sorted by relative path.
pub fn collect_files(root: &Path) -> Result<Vec<SourceFile>> {
    collect_files_excluding(root, &[])
}

/// Like [`collect_files`], additionally skipping paths that match any of
/// `exclude_globs` (matched against the `/`-separated relative path).
pub fn collect_files_excluding(root: &Path, exclude_globs: &[String]) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        bail!("Repository root does not exist: {}", root.display());
    }
    if !root.is_dir() {
        bail!("Repository root is not a directory: {}", root.display());
    }

    let exclude_set = build_globset(exclude_globs)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_git_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !is_allowed_file(&file_name) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = normalize_separators(&relative.to_string_lossy());

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        match std::fs::read(path) {
            Ok(bytes) => files.push(SourceFile {
                path: rel_str,
                content: decode_lossy(&bytes),
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "error reading file: {}", e);
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(root = %root.display(), files = files.len(), "collected files");
    Ok(files)
}

/// Decode UTF-8, dropping byte sequences that are not valid UTF-8.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

fn is_git_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ".git"
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
