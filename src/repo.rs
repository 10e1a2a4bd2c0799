//! Repository acquisition: validate a repository URL and clone it locally.
//!
//! Each repository is materialized at `<clone_dir>/<name>`, where `name` is
//! the last URL path segment without a `.git` suffix. A previous checkout at
//! that location is removed first, so every ingest starts from a fresh clone.
//! Cloning shells out to `git`, which must be on `PATH`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ReposConfig;

/// Check that `url` starts with an allowed prefix, names an owner and a
/// repository, and contains no whitespace.
pub fn validate_repo_url(url: &str, allowed_prefixes: &[String]) -> Result<()> {
    if url.is_empty() {
        bail!("Repository URL is empty");
    }
    if url.chars().any(char::is_whitespace) {
        bail!("Repository URL must not contain whitespace");
    }

    let Some(rest) = allowed_prefixes
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix.as_str()))
    else {
        bail!(
            "Invalid repository URL '{}': must start with one of {}",
            url,
            allowed_prefixes.join(", ")
        );
    };

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        bail!("Invalid repository URL '{}': expected <owner>/<repo>", url);
    }

    repo_name(url)?;
    Ok(())
}

/// Directory name for a repository URL: the last path segment minus `.git`.
pub fn repo_name(url: &str) -> Result<String> {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        bail!("Cannot derive a repository name from '{}'", url);
    }
    Ok(name.to_string())
}

/// Clone `url` into `config.clone_dir`, replacing any existing checkout.
///
/// Blocking: run it on a blocking thread from async code.
pub fn clone_repository(url: &str, config: &ReposConfig) -> Result<PathBuf> {
    validate_repo_url(url, &config.allowed_prefixes)?;
    let dest = config.clone_dir.join(repo_name(url)?);

    if dest.exists() {
        tracing::info!(path = %dest.display(), "removing previous checkout");
        remove_checkout(&dest)?;
    }
    std::fs::create_dir_all(&config.clone_dir).with_context(|| {
        format!(
            "Failed to create clone directory: {}",
            config.clone_dir.display()
        )
    })?;

    tracing::info!(url, path = %dest.display(), "cloning repository");
    git_clone(url, config.shallow, &dest)?;
    Ok(dest)
}

fn git_clone(url: &str, shallow: bool, dest: &Path) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.arg("clone");
    if shallow {
        cmd.args(["--depth", "1"]);
    }
    cmd.arg(url);
    cmd.arg(dest);

    let output = cmd
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}

/// Delete a checkout. Git marks pack files read-only, which blocks removal
/// on some platforms, so a failed first attempt clears the flag and retries.
fn remove_checkout(path: &Path) -> Result<()> {
    if std::fs::remove_dir_all(path).is_ok() {
        return Ok(());
    }
    make_writable(path);
    std::fs::remove_dir_all(path)
        .with_context(|| format!("Failed to remove existing checkout: {}", path.display()))
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) {
    for entry in walkdir::WalkDir::new(path).into_iter().flatten() {
        if let Ok(metadata) = entry.metadata() {
            let mut perms = metadata.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                let _ = std::fs::set_permissions(entry.path(), perms);
            }
        }
    }
}
