//! Directory loader.
//!
//! Walks the configured documents root, keeps files matching the include
//! globs (and none of the exclude globs), and extracts each one into a
//! [`Document`]. Files that fail extraction are skipped with a warning.
//! Results are sorted by path so ingestion order is deterministic.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use docqa_core::models::Document;

use crate::config::DocumentsConfig;
use crate::extract::extract_file;

pub fn load_documents(config: &DocumentsConfig) -> Result<Vec<Document>> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Documents root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut docs = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let bytes = std::fs::read(path)?;
        match extract_file(path, &bytes) {
            Ok(text) => docs.push(Document::new(rel_str, text)),
            Err(e) => {
                tracing::warn!(path = %rel_str, error = %e, "skipping file");
            }
        }
    }

    docs.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(root = %root.display(), documents = docs.len(), "loaded documents");

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
