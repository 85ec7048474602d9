// src/fs/glob.rs

//! Recursive, glob-filtered file listings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use super::FileSystem;

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` whose path relative to `root` matches one
/// of `include` and none of `exclude`.
///
/// The result is sorted so listings are stable across filesystems.
pub fn find_files(
    fs: &dyn FileSystem,
    root: &Path,
    include: &[&str],
    exclude: &[&str],
) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include)?;
    let exclude_set = if exclude.is_empty() {
        None
    } else {
        Some(build_globset(exclude)?)
    };

    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                let excluded = exclude_set
                    .as_ref()
                    .is_some_and(|set| set.is_match(&rel_str));
                if include_set.is_match(&rel_str) && !excluded {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
