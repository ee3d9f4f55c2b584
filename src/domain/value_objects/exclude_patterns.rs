//! Exclude patterns value object
//!
//! Matches caller-supplied globs (`node_modules/**`, `*.md`) and the optional
//! `.edgepushignore` file against paths relative to the source root, using
//! gitignore semantics.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the optional ignore file at the source root
pub const IGNORE_FILE: &str = ".edgepushignore";

/// Paths that never leave the machine: the ignore file itself and local state.
const BUILTIN_PATTERNS: &[&str] = &[".edgepush/", IGNORE_FILE];

/// Maximum file size for `.edgepushignore` (64KB)
const MAX_FILE_SIZE: u64 = 65536;

/// Maximum number of patterns allowed
const MAX_PATTERNS: usize = 1000;

/// Compiled exclude set.
#[derive(Debug)]
pub struct ExcludePatterns {
    matcher: Gitignore,
    pattern_count: usize,
}

impl Default for ExcludePatterns {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExcludePatterns {
    /// Create an empty pattern set (matches nothing).
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
            pattern_count: 0,
        }
    }

    /// Build the exclude set for a source root.
    ///
    /// Combines the built-in patterns, the root's `.edgepushignore` (if any)
    /// and the caller-supplied globs, in that order, so later entries can
    /// re-include with `!pattern`.
    pub fn for_source(root: &Path, globs: &[String]) -> Result<Self, ExcludeError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut pattern_count = 0;

        for pattern in BUILTIN_PATTERNS {
            add_pattern(&mut builder, None, 0, pattern, &mut pattern_count)?;
        }

        let ignore_path = root.join(IGNORE_FILE);
        if ignore_path.is_file() {
            let size = fs::metadata(&ignore_path).map_err(ExcludeError::Io)?.len();
            if size > MAX_FILE_SIZE {
                return Err(ExcludeError::FileTooLarge {
                    path: ignore_path,
                    size,
                    limit: MAX_FILE_SIZE,
                });
            }
            let content = fs::read_to_string(&ignore_path).map_err(ExcludeError::Io)?;
            for (line_num, line) in content.lines().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                add_pattern(
                    &mut builder,
                    Some(&ignore_path),
                    line_num + 1,
                    trimmed,
                    &mut pattern_count,
                )?;
            }
        }

        for glob in globs {
            let trimmed = glob.trim();
            if trimmed.is_empty() {
                continue;
            }
            add_pattern(&mut builder, None, 0, trimmed, &mut pattern_count)?;
        }

        let matcher = builder
            .build()
            .map_err(|e| ExcludeError::BuildFailed(e.to_string()))?;

        Ok(Self {
            matcher,
            pattern_count,
        })
    }

    /// Check if a root-relative path is excluded.
    ///
    /// `is_dir` should be true if the path is a directory.
    pub fn is_excluded(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }

    /// Number of patterns loaded (built-ins included).
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

fn add_pattern(
    builder: &mut GitignoreBuilder,
    source: Option<&Path>,
    line: usize,
    pattern: &str,
    count: &mut usize,
) -> Result<(), ExcludeError> {
    *count += 1;
    if *count > MAX_PATTERNS {
        return Err(ExcludeError::TooManyPatterns {
            count: *count,
            limit: MAX_PATTERNS,
        });
    }

    builder
        .add_line(source.map(Path::to_path_buf), pattern)
        .map_err(|e| ExcludeError::InvalidPattern {
            origin: source.map(Path::to_path_buf),
            line,
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    Ok(())
}

/// Errors that can occur when compiling exclude patterns.
#[derive(Debug, Error)]
pub enum ExcludeError {
    #[error(".edgepushignore exceeds {}KB limit ({size} bytes): {}", .limit / 1024, .path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{count} exclude patterns exceed the {limit} limit")]
    TooManyPatterns { count: usize, limit: usize },

    #[error("invalid exclude pattern '{pattern}'{}: {message}", describe_origin(.origin, *.line))]
    InvalidPattern {
        origin: Option<PathBuf>,
        line: usize,
        pattern: String,
        message: String,
    },

    #[error("failed to build exclude matcher: {0}")]
    BuildFailed(String),

    #[error("failed to read .edgepushignore: {0}")]
    Io(#[source] std::io::Error),
}

fn describe_origin(origin: &Option<PathBuf>, line: usize) -> String {
    match origin {
        Some(path) => format!(" at {}:{}", path.display(), line),
        None => String::new(),
    }
}
