//! Filepath: src/infra/walk.rs
//! Deterministic file walker used to enumerate source documents.
//! - Plain traversal by default: no .gitignore, no hidden-file skipping,
//!   so a directory source sees exactly what is on disk
//! - Opt-in ignore-file support (.gitignore, .ignore, git excludes)
//! - Extra ignore globs (early prune + late filter)
//! - Optional symlink following
//! - Sorted output so every traversal of the same tree agrees
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Walker with optional extra ignore globs.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
#[derive(Clone)]
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Honour .gitignore/.ignore files; default false
    respect_ignore_files: bool,

    /// Follow symbolic links; default false
    follow_symlinks: bool,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g. ".git/**",
    /// "**/drafts/**"). Patterns match on paths relative to the walk root.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            respect_ignore_files: false,
            follow_symlinks: false,
        })
    }

    /// (Optional) Honour .gitignore, .ignore and git exclude files.
    pub fn with_ignore_files(
        mut self,
        respect: bool,
    ) -> Self
    {
        self.respect_ignore_files = respect;
        self
    }

    /// (Optional) Follow or skip symbolic links (default false).
    pub fn with_follow_symlinks(
        mut self,
        follow: bool,
    ) -> Self
    {
        self.follow_symlinks = follow;
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Start from a plain traversal, then opt back in.
        b.standard_filters(false);

        if self.respect_ignore_files
        {
            b.ignore(true);
            b.git_ignore(true);
            b.git_global(true);
            b.git_exclude(true);
            b.require_git(false);
        }

        b.follow_links(self.follow_symlinks);

        // Early directory pruning using extra ignores, matched relative to root.
        let extra = self
            .ignore_patterns
            .clone();
        let base = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir
            {
                return true;
            }

            let rel = ent
                .path()
                .strip_prefix(&base)
                .unwrap_or(ent.path());
            rel.as_os_str()
                .is_empty()
                || !extra.is_match(rel)
        });

        b
    }

    /// Traverse files under `root`. A missing root yields nothing.
    /// Returns a **sorted** list of file paths for determinism.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();
        if !root_path.is_dir()
        {
            return Vec::new();
        }

        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<PathBuf> = walker
            // Unreadable entries are skipped like missing ones
            .filter_map(|res| res.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            // Late file-level extra ignore filtering using RELATIVE path
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root_path)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
            })
            .collect();

        out.sort();

        out
    }
}
