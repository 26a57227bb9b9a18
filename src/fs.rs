// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filesystem enumeration.
//!
//! Produces immutable [`FileAsset`] descriptors for the entries of a folder.
//! Hidden entries (names starting with `.`) below the listed folder are
//! never returned. Results are sorted by path so builds are reproducible.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

/// Which kinds of entries a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFilter {
    /// Regular files only.
    Files,
    /// Folders only.
    Folders,
    /// Files and folders.
    All,
}

impl FileFilter {
    fn accepts(self, is_folder: bool) -> bool {
        match self {
            FileFilter::Files => !is_folder,
            FileFilter::Folders => is_folder,
            FileFilter::All => true,
        }
    }
}

/// Descriptor of a single file or folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
    /// Absolute path, also used as the asset's identity.
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Lowercased extension, if any.
    pub extension: Option<String>,
    /// True for folders.
    pub is_folder: bool,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Last modification time, when the platform reports it.
    pub modified: Option<SystemTime>,
}

impl FileAsset {
    fn from_entry(entry: &DirEntry) -> Self {
        let metadata = entry.metadata().ok();
        let is_folder = entry.file_type().is_dir();
        Self {
            path: entry.path().to_path_buf(),
            name: entry.file_name().to_string_lossy().into_owned(),
            extension: extension_of(entry.path()),
            is_folder,
            size: match (&metadata, is_folder) {
                (Some(m), false) => m.len(),
                _ => 0,
            },
            modified: metadata.and_then(|m| m.modified().ok()),
        }
    }

    /// True if the asset's extension is one of `extensions` (lowercase).
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension
            .as_deref()
            .map_or(false, |ext| extensions.contains(&ext))
    }
}

/// Returns the lowercased extension of `path`.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Lists the entries of `folder`.
///
/// # Arguments
///
/// * `folder` - The folder to list. It must exist and be readable.
/// * `filter` - Which kinds of entries to return
/// * `recursive` - Descend into sub-folders
///
/// # Returns
///
/// The matching entries sorted by path, or the error that prevented
/// reading `folder` itself. Unreadable entries further down are skipped.
pub fn list(
    folder: &Path,
    filter: FileFilter,
    recursive: bool,
) -> io::Result<Vec<FileAsset>> {
    // Surface an unreadable root instead of returning an empty listing.
    let _ = fs::read_dir(folder)?;

    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    Ok(walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| filter.accepts(e.file_type().is_dir()))
        .map(|e| FileAsset::from_entry(&e))
        .collect())
}

/// Lists files with one of the given extensions directly inside `folder`.
pub fn list_files_with_extensions(
    folder: &Path,
    extensions: &[&str],
) -> io::Result<Vec<FileAsset>> {
    Ok(list(folder, FileFilter::Files, false)?
        .into_iter()
        .filter(|asset| asset.has_extension(extensions))
        .collect())
}

/// Returns the absolute form of `path`, resolving symlinks when possible.
pub fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}
