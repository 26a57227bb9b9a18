// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Artifact sinks: where rendered bytes end up.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::traits::ArtifactSink;

/// Writes artifacts below an output folder on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemSink {
    root: PathBuf,
}

impl FileSystemSink {
    /// Creates a sink writing below `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactSink for FileSystemSink {
    fn write(&self, relative_path: &Path, bytes: &[u8]) -> io::Result<()> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()
    }
}

/// Keeps artifacts in memory, keyed by relative path.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes written to `relative_path`.
    pub fn get<P: AsRef<Path>>(&self, relative_path: P) -> Option<Vec<u8>> {
        self.files.lock().get(relative_path.as_ref()).cloned()
    }

    /// Returns the text written to `relative_path`.
    pub fn get_string<P: AsRef<Path>>(&self, relative_path: P) -> Option<String> {
        self.get(relative_path)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Every path written so far, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    /// Number of artifacts written.
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn write(&self, relative_path: &Path, bytes: &[u8]) -> io::Result<()> {
        let _ = self
            .files
            .lock()
            .insert(relative_path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_system_sink_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileSystemSink::new(temp_dir.path().join("site"));

        sink.write(Path::new("blog/2024/post.html"), b"<p>hi</p>")
            .unwrap();

        let written = fs::read_to_string(
            temp_dir.path().join("site/blog/2024/post.html"),
        )
        .unwrap();
        assert_eq!(written, "<p>hi</p>");
    }

    #[test]
    fn test_file_system_sink_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileSystemSink::new(temp_dir.path());
        sink.write(Path::new("a.json"), b"{}").unwrap();
        sink.write(Path::new("a.json"), b"[]").unwrap();
        assert_eq!(fs::read(temp_dir.path().join("a.json")).unwrap(), b"[]");
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.write(Path::new("b.html"), b"b").unwrap();
        sink.write(Path::new("a.html"), b"a").unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.paths(),
            vec![PathBuf::from("a.html"), PathBuf::from("b.html")]
        );
        assert_eq!(sink.get_string("a.html").as_deref(), Some("a"));
        assert!(sink.get("c.html").is_none());
    }

    #[test]
    fn test_file_system_sink_reports_errors() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("blocker"), "file").unwrap();
        let sink = FileSystemSink::new(temp_dir.path().join("blocker"));
        assert!(sink.write(Path::new("a.html"), b"x").is_err());
    }
}
