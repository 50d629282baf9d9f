// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Source files with a precomputed line index.
//!
//! Files are loaded once and never mutated afterwards. The line index lets the
//! viewport cut out any contiguous run of lines in constant time instead of
//! re-scanning the text on every scroll.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Compute the byte offset of the start of every line in `text`.
///
/// The returned vector has one entry per line plus a trailing sentinel equal to
/// `text.len()`, so line `k` is always `text[offsets[k]..offsets[k + 1]]`,
/// terminator included. A final line without a newline still counts as a line;
/// a trailing newline does not open an extra empty one.
pub fn build_line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len() / 32 + 2);
    offsets.push(0);
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            offsets.push(idx + 1);
        }
    }
    if offsets.last() != Some(&text.len()) {
        offsets.push(text.len());
    }
    offsets
}

/// An immutable, line-indexed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Name as the user or debugger asked for it
    pub name: String,
    /// Absolute path, also the key the file is cached under
    pub path: String,
    content: String,
    offsets: Vec<usize>,
}

impl SourceFile {
    pub fn from_text(name: impl Into<String>, path: impl Into<String>, content: String) -> Self {
        let offsets = build_line_offsets(&content);
        Self {
            name: name.into(),
            path: path.into(),
            content,
            offsets,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of logical lines.
    pub fn line_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of index rows, which is the line count plus the end sentinel.
    pub fn rows(&self) -> usize {
        self.offsets.len()
    }

    /// Text of line `line` (0-based) including its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        if line >= self.line_count() {
            return None;
        }
        Some(&self.content[self.offsets[line]..self.offsets[line + 1]])
    }

    /// Text of lines `[start, end)`, clamped to the end of the file.
    pub fn slice_lines(&self, start: usize, end: usize) -> &str {
        let count = self.line_count();
        let start = start.min(count);
        let end = end.clamp(start, count);
        &self.content[self.offsets[start]..self.offsets[end]]
    }
}

/// Resolve `path` against the project root unless it is already absolute.
pub fn resolve_path(path: &str, project_root: &Path) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        project_root.join(candidate)
    }
}

/// Read a file from disk and index it.
///
/// Failures are logged and yield `None`; a missing file must never take the
/// session down.
pub async fn load_source_file(name: &str, path: &Path) -> Option<SourceFile> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load source file");
            return None;
        }
    };
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let file = SourceFile::from_text(name, path.to_string_lossy(), content);
    info!(path = %path.display(), lines = file.line_count(), "loaded source file");
    Some(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn check_offsets(text: &str, expected_lines: usize) {
        let offsets = build_line_offsets(text);
        assert_eq!(offsets.len(), expected_lines + 1, "text {text:?}");
        assert_eq!(offsets[0], 0);
        assert_eq!(*offsets.last().unwrap(), text.len());
        for pair in offsets.windows(2) {
            assert!(pair[0] < pair[1], "offsets not increasing for {text:?}");
        }
        let rebuilt: String = offsets
            .windows(2)
            .map(|pair| &text[pair[0]..pair[1]])
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_offsets_empty_text() {
        check_offsets("", 0);
    }

    #[test]
    fn test_offsets_terminated_lines() {
        check_offsets("package main\n\nfunc main() {}\n", 3);
    }

    #[test]
    fn test_offsets_unterminated_last_line() {
        check_offsets("a\nbb\nccc", 3);
    }

    #[test]
    fn test_offsets_only_newlines() {
        check_offsets("\n\n\n", 3);
    }

    #[test]
    fn test_offsets_multibyte() {
        check_offsets("héllo\nwörld\n", 2);
    }

    #[test]
    fn test_line_includes_terminator() {
        let file = SourceFile::from_text("f.go", "/p/f.go", "one\ntwo\nthree".to_string());
        assert_eq!(file.line(0), Some("one\n"));
        assert_eq!(file.line(1), Some("two\n"));
        assert_eq!(file.line(2), Some("three"));
        assert_eq!(file.line(3), None);
        assert_eq!(file.rows(), 4);
    }

    #[test]
    fn test_slice_lines_clamps() {
        let file = SourceFile::from_text("f.go", "/p/f.go", "a\nb\nc\n".to_string());
        assert_eq!(file.slice_lines(1, 2), "b\n");
        assert_eq!(file.slice_lines(1, 100), "b\nc\n");
        assert_eq!(file.slice_lines(10, 20), "");
    }

    #[test]
    fn test_resolve_relative_path() {
        let root = Path::new("/home/gopher/project");
        assert_eq!(
            resolve_path("cmd/main.go", root),
            PathBuf::from("/home/gopher/project/cmd/main.go")
        );
        assert_eq!(resolve_path("/abs/x.go", root), PathBuf::from("/abs/x.go"));
    }

    #[tokio::test]
    async fn test_load_source_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "line one\nline two\n").unwrap();
        let file = load_source_file("x.go", tmp.path()).await.unwrap();
        assert_eq!(file.line_count(), 2);
        assert_eq!(file.path, tmp.path().to_string_lossy());
        assert_eq!(file.name, "x.go");
    }

    #[tokio::test]
    async fn test_load_missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.go");
        assert!(load_source_file("nope.go", &missing).await.is_none());
    }
}
