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

//! Navigation state of a debugging session.
//!
//! `Nav` is the single owner of everything the user navigates: open files and
//! their cursors, breakpoints, the debugger position, the call stack and the
//! goroutine list. Only the session's event loop mutates it; workers see a
//! `StateSnapshot` instead.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::api::{Breakpoint, Goroutine, Stackframe};
use crate::text::SourceFile;

/// Result of a breakpoint operation, applied to the table by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointUpdate {
    Upserted(Breakpoint),
    Removed { file: String, line: i64 },
}

impl BreakpointUpdate {
    /// The (file, line) slot this update targets.
    pub fn key(&self) -> (String, i64) {
        match self {
            BreakpointUpdate::Upserted(bp) => (bp.file.clone(), bp.line),
            BreakpointUpdate::Removed { file, line } => (file.clone(), *line),
        }
    }
}

/// Breakpoints by file, then by 1-based line. At most one per line.
#[derive(Debug, Clone, Default)]
pub struct BreakpointTable {
    files: HashMap<String, BTreeMap<i64, Breakpoint>>,
}

impl BreakpointTable {
    pub fn apply(&mut self, update: BreakpointUpdate) {
        match update {
            BreakpointUpdate::Upserted(bp) => {
                if bp.id > 0 {
                    // A breakpoint the backend moved must not linger at its old line.
                    if let Some((file, line)) = self.locate(bp.id) {
                        if file != bp.file || line != bp.line {
                            self.remove(&file, line);
                        }
                    }
                }
                self.files
                    .entry(bp.file.clone())
                    .or_default()
                    .insert(bp.line, bp);
            }
            BreakpointUpdate::Removed { file, line } => self.remove(&file, line),
        }
    }

    fn remove(&mut self, file: &str, line: i64) {
        if let Some(lines) = self.files.get_mut(file) {
            lines.remove(&line);
            if lines.is_empty() {
                self.files.remove(file);
            }
        }
    }

    fn locate(&self, id: i64) -> Option<(String, i64)> {
        self.iter()
            .find(|bp| bp.id == id)
            .map(|bp| (bp.file.clone(), bp.line))
    }

    pub fn get(&self, file: &str, line: i64) -> Option<&Breakpoint> {
        self.files.get(file).and_then(|lines| lines.get(&line))
    }

    pub fn for_file(&self, file: &str) -> Option<&BTreeMap<i64, Breakpoint>> {
        self.files.get(file)
    }

    pub fn len(&self) -> usize {
        self.files.values().map(|lines| lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All breakpoints, files in name order and lines ascending.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        let mut files: Vec<&String> = self.files.keys().collect();
        files.sort();
        files
            .into_iter()
            .flat_map(move |file| self.files[file].values())
    }
}

/// Where the debugger last stopped. Lines are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerPosition {
    pub file: String,
    pub line: i64,
}

impl DebuggerPosition {
    /// The position while the target runs freely.
    pub fn unknown() -> Self {
        Self {
            file: String::new(),
            line: -1,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_empty()
    }

    /// 1-based line in `file`, if the debugger is stopped there.
    pub fn line_in(&self, file: &str) -> Option<usize> {
        if self.is_unknown() || self.file != file || self.line < 0 {
            return None;
        }
        Some(self.line as usize + 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub frames: Vec<Stackframe>,
    pub selected: Option<usize>,
}

impl Stack {
    /// Select the frame at `file` and 0-based `line`, or nothing.
    pub fn select_frame_at(&mut self, file: &str, line: i64) {
        self.selected = self
            .frames
            .iter()
            .position(|frame| frame.location.file == file && frame.location.line == line + 1);
    }

    pub fn selected_frame(&self) -> Option<&Stackframe> {
        self.selected.and_then(|idx| self.frames.get(idx))
    }
}

/// What a command worker may know about the session.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub project_root: PathBuf,
    pub cached_files: HashMap<String, Arc<SourceFile>>,
    pub current_goroutine: i64,
}

impl StateSnapshot {
    pub fn cached(&self, path: &str) -> Option<Arc<SourceFile>> {
        self.cached_files.get(path).cloned()
    }
}

#[derive(Debug)]
pub struct Nav {
    project_root: PathBuf,
    files: HashMap<String, Arc<SourceFile>>,
    cursors: HashMap<String, usize>,
    current_file: Option<Arc<SourceFile>>,
    pub breakpoints: BreakpointTable,
    position: DebuggerPosition,
    stack: Stack,
    goroutines: Vec<Goroutine>,
    current_goroutine: i64,
    source_files: Vec<String>,
}

impl Nav {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            files: HashMap::new(),
            cursors: HashMap::new(),
            current_file: None,
            breakpoints: BreakpointTable::default(),
            position: DebuggerPosition::unknown(),
            stack: Stack::default(),
            goroutines: Vec::new(),
            current_goroutine: 0,
            source_files: Vec::new(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Make `file` the current file. The cursor starts at 0 on the first
    /// visit and is kept on later ones.
    pub fn enter_file(&mut self, file: Arc<SourceFile>) {
        let path = file.path.clone();
        self.cursors.entry(path.clone()).or_insert(0);
        let file = self.files.entry(path).or_insert(file).clone();
        self.current_file = Some(file);
    }

    pub fn cached(&self, path: &str) -> Option<&Arc<SourceFile>> {
        self.files.get(path)
    }

    pub fn current_file(&self) -> Option<&Arc<SourceFile>> {
        self.current_file.as_ref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_file.as_deref().map(|f| f.path.as_str())
    }

    /// 0-based cursor in the current file.
    pub fn cursor(&self) -> usize {
        self.current_path()
            .and_then(|path| self.cursors.get(path))
            .copied()
            .unwrap_or(0)
    }

    /// Move the cursor of the current file. Lines outside the file are
    /// rejected and the previous cursor is returned.
    pub fn set_line(&mut self, line: isize) -> usize {
        let previous = self.cursor();
        let Some(file) = &self.current_file else {
            return previous;
        };
        let last = file.rows() as isize - 2;
        if line < 0 || line > last {
            return previous;
        }
        self.cursors.insert(file.path.clone(), line as usize);
        line as usize
    }

    pub fn record_breakpoint(&mut self, update: BreakpointUpdate) {
        debug!(?update, "breakpoint update");
        self.breakpoints.apply(update);
    }

    pub fn record_debugger_move(&mut self, position: DebuggerPosition, frames: Vec<Stackframe>) {
        self.stack = Stack {
            frames,
            selected: None,
        };
        self.stack.select_frame_at(&position.file, position.line);
        self.position = position;
    }

    /// Forget the debugger position while the target runs freely.
    pub fn mark_running(&mut self) {
        self.position = DebuggerPosition::unknown();
    }

    pub fn position(&self) -> &DebuggerPosition {
        &self.position
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn select_frame(&mut self, index: usize) -> Option<&Stackframe> {
        if index < self.stack.frames.len() {
            self.stack.selected = Some(index);
        }
        self.stack.selected_frame()
    }

    /// Select the frame at `file` and 0-based `line`, or clear the selection.
    pub fn select_frame_at(&mut self, file: &str, line: i64) {
        self.stack.select_frame_at(file, line);
    }

    pub fn set_goroutines(&mut self, goroutines: Vec<Goroutine>) {
        self.goroutines = goroutines;
    }

    pub fn set_current_goroutine(&mut self, id: i64) {
        self.current_goroutine = id;
    }

    pub fn current_goroutine(&self) -> i64 {
        self.current_goroutine
    }

    /// Goroutines that run, were started from, or began in project code.
    pub fn project_goroutines(&self) -> Vec<&Goroutine> {
        let root = self.project_root.to_string_lossy();
        let in_project = |file: &str| file.starts_with(&*root);
        self.goroutines
            .iter()
            .filter(|g| {
                in_project(&g.current_loc.file)
                    || in_project(&g.go_statement_loc.file)
                    || in_project(&g.start_loc.file)
            })
            .collect()
    }

    /// Keep the sources that belong to the project, sorted.
    pub fn set_source_files(&mut self, mut sources: Vec<String>) {
        let root = self.project_root.to_string_lossy().into_owned();
        sources.retain(|s| s.starts_with(&root));
        sources.sort();
        sources.dedup();
        self.source_files = sources;
    }

    pub fn source_files(&self) -> &[String] {
        &self.source_files
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            project_root: self.project_root.clone(),
            cached_files: self.files.clone(),
            current_goroutine: self.current_goroutine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Location;

    fn file_with_lines(path: &str, lines: usize) -> Arc<SourceFile> {
        let content: String = (0..lines).map(|n| format!("// {n}\n")).collect();
        Arc::new(SourceFile::from_text(path, path, content))
    }

    fn bp(id: i64, file: &str, line: i64) -> Breakpoint {
        Breakpoint {
            id,
            file: file.to_string(),
            line,
            ..Default::default()
        }
    }

    fn frame(file: &str, line: i64) -> Stackframe {
        Stackframe {
            location: Location {
                file: file.to_string(),
                line,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_enter_file_keeps_cursor_on_revisit() {
        let mut nav = Nav::new("/p");
        let a = file_with_lines("/p/a.go", 20);
        let b = file_with_lines("/p/b.go", 20);
        nav.enter_file(a.clone());
        assert_eq!(nav.cursor(), 0);
        assert_eq!(nav.set_line(7), 7);
        nav.enter_file(b);
        assert_eq!(nav.cursor(), 0);
        nav.enter_file(a);
        assert_eq!(nav.cursor(), 7);
        assert!(nav.cached("/p/b.go").is_some());
    }

    #[test]
    fn test_set_line_rejects_out_of_range() {
        let mut nav = Nav::new("/p");
        nav.enter_file(file_with_lines("/p/ten.go", 10));
        assert_eq!(nav.set_line(-1), 0);
        assert_eq!(nav.set_line(9), 9);
        assert_eq!(nav.set_line(10), 9);
        assert_eq!(nav.set_line(0), 0);
    }

    #[test]
    fn test_set_line_without_file() {
        let mut nav = Nav::new("/p");
        assert_eq!(nav.set_line(3), 0);
    }

    #[test]
    fn test_removal_targets_one_entry() {
        let mut table = BreakpointTable::default();
        table.apply(BreakpointUpdate::Upserted(bp(1, "a.go", 5)));
        table.apply(BreakpointUpdate::Upserted(bp(2, "a.go", 6)));
        table.apply(BreakpointUpdate::Upserted(bp(3, "b.go", 5)));
        table.apply(BreakpointUpdate::Removed {
            file: "a.go".to_string(),
            line: 5,
        });
        assert!(table.get("a.go", 5).is_none());
        assert_eq!(table.get("a.go", 6).map(|b| b.id), Some(2));
        assert_eq!(table.get("b.go", 5).map(|b| b.id), Some(3));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_upsert_replaces_same_line() {
        let mut table = BreakpointTable::default();
        table.apply(BreakpointUpdate::Upserted(bp(4, "a.go", 5)));
        let mut disabled = bp(4, "a.go", 5);
        disabled.disabled = true;
        table.apply(BreakpointUpdate::Upserted(disabled));
        assert_eq!(table.len(), 1);
        assert!(table.get("a.go", 5).unwrap().disabled);
    }

    #[test]
    fn test_upsert_moves_breakpoint_with_same_id() {
        let mut table = BreakpointTable::default();
        table.apply(BreakpointUpdate::Upserted(bp(4, "a.go", 5)));
        table.apply(BreakpointUpdate::Upserted(bp(4, "a.go", 7)));
        assert!(table.get("a.go", 5).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_removing_last_breakpoint_drops_file() {
        let mut table = BreakpointTable::default();
        table.apply(BreakpointUpdate::Upserted(bp(1, "a.go", 5)));
        table.apply(BreakpointUpdate::Removed {
            file: "a.go".to_string(),
            line: 5,
        });
        assert!(table.is_empty());
        assert!(table.for_file("a.go").is_none());
    }

    #[test]
    fn test_iter_is_sorted() {
        let mut table = BreakpointTable::default();
        table.apply(BreakpointUpdate::Upserted(bp(1, "b.go", 2)));
        table.apply(BreakpointUpdate::Upserted(bp(2, "a.go", 9)));
        table.apply(BreakpointUpdate::Upserted(bp(3, "a.go", 1)));
        let ids: Vec<i64> = table.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_debugger_move_selects_matching_frame() {
        let mut nav = Nav::new("/p");
        nav.record_debugger_move(
            DebuggerPosition {
                file: "/p/a.go".to_string(),
                line: 11,
            },
            vec![frame("/p/b.go", 3), frame("/p/a.go", 12)],
        );
        assert_eq!(nav.stack().selected, Some(1));
        assert_eq!(nav.position().line_in("/p/a.go"), Some(12));

        nav.record_debugger_move(
            DebuggerPosition {
                file: "/p/c.go".to_string(),
                line: 0,
            },
            vec![frame("/p/b.go", 3)],
        );
        assert_eq!(nav.stack().selected, None);
        assert_eq!(nav.stack().frames.len(), 1);
    }

    #[test]
    fn test_unknown_position_suppresses_line() {
        let mut nav = Nav::new("/p");
        nav.mark_running();
        assert!(nav.position().is_unknown());
        assert_eq!(nav.position().line_in(""), None);
        assert_eq!(nav.position().line_in("/p/a.go"), None);
    }

    #[test]
    fn test_project_goroutines_filtered_by_root() {
        let mut nav = Nav::new("/home/gopher/app");
        let mut inside = Goroutine {
            id: 1,
            ..Default::default()
        };
        inside.go_statement_loc.file = "/home/gopher/app/main.go".to_string();
        let mut outside = Goroutine {
            id: 2,
            ..Default::default()
        };
        outside.current_loc.file = "/usr/local/go/src/runtime/proc.go".to_string();
        nav.set_goroutines(vec![inside, outside]);
        let ids: Vec<i64> = nav.project_goroutines().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_source_files_filtered_and_sorted() {
        let mut nav = Nav::new("/app");
        nav.set_source_files(vec![
            "/app/z.go".to_string(),
            "/go/src/fmt/print.go".to_string(),
            "/app/a.go".to_string(),
        ]);
        assert_eq!(nav.source_files(), ["/app/a.go", "/app/z.go"]);
    }

    #[test]
    fn test_snapshot_shares_cached_files() {
        let mut nav = Nav::new("/p");
        let a = file_with_lines("/p/a.go", 3);
        nav.enter_file(a.clone());
        nav.set_current_goroutine(7);
        let snapshot = nav.snapshot();
        assert!(Arc::ptr_eq(&snapshot.cached("/p/a.go").unwrap(), &a));
        assert_eq!(snapshot.current_goroutine, 7);
    }
}
