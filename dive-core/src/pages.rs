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

//! Row models for the list pages: breakpoints, stack and goroutines.

use crate::api::{Breakpoint, Stackframe};
use crate::nav::{BreakpointTable, Nav, Stack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Code,
    Breakpoints,
    Locals,
    Stack,
    Goroutines,
}

impl PageKind {
    pub const ALL: [PageKind; 5] = [
        PageKind::Code,
        PageKind::Breakpoints,
        PageKind::Locals,
        PageKind::Stack,
        PageKind::Goroutines,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PageKind::Code => "code",
            PageKind::Breakpoints => "breakpoints",
            PageKind::Locals => "locals",
            PageKind::Stack => "stack",
            PageKind::Goroutines => "goroutines",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn next(&self) -> PageKind {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> PageKind {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Selection and scroll of a list page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListState {
    pub selected: usize,
    pub scroll: usize,
}

impl ListState {
    pub fn down(&mut self, len: usize) {
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn top(&mut self) {
        self.selected = 0;
    }

    pub fn end(&mut self, len: usize) {
        self.selected = len.saturating_sub(1);
    }

    pub fn select(&mut self, index: usize, len: usize) {
        self.selected = index.min(len.saturating_sub(1));
    }

    /// Keep the selection inside a list that may have shrunk.
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Adjust scroll so the selection is on screen.
    pub fn scroll_into_view(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + height {
            self.scroll = self.selected + 1 - height;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointRow {
    File(String),
    Breakpoint(Breakpoint),
}

impl BreakpointRow {
    pub fn label(&self) -> String {
        match self {
            BreakpointRow::File(file) => file.clone(),
            BreakpointRow::Breakpoint(bp) => {
                let state = if bp.disabled { " (disabled)" } else { "" };
                format!("  {}:{}{}", bp.function_name, bp.line, state)
            }
        }
    }
}

/// Breakpoints grouped under their file, both sorted. Internal breakpoints
/// (negative ids) are not listed.
pub fn breakpoint_rows(table: &BreakpointTable) -> Vec<BreakpointRow> {
    let mut rows = Vec::new();
    let mut current_file: Option<&str> = None;
    for bp in table.iter().filter(|bp| bp.id >= 0) {
        if current_file != Some(bp.file.as_str()) {
            rows.push(BreakpointRow::File(bp.file.clone()));
            current_file = Some(bp.file.as_str());
        }
        rows.push(BreakpointRow::Breakpoint(bp.clone()));
    }
    rows
}

pub fn frame_label(index: usize, frame: &Stackframe) -> String {
    let function = match &frame.location.function {
        Some(function) => function.name.as_str(),
        None => "?",
    };
    format!(
        "{index} {function} {}:{}",
        frame.location.file, frame.location.line
    )
}

pub fn stack_rows(stack: &Stack) -> Vec<String> {
    stack
        .frames
        .iter()
        .enumerate()
        .map(|(i, frame)| frame_label(i, frame))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoroutineRow {
    pub id: i64,
    pub current: bool,
    pub label: String,
}

pub fn goroutine_rows(nav: &Nav) -> Vec<GoroutineRow> {
    nav.project_goroutines()
        .into_iter()
        .map(|g| {
            let current = g.id == nav.current_goroutine();
            let marker = if current { ">" } else { " " };
            GoroutineRow {
                id: g.id,
                current,
                label: format!(
                    "{marker} {}. {}:{}",
                    g.id, g.current_loc.file, g.current_loc.line
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Function, Goroutine, Location};
    use crate::nav::BreakpointUpdate;

    fn bp(id: i64, file: &str, line: i64) -> Breakpoint {
        Breakpoint {
            id,
            file: file.to_string(),
            line,
            function_name: "main.main".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(PageKind::Code.next(), PageKind::Breakpoints);
        assert_eq!(PageKind::Goroutines.next(), PageKind::Code);
        assert_eq!(PageKind::Code.prev(), PageKind::Goroutines);
    }

    #[test]
    fn test_list_state_bounds() {
        let mut state = ListState::default();
        state.up();
        assert_eq!(state.selected, 0);
        state.down(2);
        state.down(2);
        assert_eq!(state.selected, 1);
        state.end(10);
        assert_eq!(state.selected, 9);
        state.clamp(3);
        assert_eq!(state.selected, 2);
        state.end(0);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_scroll_into_view() {
        let mut state = ListState::default();
        state.select(12, 20);
        state.scroll_into_view(5);
        assert_eq!(state.scroll, 8);
        state.select(3, 20);
        state.scroll_into_view(5);
        assert_eq!(state.scroll, 3);
    }

    #[test]
    fn test_breakpoint_rows_grouped() {
        let mut table = BreakpointTable::default();
        table.apply(BreakpointUpdate::Upserted(bp(2, "/p/b.go", 3)));
        table.apply(BreakpointUpdate::Upserted(bp(1, "/p/a.go", 9)));
        table.apply(BreakpointUpdate::Upserted(bp(3, "/p/a.go", 4)));
        table.apply(BreakpointUpdate::Upserted(bp(-1, "/go/runtime/panic.go", 10)));
        let labels: Vec<String> = breakpoint_rows(&table).iter().map(|r| r.label()).collect();
        assert_eq!(
            labels,
            vec![
                "/p/a.go",
                "  main.main:4",
                "  main.main:9",
                "/p/b.go",
                "  main.main:3"
            ]
        );
    }

    #[test]
    fn test_frame_label() {
        let frame = Stackframe {
            location: Location {
                file: "/p/main.go".to_string(),
                line: 14,
                function: Some(Function {
                    name: "main.run".to_string(),
                    value: 0,
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(frame_label(1, &frame), "1 main.run /p/main.go:14");
    }

    #[test]
    fn test_goroutine_rows_mark_current() {
        let mut nav = Nav::new("/p");
        let goroutine = |id: i64, file: &str| {
            let mut g = Goroutine {
                id,
                ..Default::default()
            };
            g.current_loc.file = file.to_string();
            g.current_loc.line = 3;
            g
        };
        nav.set_goroutines(vec![
            goroutine(1, "/p/main.go"),
            goroutine(2, "/usr/go/src/runtime/proc.go"),
            goroutine(5, "/p/worker.go"),
        ]);
        nav.set_current_goroutine(5);
        let rows = goroutine_rows(&nav);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "  1. /p/main.go:3");
        assert!(rows[1].current);
        assert_eq!(rows[1].label, "> 5. /p/worker.go:3");
    }
}
