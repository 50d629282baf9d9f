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

//! Windowed view over a `SourceFile`.
//!
//! The viewport never copies file content. The visible text is cut out of the
//! file's content through its line index every time it is asked for, so a
//! height change (terminal resize, notification banner) needs no bookkeeping.

use std::ops::Range;
use std::sync::Arc;

use crate::gutter::{gutter_lines, GutterContext, GutterLine};
use crate::text::SourceFile;

pub const DEFAULT_SCROLL_MARGIN: usize = 5;

#[derive(Debug, Clone)]
pub struct Viewport {
    file: Option<Arc<SourceFile>>,
    /// First visible line, 0-based
    scroll: usize,
    height: usize,
    /// 1-based line treated as the cursor for highlighting
    virtual_line: usize,
    margin: usize,
}

impl Viewport {
    pub fn new(margin: usize) -> Self {
        Self {
            file: None,
            scroll: 0,
            height: 0,
            virtual_line: 1,
            margin,
        }
    }

    /// Install new content and show its start. The virtual line is kept.
    pub fn set_text(&mut self, file: Arc<SourceFile>) {
        self.file = Some(file);
        self.scroll = 0;
    }

    pub fn file(&self) -> Option<&Arc<SourceFile>> {
        self.file.as_ref()
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn virtual_line(&self) -> usize {
        self.virtual_line
    }

    pub fn line_count(&self) -> usize {
        self.file.as_ref().map(|f| f.line_count()).unwrap_or(0)
    }

    /// Returns the accepted 0-based target, or the previous line if `line` is
    /// not inside the file.
    fn accept_target(&self, line: usize) -> Option<usize> {
        if line < self.line_count() {
            Some(line)
        } else {
            None
        }
    }

    /// Jump so that `line` (0-based) sits in the middle of the viewport.
    pub fn scroll_to_center(&mut self, line: usize) -> usize {
        let Some(line) = self.accept_target(line) else {
            return self.virtual_line - 1;
        };
        self.virtual_line = line + 1;
        self.scroll = line.saturating_sub(self.height / 2);
        line
    }

    /// Move the cursor to `line` (0-based), scrolling only when it gets
    /// within the margin of the top or bottom edge.
    pub fn scroll_incremental(&mut self, line: usize) -> usize {
        let Some(line) = self.accept_target(line) else {
            return self.virtual_line - 1;
        };
        self.virtual_line = line + 1;
        if self.height == 0 {
            return line;
        }

        // A margin of half the viewport or more would never settle.
        let margin = self.margin.min((self.height - 1) / 2);
        let max_scroll = self.line_count().saturating_sub(self.height);
        if line + margin + 1 > self.scroll + self.height {
            self.scroll = (line + margin + 1 - self.height).min(max_scroll);
        } else if line < self.scroll + margin && self.scroll > 0 {
            self.scroll = line.saturating_sub(margin);
        }
        line
    }

    /// Lines `[scroll, min(line_count, scroll + height))`.
    pub fn visible_range(&self) -> Range<usize> {
        let count = self.line_count();
        let start = self.scroll.min(count);
        let end = (self.scroll + self.height).min(count);
        start..end
    }

    /// The visible slice of the file, terminators included.
    pub fn visible_text(&self) -> &str {
        match &self.file {
            Some(file) => {
                let range = self.visible_range();
                file.slice_lines(range.start, range.end)
            }
            None => "",
        }
    }

    pub fn visible_lines(&self) -> impl Iterator<Item = &str> {
        self.visible_text()
            .split_inclusive('\n')
            .map(|line| line.trim_end_matches(['\n', '\r']))
    }

    pub fn gutter(&self, ctx: &GutterContext) -> Vec<GutterLine> {
        gutter_lines(self.scroll, self.height, self.line_count(), ctx)
    }
}
