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

//! Gutter annotations for the code viewport.
//!
//! The gutter is displayed on the left side of the code page and shows:
//! - Line numbers (right-aligned)
//! - Breakpoint glyphs (enabled, disabled, hit by the debugger)
//! - Which line is the cursor and which is the debugger position

use std::collections::BTreeMap;

use crate::api::Breakpoint;

/// Breakpoint marker shown next to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointGlyph {
    None,
    Enabled,
    Disabled,
    /// Breakpoint on the line the debugger is stopped at
    Active,
}

/// Highlight of a gutter row. Debugger position wins over cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHighlight {
    Default,
    Cursor,
    DebuggerPosition,
}

/// Information needed to render a line's gutter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterLine {
    /// 1-based line number
    pub line_number: usize,
    pub glyph: BreakpointGlyph,
    pub highlight: LineHighlight,
}

/// What the gutter needs to know about the session for one file.
#[derive(Debug, Clone, Copy)]
pub struct GutterContext<'a> {
    /// Breakpoints of the displayed file, keyed by 1-based line
    pub breakpoints: Option<&'a BTreeMap<i64, Breakpoint>>,
    /// 1-based cursor line
    pub cursor_line: usize,
    /// 1-based debugger line, `None` when the debugger is elsewhere or running
    pub debugger_line: Option<usize>,
}

/// Configuration for gutter rendering
#[derive(Debug, Clone)]
pub struct GutterConfig {
    /// Minimum width for line numbers (in characters)
    pub min_line_number_width: usize,
}

impl Default for GutterConfig {
    fn default() -> Self {
        Self {
            min_line_number_width: 3,
        }
    }
}

/// Calculate the width of the gutter in characters
///
/// Gutter layout: [glyph][line_number][separator]
pub fn calculate_gutter_width(total_lines: usize, config: &GutterConfig) -> usize {
    let digits_needed = if total_lines == 0 {
        1
    } else {
        ((total_lines as f64).log10().floor() as usize) + 1
    };
    1 + digits_needed.max(config.min_line_number_width) + 1
}

/// Format line number for display (right-aligned)
pub fn format_line_number(line_number: usize, width: usize) -> String {
    format!("{:>width$}", line_number, width = width)
}

pub fn breakpoint_glyph(ctx: &GutterContext, line_number: usize) -> BreakpointGlyph {
    let Some(bp) = ctx
        .breakpoints
        .and_then(|lines| lines.get(&(line_number as i64)))
    else {
        return BreakpointGlyph::None;
    };
    if ctx.debugger_line == Some(line_number) {
        BreakpointGlyph::Active
    } else if bp.disabled {
        BreakpointGlyph::Disabled
    } else {
        BreakpointGlyph::Enabled
    }
}

pub fn line_highlight(ctx: &GutterContext, line_number: usize) -> LineHighlight {
    if ctx.debugger_line == Some(line_number) {
        LineHighlight::DebuggerPosition
    } else if ctx.cursor_line == line_number {
        LineHighlight::Cursor
    } else {
        LineHighlight::Default
    }
}

/// Gutter rows for physical lines `[scroll + 1, scroll + height]`, stopping at
/// the end of the file.
pub fn gutter_lines(
    scroll: usize,
    height: usize,
    line_count: usize,
    ctx: &GutterContext,
) -> Vec<GutterLine> {
    let last = (scroll + height).min(line_count);
    (scroll + 1..=last)
        .map(|line_number| GutterLine {
            line_number,
            glyph: breakpoint_glyph(ctx, line_number),
            highlight: line_highlight(ctx, line_number),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bp_at(line: i64, disabled: bool) -> Breakpoint {
        Breakpoint {
            id: line,
            file: "/p/main.go".to_string(),
            line,
            disabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_gutter_width_small_file() {
        let config = GutterConfig::default();
        // 10 lines needs 2 digits, min is 3, plus glyph and separator
        assert_eq!(calculate_gutter_width(10, &config), 5);
    }

    #[test]
    fn test_gutter_width_large_file() {
        let config = GutterConfig::default();
        assert_eq!(calculate_gutter_width(12000, &config), 7);
    }

    #[test]
    fn test_format_line_number() {
        assert_eq!(format_line_number(1, 3), "  1");
        assert_eq!(format_line_number(42, 3), " 42");
        assert_eq!(format_line_number(1000, 4), "1000");
    }

    #[test]
    fn test_highlight_priority() {
        let ctx = GutterContext {
            breakpoints: None,
            cursor_line: 4,
            debugger_line: Some(4),
        };
        assert_eq!(line_highlight(&ctx, 4), LineHighlight::DebuggerPosition);

        let ctx = GutterContext {
            debugger_line: Some(7),
            ..ctx
        };
        assert_eq!(line_highlight(&ctx, 4), LineHighlight::Cursor);
        assert_eq!(line_highlight(&ctx, 7), LineHighlight::DebuggerPosition);
        assert_eq!(line_highlight(&ctx, 5), LineHighlight::Default);
    }

    #[test]
    fn test_breakpoint_glyphs() {
        let mut lines = BTreeMap::new();
        lines.insert(2, bp_at(2, false));
        lines.insert(3, bp_at(3, true));
        lines.insert(5, bp_at(5, false));
        let ctx = GutterContext {
            breakpoints: Some(&lines),
            cursor_line: 1,
            debugger_line: Some(5),
        };
        assert_eq!(breakpoint_glyph(&ctx, 1), BreakpointGlyph::None);
        assert_eq!(breakpoint_glyph(&ctx, 2), BreakpointGlyph::Enabled);
        assert_eq!(breakpoint_glyph(&ctx, 3), BreakpointGlyph::Disabled);
        assert_eq!(breakpoint_glyph(&ctx, 5), BreakpointGlyph::Active);
    }

    #[test]
    fn test_gutter_lines_stop_at_end_of_file() {
        let ctx = GutterContext {
            breakpoints: None,
            cursor_line: 9,
            debugger_line: None,
        };
        let rows = gutter_lines(6, 10, 9, &ctx);
        let numbers: Vec<usize> = rows.iter().map(|row| row.line_number).collect();
        assert_eq!(numbers, vec![7, 8, 9]);
        assert_eq!(rows[2].highlight, LineHighlight::Cursor);
        assert!(gutter_lines(0, 10, 0, &ctx).is_empty());
    }
}
