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

use std::collections::BTreeSet;

use crate::session::Session;

/// A part of the screen that needs redrawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirtyRegion {
    /// Title row: file name, debugger state
    Header,
    /// One line of the code page (0-based file line)
    Line { line: usize },
    /// The whole code page, gutter included
    Code,
    /// The current list page (breakpoints, locals, stack, goroutines)
    Page,
    /// Notification banner
    Banner,
    CommandLine,
    /// Layout changed; redraw everything
    FullScreen,
}

/// Collects dirty regions between renders
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    lines: BTreeSet<usize>,
    regions: Vec<DirtyRegion>,
    full_screen_dirty: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, region: DirtyRegion) {
        match region {
            DirtyRegion::Line { line } => {
                self.lines.insert(line);
            }
            DirtyRegion::FullScreen => self.full_screen_dirty = true,
            other => {
                if !self.regions.contains(&other) {
                    self.regions.push(other);
                }
            }
        }
    }

    pub fn is_dirty(&self, region: DirtyRegion) -> bool {
        self.full_screen_dirty || self.regions.contains(&region)
    }

    pub fn is_line_dirty(&self, line: usize) -> bool {
        self.full_screen_dirty
            || self.regions.contains(&DirtyRegion::Code)
            || self.lines.contains(&line)
    }

    /// Code lines marked individually, in order
    pub fn dirty_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.iter().copied()
    }

    pub fn is_full_screen_dirty(&self) -> bool {
        self.full_screen_dirty
    }

    pub fn is_clean(&self) -> bool {
        !self.full_screen_dirty && self.regions.is_empty() && self.lines.is_empty()
    }

    /// Clear all dirty state (call after rendering)
    pub fn clear(&mut self) {
        self.lines.clear();
        self.regions.clear();
        self.full_screen_dirty = false;
    }
}

/// Trait for pluggable rendering backends
pub trait Renderer {
    type Error;

    /// Mark a region as needing redraw
    fn mark_dirty(&mut self, region: DirtyRegion);

    /// Redraw only what was marked dirty
    fn render_incremental(&mut self, session: &Session) -> Result<(), Self::Error>;

    /// Force a full screen redraw
    fn render_full(&mut self, session: &Session) -> Result<(), Self::Error>;

    /// Clear all dirty state (called after successful render)
    fn clear_dirty(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_marking() {
        let mut tracker = DirtyTracker::new();
        assert!(tracker.is_clean());
        tracker.mark_dirty(DirtyRegion::Line { line: 7 });
        tracker.mark_dirty(DirtyRegion::Line { line: 3 });
        assert!(tracker.is_line_dirty(7));
        assert!(!tracker.is_line_dirty(4));
        assert_eq!(tracker.dirty_lines().collect::<Vec<_>>(), vec![3, 7]);
        tracker.clear();
        assert!(!tracker.is_line_dirty(7));
        assert!(tracker.is_clean());
    }

    #[test]
    fn test_code_region_covers_lines() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty(DirtyRegion::Code);
        tracker.mark_dirty(DirtyRegion::Code);
        assert!(tracker.is_line_dirty(100));
        assert!(tracker.is_dirty(DirtyRegion::Code));
        assert!(!tracker.is_dirty(DirtyRegion::Banner));
    }

    #[test]
    fn test_full_screen() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty(DirtyRegion::FullScreen);
        assert!(tracker.is_full_screen_dirty());
        assert!(tracker.is_dirty(DirtyRegion::Header));
        assert!(tracker.is_line_dirty(0));
    }
}
