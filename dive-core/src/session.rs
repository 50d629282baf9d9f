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

//! The interactive session.
//!
//! `Session` is the only writer of navigation state. It turns logical keys
//! and session events into state changes plus the screen regions that need
//! redrawing. It never waits on the debugger: every remote interaction is
//! handed to the `Dispatcher`, whose results come back as `SessionEvent`s.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::Breakpoint;
use crate::command::{parse_command_line, suggestions, LineCommand};
use crate::config::Config;
use crate::dispatcher::{Command, Dispatcher};
use crate::events::{BreakpointEvent, DebuggerMove, FileLoaded, Notification, SessionEvent};
use crate::gutter::GutterContext;
use crate::keys::LogicalKey;
use crate::nav::{BreakpointUpdate, DebuggerPosition, Nav};
use crate::pages::{breakpoint_rows, goroutine_rows, BreakpointRow, ListState, PageKind};
use crate::renderer::DirtyRegion;
use crate::text::SourceFile;
use crate::vars::VariableTree;
use crate::viewport::Viewport;

/// Header row plus command line.
const CHROME_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Mark region as dirty for redraw
    MarkDirty(DirtyRegion),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing on the `:` line
    Command,
    /// An error banner waits for acknowledgment
    Notification,
}

fn dirty(region: DirtyRegion) -> UiAction {
    UiAction::MarkDirty(region)
}

/// Break `message` into rows of at most `width` characters.
pub fn wrap_message(message: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in message.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            rows.push(String::new());
            continue;
        }
        rows.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));
    }
    rows
}

/// Commands that resume or move the target.
fn runs_target(command: &Command) -> bool {
    matches!(
        command,
        Command::Continue
            | Command::Restart
            | Command::Next
            | Command::Step
            | Command::StepOut
            | Command::SwitchGoroutine { .. }
    )
}

pub struct Session {
    config: Arc<Config>,
    nav: Nav,
    viewport: Viewport,
    vars: VariableTree,
    dispatcher: Dispatcher,
    page: PageKind,
    lists: HashMap<PageKind, ListState>,
    mode: InputMode,
    command_line: String,
    completions: Vec<String>,
    completion_index: usize,
    notification: Option<Notification>,
    last_move_seq: u64,
    width: usize,
    height: usize,
}

impl Session {
    pub fn new(config: Arc<Config>, nav: Nav, dispatcher: Dispatcher) -> Self {
        let viewport = Viewport::new(config.scroll_margin);
        let mut session = Self {
            config,
            nav,
            viewport,
            vars: VariableTree::new(),
            dispatcher,
            page: PageKind::Code,
            lists: HashMap::new(),
            mode: InputMode::Normal,
            command_line: String::new(),
            completions: Vec::new(),
            completion_index: 0,
            notification: None,
            last_move_seq: 0,
            width: 80,
            height: 24,
        };
        session.relayout();
        session
    }

    /// Fetch what the debugger already knows: breakpoints and sources.
    pub fn start(&mut self) -> Vec<UiAction> {
        let mut actions = self.dispatch(Command::ListBreakpoints);
        actions.extend(self.dispatch(Command::ListSources));
        actions
    }

    pub fn resize(&mut self, width: usize, height: usize) -> Vec<UiAction> {
        self.width = width;
        self.height = height;
        self.relayout();
        vec![dirty(DirtyRegion::FullScreen)]
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn nav(&self) -> &Nav {
        &self.nav
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn vars(&self) -> &VariableTree {
        &self.vars
    }

    pub fn page(&self) -> PageKind {
        self.page
    }

    pub fn list_state(&self, page: PageKind) -> ListState {
        self.lists.get(&page).copied().unwrap_or_default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// True while a continue or restart runs the target freely.
    pub fn is_blocking(&self) -> bool {
        self.dispatcher.is_blocking()
    }

    pub fn gutter_context(&self) -> GutterContext<'_> {
        let path = self.nav.current_path().unwrap_or("");
        GutterContext {
            breakpoints: self.nav.breakpoints.for_file(path),
            cursor_line: self.nav.cursor() + 1,
            debugger_line: self.nav.position().line_in(path),
        }
    }

    /// The notification wrapped to the terminal width. At most a third of
    /// the screen is given to the banner.
    pub fn banner_lines(&self) -> Vec<String> {
        let Some(notification) = &self.notification else {
            return Vec::new();
        };
        let mut rows = wrap_message(&notification.message, self.width);
        rows.truncate((self.height / 3).max(1));
        rows
    }

    /// Rows available to the code view or a list page.
    pub fn body_height(&self) -> usize {
        self.height
            .saturating_sub(CHROME_ROWS + self.banner_lines().len())
    }

    fn relayout(&mut self) {
        self.viewport.set_height(self.body_height());
        if self.nav.current_file().is_some() {
            self.viewport.scroll_incremental(self.nav.cursor());
        }
        for page in PageKind::ALL {
            self.clamp_list(page);
        }
    }

    fn page_len(&self, page: PageKind) -> usize {
        match page {
            PageKind::Code => 0,
            PageKind::Breakpoints => breakpoint_rows(&self.nav.breakpoints).len(),
            PageKind::Locals => self.vars.visible().len(),
            PageKind::Stack => self.nav.stack().frames.len(),
            PageKind::Goroutines => goroutine_rows(&self.nav).len(),
        }
    }

    fn clamp_list(&mut self, page: PageKind) {
        let len = self.page_len(page);
        let height = self.body_height();
        let state = self.lists.entry(page).or_default();
        state.clamp(len);
        state.scroll_into_view(height);
    }

    fn sync_stack_selection(&mut self) {
        if let Some(selected) = self.nav.stack().selected {
            let len = self.nav.stack().frames.len();
            self.lists.entry(PageKind::Stack).or_default().select(selected, len);
        }
        self.clamp_list(PageKind::Stack);
    }

    /// Hand `command` to the dispatcher. A continue or restart first
    /// forgets the debugger position so no stale line stays
    /// highlighted while the target runs.
    pub fn dispatch(&mut self, command: Command) -> Vec<UiAction> {
        if runs_target(&command) && self.dispatcher.is_blocking() {
            warn!(?command, "target is running, command ignored");
            return Vec::new();
        }
        let mut actions = Vec::new();
        if command.is_blocking() {
            self.nav.mark_running();
            actions.extend([
                dirty(DirtyRegion::Header),
                dirty(DirtyRegion::Code),
                dirty(DirtyRegion::Page),
            ]);
        }
        self.dispatcher.dispatch(command, self.nav.snapshot());
        actions
    }

    pub fn apply_event(&mut self, event: SessionEvent) -> Vec<UiAction> {
        match event {
            SessionEvent::FileLoaded(FileLoaded { file, at_line }) => self.show_file(file, at_line),
            SessionEvent::Breakpoints(event) => self.apply_breakpoints(event),
            SessionEvent::DebuggerMove(debugger_move) => self.apply_move(*debugger_move),
            SessionEvent::Goroutines(goroutines) => {
                self.nav.set_goroutines(goroutines);
                self.clamp_list(PageKind::Goroutines);
                vec![dirty(DirtyRegion::Page)]
            }
            SessionEvent::Sources(sources) => {
                self.nav.set_source_files(sources);
                Vec::new()
            }
            SessionEvent::Notification(notification) => {
                if let Some(seq) = notification.seq {
                    self.dispatcher.resolve(seq);
                }
                self.notify(notification)
            }
        }
    }

    fn show_file(&mut self, file: Arc<SourceFile>, at_line: usize) -> Vec<UiAction> {
        info!(path = %file.path, at_line, "showing file");
        self.nav.enter_file(file);
        let line = self.nav.set_line(at_line as isize);
        if let Some(file) = self.nav.current_file().cloned() {
            self.nav.select_frame_at(&file.path, line as i64);
            self.viewport.set_text(file);
        }
        self.viewport.scroll_to_center(line);
        self.sync_stack_selection();
        self.page = PageKind::Code;
        vec![dirty(DirtyRegion::FullScreen)]
    }

    fn apply_breakpoints(&mut self, event: BreakpointEvent) -> Vec<UiAction> {
        let updates = self.dispatcher.fresh_updates(event);
        if updates.is_empty() {
            return Vec::new();
        }
        for update in updates {
            self.nav.record_breakpoint(update);
        }
        self.clamp_list(PageKind::Breakpoints);
        vec![dirty(DirtyRegion::Code), dirty(DirtyRegion::Page)]
    }

    fn apply_move(&mut self, debugger_move: DebuggerMove) -> Vec<UiAction> {
        let DebuggerMove {
            seq,
            state,
            frames,
            file,
            hit,
        } = debugger_move;
        if seq <= self.last_move_seq {
            info!(seq, last = self.last_move_seq, "discarding stale debugger move");
            self.dispatcher.resolve(seq);
            return Vec::new();
        }
        self.last_move_seq = seq;

        let goroutine = state
            .current_thread
            .as_ref()
            .map(|thread| thread.goroutine_id)
            .or_else(|| state.selected_goroutine.as_ref().map(|g| g.id));
        if let Some(id) = goroutine {
            self.nav.set_current_goroutine(id);
        }
        let position = match &state.current_thread {
            Some(thread) if !thread.file.is_empty() => DebuggerPosition {
                file: thread.file.clone(),
                line: thread.line - 1,
            },
            _ => DebuggerPosition::unknown(),
        };
        debug!(seq, ?position, frames = frames.len(), "debugger moved");
        self.nav.record_debugger_move(position.clone(), frames);

        // Refreshes hit counts, unless a later command owns the slot.
        if let Some(hit) = hit {
            let event = BreakpointEvent {
                seq,
                updates: vec![BreakpointUpdate::Upserted(hit)],
            };
            for update in self.dispatcher.fresh_updates(event) {
                self.nav.record_breakpoint(update);
            }
        }
        self.dispatcher.resolve(seq);
        self.rebuild_vars();
        self.clamp_list(PageKind::Locals);
        self.sync_stack_selection();

        let mut actions = vec![dirty(DirtyRegion::Header), dirty(DirtyRegion::Page)];
        if !position.is_unknown() {
            let file = file.or_else(|| self.nav.cached(&position.file).cloned());
            match file {
                Some(file) => actions.extend(self.show_file(file, position.line.max(0) as usize)),
                None => warn!(file = %position.file, "no source for debugger position"),
            }
        }
        actions.push(dirty(DirtyRegion::Code));
        actions.extend(self.dispatch(Command::ListGoroutines));
        actions
    }

    fn rebuild_vars(&mut self) {
        let stack = self.nav.stack();
        match stack.selected_frame().or_else(|| stack.frames.first()) {
            Some(frame) => self.vars.rebuild(&[
                ("locals", frame.locals.as_slice()),
                ("args", frame.arguments.as_slice()),
            ]),
            None => self.vars.clear(),
        }
    }

    fn notify(&mut self, notification: Notification) -> Vec<UiAction> {
        let showing_error = self.notification.as_ref().is_some_and(|n| n.is_blocking());
        if showing_error && !notification.is_blocking() {
            debug!(info = %notification.message, "error banner pending, info not shown");
            return Vec::new();
        }
        if notification.is_blocking() {
            self.mode = InputMode::Notification;
            self.command_line.clear();
            self.completions.clear();
        }
        self.notification = Some(notification);
        self.relayout();
        vec![dirty(DirtyRegion::FullScreen)]
    }

    fn dismiss_notification(&mut self) -> Vec<UiAction> {
        self.notification = None;
        self.mode = InputMode::Normal;
        self.relayout();
        vec![dirty(DirtyRegion::FullScreen)]
    }

    pub fn handle_key(&mut self, key: LogicalKey) -> Vec<UiAction> {
        match self.mode {
            InputMode::Notification => match key {
                LogicalKey::Esc | LogicalKey::Enter => self.dismiss_notification(),
                _ => Vec::new(),
            },
            InputMode::Command => self.handle_command_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: LogicalKey) -> Vec<UiAction> {
        if key == LogicalKey::AlphaNumeric(':') {
            self.mode = InputMode::Command;
            self.command_line.clear();
            self.completions.clear();
            return vec![dirty(DirtyRegion::CommandLine)];
        }
        if key == LogicalKey::Esc && self.notification.is_some() {
            return self.dismiss_notification();
        }

        let config = self.config.clone();
        if config.use_tab_navigation {
            if key.matches_binding(&config.keys.prev_tab) {
                return self.show_page(self.page.prev());
            }
            if key.matches_binding(&config.keys.next_tab) {
                return self.show_page(self.page.next());
            }
        }
        match self.page {
            PageKind::Code => self.handle_code_key(key),
            _ => self.handle_list_key(key),
        }
    }

    fn show_page(&mut self, page: PageKind) -> Vec<UiAction> {
        self.page = page;
        self.clamp_list(page);
        vec![dirty(DirtyRegion::FullScreen)]
    }

    fn handle_code_key(&mut self, key: LogicalKey) -> Vec<UiAction> {
        let Some(rows) = self.nav.current_file().map(|f| f.rows()) else {
            return Vec::new();
        };
        let config = self.config.clone();
        let keys = &config.keys;
        let cursor = self.nav.cursor() as isize;

        if key.matches_binding(&keys.line_down) {
            self.move_cursor(cursor + 1, false)
        } else if key.matches_binding(&keys.line_up) {
            self.move_cursor(cursor - 1, false)
        } else if key.matches_binding(&keys.page_top) {
            self.move_cursor(0, true)
        } else if key.matches_binding(&keys.page_end) {
            self.move_cursor(rows as isize - 2, true)
        } else if key.matches_binding(&keys.breakpoint) {
            self.toggle_breakpoint_at_cursor()
        } else if key.matches_binding(&keys.toggle_breakpoint) {
            match self.breakpoint_at_cursor() {
                Some(breakpoint) => self.dispatch(Command::ToggleBreakpoint { breakpoint }),
                None => Vec::new(),
            }
        } else if key.matches_binding(&keys.clear_breakpoint) {
            match self.breakpoint_at_cursor() {
                Some(breakpoint) => self.dispatch(Command::ClearBreakpoint { breakpoint }),
                None => Vec::new(),
            }
        } else {
            Vec::new()
        }
    }

    fn move_cursor(&mut self, line: isize, centered: bool) -> Vec<UiAction> {
        let previous = self.nav.cursor();
        let line = self.nav.set_line(line);
        if line == previous {
            return Vec::new();
        }
        let scroll = self.viewport.scroll();
        if centered {
            self.viewport.scroll_to_center(line);
        } else {
            self.viewport.scroll_incremental(line);
        }
        if self.viewport.scroll() != scroll {
            vec![dirty(DirtyRegion::Code)]
        } else {
            vec![
                dirty(DirtyRegion::Line { line: previous }),
                dirty(DirtyRegion::Line { line }),
            ]
        }
    }

    fn breakpoint_at_cursor(&self) -> Option<Breakpoint> {
        let path = self.nav.current_path()?;
        let line = self.nav.cursor() as i64 + 1;
        self.nav.breakpoints.get(path, line).cloned()
    }

    /// Clear the breakpoint on the cursor line, or create one there.
    fn toggle_breakpoint_at_cursor(&mut self) -> Vec<UiAction> {
        if let Some(breakpoint) = self.breakpoint_at_cursor() {
            return self.dispatch(Command::ClearBreakpoint { breakpoint });
        }
        let Some(file) = self.nav.current_path().map(str::to_string) else {
            return Vec::new();
        };
        let line = self.nav.cursor() as i64 + 1;
        self.dispatch(Command::CreateBreakpoint { file, line })
    }

    /// First row of every group on the current page.
    fn section_starts(&self) -> Vec<usize> {
        match self.page {
            PageKind::Breakpoints => breakpoint_rows(&self.nav.breakpoints)
                .iter()
                .enumerate()
                .filter(|(_, row)| matches!(row, BreakpointRow::File(_)))
                .map(|(i, _)| i)
                .collect(),
            PageKind::Locals => self
                .vars
                .visible()
                .into_iter()
                .enumerate()
                .filter(|(_, id)| self.vars.node(*id).is_some_and(|n| n.depth == 0))
                .map(|(i, _)| i)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn handle_list_key(&mut self, key: LogicalKey) -> Vec<UiAction> {
        let config = self.config.clone();
        let keys = &config.keys;
        let page = self.page;

        if key.matches_binding(&keys.select_item) {
            return self.select_item();
        }
        if page == PageKind::Breakpoints {
            if key.matches_binding(&keys.clear_breakpoint) {
                return match self.selected_breakpoint() {
                    Some(breakpoint) => self.dispatch(Command::ClearBreakpoint { breakpoint }),
                    None => Vec::new(),
                };
            }
            if key.matches_binding(&keys.toggle_breakpoint) {
                return match self.selected_breakpoint() {
                    Some(breakpoint) => self.dispatch(Command::ToggleBreakpoint { breakpoint }),
                    None => Vec::new(),
                };
            }
        }

        let len = self.page_len(page);
        let height = self.body_height();
        let starts = self.section_starts();
        let state = self.lists.entry(page).or_default();
        let before = *state;
        if key.matches_binding(&keys.line_down) {
            state.down(len);
        } else if key.matches_binding(&keys.line_up) {
            state.up();
        } else if key.matches_binding(&keys.page_top) {
            state.top();
        } else if key.matches_binding(&keys.page_end) {
            state.end(len);
        } else if key.matches_binding(&keys.next_section) {
            if let Some(&start) = starts.iter().find(|&&s| s > state.selected) {
                state.select(start, len);
            }
        } else if key.matches_binding(&keys.prev_section) {
            if let Some(&start) = starts.iter().rev().find(|&&s| s < state.selected) {
                state.select(start, len);
            }
        } else {
            return Vec::new();
        }
        state.scroll_into_view(height);
        if *state != before {
            vec![dirty(DirtyRegion::Page)]
        } else {
            Vec::new()
        }
    }

    fn selected_breakpoint(&self) -> Option<Breakpoint> {
        let selected = self.list_state(PageKind::Breakpoints).selected;
        match breakpoint_rows(&self.nav.breakpoints).into_iter().nth(selected) {
            Some(BreakpointRow::Breakpoint(breakpoint)) => Some(breakpoint),
            _ => None,
        }
    }

    fn select_item(&mut self) -> Vec<UiAction> {
        let selected = self.list_state(self.page).selected;
        match self.page {
            PageKind::Code => Vec::new(),
            PageKind::Breakpoints => match self.selected_breakpoint() {
                Some(breakpoint) => self.dispatch(Command::OpenFile {
                    path: breakpoint.file,
                    at_line: (breakpoint.line - 1).max(0) as usize,
                }),
                None => Vec::new(),
            },
            PageKind::Locals => {
                let Some(&id) = self.vars.visible().get(selected) else {
                    return Vec::new();
                };
                if !self.vars.toggle(id) {
                    return Vec::new();
                }
                self.clamp_list(PageKind::Locals);
                vec![dirty(DirtyRegion::Page)]
            }
            PageKind::Stack => {
                let Some(frame) = self.nav.select_frame(selected).cloned() else {
                    return Vec::new();
                };
                self.rebuild_vars();
                self.clamp_list(PageKind::Locals);
                self.dispatch(Command::OpenFile {
                    path: frame.location.file,
                    at_line: (frame.location.line - 1).max(0) as usize,
                })
            }
            PageKind::Goroutines => match goroutine_rows(&self.nav).get(selected) {
                Some(row) => {
                    let id = row.id;
                    self.dispatch(Command::SwitchGoroutine { id })
                }
                None => Vec::new(),
            },
        }
    }

    fn leave_command_mode(&mut self) {
        self.mode = InputMode::Normal;
        self.completions.clear();
    }

    fn handle_command_key(&mut self, key: LogicalKey) -> Vec<UiAction> {
        match key {
            LogicalKey::Esc => {
                self.command_line.clear();
                self.leave_command_mode();
                vec![dirty(DirtyRegion::CommandLine)]
            }
            LogicalKey::Enter => {
                let line = std::mem::take(&mut self.command_line);
                self.leave_command_mode();
                let mut actions = vec![dirty(DirtyRegion::CommandLine)];
                match parse_command_line(&line) {
                    Some(command) => actions.extend(self.run_line_command(command)),
                    None => debug!(%line, "ignoring command line"),
                }
                actions
            }
            LogicalKey::Backspace => {
                self.command_line.pop();
                self.completions.clear();
                vec![dirty(DirtyRegion::CommandLine)]
            }
            LogicalKey::Tab => self.complete(),
            LogicalKey::AlphaNumeric(c) => {
                self.command_line.push(c);
                self.completions.clear();
                vec![dirty(DirtyRegion::CommandLine)]
            }
            _ => Vec::new(),
        }
    }

    /// Replace the line with the next completion, cycling through them.
    fn complete(&mut self) -> Vec<UiAction> {
        if self.completions.is_empty() {
            self.completions = suggestions(
                &self.command_line,
                self.nav.project_root(),
                self.nav.source_files(),
            );
            self.completion_index = 0;
        }
        let Some(candidate) = self.completions.get(self.completion_index) else {
            return Vec::new();
        };
        self.command_line = candidate.clone();
        self.completion_index = (self.completion_index + 1) % self.completions.len();
        vec![dirty(DirtyRegion::CommandLine)]
    }

    fn run_line_command(&mut self, command: LineCommand) -> Vec<UiAction> {
        info!(?command, "command line");
        match command {
            LineCommand::Open(path) => self.dispatch(Command::OpenFile { path, at_line: 0 }),
            LineCommand::ShowPage(page) => self.show_page(page),
            LineCommand::Restart => self.dispatch(Command::Restart),
            LineCommand::Continue => self.dispatch(Command::Continue),
            LineCommand::Next => self.dispatch(Command::Next),
            LineCommand::Step => self.dispatch(Command::Step),
            LineCommand::StepOut => self.dispatch(Command::StepOut),
            LineCommand::Quit => vec![UiAction::Quit],
        }
    }
}
