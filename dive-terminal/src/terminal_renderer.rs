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

use std::io::Write;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use dive_core::events::{EventReceivers, NotificationKind};
use dive_core::gutter::{
    breakpoint_glyph, calculate_gutter_width, format_line_number, line_highlight,
    BreakpointGlyph, GutterConfig, GutterLine, LineHighlight,
};
use dive_core::keys::LogicalKey;
use dive_core::pages::{breakpoint_rows, goroutine_rows, stack_rows, BreakpointRow, PageKind};
use dive_core::renderer::{DirtyRegion, DirtyTracker, Renderer};
use dive_core::session::{InputMode, Session, UiAction};
use futures::{future::FutureExt, select, StreamExt};
use tracing::{info, warn};

pub const BG_COLOR: Color = Color::Black;
pub const FG_COLOR: Color = Color::White;
pub const HEADER_BG_COLOR: Color = Color::Blue;
pub const ACTIVE_TAB_COLOR: Color = Color::Yellow;
pub const HINT_COLOR: Color = Color::DarkGrey;
pub const FILE_HEADING_COLOR: Color = Color::Green;
pub const SELECTED_BG_COLOR: Color = Color::DarkBlue;
pub const ERROR_BG_COLOR: Color = Color::DarkRed;
pub const INFO_BG_COLOR: Color = Color::DarkGreen;

// Gutter colors
pub const GUTTER_BG_COLOR: Color = Color::Rgb {
    r: 20,
    g: 20,
    b: 20,
};
pub const GUTTER_FG_COLOR: Color = Color::DarkGrey;
pub const BREAKPOINT_COLOR: Color = Color::Red;
pub const DISABLED_BREAKPOINT_COLOR: Color = Color::DarkGrey;
pub const ACTIVE_BREAKPOINT_COLOR: Color = Color::Yellow;
pub const CURSOR_LINE_BG_COLOR: Color = Color::Rgb {
    r: 40,
    g: 40,
    b: 50,
};
pub const DEBUGGER_LINE_BG_COLOR: Color = Color::Rgb {
    r: 70,
    g: 60,
    b: 0,
};

/// First screen row of the code view and list pages
pub const BODY_TOP: u16 = 1;
pub const TAB_WIDTH: usize = 4;
pub const EMPTY_LINE_MARKER: &str = "~";

/// Expand tabs, which Go sources are full of.
fn expand_tabs(line: &str) -> String {
    line.replace('\t', &" ".repeat(TAB_WIDTH))
}

/// Cut or pad `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

fn display_binding(binding: &str) -> String {
    LogicalKey::parse_binding(binding)
        .map(|key| key.as_display_string())
        .unwrap_or_else(|| binding.to_string())
}

/// A row of a list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRow {
    pub text: String,
    /// File names on the breakpoints page, section headers on the locals page
    pub heading: bool,
}

pub fn page_rows(session: &Session) -> Vec<PageRow> {
    match session.page() {
        PageKind::Code => Vec::new(),
        PageKind::Breakpoints => breakpoint_rows(&session.nav().breakpoints)
            .iter()
            .map(|row| PageRow {
                text: row.label(),
                heading: matches!(row, BreakpointRow::File(_)),
            })
            .collect(),
        PageKind::Locals => {
            let vars = session.vars();
            vars.visible()
                .into_iter()
                .filter_map(|id| vars.node(id))
                .map(|node| PageRow {
                    text: format!("{}{}", "  ".repeat(node.depth), node.label),
                    heading: node.depth == 0,
                })
                .collect()
        }
        PageKind::Stack => {
            let selected = session.nav().stack().selected;
            stack_rows(session.nav().stack())
                .into_iter()
                .enumerate()
                .map(|(i, label)| {
                    let marker = if selected == Some(i) { ">" } else { " " };
                    PageRow {
                        text: format!("{marker} {label}"),
                        heading: false,
                    }
                })
                .collect()
        }
        PageKind::Goroutines => goroutine_rows(session.nav())
            .into_iter()
            .map(|row| PageRow {
                text: row.label,
                heading: false,
            })
            .collect(),
    }
}

fn empty_page_text(page: PageKind) -> &'static str {
    match page {
        PageKind::Code => "No file open. Use :open <path>",
        PageKind::Breakpoints => "No breakpoints",
        PageKind::Locals => "No variables",
        PageKind::Stack => "No stack",
        PageKind::Goroutines => "No goroutines",
    }
}

/// Status shown on the right of the header.
pub fn status_text(session: &Session) -> String {
    if session.is_blocking() {
        return "running".to_string();
    }
    let position = session.nav().position();
    if position.is_unknown() {
        return "not stopped".to_string();
    }
    let file = position.file.rsplit('/').next().unwrap_or(&position.file);
    format!(
        "stopped at {}:{} (goroutine {})",
        file,
        position.line + 1,
        session.nav().current_goroutine()
    )
}

/// Terminal-specific renderer using crossterm
pub struct TerminalRenderer<W: Write> {
    device: W,
    dirty_tracker: DirtyTracker,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(device: W) -> Self {
        Self {
            device,
            dirty_tracker: DirtyTracker::new(),
        }
    }

    pub fn device(&self) -> &W {
        &self.device
    }

    fn width(session: &Session) -> usize {
        session.size().0
    }

    fn draw_header(&mut self, session: &Session) -> Result<(), std::io::Error> {
        let width = Self::width(session);
        queue!(&mut self.device, cursor::MoveTo(0, 0))?;
        let mut used = 0;
        for page in PageKind::ALL {
            let tab = format!(" {} ", page.name());
            if used + tab.chars().count() > width {
                break;
            }
            used += tab.chars().count();
            if page == session.page() {
                queue!(
                    &mut self.device,
                    Print(
                        tab.with(ACTIVE_TAB_COLOR)
                            .on(HEADER_BG_COLOR)
                            .attribute(Attribute::Bold)
                    )
                )?;
            } else {
                queue!(&mut self.device, Print(tab.with(FG_COLOR).on(HEADER_BG_COLOR)))?;
            }
        }

        let file = session.nav().current_path().unwrap_or("");
        let root = session.nav().project_root().to_string_lossy();
        let file = file
            .strip_prefix(&*root)
            .map(|rel| rel.trim_start_matches('/'))
            .unwrap_or(file);
        let rest = format!(" {}  [{}]", file, status_text(session));
        queue!(
            &mut self.device,
            Print(fit(&rest, width.saturating_sub(used)).with(FG_COLOR).on(HEADER_BG_COLOR))
        )?;
        Ok(())
    }

    fn draw_code_row(
        &mut self,
        row: u16,
        line: Option<(&GutterLine, &str)>,
        gutter_width: usize,
        width: usize,
    ) -> Result<(), std::io::Error> {
        queue!(&mut self.device, cursor::MoveTo(0, row))?;
        let Some((gutter, text)) = line else {
            queue!(
                &mut self.device,
                Print(fit(EMPTY_LINE_MARKER, width).with(GUTTER_FG_COLOR).on(BG_COLOR))
            )?;
            return Ok(());
        };

        let (glyph, glyph_color) = match gutter.glyph {
            BreakpointGlyph::None => (" ", GUTTER_FG_COLOR),
            BreakpointGlyph::Enabled => ("●", BREAKPOINT_COLOR),
            BreakpointGlyph::Disabled => ("○", DISABLED_BREAKPOINT_COLOR),
            BreakpointGlyph::Active => ("◆", ACTIVE_BREAKPOINT_COLOR),
        };
        let background = match gutter.highlight {
            LineHighlight::Default => BG_COLOR,
            LineHighlight::Cursor => CURSOR_LINE_BG_COLOR,
            LineHighlight::DebuggerPosition => DEBUGGER_LINE_BG_COLOR,
        };
        let number = format!(
            "{} ",
            format_line_number(gutter.line_number, gutter_width.saturating_sub(2))
        );
        let text = fit(&expand_tabs(text), width.saturating_sub(gutter_width));
        queue!(
            &mut self.device,
            Print(glyph.with(glyph_color).on(GUTTER_BG_COLOR)),
            Print(number.with(GUTTER_FG_COLOR).on(GUTTER_BG_COLOR)),
            Print(text.with(FG_COLOR).on(background))
        )?;
        Ok(())
    }

    fn gutter_width(session: &Session) -> usize {
        calculate_gutter_width(session.viewport().line_count(), &GutterConfig::default())
    }

    fn draw_code(&mut self, session: &Session) -> Result<(), std::io::Error> {
        let width = Self::width(session);
        let viewport = session.viewport();
        if viewport.file().is_none() {
            return self.draw_placeholder(session, empty_page_text(PageKind::Code));
        }
        let gutter_width = Self::gutter_width(session);
        let gutter = viewport.gutter(&session.gutter_context());
        let lines: Vec<&str> = viewport.visible_lines().collect();
        for i in 0..viewport.height() {
            let line = gutter.get(i).zip(lines.get(i).copied());
            self.draw_code_row(BODY_TOP + i as u16, line, gutter_width, width)?;
        }
        Ok(())
    }

    /// Redraw one file line (0-based) if it is on screen.
    fn draw_code_line(&mut self, session: &Session, line: usize) -> Result<(), std::io::Error> {
        let viewport = session.viewport();
        let Some(file) = viewport.file() else {
            return Ok(());
        };
        if !viewport.visible_range().contains(&line) {
            return Ok(());
        }
        let ctx = session.gutter_context();
        let gutter = GutterLine {
            line_number: line + 1,
            glyph: breakpoint_glyph(&ctx, line + 1),
            highlight: line_highlight(&ctx, line + 1),
        };
        let text = file.line(line).unwrap_or("").trim_end_matches(['\n', '\r']);
        let row = BODY_TOP + (line - viewport.scroll()) as u16;
        self.draw_code_row(
            row,
            Some((&gutter, text)),
            Self::gutter_width(session),
            Self::width(session),
        )
    }

    fn draw_placeholder(&mut self, session: &Session, text: &str) -> Result<(), std::io::Error> {
        let width = Self::width(session);
        for i in 0..session.body_height() {
            let content = if i == 0 { text } else { "" };
            queue!(
                &mut self.device,
                cursor::MoveTo(0, BODY_TOP + i as u16),
                Print(fit(content, width).with(HINT_COLOR).on(BG_COLOR))
            )?;
        }
        Ok(())
    }

    fn draw_page(&mut self, session: &Session) -> Result<(), std::io::Error> {
        let rows = page_rows(session);
        if rows.is_empty() {
            return self.draw_placeholder(session, empty_page_text(session.page()));
        }
        let width = Self::width(session);
        let state = session.list_state(session.page());
        for i in 0..session.body_height() {
            let index = state.scroll + i;
            queue!(&mut self.device, cursor::MoveTo(0, BODY_TOP + i as u16))?;
            let Some(row) = rows.get(index) else {
                queue!(&mut self.device, Print(fit("", width).on(BG_COLOR)))?;
                continue;
            };
            let background = if index == state.selected {
                SELECTED_BG_COLOR
            } else {
                BG_COLOR
            };
            let foreground = if row.heading {
                FILE_HEADING_COLOR
            } else {
                FG_COLOR
            };
            queue!(
                &mut self.device,
                Print(fit(&row.text, width).with(foreground).on(background))
            )?;
        }
        Ok(())
    }

    fn draw_body(&mut self, session: &Session) -> Result<(), std::io::Error> {
        match session.page() {
            PageKind::Code => self.draw_code(session),
            _ => self.draw_page(session),
        }
    }

    fn draw_banner(&mut self, session: &Session) -> Result<(), std::io::Error> {
        let Some(notification) = session.notification() else {
            return Ok(());
        };
        let background = match notification.kind {
            NotificationKind::Error => ERROR_BG_COLOR,
            NotificationKind::Info => INFO_BG_COLOR,
        };
        let width = Self::width(session);
        let top = BODY_TOP + session.body_height() as u16;
        for (i, line) in session.banner_lines().iter().enumerate() {
            queue!(
                &mut self.device,
                cursor::MoveTo(0, top + i as u16),
                Print(fit(line, width).with(FG_COLOR).on(background))
            )?;
        }
        Ok(())
    }

    fn command_row(session: &Session) -> u16 {
        session.size().1.saturating_sub(1) as u16
    }

    fn draw_command_line(&mut self, session: &Session) -> Result<(), std::io::Error> {
        let width = Self::width(session);
        let keys = &session.config().keys;
        let (text, color) = match session.mode() {
            InputMode::Command => (format!(":{}", session.command_line()), FG_COLOR),
            InputMode::Notification => ("Esc: dismiss".to_string(), HINT_COLOR),
            InputMode::Normal => (
                format!(
                    "{}/{}: pages  {}: breakpoint  :  command",
                    display_binding(&keys.prev_tab),
                    display_binding(&keys.next_tab),
                    display_binding(&keys.breakpoint),
                ),
                HINT_COLOR,
            ),
        };
        queue!(
            &mut self.device,
            cursor::MoveTo(0, Self::command_row(session)),
            Print(fit(&text, width).with(color).on(BG_COLOR))
        )?;
        Ok(())
    }

    fn place_cursor(&mut self, session: &Session) -> Result<(), std::io::Error> {
        if session.mode() == InputMode::Command {
            let x = 1 + session.command_line().chars().count();
            queue!(
                &mut self.device,
                cursor::MoveTo(x as u16, Self::command_row(session)),
                cursor::Show
            )?;
        } else {
            queue!(&mut self.device, cursor::Hide)?;
        }
        Ok(())
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    type Error = std::io::Error;

    fn mark_dirty(&mut self, region: DirtyRegion) {
        self.dirty_tracker.mark_dirty(region);
    }

    fn render_incremental(&mut self, session: &Session) -> Result<(), std::io::Error> {
        if self.dirty_tracker.is_full_screen_dirty() {
            return self.render_full(session);
        }
        if self.dirty_tracker.is_clean() {
            return Ok(());
        }

        queue!(&mut self.device, cursor::Hide)?;
        if self.dirty_tracker.is_dirty(DirtyRegion::Header) {
            self.draw_header(session)?;
        }
        match session.page() {
            PageKind::Code => {
                if self.dirty_tracker.is_dirty(DirtyRegion::Code) {
                    self.draw_code(session)?;
                } else {
                    let lines: Vec<usize> = self.dirty_tracker.dirty_lines().collect();
                    for line in lines {
                        self.draw_code_line(session, line)?;
                    }
                }
            }
            _ => {
                if self.dirty_tracker.is_dirty(DirtyRegion::Page) {
                    self.draw_page(session)?;
                }
            }
        }
        if self.dirty_tracker.is_dirty(DirtyRegion::Banner) {
            self.draw_banner(session)?;
        }
        if self.dirty_tracker.is_dirty(DirtyRegion::CommandLine) {
            self.draw_command_line(session)?;
        }
        self.place_cursor(session)?;
        self.device.flush()
    }

    fn render_full(&mut self, session: &Session) -> Result<(), std::io::Error> {
        queue!(&mut self.device, cursor::Hide, Clear(ClearType::All))?;
        self.draw_header(session)?;
        self.draw_body(session)?;
        self.draw_banner(session)?;
        self.draw_command_line(session)?;
        self.place_cursor(session)?;
        self.device.flush()
    }

    fn clear_dirty(&mut self) {
        self.dirty_tracker.clear();
    }
}

pub fn translate_key(code: &KeyCode, modifiers: KeyModifiers) -> LogicalKey {
    match code {
        KeyCode::Backspace => LogicalKey::Backspace,
        KeyCode::Enter => LogicalKey::Enter,
        KeyCode::Left => LogicalKey::Left,
        KeyCode::Right => LogicalKey::Right,
        KeyCode::Up => LogicalKey::Up,
        KeyCode::Down => LogicalKey::Down,
        KeyCode::Home => LogicalKey::Home,
        KeyCode::End => LogicalKey::End,
        KeyCode::PageUp => LogicalKey::PageUp,
        KeyCode::PageDown => LogicalKey::PageDown,
        KeyCode::Tab => LogicalKey::Tab,
        KeyCode::BackTab => LogicalKey::BackTab,
        KeyCode::Delete => LogicalKey::Delete,
        KeyCode::Esc => LogicalKey::Esc,
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => {
            LogicalKey::Control(c.to_ascii_lowercase())
        }
        KeyCode::Char(c) => LogicalKey::AlphaNumeric(*c),
        _ => LogicalKey::Unmapped,
    }
}

/// Apply session actions to the renderer. Returns true on quit.
fn apply_actions<W: Write>(renderer: &mut TerminalRenderer<W>, actions: Vec<UiAction>) -> bool {
    let mut quit = false;
    for action in actions {
        match action {
            UiAction::MarkDirty(region) => renderer.mark_dirty(region),
            UiAction::Quit => quit = true,
        }
    }
    quit
}

/// Run until the user quits. Terminal input and session events are merged
/// into one stream; the session is only ever touched from here.
pub async fn event_loop<W: Write>(
    renderer: &mut TerminalRenderer<W>,
    session: &mut Session,
    receivers: &mut EventReceivers,
) -> Result<(), std::io::Error> {
    let mut event_stream = EventStream::new();
    renderer.render_full(session)?;
    renderer.clear_dirty();

    loop {
        let actions = select! {
            event = event_stream.next().fuse() => match event {
                Some(Ok(Event::Key(keystroke))) if keystroke.kind == KeyEventKind::Press => {
                    session.handle_key(translate_key(&keystroke.code, keystroke.modifiers))
                }
                Some(Ok(Event::Resize(width, height))) => {
                    session.resize(width as usize, height as usize)
                }
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) => return Err(e),
                None => {
                    warn!("terminal event stream ended");
                    return Ok(());
                }
            },
            event = receivers.recv().fuse() => match event {
                Some(event) => session.apply_event(event),
                None => {
                    warn!("session event channels closed");
                    return Ok(());
                }
            },
        };

        if apply_actions(renderer, actions) {
            info!("quit requested");
            return Ok(());
        }
        renderer.render_incremental(session)?;
        renderer.clear_dirty();
    }
}
