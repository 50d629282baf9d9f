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

/// The keys Dive cares about, mapped from the terminal's physical key codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LogicalKey {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    AlphaNumeric(char),
    /// A character typed with Control held
    Control(char),
    Backspace,
    Enter,
    Home,
    End,
    Tab,
    BackTab,
    Delete,
    Esc,
    Unmapped,
}

impl LogicalKey {
    /// Parse a key binding as written in the configuration file.
    ///
    /// A single character binds that character; named keys use the names
    /// below; `C-x` binds Control-x.
    pub fn parse_binding(binding: &str) -> Option<LogicalKey> {
        let mut chars = binding.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(LogicalKey::AlphaNumeric(c));
        }
        if let Some(rest) = binding.strip_prefix("C-") {
            let mut chars = rest.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Some(LogicalKey::Control(c.to_ascii_lowercase()));
            }
            return None;
        }
        let key = match binding {
            "Left" => LogicalKey::Left,
            "Right" => LogicalKey::Right,
            "Up" => LogicalKey::Up,
            "Down" => LogicalKey::Down,
            "PgUp" => LogicalKey::PageUp,
            "PgDn" => LogicalKey::PageDown,
            "Backspace" => LogicalKey::Backspace,
            "Enter" => LogicalKey::Enter,
            "Home" => LogicalKey::Home,
            "End" => LogicalKey::End,
            "Tab" => LogicalKey::Tab,
            "Backtab" => LogicalKey::BackTab,
            "Delete" => LogicalKey::Delete,
            "Esc" => LogicalKey::Esc,
            _ => return None,
        };
        Some(key)
    }

    pub fn matches_binding(&self, binding: &str) -> bool {
        Self::parse_binding(binding) == Some(*self)
    }

    pub fn as_display_string(&self) -> String {
        let s = match self {
            LogicalKey::Left => "←",
            LogicalKey::Right => "→",
            LogicalKey::Up => "↑",
            LogicalKey::Down => "↓",
            LogicalKey::PageUp => "PgUp",
            LogicalKey::PageDown => "PgDn",
            LogicalKey::AlphaNumeric(a) => return a.to_string(),
            LogicalKey::Control(c) => return format!("C-{c}"),
            LogicalKey::Backspace => "⌫",
            LogicalKey::Enter => "⏎",
            LogicalKey::Home => "Home",
            LogicalKey::End => "End",
            LogicalKey::Tab => "Tab",
            LogicalKey::BackTab => "S-Tab",
            LogicalKey::Delete => "Del",
            LogicalKey::Esc => "Esc",
            LogicalKey::Unmapped => "Unmapped",
        };
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_character_bindings() {
        assert!(LogicalKey::AlphaNumeric('j').matches_binding("j"));
        assert!(LogicalKey::AlphaNumeric('G').matches_binding("G"));
        assert!(!LogicalKey::AlphaNumeric('g').matches_binding("G"));
    }

    #[test]
    fn test_named_bindings() {
        assert!(LogicalKey::Tab.matches_binding("Tab"));
        assert!(LogicalKey::BackTab.matches_binding("Backtab"));
        assert!(LogicalKey::Enter.matches_binding("Enter"));
        assert!(!LogicalKey::Enter.matches_binding("Esc"));
    }

    #[test]
    fn test_control_bindings() {
        assert_eq!(
            LogicalKey::parse_binding("C-n"),
            Some(LogicalKey::Control('n'))
        );
        assert_eq!(LogicalKey::parse_binding("C-"), None);
        assert_eq!(LogicalKey::parse_binding("Hyper"), None);
        assert_eq!(LogicalKey::parse_binding(""), None);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(LogicalKey::AlphaNumeric('b').as_display_string(), "b");
        assert_eq!(LogicalKey::Control('c').as_display_string(), "C-c");
        assert_eq!(LogicalKey::Tab.as_display_string(), "Tab");
    }
}
