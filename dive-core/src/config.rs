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

//! User configuration, read from a TOML file.
//!
//! Every field has a default, so an empty or partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::LoadConfig;
use crate::error::ConfigError;
use crate::keys::LogicalKey;
use crate::viewport::DEFAULT_SCROLL_MARGIN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub prev_tab: String,
    pub next_tab: String,
    pub breakpoint: String,
    pub page_top: String,
    pub page_end: String,
    pub line_up: String,
    pub line_down: String,
    pub toggle_breakpoint: String,
    pub clear_breakpoint: String,
    pub prev_section: String,
    pub next_section: String,
    pub select_item: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            prev_tab: "h".to_string(),
            next_tab: "l".to_string(),
            breakpoint: "b".to_string(),
            page_top: "g".to_string(),
            page_end: "G".to_string(),
            line_up: "k".to_string(),
            line_down: "j".to_string(),
            toggle_breakpoint: "d".to_string(),
            clear_breakpoint: "D".to_string(),
            prev_section: "Backtab".to_string(),
            next_section: "Tab".to_string(),
            select_item: "Enter".to_string(),
        }
    }
}

impl KeyBindings {
    fn entries(&self) -> [(&'static str, &str); 12] {
        [
            ("prev_tab", self.prev_tab.as_str()),
            ("next_tab", self.next_tab.as_str()),
            ("breakpoint", self.breakpoint.as_str()),
            ("page_top", self.page_top.as_str()),
            ("page_end", self.page_end.as_str()),
            ("line_up", self.line_up.as_str()),
            ("line_down", self.line_down.as_str()),
            ("toggle_breakpoint", self.toggle_breakpoint.as_str()),
            ("clear_breakpoint", self.clear_breakpoint.as_str()),
            ("prev_section", self.prev_section.as_str()),
            ("next_section", self.next_section.as_str()),
            ("select_item", self.select_item.as_str()),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.entries() {
            if LogicalKey::parse_binding(value).is_none() {
                return Err(ConfigError::InvalidBinding {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// How much of each variable to load when the debugger stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSettings {
    pub follow_pointers: bool,
    pub max_variable_recurse: i64,
    pub max_string_len: i64,
    pub max_array_values: i64,
    /// -1 loads every field
    pub max_struct_fields: i64,
}

impl Default for LoadSettings {
    fn default() -> Self {
        let load = LoadConfig::default();
        Self {
            follow_pointers: load.follow_pointers,
            max_variable_recurse: load.max_variable_recurse,
            max_string_len: load.max_string_len,
            max_array_values: load.max_array_values,
            max_struct_fields: load.max_struct_fields,
        }
    }
}

impl From<LoadSettings> for LoadConfig {
    fn from(settings: LoadSettings) -> Self {
        LoadConfig {
            follow_pointers: settings.follow_pointers,
            max_variable_recurse: settings.max_variable_recurse,
            max_string_len: settings.max_string_len,
            max_array_values: settings.max_array_values,
            max_struct_fields: settings.max_struct_fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Switch pages with the prev/next tab keys
    pub use_tab_navigation: bool,
    pub keys: KeyBindings,
    pub scroll_margin: usize,
    /// Frames fetched per debugger move
    pub stack_depth: i64,
    /// Goroutines fetched per listing
    pub goroutine_count: i64,
    pub load: LoadSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_tab_navigation: true,
            keys: KeyBindings::default(),
            scroll_margin: DEFAULT_SCROLL_MARGIN,
            stack_depth: 5,
            goroutine_count: 99,
            load: LoadSettings::default(),
        }
    }
}

impl Config {
    pub fn load_config(&self) -> LoadConfig {
        self.load.into()
    }

    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.keys.validate()?;
        Ok(config)
    }

    /// Where the configuration is looked for, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dive").join("config.toml"));
        }
        paths.push(PathBuf::from("config.toml"));
        paths
    }

    /// Load from `path`, or from the first existing search path. A missing
    /// file means defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let found = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };
        let Some(path) = found else {
            info!("no config file found, using defaults");
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "loaded config");
        Self::from_toml(&text, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.use_tab_navigation);
        assert_eq!(config.keys.line_down, "j");
        assert_eq!(config.keys.select_item, "Enter");
        assert_eq!(config.scroll_margin, 5);
        assert_eq!(config.load_config(), LoadConfig::default());
        assert!(config.keys.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let text = r#"
stack_depth = 20

[keys]
line_down = "n"

[load]
max_string_len = 64
"#;
        let config = Config::from_toml(text, Path::new("config.toml")).unwrap();
        assert_eq!(config.stack_depth, 20);
        assert_eq!(config.keys.line_down, "n");
        assert_eq!(config.keys.line_up, "k");
        assert_eq!(config.load.max_string_len, 64);
        assert!(config.load.follow_pointers);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = Config::from_toml("stack_depth = \"deep\"", Path::new("/etc/dive.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("/etc/dive.toml"));
    }

    #[test]
    fn test_invalid_binding_rejected() {
        let err = Config::from_toml("[keys]\nbreakpoint = \"Hyper\"\n", Path::new("c.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBinding { ref name, .. } if name == "breakpoint"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "use_tab_navigation = false").unwrap();
        let config = Config::load(Some(tmp.path())).unwrap();
        assert!(!config.use_tab_navigation);
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
