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

//! The `:` command line: parsing and completion.

use std::path::Path;

use tracing::debug;

use crate::pages::PageKind;

/// A command typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Open(String),
    ShowPage(PageKind),
    Restart,
    Continue,
    Next,
    Step,
    StepOut,
    Quit,
}

/// Every verb, in completion order.
pub const VERBS: &[&str] = &[
    "open",
    "bs",
    "breakpoints",
    "stack",
    "goroutines",
    "locals",
    "code",
    "restart",
    "c",
    "continue",
    "n",
    "next",
    "s",
    "step",
    "so",
    "stepout",
    "q",
    "quit",
];

/// Parse a command line. Unknown verbs, missing arguments and surplus
/// arguments all yield `None`.
pub fn parse_command_line(input: &str) -> Option<LineCommand> {
    let mut words = input.split_whitespace();
    let verb = words.next()?;
    let args: Vec<&str> = words.collect();
    debug!(verb, ?args, "parsed command");

    let command = match verb {
        "open" => {
            let [path] = args.as_slice() else {
                return None;
            };
            return Some(LineCommand::Open(path.to_string()));
        }
        "bs" | "breakpoints" => LineCommand::ShowPage(PageKind::Breakpoints),
        "stack" => LineCommand::ShowPage(PageKind::Stack),
        "goroutines" => LineCommand::ShowPage(PageKind::Goroutines),
        "locals" => LineCommand::ShowPage(PageKind::Locals),
        "code" => LineCommand::ShowPage(PageKind::Code),
        "restart" => LineCommand::Restart,
        "c" | "continue" => LineCommand::Continue,
        "n" | "next" => LineCommand::Next,
        "s" | "step" => LineCommand::Step,
        "so" | "stepout" => LineCommand::StepOut,
        "q" | "quit" => LineCommand::Quit,
        _ => return None,
    };
    if !args.is_empty() {
        return None;
    }
    Some(command)
}

/// Completions for a partially typed line.
///
/// After `open`, project sources relative to the project root are offered;
/// otherwise verbs starting with the first word.
pub fn suggestions(input: &str, project_root: &Path, sources: &[String]) -> Vec<String> {
    let first = input.split_whitespace().next().unwrap_or("");
    if first == "open" {
        let root = project_root.to_string_lossy();
        let root = root.trim_end_matches('/');
        return sources
            .iter()
            .filter_map(|source| source.strip_prefix(root))
            .map(|relative| format!("open {}", relative.trim_start_matches('/')))
            .filter(|candidate| candidate.starts_with(input))
            .collect();
    }
    VERBS
        .iter()
        .filter(|verb| verb.starts_with(first))
        .map(|verb| verb.to_string())
        .collect()
}
