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

//! Data model of the Delve JSON-RPC API (version 2).
//!
//! Only the fields Dive reads or sends are modelled; everything else in the
//! server's payloads is ignored on deserialization. Field names follow the
//! JSON tags of the server, which are not consistent in their casing.

use serde::{Deserialize, Deserializer, Serialize};

/// Delve sends `null` for empty slices.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// How much of a variable the debugger should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadConfig {
    pub follow_pointers: bool,
    pub max_variable_recurse: i64,
    pub max_string_len: i64,
    pub max_array_values: i64,
    pub max_struct_fields: i64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            follow_pointers: true,
            max_variable_recurse: 10,
            max_string_len: 999,
            max_array_values: 999,
            max_struct_fields: -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub addr: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: i64,
    #[serde(
        default,
        rename = "functionName",
        skip_serializing_if = "String::is_empty"
    )]
    pub function_name: String,
    #[serde(default)]
    pub goroutine: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, rename = "totalHitCount")]
    pub total_hit_count: u64,
    #[serde(default, rename = "LoadArgs", skip_serializing_if = "Option::is_none")]
    pub load_args: Option<LoadConfig>,
    #[serde(default, rename = "LoadLocals", skip_serializing_if = "Option::is_none")]
    pub load_locals: Option<LoadConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub pc: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Function>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub addr: u64,
    #[serde(default, rename = "type")]
    pub type_name: String,
    #[serde(default, rename = "realType")]
    pub real_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub len: i64,
    #[serde(default)]
    pub cap: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Variable>,
    #[serde(default)]
    pub unreadable: String,
}

impl Variable {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stackframe {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default, rename = "Locals", deserialize_with = "null_as_default")]
    pub locals: Vec<Variable>,
    #[serde(default, rename = "Arguments", deserialize_with = "null_as_default")]
    pub arguments: Vec<Variable>,
    #[serde(default, rename = "Err")]
    pub err: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub pc: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Function>,
    #[serde(default, rename = "goroutineID")]
    pub goroutine_id: i64,
    #[serde(default, rename = "breakPoint", skip_serializing_if = "Option::is_none")]
    pub breakpoint: Option<Breakpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goroutine {
    #[serde(default)]
    pub id: i64,
    #[serde(default, rename = "currentLoc")]
    pub current_loc: Location,
    #[serde(default, rename = "userCurrentLoc")]
    pub user_current_loc: Location,
    #[serde(default, rename = "goStatementLoc")]
    pub go_statement_loc: Location,
    #[serde(default, rename = "startLoc")]
    pub start_loc: Location,
    #[serde(default, rename = "threadID")]
    pub thread_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebuggerState {
    #[serde(default, rename = "Pid")]
    pub pid: i64,
    #[serde(default, rename = "Running")]
    pub running: bool,
    #[serde(default, rename = "currentThread", skip_serializing_if = "Option::is_none")]
    pub current_thread: Option<Thread>,
    #[serde(
        default,
        rename = "currentGoroutine",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_goroutine: Option<Goroutine>,
    #[serde(default)]
    pub exited: bool,
    #[serde(default, rename = "exitStatus")]
    pub exit_status: i64,
}

/// Stacktrace options, a bit set on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StacktraceKind {
    Simple,
    ReadDefers,
}

impl StacktraceKind {
    pub fn bits(self) -> u16 {
        match self {
            StacktraceKind::Simple => 0,
            StacktraceKind::ReadDefers => 1,
        }
    }
}

// Request and reply payloads of the RPCServer methods.

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateBreakpointIn {
    pub breakpoint: Breakpoint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateBreakpointOut {
    pub breakpoint: Breakpoint,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ClearBreakpointIn {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ClearBreakpointOut {
    pub breakpoint: Option<Breakpoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AmendBreakpointIn {
    pub breakpoint: Breakpoint,
}

#[derive(Debug, Serialize)]
pub(crate) struct DebuggerCommand {
    pub name: &'static str,
    #[serde(rename = "goroutineID", skip_serializing_if = "Option::is_none")]
    pub goroutine_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CommandOut {
    pub state: DebuggerState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RestartIn {
    pub position: String,
    pub reset_args: bool,
    pub new_args: Vec<String>,
    pub rerecord: bool,
    pub rebuild: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListBreakpointsIn {
    pub all: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListBreakpointsOut {
    #[serde(default, deserialize_with = "null_as_default")]
    pub breakpoints: Vec<Breakpoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListGoroutinesIn {
    pub start: i64,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListGoroutinesOut {
    #[serde(default, deserialize_with = "null_as_default")]
    pub goroutines: Vec<Goroutine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StacktraceIn {
    pub id: i64,
    pub depth: i64,
    pub full: bool,
    pub defers: bool,
    pub opts: u16,
    pub cfg: Option<LoadConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StacktraceOut {
    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: Vec<Stackframe>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListSourcesIn {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListSourcesOut {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DetachIn {
    pub kill: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_debugger_state() {
        let json = r#"{
            "Pid": 42,
            "Running": false,
            "currentThread": {
                "id": 1, "pc": 4198400, "file": "/src/main.go", "line": 12,
                "function": {"name": "main.main", "value": 4198000},
                "goroutineID": 1,
                "breakPoint": {"id": 3, "file": "/src/main.go", "line": 12, "disabled": false, "totalHitCount": 2}
            },
            "Threads": null,
            "exited": false,
            "exitStatus": 0
        }"#;
        let state: DebuggerState = serde_json::from_str(json).unwrap();
        let thread = state.current_thread.unwrap();
        assert_eq!(thread.goroutine_id, 1);
        assert_eq!(thread.line, 12);
        assert_eq!(thread.breakpoint.unwrap().total_hit_count, 2);
    }

    #[test]
    fn test_decode_stackframe_with_null_children() {
        let json = r#"{
            "pc": 1, "file": "/src/main.go", "line": 7,
            "function": {"name": "main.run"},
            "Locals": [{"name": "x", "addr": 824634, "type": "int", "realType": "int", "value": "5", "children": null}],
            "Arguments": null,
            "FrameOffset": 0
        }"#;
        let frame: Stackframe = serde_json::from_str(json).unwrap();
        assert_eq!(frame.location.line, 7);
        assert_eq!(frame.locals.len(), 1);
        assert!(frame.locals[0].children.is_empty());
        assert!(frame.arguments.is_empty());
    }

    #[test]
    fn test_encode_breakpoint_request() {
        let request = CreateBreakpointIn {
            breakpoint: Breakpoint {
                file: "/src/a.go".to_string(),
                line: 5,
                goroutine: true,
                load_args: Some(LoadConfig::default()),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["Breakpoint"]["file"], "/src/a.go");
        assert_eq!(value["Breakpoint"]["line"], 5);
        assert_eq!(value["Breakpoint"]["LoadArgs"]["MaxStringLen"], 999);
        assert!(value["Breakpoint"].get("LoadLocals").is_none());
        assert!(value["Breakpoint"].get("functionName").is_none());
    }
}
