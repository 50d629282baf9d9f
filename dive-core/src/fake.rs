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

//! Scripted stand-in for the debugger service, used by the tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::*;
use crate::error::RpcError;
use crate::service::DebuggerService;

#[derive(Default)]
struct FakeState {
    states: VecDeque<DebuggerState>,
    last_state: Option<DebuggerState>,
    next_id: i64,
    breakpoints: BTreeMap<i64, Breakpoint>,
    created: Vec<Breakpoint>,
    calls: Vec<String>,
    failure: Option<String>,
    goroutines: Vec<Goroutine>,
    sources: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakeDebugger {
    state: Mutex<FakeState>,
    continue_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeDebugger {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.set_next_breakpoint_id(1);
        fake
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_next_breakpoint_id(&self, id: i64) {
        self.with(|s| s.next_id = id);
    }

    /// Make every following call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        self.with(|s| s.failure = Some(message.to_string()));
    }

    /// Queue the state the next continue, step or switch reports.
    pub fn push_state(&self, state: DebuggerState) {
        self.with(|s| s.states.push_back(state));
    }

    /// Hold `continue_execution` until the returned gate is notified.
    pub fn gate_continue(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.continue_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_goroutines(&self, goroutines: Vec<Goroutine>) {
        self.with(|s| s.goroutines = goroutines);
    }

    pub fn set_sources(&self, sources: Vec<String>) {
        self.with(|s| s.sources = sources);
    }

    pub fn add_internal_breakpoint(&self) {
        self.with(|s| {
            s.breakpoints.insert(
                -1,
                Breakpoint {
                    id: -1,
                    name: "unrecovered-panic".to_string(),
                    function_name: "runtime.fatalpanic".to_string(),
                    ..Default::default()
                },
            )
        });
    }

    pub fn created(&self) -> Vec<Breakpoint> {
        self.with(|s| s.created.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn exited(status: i64) -> DebuggerState {
        DebuggerState {
            exited: true,
            exit_status: status,
            ..Default::default()
        }
    }

    pub fn stopped_at(file: &str, line: i64, goroutine_id: i64) -> DebuggerState {
        DebuggerState {
            pid: 100,
            current_thread: Some(Thread {
                id: 1,
                file: file.to_string(),
                line,
                goroutine_id,
                function: Some(Function {
                    name: "main.main".to_string(),
                    value: 0,
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Record a call and fail it if a failure is armed.
    fn enter(&self, call: String) -> Result<(), RpcError> {
        self.with(|s| {
            s.calls.push(call);
            match &s.failure {
                Some(message) => Err(RpcError::Remote(message.clone())),
                None => Ok(()),
            }
        })
    }

    fn next_state(&self) -> Result<DebuggerState, RpcError> {
        self.with(|s| {
            let state = s
                .states
                .pop_front()
                .ok_or_else(|| RpcError::Remote("no scripted state".to_string()))?;
            s.last_state = Some(state.clone());
            Ok(state)
        })
    }
}

#[async_trait]
impl DebuggerService for FakeDebugger {
    async fn create_breakpoint(&self, breakpoint: Breakpoint) -> Result<Breakpoint, RpcError> {
        self.enter("create_breakpoint".to_string())?;
        Ok(self.with(|s| {
            s.created.push(breakpoint.clone());
            let mut created = breakpoint;
            created.id = s.next_id;
            created.function_name = "main.main".to_string();
            s.next_id += 1;
            s.breakpoints.insert(created.id, created.clone());
            created
        }))
    }

    async fn clear_breakpoint(&self, id: i64) -> Result<Breakpoint, RpcError> {
        self.enter(format!("clear_breakpoint {id}"))?;
        self.with(|s| s.breakpoints.remove(&id))
            .ok_or_else(|| RpcError::Remote(format!("no breakpoint with id {id}")))
    }

    async fn amend_breakpoint(&self, breakpoint: Breakpoint) -> Result<(), RpcError> {
        self.enter(format!("amend_breakpoint {}", breakpoint.id))?;
        self.with(|s| s.breakpoints.insert(breakpoint.id, breakpoint));
        Ok(())
    }

    async fn list_breakpoints(&self, _all: bool) -> Result<Vec<Breakpoint>, RpcError> {
        self.enter("list_breakpoints".to_string())?;
        Ok(self.with(|s| s.breakpoints.values().cloned().collect()))
    }

    async fn continue_execution(&self) -> Result<DebuggerState, RpcError> {
        self.enter("continue".to_string())?;
        let gate = self.continue_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next_state()
    }

    async fn next(&self) -> Result<DebuggerState, RpcError> {
        self.enter("next".to_string())?;
        self.next_state()
    }

    async fn step(&self) -> Result<DebuggerState, RpcError> {
        self.enter("step".to_string())?;
        self.next_state()
    }

    async fn step_out(&self) -> Result<DebuggerState, RpcError> {
        self.enter("step_out".to_string())?;
        self.next_state()
    }

    async fn restart(&self) -> Result<(), RpcError> {
        self.enter("restart".to_string())
    }

    async fn switch_goroutine(&self, id: i64) -> Result<DebuggerState, RpcError> {
        self.enter(format!("switch_goroutine {id}"))?;
        self.next_state()
    }

    async fn list_goroutines(&self, _start: i64, count: i64) -> Result<Vec<Goroutine>, RpcError> {
        self.enter("list_goroutines".to_string())?;
        Ok(self.with(|s| s.goroutines.iter().take(count as usize).cloned().collect()))
    }

    async fn stacktrace(
        &self,
        goroutine_id: i64,
        _depth: i64,
        _kind: StacktraceKind,
        _load: Option<LoadConfig>,
    ) -> Result<Vec<Stackframe>, RpcError> {
        self.enter(format!("stacktrace {goroutine_id}"))?;
        Ok(self.with(|s| {
            let thread = s.last_state.as_ref().and_then(|st| st.current_thread.clone());
            thread
                .map(|thread| {
                    vec![Stackframe {
                        location: Location {
                            pc: thread.pc,
                            file: thread.file,
                            line: thread.line,
                            function: thread.function,
                        },
                        locals: vec![Variable {
                            name: "x".to_string(),
                            addr: 0xc000010000,
                            real_type: "int".to_string(),
                            value: "42".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }]
                })
                .unwrap_or_default()
        }))
    }

    async fn list_sources(&self, filter: &str) -> Result<Vec<String>, RpcError> {
        self.enter("list_sources".to_string())?;
        Ok(self.with(|s| {
            s.sources
                .iter()
                .filter(|source| source.starts_with(filter))
                .cloned()
                .collect()
        }))
    }

    async fn detach(&self, _kill: bool) -> Result<(), RpcError> {
        self.enter("detach".to_string())
    }
}
