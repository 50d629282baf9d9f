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

use async_trait::async_trait;

use crate::api::{Breakpoint, DebuggerState, Goroutine, LoadConfig, Stackframe, StacktraceKind};
use crate::error::RpcError;

/// Operations Dive needs from a debugger backend.
///
/// Every call may block for as long as the backend needs; `continue_execution`
/// in particular only returns once the target stops or exits.
#[async_trait]
pub trait DebuggerService: Send + Sync {
    async fn create_breakpoint(&self, breakpoint: Breakpoint) -> Result<Breakpoint, RpcError>;

    async fn clear_breakpoint(&self, id: i64) -> Result<Breakpoint, RpcError>;

    async fn amend_breakpoint(&self, breakpoint: Breakpoint) -> Result<(), RpcError>;

    async fn list_breakpoints(&self, all: bool) -> Result<Vec<Breakpoint>, RpcError>;

    async fn continue_execution(&self) -> Result<DebuggerState, RpcError>;

    async fn next(&self) -> Result<DebuggerState, RpcError>;

    async fn step(&self) -> Result<DebuggerState, RpcError>;

    async fn step_out(&self) -> Result<DebuggerState, RpcError>;

    async fn restart(&self) -> Result<(), RpcError>;

    async fn switch_goroutine(&self, id: i64) -> Result<DebuggerState, RpcError>;

    async fn list_goroutines(&self, start: i64, count: i64) -> Result<Vec<Goroutine>, RpcError>;

    async fn stacktrace(
        &self,
        goroutine_id: i64,
        depth: i64,
        kind: StacktraceKind,
        load: Option<LoadConfig>,
    ) -> Result<Vec<Stackframe>, RpcError>;

    async fn list_sources(&self, filter: &str) -> Result<Vec<String>, RpcError>;

    async fn detach(&self, kill: bool) -> Result<(), RpcError>;
}
