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

//! Runs user commands against the debugger service.
//!
//! Each dispatched command becomes its own task. The task may call the
//! service any number of times and finishes by publishing exactly one event
//! (or a notification) on the session's channels. Tasks never touch `Nav`;
//! they work from a `StateSnapshot` taken when the command was dispatched.
//!
//! Events of different commands may arrive in any order. Every command gets
//! a sequence number so the event loop can recognize results that were
//! overtaken by a later command on the same breakpoint slot. Only a result
//! that was actually applied overtakes older ones; a later command that
//! fails leaves the slot to whatever succeeded before it.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{Breakpoint, DebuggerState, StacktraceKind};
use crate::config::Config;
use crate::error::RpcError;
use crate::events::{BreakpointEvent, DebuggerMove, EventSenders, FileLoaded, Notification};
use crate::nav::{BreakpointUpdate, StateSnapshot};
use crate::service::DebuggerService;
use crate::text::{load_source_file, resolve_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show `path` with the cursor on 0-based `at_line`
    OpenFile { path: String, at_line: usize },
    /// Create a breakpoint at 1-based `line`
    CreateBreakpoint { file: String, line: i64 },
    ClearBreakpoint { breakpoint: Breakpoint },
    /// Enable a disabled breakpoint or disable an enabled one
    ToggleBreakpoint { breakpoint: Breakpoint },
    ListBreakpoints,
    Continue,
    Restart,
    Next,
    Step,
    StepOut,
    SwitchGoroutine { id: i64 },
    ListGoroutines,
    ListSources,
}

impl Command {
    /// Commands that let the target run freely until it stops on its own.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Command::Continue | Command::Restart)
    }

    /// Commands whose result can carry breakpoint records, including the
    /// breakpoint a stopping thread reports.
    fn touches_breakpoints(&self) -> bool {
        !matches!(
            self,
            Command::OpenFile { .. } | Command::ListGoroutines | Command::ListSources
        )
    }
}

/// Clears the blocking flag when dropped, however the worker ends.
struct BlockingGuard(Arc<AtomicBool>);

impl Drop for BlockingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything a worker needs, cloned into its task.
#[derive(Clone)]
struct Worker {
    service: Arc<dyn DebuggerService>,
    senders: EventSenders,
    config: Arc<Config>,
    snapshot: StateSnapshot,
    seq: u64,
}

pub struct Dispatcher {
    service: Arc<dyn DebuggerService>,
    senders: EventSenders,
    config: Arc<Config>,
    next_seq: u64,
    /// Seq of the newest applied update per (file, line)
    applied_for_slot: HashMap<(String, i64), u64>,
    /// Breakpoint-carrying commands whose result has not come back yet
    in_flight: BTreeSet<u64>,
    blocking: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn DebuggerService>, senders: EventSenders, config: Arc<Config>) -> Self {
        Self {
            service,
            senders,
            config,
            next_seq: 1,
            applied_for_slot: HashMap::new(),
            in_flight: BTreeSet::new(),
            blocking: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a continue or restart waits for the target to stop.
    pub fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::SeqCst)
    }

    /// Start `command` in its own task.
    pub fn dispatch(&mut self, command: Command, snapshot: StateSnapshot) -> JoinHandle<()> {
        let seq = self.next_seq;
        self.next_seq += 1;
        info!(seq, ?command, "dispatching command");

        if command.touches_breakpoints() {
            self.in_flight.insert(seq);
        }
        let guard = if command.is_blocking() {
            self.blocking.store(true, Ordering::SeqCst);
            Some(BlockingGuard(self.blocking.clone()))
        } else {
            None
        };

        let worker = Worker {
            service: self.service.clone(),
            senders: self.senders.clone(),
            config: self.config.clone(),
            snapshot,
            seq,
        };
        tokio::spawn(async move { worker.run(command, guard).await })
    }

    /// Drop the updates of `event` that a newer, already applied result on
    /// the same slot has superseded. The rest are recorded as applied.
    pub fn fresh_updates(&mut self, event: BreakpointEvent) -> Vec<BreakpointUpdate> {
        let seq = event.seq;
        let mut fresh = Vec::with_capacity(event.updates.len());
        for update in event.updates {
            let key = update.key();
            match self.applied_for_slot.get(&key) {
                Some(&applied) if applied > seq => {
                    info!(seq, applied, ?update, "discarding stale breakpoint update");
                }
                _ => {
                    self.applied_for_slot.insert(key, seq);
                    fresh.push(update);
                }
            }
        }
        self.resolve(seq);
        fresh
    }

    /// The command `seq` has delivered its result, whatever it was.
    ///
    /// A slot entry is only needed while some older command may still
    /// report on it, so entries at or below the oldest pending seq go.
    pub fn resolve(&mut self, seq: u64) {
        self.in_flight.remove(&seq);
        let oldest = self.in_flight.first().copied().unwrap_or(u64::MAX);
        self.applied_for_slot.retain(|_, applied| *applied > oldest);
    }
}

impl Worker {
    async fn run(self, command: Command, guard: Option<BlockingGuard>) {
        match command {
            Command::OpenFile { path, at_line } => self.open_file(&path, at_line).await,
            Command::CreateBreakpoint { file, line } => self.create_breakpoint(file, line).await,
            Command::ClearBreakpoint { breakpoint } => self.clear_breakpoint(breakpoint).await,
            Command::ToggleBreakpoint { breakpoint } => self.toggle_breakpoint(breakpoint).await,
            Command::ListBreakpoints => self.list_breakpoints().await,
            Command::Continue => {
                let result = self.service.continue_execution().await;
                drop(guard);
                self.report_move(result).await;
            }
            Command::Restart => {
                let result = match self.service.restart().await {
                    Ok(()) => self.service.continue_execution().await,
                    Err(e) => Err(e),
                };
                drop(guard);
                self.report_move(result).await;
            }
            Command::Next => {
                let result = self.service.next().await;
                self.report_move(result).await;
            }
            Command::Step => {
                let result = self.service.step().await;
                self.report_move(result).await;
            }
            Command::StepOut => {
                let result = self.service.step_out().await;
                self.report_move(result).await;
            }
            Command::SwitchGoroutine { id } => {
                let result = self.service.switch_goroutine(id).await;
                self.report_move(result).await;
            }
            Command::ListGoroutines => self.list_goroutines().await,
            Command::ListSources => self.list_sources().await,
        }
    }

    async fn notify(&self, notification: Notification) {
        if self.senders.notifications.send(notification).await.is_err() {
            warn!(seq = self.seq, "session gone, notification dropped");
        }
    }

    async fn fail(&self, e: RpcError) {
        error!(seq = self.seq, error = %e, "rpc error");
        self.notify(Notification::error(e.to_string()).for_command(self.seq))
            .await;
    }

    async fn send_breakpoints(&self, updates: Vec<BreakpointUpdate>) {
        let event = BreakpointEvent {
            seq: self.seq,
            updates,
        };
        if self.senders.breakpoints.send(event).await.is_err() {
            warn!(seq = self.seq, "session gone, breakpoint event dropped");
        }
    }

    async fn open_file(&self, path: &str, at_line: usize) {
        let abs = resolve_path(path, &self.snapshot.project_root);
        let key = abs.to_string_lossy().into_owned();
        let file = match self.snapshot.cached(&key) {
            Some(file) => file,
            None => match load_source_file(path, &abs).await {
                Some(file) => Arc::new(file),
                None => return,
            },
        };
        if self
            .senders
            .files
            .send(FileLoaded { file, at_line })
            .await
            .is_err()
        {
            warn!(seq = self.seq, "session gone, file dropped");
        }
    }

    async fn create_breakpoint(&self, file: String, line: i64) {
        info!(file, line, "creating breakpoint");
        let load = self.config.load_config();
        let request = Breakpoint {
            file,
            line,
            goroutine: true,
            load_args: Some(load),
            load_locals: Some(load),
            ..Default::default()
        };
        match self.service.create_breakpoint(request).await {
            Ok(created) => {
                self.send_breakpoints(vec![BreakpointUpdate::Upserted(created)])
                    .await
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn clear_breakpoint(&self, breakpoint: Breakpoint) {
        let removed = BreakpointUpdate::Removed {
            file: breakpoint.file.clone(),
            line: breakpoint.line,
        };
        // Never reached the backend, nothing to clear there.
        if breakpoint.id <= 0 {
            self.send_breakpoints(vec![removed]).await;
            return;
        }
        match self.service.clear_breakpoint(breakpoint.id).await {
            Ok(_) => self.send_breakpoints(vec![removed]).await,
            Err(e) => self.fail(e).await,
        }
    }

    async fn toggle_breakpoint(&self, mut breakpoint: Breakpoint) {
        breakpoint.disabled = !breakpoint.disabled;
        match self.service.amend_breakpoint(breakpoint.clone()).await {
            Ok(()) => {
                self.send_breakpoints(vec![BreakpointUpdate::Upserted(breakpoint)])
                    .await
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn list_breakpoints(&self) {
        match self.service.list_breakpoints(true).await {
            Ok(breakpoints) => {
                let updates = breakpoints
                    .into_iter()
                    .filter(|bp| bp.id > 0)
                    .map(BreakpointUpdate::Upserted)
                    .collect();
                self.send_breakpoints(updates).await;
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn list_goroutines(&self) {
        match self
            .service
            .list_goroutines(0, self.config.goroutine_count)
            .await
        {
            Ok(goroutines) => {
                info!(count = goroutines.len(), "fetched goroutines");
                if self.senders.goroutines.send(goroutines).await.is_err() {
                    warn!(seq = self.seq, "session gone, goroutines dropped");
                }
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn list_sources(&self) {
        let filter = self.snapshot.project_root.to_string_lossy().into_owned();
        match self.service.list_sources(&filter).await {
            Ok(sources) => {
                if self.senders.sources.send(sources).await.is_err() {
                    warn!(seq = self.seq, "session gone, sources dropped");
                }
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Turn the outcome of a continue, step or goroutine switch into one
    /// debugger move or one notification.
    async fn report_move(&self, result: Result<DebuggerState, RpcError>) {
        let state = match result {
            Ok(state) => state,
            Err(e) => return self.fail(e).await,
        };
        if state.exited {
            let message = format!(
                "Program has finished with exit status {}.",
                state.exit_status
            );
            info!("{message}");
            return self
                .notify(Notification::info(message).for_command(self.seq))
                .await;
        }

        let goroutine_id = state
            .current_thread
            .as_ref()
            .map(|thread| thread.goroutine_id)
            .or_else(|| state.selected_goroutine.as_ref().map(|g| g.id))
            .unwrap_or(self.snapshot.current_goroutine);
        let frames = match self
            .service
            .stacktrace(
                goroutine_id,
                self.config.stack_depth,
                StacktraceKind::Simple,
                Some(self.config.load_config()),
            )
            .await
        {
            Ok(frames) => frames,
            Err(e) => return self.fail(e).await,
        };

        let mut file = None;
        let mut hit = None;
        if let Some(thread) = &state.current_thread {
            if !thread.file.is_empty() && self.snapshot.cached(&thread.file).is_none() {
                file = load_source_file(&thread.file, Path::new(&thread.file))
                    .await
                    .map(Arc::new);
            }
            hit = thread.breakpoint.clone().filter(|bp| bp.id > 0);
        }

        let debugger_move = DebuggerMove {
            seq: self.seq,
            state,
            frames,
            file,
            hit,
        };
        if self.senders.moves.send(debugger_move).await.is_err() {
            warn!(seq = self.seq, "session gone, debugger move dropped");
        }
    }
}
