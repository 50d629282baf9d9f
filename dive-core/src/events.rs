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

//! Typed channels between command workers and the session event loop.
//!
//! There is one bounded channel per event category. Workers hold cloned
//! `EventSenders`; exactly one task owns `EventReceivers` and applies events.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{Breakpoint, DebuggerState, Goroutine, Stackframe};
use crate::nav::BreakpointUpdate;
use crate::text::SourceFile;

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct FileLoaded {
    pub file: Arc<SourceFile>,
    /// 0-based line to show
    pub at_line: usize,
}

#[derive(Debug, Clone)]
pub struct BreakpointEvent {
    pub seq: u64,
    pub updates: Vec<BreakpointUpdate>,
}

#[derive(Debug, Clone)]
pub struct DebuggerMove {
    pub seq: u64,
    pub state: DebuggerState,
    pub frames: Vec<Stackframe>,
    /// The file the debugger stopped in, when the worker had to load it
    pub file: Option<Arc<SourceFile>>,
    /// Refreshed record of the breakpoint the thread stopped at
    pub hit: Option<Breakpoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Needs to be acknowledged before anything else is accepted
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// Seq of the command this notification ends, if it ends one
    pub seq: Option<u64>,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            seq: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
            seq: None,
        }
    }

    pub fn for_command(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// One event taken off any of the channels.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    FileLoaded(FileLoaded),
    Breakpoints(BreakpointEvent),
    DebuggerMove(Box<DebuggerMove>),
    Goroutines(Vec<Goroutine>),
    Sources(Vec<String>),
    Notification(Notification),
}

#[derive(Clone)]
pub struct EventSenders {
    pub files: mpsc::Sender<FileLoaded>,
    pub breakpoints: mpsc::Sender<BreakpointEvent>,
    pub moves: mpsc::Sender<DebuggerMove>,
    pub goroutines: mpsc::Sender<Vec<Goroutine>>,
    pub sources: mpsc::Sender<Vec<String>>,
    pub notifications: mpsc::Sender<Notification>,
}

pub struct EventReceivers {
    files: mpsc::Receiver<FileLoaded>,
    breakpoints: mpsc::Receiver<BreakpointEvent>,
    moves: mpsc::Receiver<DebuggerMove>,
    goroutines: mpsc::Receiver<Vec<Goroutine>>,
    sources: mpsc::Receiver<Vec<String>>,
    notifications: mpsc::Receiver<Notification>,
}

pub fn event_channels() -> (EventSenders, EventReceivers) {
    let (files_tx, files) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (breakpoints_tx, breakpoints) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (moves_tx, moves) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (goroutines_tx, goroutines) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (sources_tx, sources) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (notifications_tx, notifications) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (
        EventSenders {
            files: files_tx,
            breakpoints: breakpoints_tx,
            moves: moves_tx,
            goroutines: goroutines_tx,
            sources: sources_tx,
            notifications: notifications_tx,
        },
        EventReceivers {
            files,
            breakpoints,
            moves,
            goroutines,
            sources,
            notifications,
        },
    )
}

impl EventReceivers {
    /// Wait for the next event from any channel. `None` once every sender
    /// is gone. Notifications win when several channels are ready.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        tokio::select! {
            biased;
            Some(n) = self.notifications.recv() => Some(SessionEvent::Notification(n)),
            Some(f) = self.files.recv() => Some(SessionEvent::FileLoaded(f)),
            Some(b) = self.breakpoints.recv() => Some(SessionEvent::Breakpoints(b)),
            Some(m) = self.moves.recv() => Some(SessionEvent::DebuggerMove(Box::new(m))),
            Some(g) = self.goroutines.recv() => Some(SessionEvent::Goroutines(g)),
            Some(s) = self.sources.recv() => Some(SessionEvent::Sources(s)),
            else => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recv_merges_channels() {
        let (senders, mut receivers) = event_channels();
        senders
            .goroutines
            .send(vec![Goroutine::default()])
            .await
            .unwrap();
        senders
            .notifications
            .send(Notification::info("done"))
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            match receivers.recv().await.unwrap() {
                SessionEvent::Goroutines(list) => seen.push(format!("goroutines {}", list.len())),
                SessionEvent::Notification(n) => seen.push(n.message),
                other => panic!("unexpected event {other:?}"),
            }
        }
        seen.sort();
        assert_eq!(seen, vec!["done".to_string(), "goroutines 1".to_string()]);
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (senders, mut receivers) = event_channels();
        drop(senders);
        assert!(receivers.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_notifications_taken_first() {
        let (senders, mut receivers) = event_channels();
        senders.sources.send(vec!["/a.go".into()]).await.unwrap();
        senders
            .notifications
            .send(Notification::error("boom").for_command(4))
            .await
            .unwrap();
        match receivers.recv().await.unwrap() {
            SessionEvent::Notification(n) => assert_eq!(n.seq, Some(4)),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            receivers.recv().await,
            Some(SessionEvent::Sources(list)) if list.len() == 1
        ));
    }

    #[test]
    fn test_notification_kinds() {
        assert!(Notification::error("boom").is_blocking());
        assert!(!Notification::info("exited").is_blocking());
    }
}
