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

use slotmap::new_key_type;

pub mod api;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gutter;
pub mod keys;
pub mod nav;
pub mod pages;
pub mod renderer;
pub mod rpc;
pub mod service;
pub mod session;
pub mod text;
pub mod vars;
pub mod viewport;

#[cfg(test)]
pub(crate) mod fake;

new_key_type! {
    pub struct VarNodeId;
}

pub use config::Config;
pub use dispatcher::{Command, Dispatcher};
pub use error::{ConfigError, RpcError};
pub use events::{event_channels, EventReceivers, EventSenders, SessionEvent};
pub use keys::LogicalKey;
pub use nav::Nav;
pub use renderer::{DirtyRegion, Renderer};
pub use rpc::DelveClient;
pub use service::DebuggerService;
pub use session::{Session, UiAction};
pub use text::SourceFile;
pub use viewport::Viewport;
