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

//! Spawning and tearing down the headless `dlv` server.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Arguments for `dlv exec` serving API v2 on localhost.
pub fn dlv_args(target: &Path, target_args: &[String], port: u16) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        "--headless".to_string(),
        "--api-version=2".to_string(),
        format!("--listen=127.0.0.1:{port}"),
        "--accept-multiclient".to_string(),
        target.to_string_lossy().into_owned(),
    ];
    if !target_args.is_empty() {
        args.push("--".to_string());
        args.extend(target_args.iter().cloned());
    }
    args
}

pub struct DlvProcess {
    child: Child,
}

impl DlvProcess {
    pub fn spawn(target: &Path, target_args: &[String], port: u16) -> Result<Self, std::io::Error> {
        let args = dlv_args(target, target_args, port);
        info!("starting dlv {}", args.join(" "));
        let mut child = Command::new("dlv")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        info!(pid = child.id(), "dlv running");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, "stderr"));
        }
        Ok(Self { child })
    }

    pub async fn shutdown(mut self) {
        let pid = self.child.id();
        match self.child.kill().await {
            Ok(()) => info!(pid, "terminated dlv"),
            Err(e) => warn!(pid, error = %e, "could not terminate dlv"),
        }
    }
}

/// The server's output (and the target's) would corrupt the screen, so it
/// goes to the log.
async fn forward_output<R: AsyncRead + Unpin>(reader: R, stream: &'static str) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => info!(stream, "dlv: {line}"),
            Ok(None) => break,
            Err(e) => {
                warn!(stream, error = %e, "reading dlv output failed");
                break;
            }
        }
    }
}
