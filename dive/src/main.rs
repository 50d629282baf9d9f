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

mod launcher;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::disable_raw_mode;
use dive_core::{
    event_channels, Config, DebuggerService, DelveClient, Dispatcher, Nav, Session,
};
use dive_terminal::{event_loop, TerminalRenderer};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use launcher::DlvProcess;

const DEFAULT_PORT: u16 = 8181;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DETACH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
struct DiveArgs {
    target: Option<PathBuf>,
    target_args: Vec<String>,
    port: u16,
    dir: PathBuf,
    connect: Option<String>,
    config: Option<PathBuf>,
    log_file: PathBuf,
}

/// Parse command line arguments, program name excluded
fn parse_args(args: &[String]) -> Result<DiveArgs, String> {
    let mut parsed = DiveArgs {
        target: None,
        target_args: Vec::new(),
        port: DEFAULT_PORT,
        dir: PathBuf::from("./"),
        connect: None,
        config: None,
        log_file: std::env::temp_dir().join("dive.log"),
    };
    let mut i = 0;

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{flag} requires a value"))
    };

    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let port = value(i, "--port")?;
                parsed.port = port
                    .parse()
                    .map_err(|_| format!("invalid port '{port}'"))?;
                i += 2;
            }
            "--dir" | "-d" => {
                parsed.dir = PathBuf::from(value(i, "--dir")?);
                i += 2;
            }
            "--connect" => {
                parsed.connect = Some(value(i, "--connect")?);
                i += 2;
            }
            "--config" | "-c" => {
                parsed.config = Some(PathBuf::from(value(i, "--config")?));
                i += 2;
            }
            "--log" => {
                parsed.log_file = PathBuf::from(value(i, "--log")?);
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--" => {
                parsed.target_args = args[i + 1..].to_vec();
                break;
            }
            arg if arg.starts_with('-') => return Err(format!("unknown option '{arg}'")),
            arg => {
                if parsed.target.is_some() {
                    return Err(format!("unexpected argument '{arg}'"));
                }
                parsed.target = Some(PathBuf::from(arg));
                i += 1;
            }
        }
    }

    if parsed.target.is_none() && parsed.connect.is_none() {
        return Err("no debug target provided".to_string());
    }
    Ok(parsed)
}

/// Print help message
fn print_help() {
    println!("Dive - a terminal front end for the Delve debugger");
    println!();
    println!("USAGE:");
    println!("    dive <TARGET> [OPTIONS] [-- TARGET_ARGS...]");
    println!("    dive --connect <ADDR> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -p, --port <PORT>      Port for the dlv server (default: 8181)");
    println!("    -d, --dir <DIR>        Source code directory (default: ./)");
    println!("        --connect <ADDR>   Attach to a running headless dlv instead");
    println!("    -c, --config <FILE>    Configuration file");
    println!("        --log <FILE>       Log file (default: $TMPDIR/dive.log)");
    println!("    -h, --help             Print this help message");
    println!();
    println!("EXAMPLES:");
    println!("    dive ./bin/server                    # Debug a compiled binary");
    println!("    dive ./bin/server --dir ~/src/server # Sources elsewhere");
    println!("    dive ./bin/cli -- -v input.txt       # Pass arguments to the target");
    println!("    dive --connect 127.0.0.1:2345        # Attach to dlv --headless");
}

/// The terminal belongs to the UI, so logs go to a file. `RUST_LOG`
/// overrides the default level.
fn init_logging(path: &Path) -> Result<(), std::io::Error> {
    let log_file = std::fs::File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(log_file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, std::io::Error> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let joined = std::env::current_dir()?.join(path);
    Ok(joined.canonicalize().unwrap_or(joined))
}

// Everything to run in raw_mode
async fn terminal_main(
    device: &mut impl Write,
    config: Arc<Config>,
    project_root: PathBuf,
    client: DelveClient,
) -> Result<(), std::io::Error> {
    assert!(crossterm::terminal::is_raw_mode_enabled()?);

    let (senders, mut receivers) = event_channels();
    let service: Arc<dyn DebuggerService> = Arc::new(client);
    let dispatcher = Dispatcher::new(service, senders, config.clone());
    let mut session = Session::new(config, Nav::new(project_root), dispatcher);

    let (width, height) = crossterm::terminal::size()?;
    session.resize(width as usize, height as usize);
    session.start();

    let mut renderer = TerminalRenderer::new(device);
    event_loop(&mut renderer, &mut session, &mut receivers).await
}

fn exit_state(device: &mut impl Write) -> Result<(), std::io::Error> {
    // Restore terminal to original state
    execute!(device, crossterm::cursor::Show)?;
    execute!(device, PopKeyboardEnhancementFlags)?;
    device.flush()?;

    disable_raw_mode()?;

    execute!(
        device,
        crossterm::terminal::Clear(crossterm::terminal::ClearType::All)
    )?;
    let (_, height) = crossterm::terminal::size().unwrap_or((80, 24));
    execute!(device, crossterm::cursor::MoveTo(0, height))?;
    device.flush()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw_args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            print_help();
            std::process::exit(1);
        }
    };

    init_logging(&args.log_file)?;

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let project_root = absolute(&args.dir)?;
    info!(dir = %project_root.display(), "using project root");

    let (dlv, addr) = match &args.connect {
        Some(addr) => (None, addr.clone()),
        None => {
            let Some(target) = &args.target else {
                eprintln!("Error: no debug target provided");
                std::process::exit(1);
            };
            let target = absolute(target)?;
            info!(target = %target.display(), "debugging executable");
            let dlv = DlvProcess::spawn(&target, &args.target_args, args.port)?;
            (Some(dlv), format!("127.0.0.1:{}", args.port))
        }
    };

    let client =
        match DelveClient::connect_with_retry(&addr, CONNECT_RETRY_INTERVAL, CONNECT_TIMEOUT).await
        {
            Ok(client) => client,
            Err(e) => {
                error!(%addr, error = %e, "could not connect to dlv");
                eprintln!("Error: could not connect to dlv at {addr}: {e}");
                if let Some(dlv) = dlv {
                    dlv.shutdown().await;
                }
                std::process::exit(1);
            }
        };

    // Set panic handler to clean up terminal state while preserving panic info
    std::panic::set_hook(Box::new(|panic_info| {
        let _ = exit_state(&mut std::io::stdout());
        eprintln!("Dive has crashed. Crash details:");
        eprintln!("{panic_info}");
    }));

    let mut stdout = std::io::stdout();

    // Set up terminal state
    crossterm::terminal::enable_raw_mode()?;
    execute!(
        stdout,
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
    )?;

    // Run the application
    let result = terminal_main(&mut stdout, config, project_root, client.clone()).await;

    // Always clean up terminal state, regardless of success or failure
    if let Err(cleanup_err) = exit_state(&mut stdout) {
        eprintln!("Warning: Failed to clean up terminal state: {cleanup_err}");
    }

    if let Some(dlv) = dlv {
        match tokio::time::timeout(DETACH_TIMEOUT, client.detach(true)).await {
            Ok(Ok(())) => info!("detached from dlv"),
            Ok(Err(e)) => warn!(error = %e, "detach failed"),
            Err(_) => warn!("detach timed out"),
        }
        dlv.shutdown().await;
    }

    // Handle the main result
    if let Err(e) = result {
        error!(error = %e, "terminal loop failed");
        eprintln!("Error: {e}");
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_target_with_defaults() {
        let parsed = parse_args(&args(&["./bin/app"])).unwrap();
        assert_eq!(parsed.target, Some(PathBuf::from("./bin/app")));
        assert_eq!(parsed.port, DEFAULT_PORT);
        assert_eq!(parsed.dir, PathBuf::from("./"));
        assert!(parsed.connect.is_none());
        assert!(parsed.target_args.is_empty());
    }

    #[test]
    fn test_parse_flags_and_target_args() {
        let parsed = parse_args(&args(&[
            "./bin/app", "--port", "9000", "--dir", "/src", "--log", "/tmp/d.log", "--", "-v",
            "in.txt",
        ]))
        .unwrap();
        assert_eq!(parsed.port, 9000);
        assert_eq!(parsed.dir, PathBuf::from("/src"));
        assert_eq!(parsed.log_file, PathBuf::from("/tmp/d.log"));
        assert_eq!(parsed.target_args, vec!["-v", "in.txt"]);
    }

    #[test]
    fn test_connect_needs_no_target() {
        let parsed = parse_args(&args(&["--connect", "127.0.0.1:2345"])).unwrap();
        assert_eq!(parsed.connect.as_deref(), Some("127.0.0.1:2345"));
        assert!(parsed.target.is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&args(&["./app", "--port"])).is_err());
        assert!(parse_args(&args(&["./app", "--port", "http"])).is_err());
        assert!(parse_args(&args(&["./app", "--frobnicate"])).is_err());
        assert!(parse_args(&args(&["./app", "./other"])).is_err());
    }
}
