pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod signal;
pub mod system;

use anyhow::Context;
use capture::WaitOutcome;
use config::{CaptureConfig, Mode};
use error::CaptureError;
use filter::FilterExpression;
use output::RelayEnd;
use signal::Cancellation;
use std::io::{BufReader, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use system::Runner;
use tracing::{debug, info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Completed => error::codes::SUCCESS,
            Outcome::Interrupted => error::codes::INTERRUPTED,
        }
    }
}

/// Runs exactly one mode for `config`. Listings and read-mode output go to
/// `out`; a live capture writes straight to the inherited stdout.
pub fn run(
    config: &CaptureConfig,
    runner: &impl Runner,
    cancel: &impl Cancellation,
    out: &mut impl Write,
) -> Result<Outcome, CaptureError> {
    let filter = filter::build_filter(config);
    let mode = config.mode();
    debug!(?mode, %filter, "dispatching");

    match mode {
        Mode::List => list(runner, out),
        Mode::Read(path) => read(config, &path, &filter, runner, cancel, out),
        Mode::LiveCapture => live(config, &filter, runner, cancel),
    }
}

fn list(runner: &impl Runner, out: &mut impl Write) -> Result<Outcome, CaptureError> {
    let interfaces = system::list_interfaces(runner)?;
    write_listing(out, &interfaces).context("failed to print interfaces")?;
    Ok(Outcome::Completed)
}

fn write_listing(out: &mut impl Write, interfaces: &[system::Interface]) -> std::io::Result<()> {
    writeln!(out, "{:<16} {}", "any", "(all interfaces)")?;
    for iface in interfaces {
        writeln!(out, "{:<16} {}", iface.name, iface.state)?;
    }
    Ok(())
}

fn read(
    config: &CaptureConfig,
    path: &Path,
    filter: &FilterExpression,
    runner: &impl Runner,
    cancel: &impl Cancellation,
    out: &mut impl Write,
) -> Result<Outcome, CaptureError> {
    // 读文件模式不需要 root，先确认文件存在。
    if !path.is_file() {
        return Err(CaptureError::NotFound(path.to_path_buf()));
    }
    ensure_tool(runner, &config.tool)?;

    let args = capture::build_read_args(config, path, filter);
    info!(file = %path.display(), command = %capture::render_command(&config.tool, &args), "reading capture file");

    let mut child = runner.spawn(&config.tool, &args, Stdio::piped())?;
    let stdout = child
        .stdout
        .take()
        .with_context(|| format!("failed to capture {} stdout", config.tool))?;
    let relay = match output::relay_packets(BufReader::new(stdout), &mut *out, cancel) {
        Ok(relay) => relay,
        Err(err) => {
            let _ = capture::stop(&mut child);
            return Err(err.into());
        }
    };

    match relay.end {
        RelayEnd::Eof => {}
        RelayEnd::Cancelled => {
            capture::stop(&mut child).context("failed to reap capture process")?;
            return Ok(interrupted());
        }
        RelayEnd::OutputClosed => {
            // 下游（如 head）已读够，不算失败。
            capture::stop(&mut child).context("failed to reap capture process")?;
            debug!(packets = relay.packets, "output closed early");
            return Ok(Outcome::Completed);
        }
    }
    let packets = relay.packets;

    let status = match capture::wait_with_cancel(&mut child, cancel)? {
        WaitOutcome::Cancelled => return Ok(interrupted()),
        WaitOutcome::Exited(status) => status,
    };
    check_status(&config.tool, status)?;

    writeln!(out, "\n{packets} packet(s) matched in {}", path.display())
        .context("failed to print summary")?;
    info!(packets, file = %path.display(), "read complete");
    Ok(Outcome::Completed)
}

fn live(
    config: &CaptureConfig,
    filter: &FilterExpression,
    runner: &impl Runner,
    cancel: &impl Cancellation,
) -> Result<Outcome, CaptureError> {
    if !system::is_privileged(runner)? {
        return Err(CaptureError::Permission);
    }
    ensure_tool(runner, &config.tool)?;

    let args = capture::build_live_args(config, filter);
    if filter.is_empty() {
        warn!("no filter given, capturing all traffic");
    }
    info!(
        interface = %config.interface,
        command = %capture::render_command(&config.tool, &args),
        "starting live capture"
    );

    let mut child = runner.spawn(&config.tool, &args, Stdio::inherit())?;
    let status = match capture::wait_with_cancel(&mut child, cancel)? {
        WaitOutcome::Cancelled => return Ok(interrupted()),
        WaitOutcome::Exited(status) => status,
    };
    check_status(&config.tool, status)?;

    match &config.output_file {
        Some(path) => info!(file = %path.display(), "capture saved"),
        None => info!("capture complete"),
    }
    Ok(Outcome::Completed)
}

fn ensure_tool(runner: &impl Runner, tool: &str) -> Result<(), CaptureError> {
    if system::tool_installed(runner, tool) {
        Ok(())
    } else {
        Err(CaptureError::Dependency {
            tool: tool.to_string(),
        })
    }
}

fn check_status(tool: &str, status: ExitStatus) -> Result<(), CaptureError> {
    if status.success() {
        return Ok(());
    }
    // 被信号杀死时没有退出码，按一般失败处理。
    Err(CaptureError::ToolExecution {
        tool: tool.to_string(),
        code: status.code().unwrap_or(error::codes::FAILURE),
    })
}

fn interrupted() -> Outcome {
    info!("capture interrupted by user");
    Outcome::Interrupted
}
