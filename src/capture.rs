use crate::config::CaptureConfig;
use crate::filter::FilterExpression;
use crate::signal::Cancellation;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum WaitOutcome {
    Exited(ExitStatus),
    Cancelled,
}

/// Arguments for a live capture on `config.interface`.
pub fn build_live_args(config: &CaptureConfig, filter: &FilterExpression) -> Vec<String> {
    let mut args = vec![
        "-i".to_string(),
        config.interface.clone(),
        "-s".to_string(),
        config.snapshot_length.to_string(),
    ];

    if config.packet_count > 0 {
        args.push("-c".to_string());
        args.push(config.packet_count.to_string());
    }

    push_display_flags(&mut args, config);

    if let Some(out) = &config.output_file {
        // 逐包刷新，中断时文件里也是完整的包。
        args.push("-U".to_string());
        args.push("-w".to_string());
        args.push(out.display().to_string());
    }

    push_filter(&mut args, filter);
    args
}

/// Arguments for reading back an existing capture file.
pub fn build_read_args(config: &CaptureConfig, path: &Path, filter: &FilterExpression) -> Vec<String> {
    let mut args = vec!["-r".to_string(), path.display().to_string()];
    push_display_flags(&mut args, config);
    push_filter(&mut args, filter);
    args
}

fn push_display_flags(args: &mut Vec<String>, config: &CaptureConfig) {
    if !config.resolve_names {
        args.push("-n".to_string());
    }
    if config.verbose {
        args.push("-v".to_string());
    }
}

fn push_filter(args: &mut Vec<String>, filter: &FilterExpression) {
    // 过滤表达式作为单个参数传入，不经过 shell。
    if !filter.is_empty() {
        args.push(filter.to_string());
    }
}

/// Renders a copy-pasteable shell equivalent of the invocation for logging.
pub fn render_command(tool: &str, args: &[String]) -> String {
    let mut cmd = tool.to_string();
    for arg in args {
        cmd.push(' ');
        if arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:,=".contains(c)) && !arg.is_empty() {
            cmd.push_str(arg);
        } else {
            cmd.push_str(&shell_escape_single_quotes(arg));
        }
    }
    cmd
}

/// Blocks until the child exits or `cancel` fires, whichever comes first.
/// A cancelled child is killed and reaped before returning.
pub fn wait_with_cancel(child: &mut Child, cancel: &impl Cancellation) -> Result<WaitOutcome> {
    loop {
        if cancel.is_cancelled() {
            stop(child).context("failed to reap capture process")?;
            return Ok(WaitOutcome::Cancelled);
        }

        if let Some(status) = child.try_wait().context("failed to poll capture process")? {
            if cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }
            return Ok(WaitOutcome::Exited(status));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Kills the child if it is still running and reaps it.
pub fn stop(child: &mut Child) -> std::io::Result<ExitStatus> {
    // 子进程可能已因同一个 SIGINT 退出，kill 失败可以忽略。
    let _ = child.kill();
    child.wait()
}

fn shell_escape_single_quotes(input: &str) -> String {
    if input.is_empty() {
        return "''".to_string();
    }
    let escaped = input.replace('\'', "'\\''");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::config::Defaults;
    use crate::signal::CancelToken;
    use clap::Parser;
    use std::process::{Command, Stdio};
    use std::time::Instant;

    fn config(argv: &[&str]) -> CaptureConfig {
        let mut full = vec!["netcap"];
        full.extend_from_slice(argv);
        CaptureConfig::from_args(Args::try_parse_from(full).unwrap(), &Defaults::default()).unwrap()
    }

    fn expr(cfg: &CaptureConfig) -> FilterExpression {
        crate::filter::build_filter(cfg)
    }

    #[test]
    fn escape_single_quotes() {
        assert_eq!(shell_escape_single_quotes("port 443"), "'port 443'");
        assert_eq!(shell_escape_single_quotes("host 'bad'"), "'host '\\''bad'\\'''");
        assert_eq!(shell_escape_single_quotes(""), "''");
    }

    #[test]
    fn live_args_with_defaults() {
        let cfg = config(&[]);
        let args = build_live_args(&cfg, &expr(&cfg));
        assert_eq!(args, vec!["-i", "any", "-s", "262144", "-c", "100"]);
    }

    #[test]
    fn live_args_full() {
        let cfg = config(&["-i", "eth0", "-p", "80,443", "-c", "0", "-n", "-v", "-w", "out.pcap"]);
        let args = build_live_args(&cfg, &expr(&cfg));
        assert_eq!(
            args,
            vec![
                "-i",
                "eth0",
                "-s",
                "262144",
                "-n",
                "-v",
                "-U",
                "-w",
                "out.pcap",
                "(port 80 or port 443)"
            ]
        );
    }

    #[test]
    fn read_args_skip_capture_options() {
        let cfg = config(&["-r", "in.pcap", "-H", "10.0.0.1", "-c", "5"]);
        let args = build_read_args(&cfg, Path::new("in.pcap"), &expr(&cfg));
        assert_eq!(args, vec!["-r", "in.pcap", "host 10.0.0.1"]);
    }

    #[test]
    fn render_quotes_filter() {
        let args = vec!["-i".to_string(), "any".to_string(), "tcp[tcpflags] & tcp-syn != 0".to_string()];
        assert_eq!(
            render_command("tcpdump", &args),
            "tcpdump -i any 'tcp[tcpflags] & tcp-syn != 0'"
        );
    }

    #[test]
    fn wait_reports_exit_status() {
        let mut child = Command::new("sh").args(["-c", "exit 4"]).stdout(Stdio::null()).spawn().unwrap();
        match wait_with_cancel(&mut child, &CancelToken::manual()).unwrap() {
            WaitOutcome::Exited(status) => assert_eq!(status.code(), Some(4)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stop_reaps_running_child() {
        let mut child = Command::new("sh").args(["-c", "exec sleep 30"]).stdout(Stdio::null()).spawn().unwrap();
        stop(&mut child).unwrap();
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn stop_tolerates_exited_child() {
        let mut child = Command::new("sh").args(["-c", "exit 0"]).stdout(Stdio::null()).spawn().unwrap();
        child.wait().unwrap();
        assert!(stop(&mut child).unwrap().success());
    }

    #[test]
    fn wait_kills_on_cancel() {
        let mut child = Command::new("sh").args(["-c", "sleep 30"]).stdout(Stdio::null()).spawn().unwrap();
        let token = CancelToken::manual();
        token.cancel();

        let started = Instant::now();
        let outcome = wait_with_cancel(&mut child, &token).unwrap();
        assert!(matches!(outcome, WaitOutcome::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
