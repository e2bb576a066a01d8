use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use netcap::cli::Args;
use netcap::config::{CaptureConfig, Defaults};
use netcap::error::codes;
use netcap::signal::CancelToken;
use netcap::system::SystemRunner;
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help/--version 正常退出，其余解析错误统一按 1 退出。
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => codes::SUCCESS,
                _ => codes::FAILURE,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let config = match CaptureConfig::from_args(args, &Defaults::default()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}\n\n{}", Args::command().render_usage());
            std::process::exit(err.exit_code());
        }
    };

    let cancel = CancelToken::install();
    let mut stdout = std::io::stdout().lock();
    let code = match netcap::run(&config, &SystemRunner, &cancel, &mut stdout) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("error: {err:#}");
            err.exit_code()
        }
    };
    stdout.flush().ok();
    std::process::exit(code);
}
