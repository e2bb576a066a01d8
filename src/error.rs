use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes.
pub mod codes {
    pub const SUCCESS: i32 = 0;
    /// Dependency, permission, missing file, bad argument or launch failure.
    pub const FAILURE: i32 = 1;
    /// Interrupted by SIGINT (128 + 2).
    pub const INTERRUPTED: i32 = 130;
}

/// Fatal conditions of a single invocation. None of them is retried.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{tool} is not installed or not on PATH")]
    Dependency { tool: String },

    #[error("live capture requires root privileges (try sudo)")]
    Permission,

    #[error("capture file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("{tool} exited with status {code}")]
    ToolExecution { tool: String, code: i32 },

    #[error(transparent)]
    System(#[from] anyhow::Error),
}

impl CaptureError {
    pub fn exit_code(&self) -> i32 {
        match self {
            // 透传抓包工具自身的退出码。
            CaptureError::ToolExecution { code, .. } if *code != codes::SUCCESS => *code,
            _ => codes::FAILURE,
        }
    }
}
