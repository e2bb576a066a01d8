use anyhow::{bail, Context, Result};
use std::process::{Child, Command, Stdio};

/// Executes external commands for capture-related queries.
pub trait Runner {
    /// Runs a command to completion and returns trimmed stdout on success.
    fn run_capture(&self, program: &str, args: &[&str]) -> Result<String>;

    /// Starts a long-running command; stderr is inherited so the user sees
    /// the tool's own diagnostics.
    fn spawn(&self, program: &str, args: &[String], stdout: Stdio) -> Result<Child>;
}

/// Runner implementation that invokes system binaries.
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run_capture(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run {program}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{program} failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn spawn(&self, program: &str, args: &[String], stdout: Stdio) -> Result<Child> {
        Command::new(program)
            .args(args)
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }
}

/// Reports whether the effective user is root.
pub fn is_privileged(runner: &impl Runner) -> Result<bool> {
    let uid = runner.run_capture("id", &["-u"])?;
    Ok(uid == "0")
}

/// Reports whether `tool` resolves to an executable, either on PATH or as a
/// direct path.
pub fn tool_installed(runner: &impl Runner, tool: &str) -> bool {
    // 通过位置参数传入工具名，避免被 shell 解释。
    runner
        .run_capture("sh", &["-c", "command -v \"$1\"", "sh", tool])
        .map(|found| !found.is_empty())
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A network interface as reported by the host's link listing.
pub struct Interface {
    pub name: String,
    pub state: String,
}

/// Lists network interfaces without touching the capture tool.
pub fn list_interfaces(runner: &impl Runner) -> Result<Vec<Interface>> {
    let out = runner
        .run_capture("ip", &["-brief", "link", "show"])
        .context("failed to list network interfaces")?;
    Ok(parse_links(&out))
}

fn parse_links(out: &str) -> Vec<Interface> {
    out.lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?;
            // veth 等设备会带 "@peer" 后缀，抓包时只用前半部分。
            let name = name.split('@').next().unwrap_or(name);
            let state = cols.next().unwrap_or("UNKNOWN");
            Some(Interface {
                name: name.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
pub use fake::{CommandRecord, FakeRunner};

#[cfg(test)]
mod fake {
    use super::Runner;
    use anyhow::{bail, Context, Result};
    use std::process::{Child, Command, Stdio};
    use std::sync::Mutex;

    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    /// Records a command executed through a runner.
    pub struct CommandRecord {
        pub program: String,
        pub args: Vec<String>,
    }

    #[derive(Debug)]
    /// Test runner with canned answers that records every call.
    pub struct FakeRunner {
        pub uid: String,
        pub installed: bool,
        pub links: String,
        /// Script run by `sh -c` in place of the capture tool.
        pub child_script: String,
        pub calls: Mutex<Vec<CommandRecord>>,
        pub pids: Mutex<Vec<u32>>,
    }

    impl Default for FakeRunner {
        fn default() -> Self {
            Self {
                uid: "0".to_string(),
                installed: true,
                links: "lo UNKNOWN 00:00:00:00:00:00 <LOOPBACK,UP>\neth0 UP 52:54:00:12:34:56 <BROADCAST,UP>"
                    .to_string(),
                child_script: "exit 0".to_string(),
                calls: Mutex::new(Vec::new()),
                pids: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeRunner {
        pub fn unprivileged() -> Self {
            Self {
                uid: "1000".to_string(),
                ..Self::default()
            }
        }

        pub fn with_script(script: &str) -> Self {
            Self {
                child_script: script.to_string(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<CommandRecord> {
            self.calls.lock().unwrap().clone()
        }

        /// Pids of every child spawned so far.
        pub fn spawned_pids(&self) -> Vec<u32> {
            self.pids.lock().unwrap().clone()
        }

        pub fn called(&self, program: &str) -> bool {
            self.calls().iter().any(|c| c.program == program)
        }

        fn record(&self, program: &str, args: Vec<String>) {
            self.calls.lock().unwrap().push(CommandRecord {
                program: program.to_string(),
                args,
            });
        }
    }

    impl Runner for FakeRunner {
        fn run_capture(&self, program: &str, args: &[&str]) -> Result<String> {
            self.record(program, args.iter().map(|s| s.to_string()).collect());
            match program {
                "id" => Ok(self.uid.clone()),
                "sh" if self.installed => Ok("/usr/sbin/tcpdump".to_string()),
                "sh" => bail!("sh failed: not found"),
                "ip" => Ok(self.links.clone()),
                other => bail!("unexpected program {other}"),
            }
        }

        fn spawn(&self, program: &str, args: &[String], stdout: Stdio) -> Result<Child> {
            self.record(program, args.to_vec());
            let child = Command::new("sh")
                .arg("-c")
                .arg(&self.child_script)
                .stdout(stdout)
                .spawn()
                .context("failed to spawn fake child")?;
            self.pids.lock().unwrap().push(child.id());
            Ok(child)
        }
    }
}
