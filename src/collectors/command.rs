use crate::analysis::CancelFlag;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL: Duration = Duration::from_millis(20);
const DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Executes a shell command line somewhere and hands back its stdout.
///
/// The exit status is not an error: smartctl sets status bits even when its
/// JSON output is complete, so callers judge the output instead.
pub trait CommandRunner: Sync {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, RunError>;

    /// Human-readable target for log messages.
    fn target(&self) -> String;
}

impl<T: CommandRunner + ?Sized> CommandRunner for Box<T> {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, RunError> {
        (**self).run(command, timeout)
    }

    fn target(&self) -> String {
        (**self).target()
    }
}

/// Runs commands through `sh -c` on this host.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner {
    pub cancel: CancelFlag,
}

impl CommandRunner for LocalRunner {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, RunError> {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        run_bounded(cmd, "sh", timeout, &self.cancel)
    }

    fn target(&self) -> String {
        "localhost".to_string()
    }
}

/// Runs commands on a remote host through the `ssh` client.
#[derive(Debug, Clone)]
pub struct SshRunner {
    pub host:    String,
    /// Extra ssh arguments, e.g. `["-i", "/root/.ssh/nas"]`.
    pub options: Vec<String>,
    pub cancel:  CancelFlag,
}

impl SshRunner {
    pub fn new(host: impl Into<String>, options: Vec<String>, cancel: CancelFlag) -> Self {
        Self { host: host.into(), options, cancel }
    }
}

impl CommandRunner for SshRunner {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, RunError> {
        let mut cmd = Command::new("ssh");
        // Never prompt; a password prompt would just burn the timeout.
        cmd.args(["-o", "BatchMode=yes"])
            .args(&self.options)
            .arg(&self.host)
            .arg(command);
        run_bounded(cmd, "ssh", timeout, &self.cancel)
    }

    fn target(&self) -> String {
        self.host.clone()
    }
}

/// Spawn `cmd`, collect stdout, and kill it on timeout or cancellation.
///
/// The child leads its own process group so a timeout takes its children
/// down too; stdout is never waited on past the deadline.
fn run_bounded(
    mut cmd: Command,
    program: &str,
    timeout: Duration,
    cancel: &CancelFlag,
) -> Result<String, RunError> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| RunError::Spawn { program: program.to_string(), source })?;

    // Drain stdout on its own thread so a full pipe can't stall the child.
    let mut stdout = child.stdout.take();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(out) = stdout.as_mut() {
            let _ = out.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });

    let deadline = Instant::now() + timeout;
    let outcome = loop {
        if child.try_wait()?.is_some() {
            break Ok(());
        }
        if cancel.is_cancelled() {
            break Err(RunError::Cancelled);
        }
        if Instant::now() >= deadline {
            break Err(RunError::Timeout(timeout));
        }
        thread::sleep(POLL);
    };
    if let Err(e) = outcome {
        kill_group(&mut child);
        return Err(e);
    }

    // A background grandchild may still hold the pipe after the child exits.
    let left = deadline.saturating_duration_since(Instant::now()).max(DRAIN_GRACE);
    match rx.recv_timeout(left) {
        Ok(buf) => Ok(String::from_utf8_lossy(&buf).into_owned()),
        Err(_) => {
            kill_group(&mut child);
            Err(RunError::Timeout(timeout))
        }
    }
}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: signals the group the child was placed in at spawn.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Single-quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_single_quotes() {
        assert_eq!(shell_quote("/dev/sda"), "'/dev/sda'");
        assert_eq!(shell_quote("a'b"), r"'a'\''b'");
    }

    #[cfg(unix)]
    #[test]
    fn local_runner_returns_stdout() {
        let out = LocalRunner::default().run("echo hello", Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn local_runner_ignores_exit_status() {
        let out = LocalRunner::default().run("echo partial; exit 4", Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "partial");
    }

    #[cfg(unix)]
    #[test]
    fn local_runner_times_out() {
        let err = LocalRunner::default().run("sleep 2", Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, RunError::Timeout(_)));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_also_stops_grandchildren() {
        let started = Instant::now();
        let err = LocalRunner::default().run("sleep 3; echo x", Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, RunError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn background_holder_of_stdout_does_not_block() {
        let started = Instant::now();
        let out = LocalRunner::default().run("sleep 3 & echo done", Duration::from_millis(300));
        assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
        assert!(matches!(out, Err(RunError::Timeout(_))));
    }

    #[cfg(unix)]
    #[test]
    fn cancelled_runner_stops() {
        let runner = LocalRunner::default();
        runner.cancel.cancel();
        let err = runner.run("sleep 2", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RunError::Cancelled));
    }
}
