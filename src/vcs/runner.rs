//! Subprocess execution for the VCS command-line tools.
//!
//! Every VCS interaction is a blocking child process. Stdout and stderr are
//! drained on helper threads while the caller polls for exit, so a timeout
//! or a Ctrl-C can kill the child without leaving a full pipe behind.
//!
//! On unix each child leads its own process group and a kill takes down the
//! whole group, including helpers such as `git-remote-https` that inherit
//! the pipes. A killed run returns without waiting for the drain threads, so
//! a descendant that escaped the group cannot hold the caller.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::DepupError;

/// Poll interval while waiting for a child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs external programs, capturing stdout and surfacing failures.
#[derive(Clone, Debug, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill children that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Kill children once `flag` becomes true (set by the Ctrl-C handler).
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program base_args... args...` in `cwd` and return its stdout.
    ///
    /// `env` entries are added to the inherited environment. A non-zero exit
    /// status becomes [`DepupError::Process`] carrying the captured stderr.
    pub fn run<S: AsRef<str>>(
        &self,
        program: &str,
        base_args: &[&str],
        args: &[S],
        env: &[(&str, &str)],
        cwd: &Path,
    ) -> Result<String, DepupError> {
        let arg_line = args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ");
        debug!(program, args = %arg_line, cwd = %cwd.display(), "Running command");

        let mut cmd = Command::new(program);
        cmd.args(base_args)
            .args(args.iter().map(|a| a.as_ref()))
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in env {
            cmd.env(key, value);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| DepupError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // On error the child is gone; the drain threads are left detached.
        let status = self.wait(&mut child, program)?;
        let stdout = join(stdout);
        let stderr = String::from_utf8_lossy(&join(stderr)).into_owned();

        if !status.success() {
            warn!(program, args = %arg_line, code = ?status.code(), stderr = %stderr.trim(), "Command failed");
            return Err(DepupError::Process {
                program: program.to_string(),
                args: arg_line,
                code: status.code(),
                stderr,
            });
        }

        if !stderr.trim().is_empty() {
            debug!(program, stderr = %stderr.trim(), "Command stderr");
        }

        String::from_utf8(stdout).map_err(|_| DepupError::NonUtf8Output {
            program: program.to_string(),
        })
    }

    /// Wait for `child`, killing it on timeout or interrupt.
    fn wait(&self, child: &mut Child, program: &str) -> Result<ExitStatus, DepupError> {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if self.interrupt.as_ref().is_some_and(|f| f.load(Ordering::SeqCst)) {
                        kill(child);
                        return Err(DepupError::Interrupted {
                            program: program.to_string(),
                        });
                    }
                    if let Some(limit) = self.timeout {
                        if start.elapsed() > limit {
                            kill(child);
                            return Err(DepupError::Timeout {
                                program: program.to_string(),
                                limit,
                            });
                        }
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    kill(child);
                    return Err(DepupError::Io(e));
                }
            }
        }
    }
}

/// Read a child pipe to the end on a helper thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            // A read error just truncates the captured output.
            let _ = p.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain syscall on the group this runner created at spawn.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
