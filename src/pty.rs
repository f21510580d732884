use crate::error::{Error, Result};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a child gets to exit after the hangup signal before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_millis(100);

/// Manages a program running inside a PTY
pub struct PtySession {
    master: Option<Box<dyn MasterPty + Send>>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
}

impl PtySession {
    /// Spawn `argv` in a fresh PTY, returning the session and reader separately
    pub fn spawn(argv: &[String]) -> Result<(Self, Box<dyn Read + Send>)> {
        let command = argv.join(" ");
        let spawn_err = |reason: anyhow::Error| Error::Spawn {
            command: command.clone(),
            reason: format!("{reason:#}"),
        };
        let (program, args) = argv.split_first().ok_or_else(|| Error::Spawn {
            command: command.clone(),
            reason: "empty command".into(),
        })?;

        let pty_system = portable_pty::native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(spawn_err)?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair.slave.spawn_command(cmd).map_err(spawn_err)?;
        // The slave end must be closed here so the reader sees EOF once the
        // child exits.
        drop(pair.slave);

        let writer = pair.master.take_writer().map_err(spawn_err)?;
        let reader = pair.master.try_clone_reader().map_err(spawn_err)?;

        debug!(command = %command, pid = ?child.process_id(), "spawned child in pty");

        Ok((
            PtySession {
                master: Some(pair.master),
                child,
                writer,
            },
            reader,
        ))
    }

    /// Write data to the program's stdin
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Check if the child process is still running
    pub fn is_running(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    /// Stop the child and release the PTY.
    ///
    /// Unless `force` is set the child first receives SIGHUP and SIGCONT and
    /// gets a short grace period; a child still alive afterwards is killed.
    ///
    /// The grace period blocks the calling thread for at most
    /// `TERMINATE_GRACE`, also when called from async code.
    pub fn terminate(&mut self, force: bool) -> Result<()> {
        if !force && self.is_running() {
            self.hangup();
            let deadline = Instant::now() + TERMINATE_GRACE;
            while self.is_running() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        if self.is_running() {
            debug!(pid = ?self.process_id(), "killing child");
            if let Err(e) = self.child.kill() {
                // The child may have exited between the check and the kill.
                if self.is_running() {
                    return Err(e.into());
                }
            }
        }
        self.child.wait()?;
        self.master.take();
        Ok(())
    }

    #[cfg(unix)]
    fn hangup(&self) {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.process_id() {
            let pid = Pid::from_raw(pid as i32);
            for sig in [Signal::SIGHUP, Signal::SIGCONT] {
                if let Err(e) = signal::kill(pid, sig) {
                    debug!(%pid, signal = ?sig, error = %e, "hangup signal failed");
                }
            }
        }
    }

    #[cfg(not(unix))]
    fn hangup(&self) {}
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_spawn_missing_program() {
        let err = PtySession::spawn(&argv(&["/nonexistent/promptty-test-binary"]))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Spawn { .. }), "got: {err}");
    }

    #[test]
    fn test_spawn_empty_command() {
        assert!(matches!(
            PtySession::spawn(&[]).err().unwrap(),
            Error::Spawn { .. }
        ));
    }

    #[test]
    fn test_terminate_graceful() {
        let (mut pty, _reader) = PtySession::spawn(&argv(&["sleep", "30"])).unwrap();
        assert!(pty.is_running());
        pty.terminate(false).unwrap();
        assert!(!pty.is_running());
    }

    #[test]
    fn test_terminate_force() {
        let (mut pty, _reader) = PtySession::spawn(&argv(&["cat"])).unwrap();
        pty.terminate(true).unwrap();
        assert!(!pty.is_running());
    }
}
