//! [`Session`]: one external program on a PTY, synchronised on its prompt.
//!
//! A session is created by [`Session::spawn`], which starts the program,
//! optionally sends an initialisation line and then waits for the first
//! prompt. Afterwards every [`send`](Session::send) is normally followed by an
//! [`expect`](Session::expect) that reads output until one of the session's
//! patterns matches.

use crate::buffer::StreamBuffer;
use crate::error::{Error, Result};
use crate::pattern::{PatternMatch, PatternSet, PromptPatterns};
use crate::pty::PtySession;
use crate::pty_reader::spawn_reader;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Expect timeout used when neither the caller nor the session sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single wait between reads in [`Session::expect`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long spawn waits for the program to print something before the init
/// line is sent. Sending earlier lets the terminal echo land ahead of the
/// program's own start-up prompt.
const INIT_SETTLE: Duration = Duration::from_secs(1);

/// Defaults applied to sessions whose [`SpawnOptions`] leave them unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub timeout: Duration,
    /// Number of trailing characters searched for a prompt; `None` searches
    /// the whole buffer.
    pub search_window: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            search_window: None,
        }
    }
}

/// Everything needed to start a session.
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Program and arguments, split with shell quoting rules.
    pub command: String,
    /// Regular expression for the program's main prompt. Mandatory.
    pub prompt: String,
    pub continuation: Option<String>,
    /// Line sent right after start-up, typically to set a known prompt.
    pub init: Option<String>,
    pub timeout: Option<Duration>,
    pub search_window: Option<usize>,
}

impl SpawnOptions {
    pub fn new(command: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn continuation(mut self, pattern: impl Into<String>) -> Self {
        self.continuation = Some(pattern.into());
        self
    }

    pub fn init(mut self, line: impl Into<String>) -> Self {
        self.init = Some(line.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn search_window(mut self, chars: usize) -> Self {
        self.search_window = Some(chars);
        self
    }
}

/// Result of a successful [`Session::expect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectOutcome {
    /// Index of the pattern that matched.
    pub index: usize,
    pub label: String,
    /// Output preceding the match.
    pub before: String,
    /// The matched text itself.
    pub after: String,
    /// Output received after the match, kept for the next expect.
    pub buffer: String,
}

/// A running program attached to a PTY.
pub struct Session {
    pty: PtySession,
    output_rx: Receiver<Vec<u8>>,
    buffer: StreamBuffer,
    name: String,
    patterns: PromptPatterns,
    compiled: PatternSet,
    timeout: Duration,
    search_window: Option<usize>,
    prompt: String,
    before: String,
    created_at: std::time::Instant,
    closed: bool,
}

impl Session {
    /// Start `options.command` on a new PTY and wait for its first prompt.
    ///
    /// `defaults` supplies the timeout and search window when `options`
    /// leaves them unset. If the prompt never shows up the child is torn
    /// down before the error is returned.
    pub async fn spawn(options: SpawnOptions, defaults: &SessionConfig) -> Result<Self> {
        if options.command.trim().is_empty() {
            return Err(Error::Usage("no command to run".into()));
        }
        if options.prompt.is_empty() {
            return Err(Error::Usage(
                "a prompt pattern is required (-p/--prompt)".into(),
            ));
        }

        let mut patterns = PromptPatterns::new(options.prompt.as_str());
        if let Some(continuation) = &options.continuation {
            patterns.set_continuation(continuation.as_str());
        }
        let compiled = patterns.compile()?;

        let argv = shell_words::split(&options.command).map_err(|e| {
            Error::Usage(format!("cannot parse command '{}': {e}", options.command))
        })?;
        let (pty, reader) = PtySession::spawn(&argv)?;
        let output_rx = spawn_reader(reader, &options.command);

        let mut session = Session {
            pty,
            output_rx,
            buffer: StreamBuffer::new(),
            name: options.command.clone(),
            patterns,
            compiled,
            timeout: options.timeout.unwrap_or(defaults.timeout),
            search_window: options.search_window.or(defaults.search_window),
            prompt: String::new(),
            before: String::new(),
            created_at: std::time::Instant::now(),
            closed: false,
        };

        if let Err(e) = session.synchronise(options.init.as_deref()).await {
            session.closed = true;
            if let Err(teardown) = session.pty.terminate(true) {
                warn!(command = %session.name, error = %teardown, "failed to stop child after spawn error");
            }
            return Err(e);
        }
        Ok(session)
    }

    async fn synchronise(&mut self, init: Option<&str>) -> Result<()> {
        if let Some(init) = init {
            self.await_output(INIT_SETTLE.min(self.timeout)).await;
            self.send(init)?;
        }
        self.expect_prompt(None, None).await?;
        Ok(())
    }

    /// Buffer the first chunk of output, giving up after `limit`.
    async fn await_output(&mut self, limit: Duration) {
        let deadline = Instant::now() + limit;
        loop {
            match self.output_rx.try_recv() {
                Ok(chunk) => {
                    self.buffer.push(&chunk);
                    return;
                }
                Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Write `line` and a line terminator to the program.
    pub fn send(&mut self, line: &str) -> Result<()> {
        debug!(session = %self.name, line, "send");
        let mut data = line.as_bytes().to_vec();
        data.push(b'\n');
        self.pty.write(&data)
    }

    /// Read output until one of `patterns` matches or `timeout` elapses.
    ///
    /// The buffer is searched after every received chunk, restricted to the
    /// last `search_window` characters when set. On success the buffer is
    /// advanced past the match. On timeout the buffer is left intact and a
    /// copy travels in the error.
    pub async fn expect(
        &mut self,
        patterns: &PatternSet,
        timeout: Duration,
        search_window: Option<usize>,
    ) -> Result<ExpectOutcome> {
        if patterns.is_empty() {
            return Err(Error::Usage("expect needs at least one pattern".into()));
        }
        let deadline = Instant::now() + timeout;

        if let Some(m) = self.buffer.find(patterns, search_window) {
            return Ok(self.consume(patterns, &m));
        }

        loop {
            let mut eof = false;
            loop {
                match self.output_rx.try_recv() {
                    Ok(chunk) => {
                        self.buffer.push(&chunk);
                        if let Some(m) = self.buffer.find(patterns, search_window) {
                            return Ok(self.consume(patterns, &m));
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        eof = true;
                        break;
                    }
                }
            }

            if eof {
                debug!(session = %self.name, "eof while waiting for prompt");
                return Err(Error::Eof {
                    buffer: self.buffer.as_str().to_string(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(session = %self.name, ?timeout, "expect timed out");
                return Err(Error::ExpectTimeout {
                    timeout,
                    patterns: patterns.describe(),
                    buffer: self.buffer.as_str().to_string(),
                });
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Expect the session's own prompt/continuation set and record the
    /// outcome as the current prompt.
    ///
    /// `None` arguments fall back to the session defaults.
    pub async fn expect_prompt(
        &mut self,
        timeout: Option<Duration>,
        search_window: Option<usize>,
    ) -> Result<ExpectOutcome> {
        let patterns = self.compiled.clone();
        let timeout = timeout.unwrap_or(self.timeout);
        let window = search_window.or(self.search_window);
        let outcome = self.expect(&patterns, timeout, window).await?;
        self.before = outcome.before.clone();
        self.prompt = outcome.after.trim_start().to_string();
        Ok(outcome)
    }

    fn consume(&mut self, patterns: &PatternSet, m: &PatternMatch) -> ExpectOutcome {
        let (before, after) = self.buffer.consume(m);
        let label = patterns.label(m.index).unwrap_or_default().to_string();
        debug!(session = %self.name, pattern = %label, "matched");
        ExpectOutcome {
            index: m.index,
            label,
            before,
            after,
            buffer: self.buffer.as_str().to_string(),
        }
    }

    /// Replace the prompt and/or continuation pattern for all later expects.
    ///
    /// Both patterns are compiled before anything changes, so an invalid
    /// pattern leaves the session as it was.
    pub fn set_patterns(&mut self, prompt: Option<&str>, continuation: Option<&str>) -> Result<()> {
        let mut next = self.patterns.clone();
        if let Some(prompt) = prompt {
            if prompt.is_empty() {
                return Err(Error::Usage("prompt pattern must not be empty".into()));
            }
            next.set_prompt(prompt);
        }
        if let Some(continuation) = continuation {
            next.set_continuation(continuation);
        }
        self.compiled = next.compile()?;
        self.patterns = next;
        Ok(())
    }

    /// Stop the program and release its PTY.
    pub fn close(mut self, force: bool) -> Result<()> {
        debug!(session = %self.name, force, "closing session");
        self.closed = true;
        self.pty.terminate(force)
    }

    /// The command line this session was spawned with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text of the most recent prompt match, without leading whitespace.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Output preceding the most recent prompt match.
    pub fn last_before(&self) -> &str {
        &self.before
    }

    pub fn patterns(&self) -> &PromptPatterns {
        &self.patterns
    }

    pub fn active_patterns(&self) -> &PatternSet {
        &self.compiled
    }

    /// Output received but not yet consumed by a match.
    pub fn buffer(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn search_window(&self) -> Option<usize> {
        self.search_window
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.pty.process_id()
    }

    pub fn is_running(&mut self) -> bool {
        self.pty.is_running()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.pty.terminate(true) {
                warn!(session = %self.name, error = %e, "failed to stop child on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_options_builder() {
        let options = SpawnOptions::new("bash", r"\r\nbash> ")
            .continuation(r"\r\n> ")
            .init("PS1='bash> '")
            .timeout(Duration::from_secs(5))
            .search_window(200);
        assert_eq!(options.command, "bash");
        assert_eq!(options.continuation.as_deref(), Some(r"\r\n> "));
        assert_eq!(options.init.as_deref(), Some("PS1='bash> '"));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.search_window, Some(200));
    }

    #[tokio::test]
    async fn test_spawn_requires_prompt() {
        let err = Session::spawn(SpawnOptions::new("cat", ""), &SessionConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Usage(_)), "got: {err}");
    }

    #[tokio::test]
    async fn test_spawn_requires_command() {
        let err = Session::spawn(SpawnOptions::new("  ", "> "), &SessionConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Usage(_)), "got: {err}");
    }

    #[tokio::test]
    async fn test_spawn_rejects_invalid_pattern() {
        let err = Session::spawn(SpawnOptions::new("cat", "(oops"), &SessionConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidPattern(_)), "got: {err}");
    }
}
