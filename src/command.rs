//! The [`MagicCommand`] trait and the [`Context`] commands receive when executed.

use crate::dispatcher::{self, RunOptions};
use crate::error::{Error, Result};
use crate::lock::SessionLock;
use crate::session::{Session, SessionConfig, SpawnOptions};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) type OutputHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Host-side state shared by all commands: the active session, the lock
/// flag, session defaults and the output sink.
///
/// At most one session is open per context. Independent contexts do not
/// share anything, so tests and embedders can hold several side by side.
pub struct Context {
    session: Option<Session>,
    lock: SessionLock,
    defaults: SessionConfig,
    output_handler: OutputHandler,
}

impl Context {
    /// Create a context that writes displayed text with `handler`.
    pub fn new<F>(defaults: SessionConfig, handler: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        Self {
            session: None,
            lock: SessionLock::new(),
            defaults,
            output_handler: Arc::new(handler),
        }
    }

    /// Pass bytes through the output handler (e.g. to stdout or a custom sink).
    pub fn emit(&self, data: &[u8]) {
        (self.output_handler)(data);
    }

    /// Emit `text` followed by a newline.
    pub fn emit_line(&self, text: &str) {
        let mut data = text.as_bytes().to_vec();
        data.push(b'\n');
        self.emit(&data);
    }

    pub fn defaults(&self) -> &SessionConfig {
        &self.defaults
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The active session, or [`Error::NotConnected`].
    pub fn session(&mut self) -> Result<&mut Session> {
        self.session.as_mut().ok_or(Error::NotConnected)
    }

    /// Start a new session, closing any existing one first.
    ///
    /// Failures while closing the old session are logged and ignored.
    pub async fn spawn(&mut self, options: SpawnOptions) -> Result<&mut Session> {
        if let Some(old) = self.session.take() {
            let name = old.name().to_string();
            if let Err(e) = old.close(false) {
                warn!(session = %name, error = %e, "failed to close previous session");
            }
            self.emit_line("Closing old connection");
        }

        let session = Session::spawn(options, &self.defaults).await?;
        info!(session = %session.name(), pid = ?session.process_id(), "session ready");
        self.emit_line(&format!("Opened connection to {}", session.name()));
        self.emit_line(session.last_before());
        Ok(self.session.insert(session))
    }

    /// Run `code` line by line through the active session.
    pub async fn run(&mut self, code: &str, options: &RunOptions) -> Result<Option<String>> {
        let handler = Arc::clone(&self.output_handler);
        let session = self.session()?;
        dispatcher::run(session, code, options, |text| emit_line_with(&handler, text)).await
    }

    /// Wait for the next prompt of the active session without sending input.
    pub async fn next_prompt(
        &mut self,
        timeout: Option<Duration>,
        search_window: Option<usize>,
    ) -> Result<()> {
        let handler = Arc::clone(&self.output_handler);
        let session = self.session()?;
        dispatcher::next_prompt(session, timeout, search_window, |text| {
            emit_line_with(&handler, text)
        })
        .await
    }

    /// Stop the active session's program and forget the session.
    pub fn close(&mut self, force: bool) -> Result<()> {
        let session = self.session.take().ok_or(Error::NotConnected)?;
        let name = session.name().to_string();
        session.close(force)?;
        self.emit_line(&format!("Closed connection to {name}"));
        Ok(())
    }

    pub fn lock(&mut self) {
        self.lock.lock();
        self.emit_line("WARNING: All future cell execution will be processed through the pty session!");
        self.emit_line("To return to the host evaluator, issue %pty_unlock");
    }

    pub fn unlock(&mut self) {
        self.lock.unlock();
        self.emit_line("Cells will use the host evaluator");
    }

    pub fn lock_state(&self) -> &SessionLock {
        &self.lock
    }
}

fn emit_line_with(handler: &OutputHandler, text: &str) {
    let mut data = text.as_bytes().to_vec();
    data.push(b'\n');
    handler(&data);
}

/// A single host-facing command such as `%pty_spawn` or `%%P`.
///
/// Implement this trait to add a new command to the engine. Then:
///
/// 1. Define `pub const NAME: &'static str` on your struct — the name after
///    the `%` or `%%` prefix.
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add one entry to the `REGISTRY` in [`crate::parser`]:
///    `(MyCmd::NAME, MyCmd::parse_boxed)`.
#[async_trait(?Send)]
pub trait MagicCommand: 'static {
    /// The command name, accessible at runtime through a trait object.
    ///
    /// Implementations should return their `NAME` constant:
    /// `fn name(&self) -> &'static str { Self::NAME }`.
    fn name(&self) -> &'static str;

    /// Parse this command from its argument string (everything after the
    /// name on the first line) and, for cell magics, the cell body.
    fn parse(args: &str, body: Option<&str>) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Parse and box this command. Used as the function-pointer type stored in
    /// the command registry.
    fn parse_boxed(args: &str, body: Option<&str>) -> anyhow::Result<Box<dyn MagicCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args, body)?))
    }

    /// Execute the command. The returned value, if any, is handed back to
    /// the host as the cell's result.
    async fn execute(&self, ctx: &mut Context) -> anyhow::Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capturing_context() -> (Context, Arc<Mutex<Vec<u8>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let ctx = Context::new(SessionConfig::default(), move |data| {
            sink.lock().unwrap().extend_from_slice(data);
        });
        (ctx, captured)
    }

    #[tokio::test]
    async fn test_run_without_session() {
        let (mut ctx, captured) = capturing_context();
        let err = ctx.run("ls", &RunOptions::default()).await.err().unwrap();
        assert!(matches!(err, Error::NotConnected));
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_next_prompt_without_session() {
        let (mut ctx, _) = capturing_context();
        let err = ctx.next_prompt(None, None).await.err().unwrap();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn test_close_without_session() {
        let (mut ctx, _) = capturing_context();
        assert!(matches!(ctx.close(true), Err(Error::NotConnected)));
    }

    #[test]
    fn test_lock_emits_warning() {
        let (mut ctx, captured) = capturing_context();
        ctx.lock();
        assert!(ctx.lock_state().is_locked());
        let text = String::from_utf8(captured.lock().unwrap().clone()).unwrap();
        assert!(text.contains("WARNING"));
        ctx.unlock();
        assert!(!ctx.lock_state().is_locked());
    }
}
