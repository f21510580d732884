use crate::command::Context;
use crate::parser::{Cell, parse_cell};
use crate::session::SessionConfig;
use anyhow::{Context as _, Result};
use std::io::{self, Write};
use tracing::debug;

/// The host's own way of executing code that is not a magic command.
pub trait Evaluator {
    /// Execute `code`, optionally returning a value to show as the result.
    fn evaluate(&mut self, code: &str) -> Result<Option<String>>;
}

/// Executes submitted cells: applies the session lock, dispatches magics
/// through the command registry and hands everything else to the host's
/// [`Evaluator`].
pub struct Engine<E> {
    ctx: Context,
    evaluator: E,
}

impl<E: Evaluator> Engine<E> {
    /// Create an engine that writes all displayed output to stdout.
    pub fn new(evaluator: E, defaults: SessionConfig) -> Self {
        Self::with_handler(evaluator, defaults, |data| {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(data);
            let _ = stdout.flush();
        })
    }

    /// Create an engine with a custom output handler.
    ///
    /// The handler receives every chunk of displayed text, which makes it
    /// straightforward to capture output in tests or redirect it elsewhere.
    pub fn with_handler<F>(evaluator: E, defaults: SessionConfig, handler: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        Engine {
            ctx: Context::new(defaults, handler),
            evaluator,
        }
    }

    /// Execute one submitted cell.
    ///
    /// While the lock is on, the cell is first rewritten to run through the
    /// active session.
    pub async fn submit(&mut self, raw: &str) -> Result<Option<String>> {
        let work = self.ctx.lock_state().filter(raw);
        match parse_cell(&work)? {
            Cell::Native(code) => {
                debug!(bytes = code.len(), "cell handed to host evaluator");
                self.evaluator.evaluate(code)
            }
            Cell::Magics(commands) => {
                let mut value = None;
                for cmd in commands {
                    debug!(command = cmd.name(), "executing magic");
                    value = cmd
                        .execute(&mut self.ctx)
                        .await
                        .with_context(|| format!("%{} failed", cmd.name()))?;
                }
                Ok(value)
            }
        }
    }

    /// Execute cells in order, stopping at the first failure.
    pub async fn execute<'a>(&mut self, cells: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for (n, cell) in cells.into_iter().enumerate() {
            if let Some(value) = self
                .submit(cell)
                .await
                .with_context(|| format!("Cell {} failed", n + 1))?
            {
                self.ctx.emit_line(&value);
            }
        }
        Ok(())
    }

    pub fn context(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        cells: Vec<String>,
    }

    impl Evaluator for Recorder {
        fn evaluate(&mut self, code: &str) -> Result<Option<String>> {
            self.cells.push(code.to_string());
            Ok(Some(format!("evaluated {} bytes", code.len())))
        }
    }

    fn engine() -> (Engine<Recorder>, Arc<Mutex<Vec<u8>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let engine = Engine::with_handler(Recorder::default(), SessionConfig::default(), move |d| {
            sink.lock().unwrap().extend_from_slice(d);
        });
        (engine, captured)
    }

    #[tokio::test]
    async fn test_native_cells_reach_evaluator() {
        let (mut engine, _) = engine();
        let value = engine.submit("1 + 1").await.unwrap();
        assert_eq!(value.as_deref(), Some("evaluated 5 bytes"));
        assert_eq!(engine.evaluator().cells, vec!["1 + 1"]);
    }

    #[tokio::test]
    async fn test_locked_cells_route_to_session() {
        let (mut engine, _) = engine();
        engine.submit("%pty_lock").await.unwrap();

        // Routed through the dispatcher, which has no session to talk to.
        let err = engine.submit("1 + 1").await.err().unwrap();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotConnected)));
        assert!(engine.evaluator().cells.is_empty());

        engine.submit("%pty_unlock").await.unwrap();
        engine.submit("1 + 1").await.unwrap();
        assert_eq!(engine.evaluator().cells, vec!["1 + 1"]);
    }

    #[tokio::test]
    async fn test_execute_emits_values() {
        let (mut engine, captured) = engine();
        engine.execute(["abc"]).await.unwrap();
        let text = String::from_utf8(captured.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "evaluated 3 bytes\n");
    }

    #[tokio::test]
    async fn test_unknown_magic_fails() {
        let (mut engine, _) = engine();
        assert!(engine.submit("%pty_bogus").await.is_err());
    }
}
