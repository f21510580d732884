//! # Promptty
//!
//! Drive prompt-based interactive programs (shells, REPLs, interpreters)
//! through a pseudo-terminal.
//!
//! A [`Session`] spawns a program on a PTY and synchronises with it by
//! matching its output against a prompt pattern and an optional
//! continuation pattern. Code is sent one line at a time; after each line
//! the session waits until the program shows a prompt again, so the output
//! of every line can be reported separately.
//!
//! ## Quick start
//!
//! ```no_run
//! use promptty::{RunOptions, Session, SessionConfig, SpawnOptions, dispatcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = SpawnOptions::new("bash --norc --noprofile --noediting", r"\r\nbash> ")
//!         .continuation(r"\r\n> ")
//!         .init("PS1='bash> '");
//!     let mut session = Session::spawn(options, &SessionConfig::default()).await?;
//!
//!     let run = RunOptions { eval_last: true, ..Default::default() };
//!     let value = dispatcher::run(&mut session, "echo hello", &run, |text| print!("{text}")).await?;
//!     assert_eq!(value.as_deref(), Some("hello"));
//!
//!     session.close(false)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Cells and commands
//!
//! Hosts that execute "cells" of code use an [`Engine`]. A cell is either
//! native code, handed to the host's [`Evaluator`], or magic commands:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `%pty_spawn -p PROMPT [-c CONT] [-i INIT] CMD...` | Start a program, replacing any open session |
//! | `%pty_spawn_bash`, `%pty_spawn_r`, `%pty_spawn_root` | Presets for common programs |
//! | `%P CODE` / `%%P` + body | Run code line by line through the session |
//! | `%pty_next_prompt` | Wait for the next prompt without sending anything |
//! | `%pty_close [-f]` | Terminate the session |
//! | `%pty_lock` / `%pty_unlock` | Route every following cell through the session |
//! | `%pty_status` | Describe the open session |
//!
//! ```no_run
//! use promptty::{Engine, Evaluator, SessionConfig};
//!
//! struct Nothing;
//!
//! impl Evaluator for Nothing {
//!     fn evaluate(&mut self, _code: &str) -> anyhow::Result<Option<String>> {
//!         Ok(None)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut engine = Engine::new(Nothing, SessionConfig::default());
//!     engine.submit("%pty_spawn_bash").await?;
//!     engine.submit("%pty_lock").await?;
//!     engine.submit("for i in 1 2 3\ndo echo $i\ndone").await?;
//!     engine.submit("%pty_unlock").await?;
//!     engine.submit("%pty_close").await?;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod command;
pub mod commands;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod lock;
pub mod parser;
pub mod pattern;
pub mod session;
pub(crate) mod pty;
pub(crate) mod pty_reader;

pub use command::{Context, MagicCommand};
pub use dispatcher::RunOptions;
pub use engine::{Engine, Evaluator};
pub use error::{Error, Result};
pub use lock::SessionLock;
pub use pattern::{PatternSet, PromptPatterns};
pub use session::{ExpectOutcome, Session, SessionConfig, SpawnOptions};
