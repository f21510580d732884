//! [`Lock`] and [`Unlock`] commands — toggle routing of every cell through
//! the session.
//!
//! Syntax: `%pty_lock`, `%pty_unlock`

use crate::command::{Context, MagicCommand};
use crate::parser::expect_no_args;
use anyhow::Result;
use async_trait::async_trait;

/// Sends every following cell through the session until [`Unlock`].
pub struct Lock;

impl Lock {
    pub const NAME: &'static str = "pty_lock";
}

#[async_trait(?Send)]
impl MagicCommand for Lock {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
        expect_no_args(Self::NAME, args)?;
        Ok(Self)
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        ctx.lock();
        Ok(None)
    }
}

/// Returns cells to the host's own evaluator.
pub struct Unlock;

impl Unlock {
    pub const NAME: &'static str = "pty_unlock";
}

#[async_trait(?Send)]
impl MagicCommand for Unlock {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
        expect_no_args(Self::NAME, args)?;
        Ok(Self)
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        ctx.unlock();
        Ok(None)
    }
}
