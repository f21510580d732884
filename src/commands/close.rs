//! [`Close`] command — stops the session's program.
//!
//! Syntax: `%pty_close [-f]`

use crate::command::{Context, MagicCommand};
use crate::parser::parse_options;
use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;

#[derive(Parser, Debug)]
struct CloseArgs {
    /// Kill straight away instead of sending SIGHUP first
    #[arg(short, long)]
    force: bool,
}

pub struct Close {
    pub force: bool,
}

impl Close {
    pub const NAME: &'static str = "pty_close";
}

#[async_trait(?Send)]
impl MagicCommand for Close {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
        let args: CloseArgs = parse_options(Self::NAME, args)?;
        Ok(Self { force: args.force })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        ctx.close(self.force)?;
        Ok(None)
    }
}
