//! [`NextPrompt`] command — waits for the next prompt without sending input.
//!
//! Syntax: `%pty_next_prompt [-t TIMEOUT] [-w WINDOW]`
//!
//! Typically used to catch up after a line timed out.

use crate::command::{Context, MagicCommand};
use crate::parser::{parse_duration, parse_options};
use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
struct NextPromptArgs {
    /// Timeout for this wait
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Search window size for this wait
    #[arg(short = 'w', long)]
    search_window: Option<usize>,
}

pub struct NextPrompt {
    pub timeout: Option<Duration>,
    pub search_window: Option<usize>,
}

impl NextPrompt {
    pub const NAME: &'static str = "pty_next_prompt";
}

#[async_trait(?Send)]
impl MagicCommand for NextPrompt {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
        let args: NextPromptArgs = parse_options(Self::NAME, args)?;
        Ok(Self {
            timeout: args.timeout,
            search_window: args.search_window,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        ctx.next_prompt(self.timeout, self.search_window).await?;
        Ok(None)
    }
}
