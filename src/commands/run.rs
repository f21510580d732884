//! [`Run`] command — sends code to the session line by line.
//!
//! Syntax:
//! - `%P [OPTIONS] CODE...` — run a single line
//! - `%%P [OPTIONS]` followed by a body — run every line of the body
//!
//! Options: `-p PROMPT`, `-c CONTINUATION` (both kept for later calls),
//! `-t TIMEOUT`, `-w WINDOW`, `-e` (return the last line's output).

use crate::command::{Context, MagicCommand};
use crate::dispatcher::RunOptions;
use crate::parser::{parse_duration, parse_options};
use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
struct RunArgs {
    /// Timeout for each line of this call
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Search window size for this call
    #[arg(short = 'w', long)]
    search_window: Option<usize>,

    /// New regex for the main prompt
    #[arg(short, long)]
    prompt: Option<String>,

    /// New regex for the continuation prompt
    #[arg(short, long)]
    continuation: Option<String>,

    /// Return the output of the last line to the host as well as displaying it
    #[arg(short, long)]
    eval_last: bool,

    /// Code to run before the cell body
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    code: Vec<String>,
}

/// Runs code through the active session.
pub struct Run {
    pub code: String,
    pub options: RunOptions,
}

impl Run {
    pub const NAME: &'static str = "P";
}

#[async_trait(?Send)]
impl MagicCommand for Run {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, body: Option<&str>) -> Result<Self> {
        let args: RunArgs = parse_options(Self::NAME, args)?;
        let mut code = args.code.join(" ");
        if let Some(body) = body {
            code.push('\n');
            code.push_str(body);
        }

        Ok(Self {
            code,
            options: RunOptions {
                prompt: args.prompt,
                continuation: args.continuation,
                timeout: args.timeout,
                search_window: args.search_window,
                eval_last: args.eval_last,
            },
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        Ok(ctx.run(&self.code, &self.options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_form() {
        let cmd = Run::parse("echo hello world", None).unwrap();
        assert_eq!(cmd.code, "echo hello world");
        assert!(!cmd.options.eval_last);
    }

    #[test]
    fn test_parse_cell_form() {
        let cmd = Run::parse("-e -t 2s", Some("x <- 1\nprint(x)\n")).unwrap();
        assert_eq!(cmd.code, "\nx <- 1\nprint(x)\n");
        assert!(cmd.options.eval_last);
        assert_eq!(cmd.options.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_parse_pattern_overrides() {
        let cmd = Run::parse(r"-p '\r\nnew> ' -c '\r\n\.\.\. ' -w 100", Some("")).unwrap();
        assert_eq!(cmd.options.prompt.as_deref(), Some(r"\r\nnew> "));
        assert_eq!(cmd.options.continuation.as_deref(), Some(r"\r\n\.\.\. "));
        assert_eq!(cmd.options.search_window, Some(100));
    }

    #[test]
    fn test_parse_code_with_dashes() {
        let cmd = Run::parse("ls -la", None).unwrap();
        assert_eq!(cmd.code, "ls -la");
    }
}
