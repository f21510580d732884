//! [`Spawn`] command — starts a program and synchronises on its first prompt.
//!
//! Syntax: `%pty_spawn -p PROMPT [-c CONTINUATION] [-i INIT] [-t TIMEOUT]
//! [-w WINDOW] COMMAND [ARGS...]`
//!
//! Examples:
//! - `%pty_spawn -i "PS1='bash> '" -p '\r\nbash> ' -c '\r\n> ' bash --noediting`
//! - `%pty_spawn -p '\r\n> ' -c '\r\n[+] ' R`
//! - `%pty_spawn -p '\r\nroot \[\d+\] ' -c '\r\n> ' root`

use crate::command::{Context, MagicCommand};
use crate::error::Error;
use crate::parser::{parse_duration, parse_options};
use crate::session::SpawnOptions;
use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
struct SpawnArgs {
    /// Regex for the program's main prompt [mandatory]
    #[arg(short, long)]
    prompt: Option<String>,

    /// Regex for the continuation prompt
    #[arg(short, long)]
    continuation: Option<String>,

    /// Line sent after start-up, e.g. to set a known prompt
    #[arg(short, long)]
    init: Option<String>,

    /// Expect timeout (`5`, `5s` or `500ms`)
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Only search the last N characters of output for the prompt
    #[arg(short = 'w', long)]
    search_window: Option<usize>,

    /// The command to run, including its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// Starts a program under a PTY, replacing any existing session.
pub struct Spawn {
    pub options: SpawnOptions,
}

impl Spawn {
    pub const NAME: &'static str = "pty_spawn";
}

#[async_trait(?Send)]
impl MagicCommand for Spawn {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
        let args: SpawnArgs = parse_options(Self::NAME, args)?;
        let prompt = args
            .prompt
            .ok_or_else(|| Error::Usage("You did not supply -p or --prompt".into()))?;
        if args.command.is_empty() {
            return Err(Error::Usage("You did not supply a command to run".into()).into());
        }

        Ok(Self {
            options: SpawnOptions {
                command: shell_words::join(&args.command),
                prompt,
                continuation: args.continuation,
                init: args.init,
                timeout: args.timeout,
                search_window: args.search_window,
            },
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        ctx.spawn(self.options.clone()).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let cmd = Spawn::parse(
            r#"-i "PS1='bash> '" -p '\r\nbash> ' -c '\r\n> ' -t 10 -w 500 /usr/bin/env bash --noediting"#,
            None,
        )
        .unwrap();
        let o = &cmd.options;
        assert_eq!(o.command, "/usr/bin/env bash --noediting");
        assert_eq!(o.prompt, r"\r\nbash> ");
        assert_eq!(o.continuation.as_deref(), Some(r"\r\n> "));
        assert_eq!(o.init.as_deref(), Some("PS1='bash> '"));
        assert_eq!(o.timeout, Some(Duration::from_secs(10)));
        assert_eq!(o.search_window, Some(500));
    }

    #[test]
    fn test_parse_regex_escapes_survive() {
        let cmd = Spawn::parse(r"-p '\r\nroot \[\d+\] ' root -l", None).unwrap();
        assert_eq!(cmd.options.prompt, r"\r\nroot \[\d+\] ");
        assert_eq!(cmd.options.command, "root -l");
    }

    #[test]
    fn test_parse_requires_prompt() {
        let err = Spawn::parse("bash", None).err().unwrap();
        assert!(err.to_string().contains("--prompt"), "got: {err}");
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Usage(_))));
    }

    #[test]
    fn test_parse_requires_command() {
        assert!(Spawn::parse("-p '> '", None).is_err());
    }

    #[test]
    fn test_parse_quoted_command_words() {
        let cmd = Spawn::parse(r#"-p '> ' sh -c 'echo "a b"; exec sh'"#, None).unwrap();
        assert_eq!(
            shell_words::split(&cmd.options.command).unwrap(),
            vec!["sh", "-c", r#"echo "a b"; exec sh"#]
        );
    }
}
