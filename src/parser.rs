//! Cell parser and command registry.
//!
//! A submitted cell is one of:
//!
//! - a cell magic: first line `%%name args`, the remaining lines are its body;
//! - one or more line magics: every non-blank line is `%name args`;
//! - native code for the host's own evaluator, when the first non-blank line
//!   is not a magic.
//!
//! The top-level entry point is [`parse_cell`].

use crate::command::MagicCommand;
use crate::commands::{
    Close, Lock, NextPrompt, Run, Spawn, SpawnBash, SpawnR, SpawnRoot, Status, Unlock,
};
use anyhow::{Context as _, Result, anyhow};
use std::time::Duration;

/// How the host should execute a cell.
pub enum Cell<'a> {
    /// Commands from the registry, run in order.
    Magics(Vec<Box<dyn MagicCommand>>),
    /// Code for the host's evaluator.
    Native(&'a str),
}

/// Parse a submitted cell.
///
/// # Errors
///
/// Returns an error if a magic names an unknown command or its arguments
/// are malformed, or if line magics are followed by native code.
///
/// # Example
///
/// ```
/// use promptty::parser::{Cell, parse_cell};
///
/// let Cell::Magics(commands) = parse_cell("%pty_lock\n%pty_status").unwrap() else {
///     panic!("expected magics");
/// };
/// assert_eq!(commands.len(), 2);
/// ```
pub fn parse_cell(cell: &str) -> Result<Cell<'_>> {
    let trimmed = cell.trim_start();

    if let Some(rest) = trimmed.strip_prefix("%%") {
        let (header, body) = rest.split_once('\n').unwrap_or((rest, ""));
        let cmd = parse_invocation(header.trim(), Some(body))
            .with_context(|| format!("Failed to parse cell magic: %%{}", header.trim()))?;
        return Ok(Cell::Magics(vec![cmd]));
    }

    let lines: Vec<&str> = trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.first().is_none_or(|line| !line.starts_with('%')) {
        return Ok(Cell::Native(cell));
    }

    let mut commands = Vec::with_capacity(lines.len());
    for (line_num, line) in lines.iter().enumerate() {
        let invocation = line
            .strip_prefix('%')
            .ok_or_else(|| anyhow!("Line magics cannot be mixed with native code"))?;
        let cmd = parse_invocation(invocation, None)
            .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
        commands.push(cmd);
    }
    Ok(Cell::Magics(commands))
}

type ParseFn = fn(&str, Option<&str>) -> Result<Box<dyn MagicCommand>>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (Spawn::NAME, Spawn::parse_boxed),
    (SpawnBash::NAME, SpawnBash::parse_boxed),
    (SpawnR::NAME, SpawnR::parse_boxed),
    (SpawnRoot::NAME, SpawnRoot::parse_boxed),
    (Run::NAME, Run::parse_boxed),
    (NextPrompt::NAME, NextPrompt::parse_boxed),
    (Close::NAME, Close::parse_boxed),
    (Lock::NAME, Lock::parse_boxed),
    (Unlock::NAME, Unlock::parse_boxed),
    (Status::NAME, Status::parse_boxed),
];

/// Names of all registered commands.
pub fn command_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Dispatch `name args` to the matching command's parser.
///
/// To add a new command, add one entry to [`REGISTRY`] using the command's
/// `NAME` constant and `parse_boxed` function pointer.
fn parse_invocation(invocation: &str, body: Option<&str>) -> Result<Box<dyn MagicCommand>> {
    let (name, args) = invocation
        .split_once(char::is_whitespace)
        .unwrap_or((invocation, ""));
    REGISTRY
        .iter()
        .find(|(cmd_name, _)| *cmd_name == name)
        .map(|(_, parse)| parse(args, body))
        .unwrap_or_else(|| Err(anyhow!("Unknown command: {}", name)))
}

/// Split `args` with shell quoting rules and parse them into the command's
/// typed option struct.
pub(crate) fn parse_options<T: clap::Parser>(name: &str, args: &str) -> Result<T> {
    let words = shell_words::split(args)
        .with_context(|| format!("Unbalanced quotes in arguments: {args}"))?;
    T::try_parse_from(std::iter::once(name.to_string()).chain(words))
        .map_err(|e| anyhow!("{}", e.render().to_string().trim_end()))
}

/// Fail unless `args` is blank, for commands that take no options.
pub(crate) fn expect_no_args(name: &str, args: &str) -> Result<()> {
    if args.trim().is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{name} takes no arguments, got: {}", args.trim()))
    }
}

/// Parse a duration string: `5` (seconds), `1s`, `500ms`, `1.5s`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else {
        let secs_str = s.strip_suffix('s').unwrap_or(s);
        let secs: f64 = secs_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).map_err(|e| anyhow!("Invalid duration {s}: {e}"))
    }
}
