//! Line-by-line execution of code against a [`Session`].
//!
//! Each non-empty line is sent on its own and followed by an expect on the
//! session's prompt set, so multi-line statements work as long as the
//! program's continuation prompt is configured. A failing line stops the run;
//! lines already sent have reached the program and stay executed.

use crate::error::Result;
use crate::session::Session;
use std::time::Duration;
use tracing::debug;

/// Per-call settings for [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// New prompt pattern, kept for all later calls.
    pub prompt: Option<String>,
    /// New continuation pattern, kept for all later calls.
    pub continuation: Option<String>,
    pub timeout: Option<Duration>,
    pub search_window: Option<usize>,
    /// Return the last line's output without its echoed command.
    pub eval_last: bool,
}

/// Send every non-empty line of `code` and wait for a prompt after each.
///
/// For every line `emit` receives the previous prompt followed by the
/// output that preceded the new prompt. With `eval_last` set the captured
/// output of the final line is returned as well.
pub async fn run<F>(
    session: &mut Session,
    code: &str,
    options: &RunOptions,
    mut emit: F,
) -> Result<Option<String>>
where
    F: FnMut(&str),
{
    if options.prompt.is_some() || options.continuation.is_some() {
        session.set_patterns(options.prompt.as_deref(), options.continuation.as_deref())?;
    }

    for line in code_lines(code) {
        session.send(line)?;
        let previous = session.prompt().to_string();
        let outcome = session
            .expect_prompt(options.timeout, options.search_window)
            .await?;
        debug!(line, pattern = %outcome.label, "line completed");
        emit(&format!("{previous}{}", outcome.before));
    }

    Ok(if options.eval_last {
        strip_echo(session.last_before())
    } else {
        None
    })
}

/// Wait for the next prompt without sending anything.
///
/// Useful to catch up after a timeout left the program's output unread.
pub async fn next_prompt<F>(
    session: &mut Session,
    timeout: Option<Duration>,
    search_window: Option<usize>,
    mut emit: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let previous = session.prompt().to_string();
    let outcome = session.expect_prompt(timeout, search_window).await?;
    emit(&format!("{previous}{}", outcome.before));
    Ok(())
}

/// Trimmed, non-empty lines of `code`.
pub fn code_lines(code: &str) -> impl Iterator<Item = &str> {
    code.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

/// Drop the echoed command (first line) from captured output.
///
/// Returns `None` when there is nothing beyond the echo.
pub fn strip_echo(before: &str) -> Option<String> {
    let lines: Vec<&str> = before.split('\n').map(str::trim).collect();
    if lines.len() > 1 {
        Some(lines[1..].join("\n"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lines_trims_and_skips_blank() {
        let lines: Vec<&str> = code_lines("  ls -l \r\n\n\t\npwd\r\n").collect();
        assert_eq!(lines, vec!["ls -l", "pwd"]);
    }

    #[test]
    fn test_code_lines_empty() {
        assert_eq!(code_lines("\n \r\n").count(), 0);
    }

    #[test]
    fn test_strip_echo() {
        assert_eq!(
            strip_echo("print(1+1)\r\n[1] 2\r\n[2] 3"),
            Some("[1] 2\n[2] 3".to_string())
        );
    }

    #[test]
    fn test_strip_echo_single_line() {
        assert_eq!(strip_echo("x <- 1"), None);
        assert_eq!(strip_echo(""), None);
    }
}
