//! Routing of every submitted cell through the active session.
//!
//! While locked, [`SessionLock::filter`] rewrites plain cells into `%%P`
//! cell magics, so the host runs them with the dispatcher instead of its own
//! evaluator. Cells that already run explicitly through the session, and the
//! unlock command itself, pass through unchanged.

use crate::commands::{Run, Unlock};
use std::borrow::Cow;
use tracing::warn;

/// Process-wide lock flag, owned by the host's [`Context`](crate::Context).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionLock {
    locked: bool,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route all later cells through the session.
    pub fn lock(&mut self) {
        warn!("all future cells will be processed through the pty session");
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Pre-execution hook: return the cell the host should execute.
    pub fn filter<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        if !self.locked || is_direct(raw) {
            return Cow::Borrowed(raw);
        }
        Cow::Owned(format!("%%{}\n{raw}", Run::NAME))
    }
}

fn is_direct(raw: &str) -> bool {
    let cell = raw.trim_start();
    let run_cell = format!("%%{}", Run::NAME);
    let unlock = format!("%{}", Unlock::NAME);
    starts_with_word(cell, &run_cell) || starts_with_word(cell, &unlock)
}

/// `text` starts with `word` followed by whitespace or the end of input.
fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlocked_passes_through() {
        let lock = SessionLock::new();
        assert!(matches!(lock.filter("ls"), Cow::Borrowed("ls")));
    }

    #[test]
    fn test_locked_wraps_plain_cells() {
        let mut lock = SessionLock::new();
        lock.lock();
        assert_eq!(lock.filter("ls -l\npwd"), "%%P\nls -l\npwd");
    }

    #[test]
    fn test_locked_keeps_explicit_run_and_unlock() {
        let mut lock = SessionLock::new();
        lock.lock();
        assert_eq!(lock.filter("%%P -t 5\nls"), "%%P -t 5\nls");
        assert_eq!(lock.filter("%pty_unlock"), "%pty_unlock");
    }

    #[test]
    fn test_locked_wraps_lookalike_commands() {
        let mut lock = SessionLock::new();
        lock.lock();
        assert_eq!(lock.filter("%%Plot"), "%%P\n%%Plot");
        assert_eq!(lock.filter("%pty_close"), "%%P\n%pty_close");
    }

    #[test]
    fn test_unlock_reverses() {
        let mut lock = SessionLock::new();
        lock.lock();
        lock.unlock();
        assert!(!lock.is_locked());
        assert_eq!(lock.filter("ls"), "ls");
    }
}
