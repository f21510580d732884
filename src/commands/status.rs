//! [`Status`] command — describes the active session.
//!
//! Syntax: `%pty_status`

use crate::command::{Context, MagicCommand};
use crate::parser::expect_no_args;
use anyhow::Result;
use async_trait::async_trait;

pub struct Status;

impl Status {
    pub const NAME: &'static str = "pty_status";
}

#[async_trait(?Send)]
impl MagicCommand for Status {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
        expect_no_args(Self::NAME, args)?;
        Ok(Self)
    }

    async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
        let locked = ctx.lock_state().is_locked();
        let session = ctx.session()?;
        let running = session.is_running();
        let report = format!(
            "session: {}\npid: {}\nrunning: {running}\nprompt: {:?}\npatterns: {}\ntimeout: {:?}\nsearch window: {}\nuptime: {:.1?}\nlocked: {locked}",
            session.name(),
            session
                .process_id()
                .map_or_else(|| "unknown".to_string(), |pid| pid.to_string()),
            session.prompt(),
            session.active_patterns().describe(),
            session.timeout(),
            session
                .search_window()
                .map_or_else(|| "full buffer".to_string(), |w| format!("{w} chars")),
            session.uptime(),
        );
        ctx.emit_line(&report);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::SessionConfig;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_rejects_arguments() {
        assert!(Status::parse("", None).is_ok());
        assert!(Status::parse("-v", None).is_err());
    }

    #[tokio::test]
    async fn test_execute_without_session() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let mut ctx = Context::new(SessionConfig::default(), move |d| {
            sink.lock().unwrap().extend_from_slice(d);
        });

        let err = Status.execute(&mut ctx).await.err().unwrap();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotConnected)));
        assert!(captured.lock().unwrap().is_empty());
    }
}
