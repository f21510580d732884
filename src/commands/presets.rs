//! Ready-made spawn commands for common interactive programs.
//!
//! Syntax: `%pty_spawn_bash`, `%pty_spawn_r`, `%pty_spawn_root` (no arguments).

use crate::command::{Context, MagicCommand};
use crate::parser::expect_no_args;
use crate::session::SpawnOptions;
use anyhow::Result;
use async_trait::async_trait;

/// Bash with a fixed `bash> ` prompt.
///
/// Line editing is disabled so readline's bracketed-paste escapes do not
/// end up between the newline and the prompt.
pub struct SpawnBash;

impl SpawnBash {
    pub const NAME: &'static str = "pty_spawn_bash";

    pub fn options() -> SpawnOptions {
        SpawnOptions::new(
            "/usr/bin/env bash --norc --noprofile --noediting",
            r"\r\nbash> ",
        )
        .continuation(r"\r\n> ")
        .init("PS1='bash> '")
    }
}

/// GNU R.
pub struct SpawnR;

impl SpawnR {
    pub const NAME: &'static str = "pty_spawn_r";

    pub fn options() -> SpawnOptions {
        SpawnOptions::new("R", r"\r\n> ").continuation(r"\r\n[+] ")
    }
}

/// CERN ROOT, whose prompt carries a line counter.
pub struct SpawnRoot;

impl SpawnRoot {
    pub const NAME: &'static str = "pty_spawn_root";

    pub fn options() -> SpawnOptions {
        SpawnOptions::new("root", r"\r\nroot \[\d+\] ").continuation(r"\r\n> ")
    }
}

macro_rules! preset_command {
    ($ty:ident) => {
        #[async_trait(?Send)]
        impl MagicCommand for $ty {
            fn name(&self) -> &'static str {
                Self::NAME
            }

            fn parse(args: &str, _body: Option<&str>) -> Result<Self> {
                expect_no_args(Self::NAME, args)?;
                Ok(Self)
            }

            async fn execute(&self, ctx: &mut Context) -> Result<Option<String>> {
                ctx.spawn(Self::options()).await?;
                Ok(None)
            }
        }
    };
}

preset_command!(SpawnBash);
preset_command!(SpawnR);
preset_command!(SpawnRoot);
