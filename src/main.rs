use anyhow::{Context, Result};
use clap::Parser;
use promptty::parser::parse_duration;
use promptty::{Engine, Evaluator, SessionConfig};
use std::io::Read;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "promptty",
    about = "Run cells of session commands against prompt-based interactive programs",
    version
)]
struct Args {
    /// Script file with cells separated by `---` lines (stdin when omitted)
    #[arg(short, long)]
    script: Option<String>,

    /// Default expect timeout for new sessions (`30`, `30s`, `500ms`)
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Default search window, in characters, for new sessions
    #[arg(short = 'w', long)]
    search_window: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// The CLI has no language of its own; plain cells only make sense while
/// the lock routes them to the session.
struct NoEvaluator;

impl Evaluator for NoEvaluator {
    fn evaluate(&mut self, code: &str) -> Result<Option<String>> {
        warn!(
            bytes = code.len(),
            "Skipping plain cell: use %P or %pty_lock to run it in the session"
        );
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let script = read_script(args.script.as_deref())?;

    let mut defaults = SessionConfig::default();
    if let Some(timeout) = args.timeout {
        defaults.timeout = timeout;
    }
    defaults.search_window = args.search_window;

    let mut engine = Engine::new(NoEvaluator, defaults);

    engine
        .execute(split_cells(&script))
        .await
        .context("Failed to execute script")?;

    Ok(())
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn read_script(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file: {path}")),
        None => {
            let mut script = String::new();
            std::io::stdin()
                .read_to_string(&mut script)
                .context("Failed to read script from stdin")?;
            Ok(script)
        }
    }
}

/// Split a script into cells at lines consisting of `---`, dropping blank cells.
fn split_cells(script: &str) -> Vec<&str> {
    let mut cells = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in script.split_inclusive('\n') {
        if line.trim_end() == "---" {
            cells.push(&script[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    cells.push(&script[start..]);
    cells.retain(|cell| !cell.trim().is_empty());
    cells
}
