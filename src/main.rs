use anyhow::{Context, Result};
use clap::Parser;
use mosaic_spec::{DryRunEngine, ParseContext, ParseOptions};
use std::io::{self, Read, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mosaic-spec")]
#[command(
    about = "Interpret a dashboard specification and print its directive tree",
    long_about = None
)]
struct Args {
    /// Path to the JSON specification ('-' reads stdin)
    spec: String,

    /// Reject nodes that carry more than one directive key
    #[arg(long)]
    strict: bool,

    /// Print the materialization statements instead of the directive tree
    #[arg(long)]
    statements: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_spec(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read specification from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read specification '{}'", path))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let text = read_spec(&args.spec)?;

    let engine = Arc::new(DryRunEngine::new());
    let mut ctx = ParseContext::new(engine.clone()).with_options(ParseOptions {
        strict: args.strict,
    });

    let spec = match ctx.parse_str(&text).await {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.statements {
        for statement in engine.statements() {
            writeln!(handle, "{}", statement).context("Failed to write to stdout")?;
        }
    } else {
        let json =
            serde_json::to_string_pretty(&spec).context("Failed to serialize directive tree")?;
        writeln!(handle, "{}", json).context("Failed to write to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
