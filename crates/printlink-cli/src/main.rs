//! printlink — upload print jobs to networked printer controllers.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use printlink_connector as connector;
use printlink_connector::{Payload, Printer};
use printlink_core::config::LinkConfig;

mod human;

// ── Argument parsing ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Args {
    host: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
    tool1: Option<u16>,
    tool2: Option<u16>,
    bed: Option<u16>,
    home: bool,
    debug: bool,
    help: bool,
    files: Vec<String>,
}

fn parse_args(argv: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "--host" => {
                i += 1;
                args.host = Some(argv.get(i).context("--host requires a value")?.clone());
            }
            "--token" => {
                i += 1;
                args.token = Some(argv.get(i).context("--token requires a value")?.clone());
            }
            "--timeout" => {
                i += 1;
                let secs = argv
                    .get(i)
                    .context("--timeout requires a value")?
                    .parse()
                    .context("--timeout must be a number of seconds")?;
                args.timeout_secs = Some(secs);
            }
            "--tool1" => {
                i += 1;
                let t = argv
                    .get(i)
                    .context("--tool1 requires a value")?
                    .parse()
                    .context("--tool1 must be a temperature in °C")?;
                args.tool1 = Some(t);
            }
            "--tool2" => {
                i += 1;
                let t = argv
                    .get(i)
                    .context("--tool2 requires a value")?
                    .parse()
                    .context("--tool2 must be a temperature in °C")?;
                args.tool2 = Some(t);
            }
            "--bed" => {
                i += 1;
                let t = argv
                    .get(i)
                    .context("--bed requires a value")?
                    .parse()
                    .context("--bed must be a temperature in °C")?;
                args.bed = Some(t);
            }
            "--home" => args.home = true,
            "--debug" => args.debug = true,
            "--help" | "-h" => args.help = true,
            flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
            file => args.files.push(file.to_string()),
        }
        i += 1;
    }
    Ok(args)
}

fn print_usage() {
    println!("Usage: printlink [options] <file>...");
    println!();
    println!("Options:");
    println!("  --host <addr>      printer host name or IP (required unless configured)");
    println!("  --token <token>    API token for the HTTP fallback");
    println!("  --timeout <secs>   connect/command timeout (default: 5)");
    println!("  --tool1 <°C>       preheat tool 1");
    println!("  --tool2 <°C>       preheat tool 2");
    println!("  --bed <°C>         preheat the bed");
    println!("  --home             home all axes");
    println!("  --debug            verbose logging");
    println!();
    println!("Defaults come from {} and PRINTLINK_* environment", LinkConfig::file_path().display());
    println!("variables; command-line flags win.");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;

    if args.help {
        print_usage();
        return Ok(());
    }

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = LinkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        LinkConfig::default()
    });

    let host = args.host.unwrap_or(config.printer.host);
    if host.is_empty() {
        bail!("no printer host given — pass --host or set it in the config");
    }
    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(config.printer.timeout_secs));

    let mut printer = Printer::new(host);
    let token = args.token.unwrap_or(config.printer.token);
    if !token.is_empty() {
        printer.token = Some(token);
    }

    let tool1 = args.tool1.unwrap_or(config.preheat.tool1);
    let tool2 = args.tool2.unwrap_or(config.preheat.tool2);
    let bed = args.bed.unwrap_or(config.preheat.bed);
    let home = args.home || config.preheat.home;

    let preheating = tool1 > 0 || tool2 > 0 || bed > 0 || home;
    if preheating {
        tracing::info!(host = %printer.host, "preheating");
        connector::preheat(&printer, tool1, tool2, bed, home, timeout).await?;
    }

    if args.files.is_empty() {
        if preheating {
            return Ok(());
        }
        bail!("no input files — pass at least one job file");
    }

    for (n, path) in args.files.iter().enumerate() {
        let data = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
        let name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(path)
            .to_string();

        tracing::info!(
            file = %name,
            size = %human::readable_size(data.len() as u64),
            "uploading"
        );
        let payload = Payload::new(name, data);
        connector::upload(&printer, &payload, timeout).await?;
        tracing::info!("upload finished");

        // The printer's display needs a moment between consecutive jobs.
        if n + 1 < args.files.len() {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    Ok(())
}
