use anyhow::{Context, Result};
use clap::Parser;
use opnsense_config::schema::load_version_schema;
use opnsense_config::version::{OpnsenseVersionCommand, VersionProvider};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod alias_cmd;
mod cli;
mod setting_cmd;

use cli::{Cli, Command, OutputFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::Version => run_version(&cli),
        Command::Get(args) => setting_cmd::run_get(&cli, args),
        Command::Set(args) => setting_cmd::run_set(&cli, args),
        Command::Alias(command) => alias_cmd::run_alias(&cli, command),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The version passed on the command line, or the one reported by the appliance.
pub(crate) fn resolve_version(cli: &Cli) -> Result<String> {
    match &cli.opnsense_version {
        Some(version) => Ok(version.clone()),
        None => OpnsenseVersionCommand::default()
            .opnsense_version()
            .context("pass --opnsense-version when not running on the appliance"),
    }
}

#[derive(Serialize)]
struct VersionReport {
    version: String,
    schema: String,
    source: String,
}

fn run_version(cli: &Cli) -> Result<()> {
    let version = resolve_version(cli)?;
    let loaded = load_version_schema(&version, cli.schema_dir.as_deref())
        .with_context(|| format!("no schema for version {version}"))?;
    let report = VersionReport {
        version,
        schema: loaded.matched,
        source: loaded.source,
    };

    match cli.format {
        OutputFormat::Text => println!(
            "version={} schema={} source={}",
            report.version, report.schema, report.source
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
