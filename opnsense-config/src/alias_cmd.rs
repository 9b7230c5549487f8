use anyhow::{Context, Result};
use opnsense_config::alias::{AliasContent, AliasParams, FirewallAlias, FirewallAliasSet};
use opnsense_config::apply::{ConfigureOutput, PhpApplier};
use opnsense_config::report::{render_aliases, render_summary, render_text};
use serde::Serialize;
use xml_config_core::DiffEntry;

use crate::cli::{AliasAbsentArgs, AliasCommand, AliasPresentArgs, Cli, OutputFormat};
use crate::resolve_version;

#[derive(Serialize)]
struct AliasReport {
    changed: bool,
    diff: Vec<DiffEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    applied: Vec<ConfigureOutput>,
}

pub fn run_alias(cli: &Cli, command: &AliasCommand) -> Result<()> {
    let version = resolve_version(cli)?;
    let set = FirewallAliasSet::open(&cli.config, &version, cli.schema_dir.as_deref())
        .with_context(|| format!("failed to open {}", cli.config.display()))?;

    match command {
        AliasCommand::List => run_list(cli, &set),
        AliasCommand::Present(args) => run_present(cli, set, args),
        AliasCommand::Absent(args) => run_absent(cli, set, args),
    }
}

fn run_list(cli: &Cli, set: &FirewallAliasSet) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let rendered = render_aliases(set.aliases());
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(set.aliases())?),
    }
    Ok(())
}

fn run_present(cli: &Cli, mut set: FirewallAliasSet, args: &AliasPresentArgs) -> Result<()> {
    let mut params = AliasParams::new(args.name.clone(), args.alias_type);
    params.enabled = Some(!args.disabled);
    params.content = Some(AliasContent::List(args.content.clone()));
    params.statistics = Some(args.statistics);
    params.description = args.description.clone();
    params.refreshfrequency = args.refresh_frequency;
    params.interface = args.interface.clone();

    set.add_or_update(FirewallAlias::from_params(params))
        .with_context(|| format!("alias {} was rejected", args.name))?;
    finish(cli, set, args.check, args.apply)
}

fn run_absent(cli: &Cli, mut set: FirewallAliasSet, args: &AliasAbsentArgs) -> Result<()> {
    set.delete(&args.name);
    finish(cli, set, args.check, args.apply)
}

fn finish(cli: &Cli, mut set: FirewallAliasSet, check: bool, apply: bool) -> Result<()> {
    let changed = set.changed()?;
    let diff = set.diff()?;

    let mut applied = Vec::new();
    if changed && !check {
        set.save()
            .with_context(|| format!("failed to save {}", cli.config.display()))?;
        if apply {
            applied = set.apply_settings(&PhpApplier::default())?;
        }
    }

    match cli.format {
        OutputFormat::Text => {
            println!("changed={changed}");
            if !diff.is_empty() {
                println!("{}", render_text(&diff));
                println!("{}", render_summary(&diff));
            }
            for output in &applied {
                println!("applied {} rc={}", output.function, output.rc);
            }
        }
        OutputFormat::Json => {
            let report = AliasReport {
                changed,
                diff,
                applied,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
