use anyhow::{Context, Result};
use opnsense_config::{ConfigStore, OpenOptions};
use opnsense_config::report::render_settings_diff;
use serde::Serialize;
use serde_json::json;
use xml_config_core::DiffEntry;

use crate::cli::{Cli, GetArgs, OutputFormat, SetArgs};
use crate::resolve_version;

fn open_store(cli: &Cli, module: &str) -> Result<ConfigStore> {
    let version = resolve_version(cli)?;
    let options = OpenOptions {
        schema_dir: cli.schema_dir.as_deref(),
        ..OpenOptions::default()
    };
    ConfigStore::open(&cli.config, &version, module, options)
        .with_context(|| format!("failed to open {}", cli.config.display()))
}

pub fn run_get(cli: &Cli, args: &GetArgs) -> Result<()> {
    let store = open_store(cli, &args.module)?;
    let path = store.resolve(&args.setting)?.to_string();
    let value = store.get_text(&args.setting)?;

    match cli.format {
        OutputFormat::Text => println!("{}", value.unwrap_or_default()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "path": path, "value": value }))?
        ),
    }
    Ok(())
}

#[derive(Serialize)]
struct SetReport {
    changed: bool,
    diff: opnsense_config::SettingsDiff,
    changes: Vec<DiffEntry>,
}

pub fn run_set(cli: &Cli, args: &SetArgs) -> Result<()> {
    let mut store = open_store(cli, &args.module)?;
    store.set(&args.value, &args.setting)?;

    let changed = store.changed()?;
    let diff = store.diff()?;
    let changes = store.tree_diff()?;
    if changed && !args.check {
        store
            .save()
            .with_context(|| format!("failed to save {}", cli.config.display()))?;
    }

    match cli.format {
        OutputFormat::Text => {
            println!("changed={changed}");
            let rendered = render_settings_diff(&diff);
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
        OutputFormat::Json => {
            let report = SetReport {
                changed,
                diff,
                changes,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
