use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use opnsense_config::alias::FirewallAliasType;
use opnsense_config::store::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "opnsense-config")]
#[command(about = "Read and change OPNsense config.xml settings and firewall aliases")]
pub struct Cli {
    /// Config file to operate on.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Appliance version; detected with `opnsense-version` when omitted.
    #[arg(long, global = true)]
    pub opnsense_version: Option<String>,
    /// Optional schema directory (expects <dir>/<version>.toml).
    #[arg(long, global = true)]
    pub schema_dir: Option<PathBuf>,
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the appliance version and the schema it resolves to.
    Version,
    /// Print the value of one setting.
    Get(GetArgs),
    /// Write one setting and save the config if it changed.
    Set(SetArgs),
    /// Manage firewall aliases.
    #[command(subcommand)]
    Alias(AliasCommand),
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Schema context, for example `system_settings_general`.
    pub module: String,
    pub setting: String,
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    pub module: String,
    pub setting: String,
    pub value: String,
    /// Report the change without writing the file.
    #[arg(long)]
    pub check: bool,
}

#[derive(Subcommand, Debug)]
pub enum AliasCommand {
    /// List all aliases.
    List,
    /// Create or update an alias.
    Present(AliasPresentArgs),
    /// Remove an alias by name.
    Absent(AliasAbsentArgs),
}

#[derive(Parser, Debug)]
pub struct AliasPresentArgs {
    #[arg(long)]
    pub name: String,
    /// Alias type; `macaddress` and `dynamicipv6host` are accepted.
    #[arg(long = "type", value_parser = parse_alias_type)]
    pub alias_type: FirewallAliasType,
    /// Content entry; repeat for several.
    #[arg(long)]
    pub content: Vec<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub disabled: bool,
    /// Enable statistics counters.
    #[arg(long)]
    pub statistics: bool,
    /// Refresh frequency for URL table aliases.
    #[arg(long)]
    pub refresh_frequency: Option<u32>,
    /// Interface for dynipv6host aliases.
    #[arg(long)]
    pub interface: Option<String>,
    /// Report the change without writing the file.
    #[arg(long)]
    pub check: bool,
    /// Run the configure functions after saving.
    #[arg(long)]
    pub apply: bool,
}

#[derive(Parser, Debug)]
pub struct AliasAbsentArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub check: bool,
    #[arg(long)]
    pub apply: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_alias_type(value: &str) -> Result<FirewallAliasType, String> {
    FirewallAliasType::from_param(value).map_err(|err| err.to_string())
}
