//! pkitool - local certificate authority command line
//!
//! ```bash
//! pkitool create ca --alias root --subject-common-name "Example Root CA" --years 10
//! pkitool create ca --alias issuing --intermediate --parent root --subject-common-name "Issuing CA"
//! pkitool create leaf --alias web --parent issuing --subject-common-name www.example.com \
//!     --dns-san www.example.com --ip-san 10.0.0.7
//! pkitool list
//! pkitool show --alias web --output json
//! pkitool remove --alias web
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pkitool::certificate_details::CertificateDetails;
use pkitool::configs::{AppConfig, LoggingConfig};
use pkitool::render::{self, ListEntry};
use pkitool::{CertData, CertManager, DistinguishedName, MissingField};

#[derive(Parser)]
#[command(name = "pkitool", author, version, about = "Issue and manage a local X.509 hierarchy")]
struct Cli {
    /// Configuration file (defaults to ./pkitool.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter directives (e.g. `info`, `pkitool=debug`); RUST_LOG wins
    #[arg(long = "log-level", global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a certificate and its private key
    Create {
        #[command(subcommand)]
        kind: CreateCommand,
    },
    /// Show the properties of one certificate
    Show {
        #[arg(long)]
        alias: String,
        #[command(flatten)]
        location: Location,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List every certificate in the storage directory
    List {
        #[command(flatten)]
        location: Location,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Remove a certificate and its private key
    Remove {
        #[arg(long)]
        alias: String,
        #[command(flatten)]
        location: Location,
    },
}

#[derive(Subcommand)]
enum CreateCommand {
    /// Root CA, or an intermediate CA with `--intermediate`
    Ca(CaArgs),
    /// End-entity certificate for TLS servers and clients
    Leaf(LeafArgs),
}

#[derive(Args)]
struct CaArgs {
    #[command(flatten)]
    common: IssueArgs,

    /// Sign with `--parent` instead of self-signing
    #[arg(long, default_value_t = false)]
    intermediate: bool,

    /// Alias of the signing CA (intermediate only)
    #[arg(long)]
    parent: Option<String>,

    #[command(flatten)]
    subject: SubjectArgs,

    #[command(flatten)]
    issuer: IssuerArgs,
}

#[derive(Args)]
struct LeafArgs {
    #[command(flatten)]
    common: IssueArgs,

    /// Alias of the signing CA
    #[arg(long)]
    parent: String,

    #[command(flatten)]
    subject: SubjectArgs,

    /// DNS subject alternative name (repeatable)
    #[arg(long = "dns-san", value_name = "NAME")]
    dns_names: Vec<String>,

    /// IP subject alternative name (repeatable)
    #[arg(long = "ip-san", value_name = "IP")]
    ip_addresses: Vec<IpAddr>,
}

#[derive(Args)]
struct IssueArgs {
    /// Alias the new pair is stored under
    #[arg(long)]
    alias: String,

    /// Validity in years (config default: 2)
    #[arg(long)]
    years: Option<u32>,

    /// RSA key size in bits (config default: 4096)
    #[arg(long)]
    bits: Option<u32>,

    /// Serial number (non-negative); 0 when not given
    #[arg(long, default_value_t = 0)]
    serial: u64,

    #[command(flatten)]
    location: Location,
}

#[derive(Args)]
struct Location {
    /// Storage directory (config default: .)
    #[arg(long)]
    directory: Option<PathBuf>,
}

#[derive(Args)]
struct SubjectArgs {
    #[arg(long, value_name = "VALUE")]
    subject_country: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    subject_organization: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    subject_organizational_unit: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    subject_locality: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    subject_province: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    subject_street_address: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    subject_postal_code: Vec<String>,
    #[arg(long, value_name = "CN", default_value = "")]
    subject_common_name: String,
}

impl From<SubjectArgs> for DistinguishedName {
    fn from(args: SubjectArgs) -> Self {
        DistinguishedName {
            country: args.subject_country,
            organization: args.subject_organization,
            organizational_unit: args.subject_organizational_unit,
            locality: args.subject_locality,
            province: args.subject_province,
            street_address: args.subject_street_address,
            postal_code: args.subject_postal_code,
            common_name: args.subject_common_name,
        }
    }
}

#[derive(Args)]
struct IssuerArgs {
    #[arg(long, value_name = "VALUE")]
    issuer_country: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    issuer_organization: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    issuer_organizational_unit: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    issuer_locality: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    issuer_province: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    issuer_street_address: Vec<String>,
    #[arg(long, value_name = "VALUE")]
    issuer_postal_code: Vec<String>,
    #[arg(long, value_name = "CN", default_value = "")]
    issuer_common_name: String,
}

impl From<IssuerArgs> for DistinguishedName {
    fn from(args: IssuerArgs) -> Self {
        DistinguishedName {
            country: args.issuer_country,
            organization: args.issuer_organization,
            organizational_unit: args.issuer_organizational_unit,
            locality: args.issuer_locality,
            province: args.issuer_province,
            street_address: args.issuer_street_address,
            postal_code: args.issuer_postal_code,
            common_name: args.issuer_common_name,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn init_tracing(cli_level: Option<&str>, config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli_level.unwrap_or(&config.level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(cli.log_level.as_deref(), &config.logging);
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Create { kind } => match kind {
            CreateCommand::Ca(args) => create_ca(args, &config),
            CreateCommand::Leaf(args) => create_leaf(args, &config),
        },
        Commands::Show {
            alias,
            location,
            output,
        } => show(&alias, location, output, &config),
        Commands::List { location, output } => list(location, output, &config),
        Commands::Remove { alias, location } => remove(&alias, location, &config),
    }
}

fn manager_for(location: Location, config: &AppConfig) -> CertManager {
    CertManager::new(
        location
            .directory
            .unwrap_or_else(|| config.storage.directory.clone()),
    )
}

fn base_request(common: IssueArgs, config: &AppConfig) -> (CertManager, CertData) {
    let manager = manager_for(common.location, config);
    let data = CertData {
        alias: common.alias,
        key_size_bits: common.bits.unwrap_or(config.defaults.key_size_bits),
        valid_years: common.years.unwrap_or(config.defaults.valid_years),
        serial: common.serial,
        ..Default::default()
    };
    (manager, data)
}

fn create_ca(args: CaArgs, config: &AppConfig) -> Result<()> {
    let (manager, mut data) = base_request(args.common, config);
    data.subject = args.subject.into();
    let issuer: DistinguishedName = args.issuer.into();

    if args.intermediate {
        if !issuer.is_empty() {
            warn!("issuer flags are ignored for an intermediate CA; the parent's subject is used");
        }
        data.parent_alias = args.parent.unwrap_or_default();
        let alias = data.alias.clone();
        manager
            .issue_intermediate_ca(data)
            .with_context(|| format!("Failed to create intermediate CA '{}'", alias))?;
        println!("✓ Intermediate CA '{}' created in {}", alias, manager.dir().display());
    } else {
        if let Some(parent) = args.parent {
            warn!(%parent, "--parent is ignored for a root CA");
        }
        data.issuer = if issuer.is_empty() {
            data.subject.clone()
        } else {
            issuer
        };
        let alias = data.alias.clone();
        manager
            .issue_root_ca(data)
            .with_context(|| format!("Failed to create root CA '{}'", alias))?;
        println!("✓ Root CA '{}' created in {}", alias, manager.dir().display());
    }
    Ok(())
}

fn create_leaf(args: LeafArgs, config: &AppConfig) -> Result<()> {
    let (manager, mut data) = base_request(args.common, config);
    data.parent_alias = args.parent;
    data.subject = args.subject.into();
    data.dns_names = args.dns_names;
    data.ip_addresses = args.ip_addresses;

    let alias = data.alias.clone();
    manager
        .issue_leaf(data)
        .with_context(|| format!("Failed to create certificate '{}'", alias))?;
    println!("✓ Certificate '{}' created in {}", alias, manager.dir().display());
    Ok(())
}

fn show(alias: &str, location: Location, output: OutputFormat, config: &AppConfig) -> Result<()> {
    if alias.is_empty() {
        return Err(MissingField::Alias.into());
    }
    let manager = manager_for(location, config);
    let pair = manager
        .get_pair(alias)
        .with_context(|| format!("Failed to load certificate '{}'", alias))?;
    let details = CertificateDetails::inspect(&pair)?;

    match output {
        OutputFormat::Table => print!("{}", render::details_table(&details)),
        OutputFormat::Json => println!("{}", render::details_json(&details)?),
    }
    Ok(())
}

fn list(location: Location, output: OutputFormat, config: &AppConfig) -> Result<()> {
    let manager = manager_for(location, config);
    let aliases = manager
        .list_aliases()
        .with_context(|| format!("Failed to list {}", manager.dir().display()))?;

    let mut entries = Vec::with_capacity(aliases.len());
    for alias in aliases {
        let pair = manager
            .get_pair(&alias)
            .with_context(|| format!("Failed to load certificate '{}'", alias))?;
        let details = CertificateDetails::inspect(&pair)?;
        entries.push(ListEntry::new(alias, &details));
    }

    match output {
        OutputFormat::Table => print!("{}", render::list_table(&entries)),
        OutputFormat::Json => println!("{}", render::list_json(&entries)?),
    }
    Ok(())
}

fn remove(alias: &str, location: Location, config: &AppConfig) -> Result<()> {
    if alias.is_empty() {
        return Err(MissingField::Alias.into());
    }
    let manager = manager_for(location, config);
    manager
        .delete_alias(alias)
        .with_context(|| format!("Failed to remove '{}'", alias))?;
    println!("✓ '{}' removed from {}", alias, manager.dir().display());
    Ok(())
}
