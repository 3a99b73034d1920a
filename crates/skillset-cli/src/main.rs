//! Skillset CLI - manage search service indexer skillsets

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use skillset_core::config::{API_KEY_ENV_VARS, Config};
use skillset_core::{Error, MatchCondition, Skillset, SkillsetClient};
use tracing::debug;

#[derive(Parser)]
#[command(name = "skillset")]
#[command(author, version, about = "Manage search service indexer skillsets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List skillsets
    List {
        /// Fetch names only
        #[arg(long)]
        names_only: bool,
    },

    /// Show a skillset
    Get {
        /// Skillset name
        name: String,
    },

    /// Create a skillset from a JSON file; fails if the name is taken
    Create {
        /// Path to the skillset JSON document
        file: PathBuf,
    },

    /// Create or replace a skillset from a JSON file
    Apply {
        /// Path to the skillset JSON document
        file: PathBuf,
        /// Write only if the document's @odata.etag is still current
        #[arg(long)]
        if_unchanged: bool,
        /// Precondition to send (unconditionally, if-unchanged, if-modified, if-present, if-missing)
        #[arg(long, conflicts_with = "if_unchanged")]
        condition: Option<MatchCondition>,
    },

    /// Delete a skillset
    Delete {
        /// Skillset name
        name: String,
        /// Delete only the version fetched right before the call
        #[arg(long)]
        if_unchanged: bool,
        /// Precondition to send; ETag conditions use the version fetched right before the call
        #[arg(long, conflicts_with = "if_unchanged")]
        condition: Option<MatchCondition>,
    },

    /// Mark skills for recomputation on the next indexer run
    Reset {
        /// Skillset name
        name: String,
        /// Skill names to reset
        #[arg(required = true)]
        skills: Vec<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skillset=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (format, quiet) = (cli.format, cli.quiet);

    let result = match cli.command {
        Commands::List { names_only } => cmd_list(names_only, format, quiet).await,
        Commands::Get { name } => cmd_get(&name, format).await,
        Commands::Create { file } => cmd_create(&file, format, quiet).await,
        Commands::Apply {
            file,
            if_unchanged,
            condition,
        } => cmd_apply(&file, match_condition(if_unchanged, condition), format, quiet).await,
        Commands::Delete {
            name,
            if_unchanged,
            condition,
        } => cmd_delete(&name, match_condition(if_unchanged, condition), format, quiet).await,
        Commands::Reset { name, skills } => cmd_reset(&name, &skills, format, quiet).await,
        Commands::Config { action } => cmd_config(action, format, quiet),
        Commands::Doctor => cmd_doctor(quiet).await,
    };

    if let Err(e) = &result {
        if let Some(hint) = e.downcast_ref::<Error>().and_then(Error::suggestion) {
            if !quiet {
                eprintln!("Try: {}", hint);
            }
        }
    }
    result
}

// ============================================================================
// Helpers
// ============================================================================

fn connect() -> anyhow::Result<SkillsetClient> {
    let config = Config::load()?;
    let client = SkillsetClient::from_config(&config.service)?;
    debug!(endpoint = client.endpoint(), api_version = client.api_version(), "Client ready");
    Ok(client)
}

fn match_condition(if_unchanged: bool, condition: Option<MatchCondition>) -> MatchCondition {
    match condition {
        Some(condition) => condition,
        None if if_unchanged => MatchCondition::IfNotModified,
        None => MatchCondition::Unconditionally,
    }
}

fn read_skillset(path: &Path) -> anyhow::Result<Skillset> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read skillset file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse skillset file: {}", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_skillset(skillset: &Skillset, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(skillset);
    }

    println!("{}", skillset.name);
    if let Some(description) = &skillset.description {
        println!("  Description: {}", description);
    }
    if let Some(etag) = &skillset.etag {
        println!("  ETag: {}", etag);
    }
    println!("  Skills ({}):", skillset.skills.len());
    for skill in &skillset.skills {
        let kind = if skill.is_unknown() {
            skill.odata_type()
        } else {
            skill.kind()
        };
        println!("    - {} [{}]", skill.name().unwrap_or("(unnamed)"), kind);
    }
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_list(names_only: bool, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let client = connect()?;

    if names_only {
        let names = client.list_names().await?;
        return match format {
            OutputFormat::Json => print_json(&names),
            OutputFormat::Text => {
                for name in &names {
                    println!("{}", name);
                }
                Ok(())
            }
        };
    }

    let skillsets = client.list().await?;
    if format == OutputFormat::Json {
        return print_json(&skillsets);
    }

    if skillsets.is_empty() {
        if !quiet {
            println!("No skillsets found.");
        }
        return Ok(());
    }
    for skillset in &skillsets {
        println!(
            "{:<32} {:>3} skills  {}",
            skillset.name,
            skillset.skills.len(),
            skillset.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn cmd_get(name: &str, format: OutputFormat) -> anyhow::Result<()> {
    let client = connect()?;
    let skillset = client.get(name).await?;
    print_skillset(&skillset, format)
}

async fn cmd_create(file: &Path, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let skillset = read_skillset(file)?;
    let client = connect()?;
    let created = client.create(&skillset).await?;

    match format {
        OutputFormat::Json => print_json(&created)?,
        OutputFormat::Text if !quiet => println!(
            "Created skillset '{}' (ETag {})",
            created.name,
            created.etag.as_deref().unwrap_or("-")
        ),
        OutputFormat::Text => {}
    }
    Ok(())
}

async fn cmd_apply(
    file: &Path,
    condition: MatchCondition,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let skillset = read_skillset(file)?;
    let client = connect()?;
    let stored = client.create_or_update(&skillset, condition).await?;

    match format {
        OutputFormat::Json => print_json(&stored)?,
        OutputFormat::Text if !quiet => println!(
            "Applied skillset '{}' (ETag {})",
            stored.name,
            stored.etag.as_deref().unwrap_or("-")
        ),
        OutputFormat::Text => {}
    }
    Ok(())
}

async fn cmd_delete(
    name: &str,
    condition: MatchCondition,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let client = connect()?;

    if condition.needs_etag() {
        let current = client.get(name).await?;
        client.delete(&current, condition).await?;
    } else {
        client.delete(name, condition).await?;
    }

    match format {
        OutputFormat::Json => print_json(&json!({ "name": name, "deleted": true }))?,
        OutputFormat::Text if !quiet => println!("Deleted skillset '{}'", name),
        OutputFormat::Text => {}
    }
    Ok(())
}

async fn cmd_reset(
    name: &str,
    skills: &[String],
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let client = connect()?;
    client.reset_skills(name, skills).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "name": name, "reset": skills }))?,
        OutputFormat::Text if !quiet => {
            println!("Reset {} skill(s) in '{}'", skills.len(), name)
        }
        OutputFormat::Text => {}
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            if format == OutputFormat::Json {
                let map: serde_json::Map<String, serde_json::Value> = items
                    .into_iter()
                    .map(|(key, value)| (key, serde_json::Value::String(value)))
                    .collect();
                print_json(&map)?;
            } else {
                for (key, value) in items {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Skillset Health Check");
        println!("=====================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            None
        }
    };

    if let Some(config) = &config {
        match &config.service.endpoint {
            Some(endpoint) => {
                if !quiet {
                    println!("[OK] Endpoint: {}", endpoint);
                }
            }
            None => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Endpoint: Not configured");
                    println!("     Run `skillset config set service.endpoint <url>`");
                }
            }
        }

        match config.service.redacted_api_key() {
            Some(redacted) => {
                if !quiet {
                    println!("[OK] API Key: Configured ({})", redacted);
                }
            }
            None => {
                all_ok = false;
                if !quiet {
                    println!("[!!] API Key: Not configured");
                    println!(
                        "     Set {} environment variable",
                        API_KEY_ENV_VARS.join(" or ")
                    );
                }
            }
        }

        // Only contact the service once it can be addressed
        if all_ok {
            match SkillsetClient::from_config(&config.service) {
                Ok(client) => match client.list_names().await {
                    Ok(names) => {
                        if !quiet {
                            println!("[OK] Service: Reachable ({} skillsets)", names.len());
                        }
                    }
                    Err(e) => {
                        all_ok = false;
                        if !quiet {
                            println!("[!!] Service: {} - {}", e.code(), e);
                        }
                    }
                },
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Client: Error - {}", e);
                    }
                }
            }
        }
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    if !all_ok {
        bail!("Health check failed");
    }
    Ok(())
}
