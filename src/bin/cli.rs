//! Deskpilot CLI
//!
//! Inspect the tool catalog, invoke a tool directly, and manage browser
//! and file permission settings without the desktop UI.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use deskpilot_lib::browser::{available_browsers, ChannelBrowserDriver};
use deskpilot_lib::config::{self, DeskpilotConfig};
use deskpilot_lib::security::{FileOperation, GrantScope};
use deskpilot_lib::tools::{ToolCategory, ToolDescriptor, ToolRequest, ToolResponse};
use deskpilot_lib::{AgentCore, Collaborators};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deskpilot-cli")]
#[command(about = "Deskpilot Command Line Interface")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config_dir>/deskpilot/config.toml)
    #[arg(short, long, env = "DESKPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools exposed to the agent
    Tools {
        /// Only tools in this category (shell, files, tasks, browser, skills)
        #[arg(short = 'C', long)]
        category: Option<ToolCategory>,
    },

    /// Invoke a tool with JSON arguments
    Invoke {
        /// Tool name, e.g. list_directory
        name: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// List installed browsers, optionally choosing one for automation
    Browsers {
        /// Browser id to use from now on
        #[arg(long)]
        select: Option<String>,
    },

    /// Manage file permission grants
    Permissions {
        #[command(subcommand)]
        action: PermissionAction,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum PermissionAction {
    /// Allow an operation on a path and its descendants
    Grant {
        /// read, write or execute
        operation: FileOperation,
        path: PathBuf,

        /// Keep the grant across restarts
        #[arg(long)]
        persistent: bool,
    },

    /// Remove a grant
    Revoke {
        operation: FileOperation,
        path: PathBuf,
    },

    /// List active grants
    List,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "deskpilot_lib=debug,deskpilot_cli=debug"
    } else {
        "deskpilot_lib=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run_command(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DeskpilotConfig> {
    let config = match path {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    Ok(config)
}

fn build_core(config: DeskpilotConfig) -> anyhow::Result<AgentCore> {
    // No automation engine runs inside the CLI; browser tools report it as disconnected
    let (driver, _engine) = ChannelBrowserDriver::new(1);
    let collaborators = Collaborators::local(&config, Arc::new(driver))
        .context("failed to set up the skill registry client")?;
    Ok(AgentCore::new(config, collaborators))
}

async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Tools { category } => {
            let core = build_core(config)?;
            let tools = match category {
                Some(category) => core.catalog.descriptors_by_category(category),
                None => core.catalog.descriptors(),
            };
            print_tools(&tools, cli.format)?;
        }

        Commands::Invoke { name, args } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).context("arguments must be valid JSON")?;
            let core = build_core(config)?;
            let response = core.catalog.invoke(ToolRequest::new(name, arguments)).await?;
            print_response(&response, cli.format)?;
            if !response.success {
                return Ok(2);
            }
        }

        Commands::Browsers { select } => {
            let core = build_core(config)?;
            if let Some(id) = select {
                core.browser.select_browser(&id)?;
            }
            let preferred = core.browser.preferred_browser();
            let browsers = available_browsers();
            match cli.format {
                OutputFormat::Json => {
                    let value = serde_json::json!({
                        "preferred": preferred,
                        "installed": browsers,
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                OutputFormat::Text => {
                    if browsers.is_empty() {
                        println!("No supported browsers found");
                    }
                    for browser in &browsers {
                        let marker = if preferred.as_deref() == Some(browser.id.as_str()) {
                            "*"
                        } else {
                            " "
                        };
                        println!(
                            "{} {:<10} {:<16} {}",
                            marker,
                            browser.id,
                            browser.name,
                            browser.path.display()
                        );
                    }
                    if preferred.is_none() {
                        println!("\nNo browser selected; use --select <id>");
                    }
                }
            }
        }

        Commands::Permissions { action } => {
            let core = build_core(config)?;
            let permissions = &core.permissions;
            match action {
                PermissionAction::Grant {
                    operation,
                    path,
                    persistent,
                } => {
                    let scope = if persistent {
                        GrantScope::Persistent
                    } else {
                        GrantScope::Session
                    };
                    let grant = permissions.grant(&path, operation, scope)?;
                    println!(
                        "Granted {} on {} ({:?})",
                        operation.as_str(),
                        grant.path.display(),
                        grant.scope
                    );
                }
                PermissionAction::Revoke { operation, path } => {
                    if permissions.revoke(&path, operation)? {
                        println!("Revoked {} on {}", operation.as_str(), path.display());
                    } else {
                        println!("No {} grant for {}", operation.as_str(), path.display());
                    }
                }
                PermissionAction::List => {
                    let grants = permissions.list()?;
                    match cli.format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&grants)?);
                        }
                        OutputFormat::Text => {
                            println!("{:<8} {:<11} Path", "Op", "Scope");
                            println!("{}", "-".repeat(60));
                            for grant in grants {
                                println!(
                                    "{:<8} {:<11} {}",
                                    grant.operation.as_str(),
                                    format!("{:?}", grant.scope),
                                    grant.path.display()
                                );
                            }
                        }
                    }
                }
            }
        }

        Commands::Config { init } => {
            if init {
                let path = cli.config.clone().unwrap_or_else(config::get_config_path);
                config::save_config(&config, &path)?;
                println!("Wrote {}", path.display());
            } else {
                match cli.format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                    OutputFormat::Text => print!("{}", toml::to_string_pretty(&config)?),
                }
            }
        }
    }

    Ok(0)
}

fn print_tools(tools: &[ToolDescriptor], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tools)?);
        }
        OutputFormat::Text => {
            println!("{:<22} {:<9} {:<6} Description", "Name", "Category", "Effect");
            println!("{}", "-".repeat(80));
            for tool in tools {
                let effect = if tool.is_side_effect { "yes" } else { "" };
                println!(
                    "{:<22} {:<9} {:<6} {}",
                    tool.name,
                    tool.category.as_str(),
                    effect,
                    tool.description
                );
            }
        }
    }
    Ok(())
}

fn print_response(response: &ToolResponse, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Text => {
            if response.success {
                if let Some(message) = response.data.get("message").and_then(|m| m.as_str()) {
                    println!("{}", message);
                }
                println!("{}", serde_json::to_string_pretty(&response.data)?);
            } else {
                eprintln!(
                    "Error: {}",
                    response.error.as_deref().unwrap_or("Unknown error")
                );
                if let Some(suggestion) = response.data.get("suggestion").and_then(|s| s.as_str()) {
                    eprintln!("Suggestion: {}", suggestion);
                }
            }
            println!("({} ms)", response.execution_time_ms);
        }
    }
    Ok(())
}
