//! CLI binary for filling and checking boxfill templates.

mod source;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use boxfill_engine::{Document, Engine, EngineConfig, GenerateOutcome};
use boxfill_rules::Preset;
use boxfill_types::{Diagnostic, Severity};

use crate::source::FileNodeSource;

#[derive(Parser)]
#[command(
    name = "boxfill",
    version,
    about = "Fill sing-box configuration templates with subscription nodes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tag of the top-level selector (overrides the config file)
    #[arg(long, global = true)]
    top_selector: Option<String>,

    /// Preset rule table to apply before the parsed rules (repeatable)
    #[arg(long = "preset", global = true, value_parser = parse_preset)]
    presets: Vec<Preset>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a template and print the resulting configuration
    Generate {
        /// Path to the template .json file
        template: PathBuf,

        /// Invocation parameters, e.g. '#type=0&name=main&outbound=...'
        #[arg(short, long)]
        params: String,

        /// Directory holding subscriptions/ and profiles/ node files
        #[arg(short, long, default_value = ".")]
        nodes_dir: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a rule string and show the resulting rules
    Rules {
        /// The rule string (the decoded `outbound` parameter)
        rules: String,
    },

    /// Check a template for shape problems and list its groups
    Check {
        /// Path to the template .json file
        template: PathBuf,
    },
}

fn parse_preset(name: &str) -> Result<Preset, String> {
    Preset::from_name(name).ok_or_else(|| format!("unknown preset '{name}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the result document.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Generate {
            template,
            params,
            nodes_dir,
            output,
        } => {
            cmd_generate(config, &template, &params, &nodes_dir, output.as_deref()).await?;
        }
        Commands::Rules { rules } => {
            cmd_rules(config, &rules);
        }
        Commands::Check { template } => {
            cmd_check(config, &template)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(tag) = &cli.top_selector {
        config.top_selector = tag.clone();
    }
    for preset in &cli.presets {
        if !config.presets.contains(preset) {
            config.presets.push(*preset);
        }
    }
    Ok(config)
}

async fn cmd_generate(
    config: EngineConfig,
    template_path: &Path,
    params: &str,
    nodes_dir: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let template = std::fs::read_to_string(template_path)?;
    let source = FileNodeSource::new(nodes_dir);
    let outcome = Engine::new(config).generate(params, &template, &source).await;

    let failed = !outcome.is_success();
    if let GenerateOutcome::Success { report, .. } = &outcome {
        for diag in &report.diagnostics {
            let tag = diag.tag.as_deref().unwrap_or_default();
            match diag.severity {
                Severity::Info => tracing::info!(kind = ?diag.kind, tag, "{}", diag.message),
                Severity::Warning | Severity::Error => {
                    tracing::warn!(kind = ?diag.kind, tag, "{}", diag.message)
                }
            }
        }
    }

    let json = outcome.into_json();
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            tracing::info!(path = %path.display(), "Wrote configuration");
        }
        None => println!("{json}"),
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_rules(config: EngineConfig, input: &str) {
    let (rules, diagnostics) = Engine::new(config).rules(input);

    println!("Rules: {}", rules.len());
    for (i, rule) in rules.iter().enumerate() {
        let case = if rule.case_insensitive() { " (case-insensitive)" } else { "" };
        println!("  {}. {} <- {}{}", i + 1, rule.target, rule.matcher.filter_type(), case);
    }
    print_diagnostics(&diagnostics);
}

fn cmd_check(config: EngineConfig, template_path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(template_path)?;
    let document = match Document::parse(&text) {
        Ok(document) => document,
        Err(e) => {
            print_diagnostics(&[Diagnostic::from(&e)]);
            std::process::exit(1);
        }
    };

    println!("Outbounds: {}", document.len());
    println!("\nGroups:");
    for entry in document.entries().iter().filter(|e| e.is_group()) {
        let members = entry.members.as_ref().map_or(0, Vec::len);
        let marker = if entry.tag == config.top_selector { " (top)" } else { "" };
        println!("  {} [{}] members={}{}", entry.tag, entry.kind, members, marker);
    }
    if !document.contains(&config.top_selector) {
        println!("\nTop-level selector '{}' not found", config.top_selector);
    }

    print_diagnostics(document.diagnostics());
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("\nDiagnostics:");
    for diag in diagnostics {
        println!("{}", format_diagnostic(diag));
    }
}

fn format_diagnostic(diag: &Diagnostic) -> String {
    let severity = match diag.severity {
        Severity::Error => "ERROR",
        Severity::Warning => "WARN",
        Severity::Info => "INFO",
    };
    match &diag.tag {
        Some(tag) => format!("[{severity}] {tag}: {}", diag.message),
        None => format!("[{severity}] {}", diag.message),
    }
}
