//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pbnforge_core::{RunProgress, RunReport, TaskRunner};
use pbnforge_reporting::{DashboardMetrics, generate_dashboard, log_run, notify_report};
use pbnforge_shared::{
    AppConfig, Secrets, SkippedTask, TaskRecord, config_file_path, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pbnforge: generate, publish and cross-link articles across WordPress sites.
#[derive(Parser)]
#[command(
    name = "pbnforge",
    version,
    about = "Generate articles, publish them to WordPress satellites and cross-link older posts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.pbnforge/pbnforge.toml).
    #[arg(long = "config", global = true, env = "PBNFORGE_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a batch of publishing tasks.
    Run {
        /// Tasks JSON file. Without one the batch is empty.
        tasks: Option<PathBuf>,

        /// Results manifest path (overrides `[output] results_path`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Build the dashboard and send notifications after the batch.
        #[arg(long)]
        report: bool,
    },

    /// Build the dashboard from a results manifest and generation log.
    Report {
        /// Results manifest (defaults to `[output] results_path`).
        #[arg(long)]
        results: Option<PathBuf>,

        /// Generation log (defaults to `[generation] log_path`).
        #[arg(long)]
        logs: Option<PathBuf>,
    },

    /// Convert a spreadsheet CSV export into a tasks JSON file.
    Import {
        /// CSV file exported from the sites spreadsheet.
        #[arg(default_value = "sites_import.csv")]
        csv: PathBuf,

        /// Tasks JSON to write.
        #[arg(short, long, default_value = "sites_data.json")]
        out: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pbnforge=info",
        1 => "pbnforge=debug",
        _ => "pbnforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file;
    match cli.command {
        Command::Run { tasks, out, report } => {
            cmd_run(config_path.as_deref(), tasks.as_deref(), out, report).await
        }
        Command::Report { results, logs } => {
            cmd_report(config_path.as_deref(), results, logs).await
        }
        Command::Import { csv, out } => cmd_import(&csv, &out),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    tasks_path: Option<&Path>,
    out: Option<PathBuf>,
    report: bool,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(out) = out {
        config.output.results_path = out;
    }
    let secrets = Secrets::from_env(&config);

    let tasks = pbnforge_core::load_tasks(tasks_path)?;
    info!(tasks = tasks.len(), ?secrets, "starting batch");

    let runner = TaskRunner::from_config(&config, &secrets)?;
    let progress = CliProgress::new();
    let run_report = runner.run_tasks(&tasks, &progress).await?;

    println!();
    println!("  Batch finished");
    println!("  Executed:      {}", run_report.results.len());
    println!("  Successful:    {}", run_report.successful());
    println!(
        "  Errors:        {}",
        run_report.results.len() - run_report.successful()
    );
    println!("  Skipped:       {}", run_report.skipped.len());
    println!("  Links added:   {}", run_report.links_inserted());
    println!("  Results:       {}", config.output.results_path.display());
    println!();

    log_run(&config.sheets, &secrets, &run_report.records).await;

    if report {
        let metrics = generate_dashboard(
            &run_report.results,
            &config.generation.log_path,
            &config.reporting,
        )
        .await?;
        print_dashboard(&metrics, &config);
        notify_report(&config.telegram, &secrets, &metrics).await;
    }

    Ok(())
}

async fn cmd_report(
    config_path: Option<&Path>,
    results: Option<PathBuf>,
    logs: Option<PathBuf>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let secrets = Secrets::from_env(&config);

    let results_path = results.unwrap_or_else(|| config.output.results_path.clone());
    let log_path = logs.unwrap_or_else(|| config.generation.log_path.clone());

    let results = pbnforge_core::read_results(&results_path).wrap_err_with(|| {
        format!(
            "cannot read {}: run a batch first",
            results_path.display()
        )
    })?;

    let metrics = generate_dashboard(&results, &log_path, &config.reporting).await?;
    print_dashboard(&metrics, &config);
    notify_report(&config.telegram, &secrets, &metrics).await;
    Ok(())
}

fn cmd_import(csv: &Path, out: &Path) -> Result<()> {
    let count = pbnforge_core::import_csv(csv, out)
        .wrap_err_with(|| format!("failed to import {}", csv.display()))?;
    println!("Imported {count} sites into {}", out.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let source = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", source.display());
    println!("{toml_str}");
    println!("# secrets: {:?}", Secrets::from_env(&config));
    Ok(())
}

fn print_dashboard(metrics: &DashboardMetrics, config: &AppConfig) {
    println!("=== PBN Executive Dashboard ===");
    println!();
    println!("[Overall Performance]");
    println!("Total Sites: {}", metrics.total_sites);
    println!(
        "Successful:  {} | Errors: {}",
        metrics.successful, metrics.errors
    );
    println!(
        "Old Updated: {} | New Created: {}",
        metrics.old_posts_updated, metrics.new_posts_created
    );

    if !metrics.styles.is_empty() {
        println!();
        println!("[Persona & Content Metrics]");
        for (style, stats) in metrics.styles.iter() {
            println!(
                "Style: {style:10} | Posts: {:3} | Avg Length: {:4} chars",
                stats.count,
                stats.average_length()
            );
        }
    }

    println!();
    println!("[Economical Metrics]");
    println!("Estimated Gemini Cost: ${:.4}", metrics.estimated_cost_usd);
    println!();
    println!(
        "CSV Reports generated: {}, {}",
        config.reporting.summary_csv.display(),
        config.reporting.persona_csv.display()
    );
    println!("===============================");
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RunProgress for CliProgress {
    fn task_started(&self, index: usize, total: usize, site: &str) {
        self.spinner
            .set_prefix(format!("[{}/{total}] {site}", index + 1));
        self.spinner.set_message("Validating");
    }

    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn task_skipped(&self, skipped: &SkippedTask) {
        self.spinner.println(format!(
            "  - task {} skipped: missing {}",
            skipped.index + 1,
            skipped.missing.join(", ")
        ));
    }

    fn task_finished(&self, record: &TaskRecord) {
        let result = &record.result;
        let line = match &result.new_post_url {
            Some(url) if result.is_success() => format!("  ✓ {} → {url}", result.site),
            _ => format!("  ✗ {} (publish failed)", result.site),
        };
        self.spinner.println(line);
        if let Some(old) = &result.updated_old_post {
            self.spinner.println(format!("    linked from {old}"));
        }
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
