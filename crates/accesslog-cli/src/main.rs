// accesslog CLI - access-log analysis reports

use accesslog_core::export::export_to_dir;
use accesslog_core::{
    analyze_with, build_report, export, load_config, AnalyzerConfig, FrequencyTable,
    RecommendationKind, Report,
};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "accesslog")]
#[command(version = "0.1.0")]
#[command(about = "Web server access-log analyzer", long_about = None)]
struct Cli {
    /// TOML config file (or set ACCESSLOG_CONFIG env var)
    #[arg(short, long, global = true, env = "ACCESSLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Log engine progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a log file and print the report
    Analyze {
        /// Path to the access log
        file: PathBuf,

        /// Only analyze the last N lines (0 = all)
        #[arg(short = 'n', long)]
        max_lines: Option<usize>,

        /// Print the report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Analyze a log file and write the report as JSON
    Export {
        /// Path to the access log
        file: PathBuf,

        /// Output file (default: access_log_analysis_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only analyze the last N lines (0 = all)
        #[arg(short = 'n', long)]
        max_lines: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the report, logs go to stderr
    let default_filter = if cli.verbose { "accesslog_core=info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalyzerConfig::default(),
    };
    debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Analyze { file, max_lines, json } => {
            let report = run(&file, max_lines, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Export { file, output, max_lines } => {
            let report = run(&file, max_lines, &config)?;
            let written = match (output, &config.output_dir) {
                (Some(path), _) => export(&report, Some(path.as_path()))?,
                (None, Some(dir)) => export_to_dir(&report, dir)?,
                (None, None) => export(&report, None)?,
            };
            println!(
                "{} {}",
                "✓ Report written to".green().bold(),
                written.display()
            );
        }
    }

    Ok(())
}

// command-line max_lines wins over the config file
fn run(
    file: &Path,
    max_lines: Option<usize>,
    config: &AnalyzerConfig,
) -> Result<Report, Box<dyn std::error::Error>> {
    let mut options = config.options();
    if max_lines.is_some() {
        options.max_lines = max_lines;
    }
    let stats = analyze_with(file, &options)?;
    Ok(build_report(stats))
}

fn format_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_report(report: &Report) {
    let summary = &report.summary;

    println!("\n{} {}", "📊 Access Log Report:".cyan().bold(), summary.log_file);
    println!("{}", "─".repeat(50).dimmed());

    let error_rate = format!("{:.2}%", summary.error_rate);
    let error_rate = if summary.error_rate > 10.0 {
        error_rate.red()
    } else {
        error_rate.green()
    };

    println!("  {} {}", "Total requests:".dimmed(), summary.total_requests.to_string().yellow());
    println!("  {} {}", "Unique visitors:".dimmed(), summary.unique_visitors.to_string().yellow());
    println!("  {} {}", "Bot requests:".dimmed(), summary.bot_requests);
    println!("  {} {}", "Admin requests:".dimmed(), summary.admin_requests);
    println!("  {} {}", "Static requests:".dimmed(), summary.static_requests);
    println!("  {} {}", "Error rate:".dimmed(), error_rate);
    println!(
        "  {} {} → {} ({})",
        "Period:".dimmed(),
        format_time(summary.analysis_period.start),
        format_time(summary.analysis_period.end),
        summary.analysis_period.duration
    );

    let stats = &report.detailed_stats;
    if stats.fallback_entries > 0 {
        println!(
            "  {} {} lines matched no grammar",
            "Unrecognized:".dimmed(),
            stats.fallback_entries.to_string().yellow()
        );
    }

    print_table("Popular pages", &["Path", "Hits"], &report.popular_pages);
    print_table("Top IPs", &["IP", "Requests"], &stats.top_ips);
    print_table("Status codes", &["Status", "Count"], &report.status_codes);
    print_table("Errors", &["Status / Path", "Count"], &stats.errors);
    print_table("Browsers", &["Browser", "Requests"], &report.browsers);
    print_table("Operating systems", &["OS", "Requests"], &report.operating_systems);
    print_table("Referers", &["Referer", "Count"], &stats.referers);

    print_hourly(report);

    println!("\n{}", "Recommendations:".green().bold());
    for rec in &report.recommendations {
        let marker = match rec.kind {
            RecommendationKind::Warning => "⚠".yellow(),
            RecommendationKind::Info => "ℹ".blue(),
            RecommendationKind::Success => "✓".green(),
        };
        println!("  {} {}", marker, rec.title.bold());
        println!("    {}", rec.message.dimmed());
    }
    println!();
}

fn print_table(title: &str, header: &[&str], rows: &FrequencyTable) {
    if rows.is_empty() {
        return;
    }

    println!("\n{}", title.cyan().bold());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header.to_vec());

    for (key, count) in rows.iter() {
        // Truncate long keys
        let key = if key.chars().count() > 60 {
            format!("{}...", key.chars().take(57).collect::<String>())
        } else {
            key.to_string()
        };
        table.add_row(vec![key, count.to_string()]);
    }

    println!("{table}");
}

fn print_hourly(report: &Report) {
    let peak = report.hourly_traffic.values().copied().max().unwrap_or(0);
    if peak == 0 {
        return;
    }

    println!("\n{}", "Hourly traffic".cyan().bold());
    for (hour, count) in &report.hourly_traffic {
        let width = (*count * 40 / peak) as usize;
        println!("  {}:00 {} {}", hour, "█".repeat(width).blue(), count.to_string().dimmed());
    }
}
