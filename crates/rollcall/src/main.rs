//! `rollcall` - CLI for the QR attendance recorder
//!
//! This binary provides the command-line interface for scanning, sweeping
//! absences, generating QR codes and reading the daily logs.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;

use rollcall::cli::{Cli, Command, ConfigCommand, GenerateCommand, ReportCommand, SweepCommand};
use rollcall::storage::{self, DailyLog, LogStats};
use rollcall::{app, codegen, init_logging, sweeper, Config, Roster};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validating a file must not depend on the active configuration loading
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_validate(file.clone().or_else(|| cli.config.clone()));
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Run => handle_run(&config),
        Command::Sweep(cmd) => handle_sweep(&config, &cmd),
        Command::Generate(cmd) => handle_generate(&config, &cmd),
        Command::Report(cmd) => handle_report(&config, &cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn handle_run(config: &Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let summary = runtime
        .block_on(app::run(config))
        .context("attendance session failed")?;

    println!(
        "Session ended: {} frames, {} students recorded, {} absence sweeps",
        summary.frames, summary.recorded, summary.sweeps
    );
    Ok(())
}

fn handle_sweep(config: &Config, cmd: &SweepCommand) -> anyhow::Result<()> {
    let date = cmd.date.unwrap_or_else(today);
    let roster = Roster::load(config.roster_path()).context("failed to load roster")?;
    let log = DailyLog::open(config.log_dir(), date)?;

    let summary = sweeper::sweep(&roster, &log)
        .with_context(|| format!("absence sweep failed for {date}"))?;

    println!(
        "Marked {} absent for {date} ({} already recorded)",
        summary.marked_absent, summary.already_recorded
    );
    println!("Log: {}", log.path().display());
    Ok(())
}

fn handle_generate(config: &Config, cmd: &GenerateCommand) -> anyhow::Result<()> {
    let output = cmd
        .output
        .clone()
        .unwrap_or_else(|| config.codegen.output_dir.clone());
    let roster = Roster::load(config.roster_path()).context("failed to load roster")?;

    let written = codegen::generate_for(&roster, &output, config.codegen.module_size)?;

    println!(
        "Generated {} QR codes in {}",
        written.len(),
        output.display()
    );
    if written.len() < roster.len() {
        println!(
            "Skipped {} IDs that cannot be used as file names",
            roster.len() - written.len()
        );
    }
    Ok(())
}

fn handle_report(config: &Config, cmd: &ReportCommand) -> anyhow::Result<()> {
    let date = cmd.date.unwrap_or_else(today);
    let path = DailyLog::path_for(config.log_dir(), date);
    let entries = storage::read_entries(&path)?;
    let stats = LogStats::from_entries(&entries);

    if cmd.json {
        let report = serde_json::json!({
            "date": date,
            "path": path,
            "stats": stats,
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Attendance for {date}");
    println!("========================");
    println!("Log:      {}", path.display());
    println!(
        "Total:    {}  (present {}, absent {})",
        stats.total, stats.present, stats.absent
    );
    if entries.is_empty() {
        println!();
        println!("No entries recorded.");
        return Ok(());
    }

    println!();
    let width = entries.iter().map(|e| e.id.len()).max().unwrap_or(2).max(2);
    for entry in &entries {
        println!(
            "  {:<width$}  {:<8}  {}",
            entry.id,
            entry.status.to_string(),
            entry.name
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            handle_validate(file)?;
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Roster]");
    println!("  Path:               {}", config.roster_path().display());
    println!();
    println!("[Log]");
    println!("  Directory:          {}", config.log_dir().display());
    println!();
    println!("[Camera]");
    println!("  Device index:       {}", config.camera_index());
    println!(
        "  Resolution:         {}x{}",
        config.camera.width, config.camera.height
    );
    println!("  Format:             {}", config.camera.format);
    println!("  Frame retry (ms):   {}", config.camera.frame_retry_ms);
    println!("  Rescan cooldown (ms): {}", config.camera.rescan_cooldown_ms);
    println!("  Quit key:           {}", config.camera.quit_key);
    println!(
        "  Preview:            {}",
        config
            .camera
            .preview_path
            .as_deref()
            .map_or_else(|| "disabled".to_string(), |p| p.display().to_string())
    );
    println!();
    println!("[Schedule]");
    println!("  Sweep time:         {}", config.schedule.sweep_time);
    println!("  Tick (ms):          {}", config.schedule.tick_interval_ms);
    println!("  Catch up on start:  {}", config.schedule.catch_up_on_start);
    println!();
    println!("[Codegen]");
    println!(
        "  Output directory:   {}",
        config.codegen.output_dir.display()
    );
    println!("  Module size (px):   {}", config.codegen.module_size);
}

fn handle_validate(file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    if !path.exists() {
        println!("  (file not found, checking defaults and environment only)");
    }

    Config::load_from(Some(path)).context("configuration is invalid")?;
    println!("Configuration is valid.");
    Ok(())
}
