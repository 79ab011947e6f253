mod app;
mod block_font;
mod cli;
mod device;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use tombola_core::{
    config::{self, AppConfig},
    pools::parse_entries,
    GameMode, Receipt, Registration, Trigger,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::{
    cli::{Cli, Command},
    device::Device,
};

const LOG_FILE: &str = "tombola.log";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            config::ensure_default_config()?;
            AppConfig::load()?
        }
    };
    init_logging(&config.data_root, cli.command.is_some())?;
    info!(data_root = %config.data_root.display(), "starting");

    let mut device = Device::boot(&config)?;
    match cli.command {
        None => app::PanelApp::new(device).run().await,
        Some(command) => run_command(&mut device, command),
    }
}

fn run_command(device: &mut Device, command: Command) -> Result<()> {
    let arbiter = device.arbiter().clone();
    match command {
        Command::LoadRoster { file, questions } => {
            let roster = read_entries(&file)?;
            match questions {
                Some(questions_file) => {
                    let questions = read_entries(&questions_file)?;
                    let (names, asked) =
                        arbiter.bulk_load_roster_and_questions(&roster, &questions)?;
                    println!("Loaded {names} names and {asked} questions");
                }
                None => {
                    let names = arbiter.bulk_load_roster(&roster)?;
                    println!("Loaded {names} names");
                }
            }
        }
        Command::LoadQuestions { file } => {
            let asked = arbiter.bulk_load_questions(&read_entries(&file)?)?;
            println!("Loaded {asked} questions");
        }
        Command::Register { name } => match arbiter.register(&name)? {
            Registration::Added => println!("Registered {}", name.trim()),
            Registration::Ignored => println!("Ignored blank name"),
        },
        Command::Draw { mode } => {
            let target = GameMode::from(mode);
            for _ in 0..GameMode::CYCLE.len() {
                if arbiter.current_mode()? == target {
                    break;
                }
                arbiter.submit(Trigger::AdvanceMode)?;
            }
            submit_and_print(device, Trigger::Draw)?;
        }
        Command::Reset { all } => {
            let trigger = if all {
                Trigger::ResetAll
            } else {
                Trigger::ResetRoster
            };
            submit_and_print(device, trigger)?;
        }
        Command::Status { json } => {
            let status = arbiter.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Mode:      {}", status.mode);
                println!(
                    "Roster:    {}/{}",
                    status.roster.remaining, status.roster.total
                );
                println!(
                    "Questions: {}/{}",
                    status.questions.remaining, status.questions.total
                );
            }
        }
    }
    Ok(())
}

fn submit_and_print(device: &mut Device, trigger: Trigger) -> Result<()> {
    match device.arbiter().submit(trigger) {
        Ok(outcome) => {
            if let Some(receipt) = device.receipt_for(&outcome) {
                emit(device, &receipt)?;
            }
            Ok(())
        }
        Err(err) if err.is_recoverable() => {
            match device.receipt_for_error(&err) {
                Some(receipt) => emit(device, &receipt)?,
                None => eprintln!("{err}"),
            }
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn emit(device: &mut Device, receipt: &Receipt) -> Result<()> {
    println!("{}", receipt.plain_text());
    device.print(receipt)?;
    Ok(())
}

fn read_entries(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_entries(&String::from_utf8_lossy(&bytes)))
}

fn init_logging(data_root: &Path, to_stderr: bool) -> Result<()> {
    let log_dir = data_root.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join(LOG_FILE);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    // The panel owns the terminal, so console logging is for subcommands only.
    let stderr_layer = to_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}
