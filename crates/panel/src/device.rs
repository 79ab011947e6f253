//! Wiring of store, engine, arbiter and printer for one device.

use std::{
    fs::{File, OpenOptions},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Local;
use tombola_core::{
    AppConfig, DrawEngine, FileListStore, Printer, Receipt, ReceiptLayout, ResetReport,
    TombolaError, TriggerArbiter, TriggerOutcome,
};
use tracing::{info, warn};

/// Arbiter over the file-backed store.
pub type Arbiter = TriggerArbiter<FileListStore>;

/// A booted device: the shared arbiter plus the receipt output.
pub struct Device {
    arbiter: Arbiter,
    layout: ReceiptLayout,
    printer: Option<Printer<File>>,
    debounce: Duration,
}

impl Device {
    /// Open the data root, seed the engine and attach the printer if configured.
    pub fn boot(config: &AppConfig) -> Result<Self> {
        let store = FileListStore::open_with_wait(&config.data_root, config.busy_wait())
            .with_context(|| format!("failed to open data root {}", config.data_root.display()))?;
        info!(root = %store.root().display(), "data root locked");
        let engine = DrawEngine::new(Arc::new(store), config.group_size);
        let arbiter = TriggerArbiter::new(engine, config.busy_wait());

        let printer = match config.printer.device.as_ref() {
            Some(path) => {
                let sink = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open printer {}", path.display()))?;
                info!(device = %path.display(), "printer attached");
                Some(Printer::new(sink))
            }
            None => None,
        };

        Ok(Self {
            arbiter,
            layout: ReceiptLayout::from_config(&config.printer),
            printer,
            debounce: config.debounce(),
        })
    }

    /// Shared handle for every trigger source.
    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Refractory window for the buttons.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Whether receipts reach paper or stay on screen.
    pub fn has_printer(&self) -> bool {
        self.printer.is_some()
    }

    /// Receipt for an accepted trigger; mode changes print nothing.
    pub fn receipt_for(&self, outcome: &TriggerOutcome) -> Option<Receipt> {
        let now = Some(Local::now());
        match outcome {
            TriggerOutcome::Drawn { mode, outcome } => {
                Some(self.layout.draw_receipt(*mode, outcome, now))
            }
            TriggerOutcome::Reset(report) => {
                Some(self.layout.message_receipt(&describe_reset(report), now))
            }
            TriggerOutcome::ModeChanged(_) => None,
        }
    }

    /// Receipt for a failed trigger; a busy rejection prints nothing.
    pub fn receipt_for_error(&self, err: &TombolaError) -> Option<Receipt> {
        match err {
            TombolaError::Busy => None,
            other => Some(self.layout.message_receipt(&other.to_string(), Some(Local::now()))),
        }
    }

    /// Send `receipt` to the printer. Returns `false` when none is attached.
    pub fn print(&mut self, receipt: &Receipt) -> Result<bool> {
        let Some(printer) = self.printer.as_mut() else {
            return Ok(false);
        };
        if let Err(err) = printer.print(receipt) {
            warn!(%err, "printer write failed");
            return Err(err).context("failed to write to printer");
        }
        Ok(true)
    }
}

/// Human summary of a reset.
pub fn describe_reset(report: &ResetReport) -> String {
    let mut parts = Vec::new();
    match report.roster {
        Some(count) => parts.push(format!("Roster restored: {count} names")),
        None => parts.push("No roster loaded".to_string()),
    }
    if let Some(count) = report.questions {
        parts.push(format!("Questions restored: {count}"));
    }
    parts.join(". ")
}
