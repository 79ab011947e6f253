#![warn(clippy::all, missing_docs)]

//! Roster and draw engine for the classroom tombola.
//!
//! This crate owns the persisted name and question lists, draws from them
//! without replacement in every game mode, restores them from their master
//! copies, and serializes the triggers that arrive from the physical buttons
//! and from the status web page.

pub mod arbiter;
pub mod config;
pub mod debounce;
pub mod draw;
pub mod error;
pub mod mode;
pub mod pools;
pub mod printer;
pub mod reset;
pub mod store;

pub use arbiter::{DeviceStatus, Trigger, TriggerArbiter, TriggerOutcome};
pub use config::AppConfig;
pub use debounce::{Button, ButtonPanel, Debouncer, Level};
pub use draw::{DrawEngine, DrawOutcome};
pub use error::{PoolSide, StoreError, TombolaError, TombolaResult};
pub use mode::{GameMode, ModeState};
pub use pools::{ListKey, PoolCounts, PoolPair, Registration};
pub use printer::{transliterate, Printer, Receipt, ReceiptLayout};
pub use reset::ResetReport;
pub use store::{FileListStore, ListStore, MemoryListStore};
