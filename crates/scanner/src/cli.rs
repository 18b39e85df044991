use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};

use roundwatch_common::types::parse_timestamp;
use roundwatch_engine::ScanMode;

/// Roundwatch: scan funding rounds for due reminders and events
#[derive(Debug, Parser)]
#[command(name = "roundwatch-scanner", version, about, long_about = None)]
pub struct Cli {
    /// Which part of the scan to run
    #[arg(long, value_enum, default_value = "all")]
    pub mode: ModeArg,

    /// Scan as of this local time (YYYY-MM-DDTHH:MM:SS) instead of now
    #[arg(long, value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    All,
    Reminders,
    Events,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => ScanMode::All,
            ModeArg::Reminders => ScanMode::Reminders,
            ModeArg::Events => ScanMode::Events,
        }
    }
}

fn parse_now(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SS: {e}"))
}
