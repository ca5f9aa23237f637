//! Subcommand implementations.

pub mod attestation;
pub mod auth_data;
pub mod cbor;
pub mod ceremony;
pub mod client_data;

use anyhow::{Context, Result};
use colored::Colorize;

/// Global output switches
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn print_json(&self, value: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{text}");
        Ok(())
    }

    pub fn heading(&self, title: &str) {
        if !self.quiet {
            println!();
            println!("{}", title.bold());
        }
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("   {} {}", format!("{label}:").dimmed(), value);
    }
}
