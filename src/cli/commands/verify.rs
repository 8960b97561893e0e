//! Verify command implementation
//!
//! This module implements the `verify` command, which checks every declared
//! foreign key of a JSON dataset file.

use crate::adapters::file::read_dataset;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Dataset JSON file to check
    #[arg(short, long)]
    pub input: PathBuf,
}

impl VerifyArgs {
    /// Execute the verify command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Verifying referential integrity");

        let dataset = read_dataset(&self.input)
            .with_context(|| format!("Failed to load dataset {}", self.input.display()))?;
        let report = crate::anonymization::validate(&dataset, &dataset.relationships());

        println!("🔍 Referential integrity: {}", self.input.display());
        println!("   Relationships checked: {}", report.relationships_checked);

        for warning in &report.warnings {
            println!("   ⚠️  {warning}");
        }

        if report.is_valid {
            println!("✅ No dangling references");
            return Ok(0);
        }

        println!("❌ {} dangling reference(s):", report.errors.len());
        for violation in &report.errors {
            println!("   - {violation}");
        }
        Ok(1)
    }
}
