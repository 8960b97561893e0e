//! Plan command implementation
//!
//! Prints the order in which the tables of a JSON dataset file would be
//! masked and which relationships could not be ordered.

use crate::adapters::file::read_dataset;
use crate::anonymization::graph;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Dataset JSON file to plan
    #[arg(short, long)]
    pub input: PathBuf,
}

impl PlanArgs {
    /// Execute the plan command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let dataset = read_dataset(&self.input)
            .with_context(|| format!("Failed to load dataset {}", self.input.display()))?;

        let relationships = dataset.relationships();
        let names: Vec<&str> = dataset.tables.iter().map(|t| t.name()).collect();
        let order = graph::order(&names, &relationships);

        println!("📋 Processing order ({} tables):", order.tables.len());
        for (index, table) in order.tables.iter().enumerate() {
            let rows = dataset.table(table).map_or(0, |t| t.rows.len());
            println!("   {:>2}. {table} ({rows} rows)", index + 1);
        }

        if !order.skipped_edges.is_empty() {
            println!();
            println!("⚠️  Relationships outside the order:");
            for edge in &order.skipped_edges {
                let reason = if edge.is_self_reference() {
                    "self reference"
                } else {
                    "cycle"
                };
                println!("   - {edge} ({reason})");
            }
        }

        Ok(0)
    }
}
