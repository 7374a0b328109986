//! The `madrasa leaderboard` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use madrasa_client::{load_config_from, RestBackend};
use madrasa_core::backend::TestBackend;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = RestBackend::with_timeout(&config.base_url, config.request_timeout_secs);

    let entries = backend.leaderboard().await?;
    if entries.is_empty() {
        println!("The leaderboard is empty.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Rank", "Name", "Points", "Tests", "Last active"]);
    for (position, entry) in entries.iter().enumerate() {
        // Fall back to list order when the server leaves ranks implicit
        let rank = if entry.rank > 0 {
            entry.rank
        } else {
            (position + 1) as u32
        };
        let last_active = entry
            .updated_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            Cell::new(rank),
            Cell::new(&entry.user_name),
            Cell::new(entry.points),
            Cell::new(entry.tests_taken),
            Cell::new(last_active),
        ]);
    }
    println!("{table}");
    Ok(())
}
