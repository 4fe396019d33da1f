//! List assets.

use anyhow::Result;
use stash_types::AssetRecord;

use crate::context::AppContext;

/// Run the list command.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let records = ctx.library.list().await?;
    if records.is_empty() {
        println!("Library is empty.");
        return Ok(());
    }

    for record in &records {
        println!("{}", format_record(record));
    }
    println!();
    println!("{} assets", records.len());
    Ok(())
}

fn format_record(record: &AssetRecord) -> String {
    let id = record
        .local_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = record.sync_status.map(|s| s.as_str()).unwrap_or("local");
    let dimensions = match (record.width, record.height) {
        (Some(w), Some(h)) => format!(" {}x{}", w, h),
        _ => String::new(),
    };
    let downloaded = if record.is_downloaded() { "" } else { " (not downloaded)" };

    format!(
        "#{:<5} {:<8} {:<8} {:>10}{}  {}{}",
        id,
        record.kind.as_str(),
        status,
        format_size(record.byte_size),
        dimensions,
        record.display_name,
        downloaded
    )
}

/// Format a byte count with a binary unit.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
