//! Bundle statistics overview.
//!
//! Summarizes `package-info.json`: where the bundle came from, when it was
//! downloaded and last checked, and a per-file breakdown. Used by
//! `hitokoto bundle info`.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::bundle::Bundle;
use crate::models::Category;

/// Print a summary of the bundle's package metadata.
pub fn print_package_info(bundle: &Bundle) -> Result<()> {
    let info = match bundle.load_package_info()? {
        Some(info) => info,
        None => bail!(
            "no bundle found in {}, run `hitokoto bundle get` first",
            bundle.root().display()
        ),
    };

    let on_disk: u64 = info
        .files
        .iter()
        .filter_map(|f| bundle.file_path(&f.name))
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    println!("Hitokoto bundle");
    println!("===============");
    println!();
    println!("  Directory:   {}", bundle.root().display());
    println!("  Size:        {}", format_bytes(on_disk));
    println!("  Source:      {} ({})", info.source, info.source_url);
    println!("  Files:       {} / {}", info.files_amount, Category::ALL.len());
    println!("  Quotes:      {}", info.amount);
    println!("  Updated:     {}", format_ts_relative(info.last_update));
    println!("  Checked:     {}", format_ts_relative(info.last_check));

    if !info.source_usage.is_empty() {
        let usage: Vec<String> = info
            .source_usage
            .iter()
            .map(|(mirror, n)| format!("{} {}", mirror, n))
            .collect();
        println!("  Mirrors:     {}", usage.join(", "));
    }
    if !info.failed_types.is_empty() {
        println!("  Missing:     {}", info.failed_types.join(", "));
    }

    if !info.files.is_empty() {
        println!();
        println!("  {:<10} {:>8} {:>8}   {}", "FILE", "QUOTES", "SOURCE", "TYPE");
        println!("  {}", "-".repeat(52));
        for file in &info.files {
            let label = file
                .name
                .chars()
                .next()
                .and_then(Category::from_letter)
                .map(|c| c.label())
                .unwrap_or("?");
            println!(
                "  {:<10} {:>8} {:>8}   {}",
                file.name, file.amount, file.source, label
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        return format_ts(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts(ts)
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
