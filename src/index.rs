//! Line-oriented index over the category files.
//!
//! `index.jsonl` holds one `{id, uuid, type, file, length}` object per valid
//! quote record. It is a derived projection: [`rebuild_index`] always
//! re-derives it in full from the category files and overwrites it, so it
//! can only be stale between a category write and the next rebuild.

use serde_json::Value;
use std::io::Write;

use crate::bundle::Bundle;
use crate::error::{BundleError, IndexError};
use crate::models::{Category, IndexEntry, Quote};

/// Rebuild `index.jsonl` from every category file present in the bundle.
///
/// Returns the number of entries written. Fails with [`IndexError::NoData`]
/// when no valid record exists in any file; the previous index is left
/// untouched in that case.
pub fn rebuild_index(bundle: &Bundle) -> Result<usize, IndexError> {
    let entries = collect_entries(bundle);
    if entries.is_empty() {
        tracing::error!("no valid quote records found in {}", bundle.root().display());
        return Err(IndexError::NoData);
    }

    write_index(bundle, &entries)?;
    tracing::info!(
        "index written to {} with {} entries",
        bundle.index_path().display(),
        entries.len()
    );
    Ok(entries.len())
}

/// CLI entry point for `hitokoto bundle reindex`.
pub fn run_reindex(bundle: &Bundle) -> anyhow::Result<()> {
    let count = rebuild_index(bundle)?;
    println!(
        "Index rebuilt: {} entries written to {}",
        count,
        bundle.index_path().display()
    );
    Ok(())
}

/// Derive index entries from all category files, in category order.
pub fn collect_entries(bundle: &Bundle) -> Vec<IndexEntry> {
    let mut entries = Vec::new();

    for category in Category::ALL {
        let path = bundle.category_path(category);
        let value = match bundle.read_json(&path) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!("{} not present, skipping", category.file_name());
                continue;
            }
            Err(e) => {
                tracing::warn!("skipping {}: {}", category.file_name(), e);
                continue;
            }
        };

        let items = match value.as_array() {
            Some(items) => items,
            None => {
                tracing::warn!(
                    "{} is not a JSON array, skipping",
                    category.file_name()
                );
                continue;
            }
        };

        let before = entries.len();
        entries.extend(entries_for_category(category, items));
        tracing::info!(
            "indexed {}: {} records, {} valid",
            category.file_name(),
            items.len(),
            entries.len() - before
        );
    }

    entries
}

/// Index entries for the records of one category file. Records without an
/// `id` or a non-empty `uuid` are skipped.
pub fn entries_for_category(category: Category, items: &[Value]) -> Vec<IndexEntry> {
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let Some(quote) = Quote::from_value(item.clone()) else {
            tracing::warn!("skipping non-object record in {}", category.file_name());
            continue;
        };
        let (id, uuid) = match (quote.id(), quote.uuid()) {
            (Some(id), Some(uuid)) => (id, uuid.to_string()),
            (id, uuid) => {
                tracing::warn!(
                    "skipping record without id/uuid in {}: id={:?}, uuid={:?}",
                    category.file_name(),
                    id,
                    uuid
                );
                continue;
            }
        };

        entries.push(IndexEntry {
            id,
            uuid,
            category: quote
                .category()
                .map_or_else(|| category.to_string(), str::to_string),
            file: category.file_name(),
            length: quote.length(),
        });
    }

    entries
}

fn write_index(bundle: &Bundle, entries: &[IndexEntry]) -> Result<(), BundleError> {
    bundle.ensure_dir()?;
    let mut buf = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }

    let path = bundle.index_path();
    let mut file = std::fs::File::create(&path).map_err(|source| BundleError::Write {
        path: path.clone(),
        source,
    })?;
    file.write_all(&buf)
        .map_err(|source| BundleError::Write { path, source })
}

/// Load every entry of `index.jsonl`.
///
/// A missing index yields an empty list. Malformed lines are skipped with a
/// warning.
pub fn load_index(bundle: &Bundle) -> Result<Vec<IndexEntry>, BundleError> {
    let path = bundle.index_path();
    if !path.is_file() {
        tracing::warn!("index file not found: {}", path.display());
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| BundleError::Read {
        path: path.clone(),
        source,
    })?;

    let mut entries = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<IndexEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!("skipping malformed index line {}: {}", lineno + 1, e),
        }
    }

    tracing::debug!("loaded {} index entries", entries.len());
    Ok(entries)
}
