//! Bulk export of random quotes to a text file.
//!
//! Draws distinct index entries without replacement, resolves them to full
//! records and writes one formatted quote per paragraph. Existing files are
//! never overwritten; a free `name(n).ext` is picked instead.

use rand::Rng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::bundle::Bundle;
use crate::error::{BundleError, ExportError};
use crate::format::render_text;
use crate::models::Category;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::query::{list_by_categories, LengthRange, Resolver};

/// Number of formatted quotes kept in [`ExportReport::preview`].
pub const PREVIEW_LEN: usize = 5;

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub count: usize,
    /// A target file (existing, or ending in `.txt`/`.json`) or a directory.
    pub output: PathBuf,
    /// Empty means every category.
    pub categories: Vec<Category>,
    pub range: LengthRange,
    pub include_source: bool,
    /// File name used when `output` is a directory.
    pub default_filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub exported: usize,
    pub requested: usize,
    /// Entries that matched the filters.
    pub available: usize,
    /// First few formatted quotes, in written order.
    pub preview: Vec<String>,
}

impl ExportReport {
    pub fn clamped(&self) -> bool {
        self.requested > self.available
    }
}

/// Export `request.count` distinct random quotes to a new file.
pub fn export_to_file<R: Rng + ?Sized>(
    bundle: &Bundle,
    request: &ExportRequest,
    progress: &dyn ProgressReporter,
    rng: &mut R,
) -> Result<ExportReport, ExportError> {
    if !bundle.exists() {
        return Err(ExportError::NoBundle);
    }

    let categories = if request.categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        request.categories.clone()
    };
    let candidates = list_by_categories(bundle, &categories, request.range)?;
    if candidates.is_empty() {
        return Err(ExportError::NoMatch);
    }

    let mut count = request.count;
    if count > candidates.len() {
        tracing::warn!(
            "requested {} quotes but only {} match, exporting all of them",
            count,
            candidates.len()
        );
        progress.report(ProgressEvent::ExportClamped {
            requested: count,
            available: candidates.len(),
        });
        count = candidates.len();
    }

    // Draw without replacement, then resolve
    let picked = rand::seq::index::sample(rng, candidates.len(), count);
    let mut resolver = Resolver::new(bundle);
    let mut seen = HashSet::new();
    let mut formatted = Vec::with_capacity(count);

    for i in picked.iter() {
        let entry = &candidates[i];
        let Some(quote) = resolver.resolve(entry) else {
            tracing::warn!("skipping unresolvable entry {} in {}", entry.id, entry.file);
            continue;
        };
        if !seen.insert(quote.id().unwrap_or(entry.id)) {
            tracing::debug!("skipping duplicate id {}", entry.id);
            continue;
        }
        formatted.push(render_text(&quote, request.include_source));
    }

    if formatted.is_empty() {
        return Err(ExportError::NoContent);
    }

    let (dir, filename) = resolve_output_target(&request.output, &request.default_filename);
    std::fs::create_dir_all(&dir).map_err(|source| BundleError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    let path = unique_path(&dir, &filename);

    std::fs::write(&path, formatted.join("\n\n")).map_err(|source| BundleError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!("exported {} quotes to {}", formatted.len(), path.display());

    Ok(ExportReport {
        path,
        exported: formatted.len(),
        requested: request.count,
        available: candidates.len(),
        preview: formatted.iter().take(PREVIEW_LEN).cloned().collect(),
    })
}

/// CLI entry point: export with a fresh RNG and print a short preview.
pub fn run_export(
    bundle: &Bundle,
    request: &ExportRequest,
    progress: &dyn ProgressReporter,
) -> anyhow::Result<()> {
    let report = export_to_file(bundle, request, progress, &mut rand::thread_rng())?;

    println!(
        "Exported {} quotes to {}",
        report.exported,
        report.path.display()
    );
    if report.clamped() {
        println!(
            "  requested {}, only {} matched the filters",
            report.requested, report.available
        );
    }

    println!();
    println!("Preview:");
    for quote in &report.preview {
        println!("  {}", quote);
    }
    if report.exported > report.preview.len() {
        println!("  ... and {} more", report.exported - report.preview.len());
    }
    Ok(())
}

fn has_known_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Split an output path into destination directory and file name.
///
/// An existing file or a path ending in `.txt`/`.json` names the file
/// itself; anything else is a directory that receives `default_filename`.
pub fn resolve_output_target(path: &Path, default_filename: &str) -> (PathBuf, String) {
    if path.is_file() || has_known_extension(path) {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| default_filename.to_string());
        (dir, name)
    } else {
        (path.to_path_buf(), default_filename.to_string())
    }
}

/// `dir/filename`, or the first free `dir/stem(n).ext` for n = 1, 2, ...
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let ext = name.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n: u32 = 1;
    loop {
        let numbered = match &ext {
            Some(ext) => format!("{}({}).{}", stem, n, ext),
            None => format!("{}({})", stem, n),
        };
        let candidate = dir.join(numbered);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
