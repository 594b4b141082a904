//! Bundle download with per-category mirror failover.
//!
//! Each category is fetched from the pass's primary mirror first. A 404 on
//! the primary is taken as authoritative and ends that category; any other
//! failure walks [`retry_order`]. When a whole pass obtains nothing, the
//! next mirror of [`try_order`] becomes the primary for a fresh pass.
//!
//! On success the package metadata is written and the index rebuilt before
//! the report is returned.

use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::bundle::Bundle;
use crate::error::{CategoryFailure, DownloadError, FetchError};
use crate::fetch::Fetcher;
use crate::http::{HttpClient, ReqwestClient};
use crate::index::rebuild_index;
use crate::models::{Category, FileInfo, PackageInfo};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sources::{retry_order, try_order, Mirror};

/// One category obtained from a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDownload {
    pub category: Category,
    pub mirror: Mirror,
    pub count: usize,
}

/// Whether every category was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Partial { message: String },
}

/// Result of a bundle download that obtained at least one category.
#[derive(Debug)]
pub struct BundleReport {
    pub outcome: Outcome,
    /// Metadata as written to `package-info.json`.
    pub package: PackageInfo,
    pub downloads: Vec<CategoryDownload>,
    /// Categories whose primary mirror answered 404.
    pub absent: Vec<Category>,
    /// Categories that failed on every mirror.
    pub failures: Vec<CategoryFailure>,
    /// Entries written by the post-download index rebuild, if it succeeded.
    pub index_entries: Option<usize>,
    /// Non-fatal problems from the post-download step.
    pub warnings: Vec<String>,
}

impl BundleReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Complete
    }
}

/// Drives [`Fetcher`] across mirrors and records the result in the bundle.
pub struct Downloader<'a> {
    fetcher: Fetcher<'a>,
    bundle: &'a Bundle,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Downloader<'a> {
    pub fn new(
        client: &'a dyn HttpClient,
        bundle: &'a Bundle,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(client, bundle),
            bundle,
            progress,
        }
    }

    /// Obtain one category, starting with `primary`.
    pub fn download_category(
        &self,
        category: Category,
        primary: Mirror,
    ) -> Result<CategoryDownload, CategoryFailure> {
        let first = match self.attempt(category, primary) {
            Ok(download) => return Ok(download),
            Err(e) if e.is_not_found() => {
                tracing::info!("{} not available on {}, not retrying", category.file_name(), primary);
                self.progress.report(ProgressEvent::Failed {
                    category,
                    reason: e.to_string(),
                });
                return Err(CategoryFailure::Absent {
                    category,
                    mirror: primary,
                    source: e,
                });
            }
            Err(e) => e,
        };

        tracing::error!("{} failed on {}: {}", category.file_name(), primary, first);
        self.progress.report(ProgressEvent::Failover {
            category,
            from: primary,
        });

        let mut last = first;
        for mirror in retry_order(primary) {
            match self.attempt(category, mirror) {
                Ok(download) => return Ok(download),
                Err(e) => {
                    tracing::warn!("{} failed on {}: {}", category.file_name(), mirror, e);
                    last = e;
                }
            }
        }

        self.progress.report(ProgressEvent::Failed {
            category,
            reason: last.to_string(),
        });
        Err(CategoryFailure::Exhausted { category, last })
    }

    fn attempt(&self, category: Category, mirror: Mirror) -> Result<CategoryDownload, FetchError> {
        self.progress.report(ProgressEvent::Attempt { category, mirror });
        let count = self.fetcher.fetch(mirror, category)?;
        self.progress.report(ProgressEvent::Downloaded {
            category,
            mirror,
            count,
        });
        Ok(CategoryDownload {
            category,
            mirror,
            count,
        })
    }

    /// Download every category, preferring `requested`.
    ///
    /// Fails only when no category could be obtained in any pass.
    pub fn download_bundle(&self, requested: Mirror) -> Result<BundleReport, DownloadError> {
        let order = try_order(requested);
        self.bundle.ensure_dir()?;

        let mut last_error = String::from("no mirror was attempted");
        for primary in order.iter().copied() {
            self.progress.report(ProgressEvent::PassStarted { primary });
            tracing::info!("download pass with primary mirror {}", primary);

            let mut downloads = Vec::new();
            let mut absent = Vec::new();
            let mut failures = Vec::new();

            for category in Category::ALL {
                match self.download_category(category, primary) {
                    Ok(download) => downloads.push(download),
                    Err(failure) => {
                        last_error = failure.to_string();
                        if failure.is_absent() {
                            absent.push(category);
                        } else {
                            failures.push(failure);
                        }
                    }
                }
            }

            if downloads.is_empty() {
                tracing::warn!("pass with primary {} obtained no category", primary);
                continue;
            }

            return Ok(self.finish(&order, primary, downloads, absent, failures));
        }

        Err(DownloadError::NothingDownloaded { last: last_error })
    }

    fn finish(
        &self,
        order: &[Mirror],
        primary: Mirror,
        downloads: Vec<CategoryDownload>,
        absent: Vec<Category>,
        failures: Vec<CategoryFailure>,
    ) -> BundleReport {
        let mut warnings = Vec::new();
        let mut source_usage: BTreeMap<String, usize> = BTreeMap::new();
        let mut files = Vec::with_capacity(downloads.len());

        for download in &downloads {
            *source_usage
                .entry(download.mirror.key().to_string())
                .or_insert(0) += 1;

            let path = self.bundle.category_path(download.category);
            let sha256 = match self.bundle.file_digest(&path) {
                Ok(digest) => Some(digest),
                Err(e) => {
                    warnings.push(format!("could not checksum {}: {}", path.display(), e));
                    None
                }
            };

            files.push(FileInfo {
                name: download.category.file_name(),
                amount: download.count as u64,
                source: download.mirror.key().to_string(),
                sha256,
            });
        }

        let failed_types: Vec<String> = Category::ALL
            .iter()
            .filter(|c| !downloads.iter().any(|d| d.category == **c))
            .map(|c| c.to_string())
            .collect();

        let source = majority_mirror(order, &downloads).unwrap_or(primary);
        let now = Utc::now();
        let package = PackageInfo {
            source: source.key().to_string(),
            source_url: source.base_url().trim_end_matches('/').to_string(),
            files_amount: files.len(),
            amount: files.iter().map(|f| f.amount).sum(),
            files,
            last_update: now,
            last_check: now,
            source_usage,
            failed_types,
        };

        // Persist metadata, then derive the index
        if let Err(e) = self.bundle.save_package_info(&package) {
            tracing::error!("failed to save package metadata: {}", e);
            warnings.push(format!("failed to save package metadata: {}", e));
        }
        let index_entries = match rebuild_index(self.bundle) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::error!("index rebuild failed: {}", e);
                warnings.push(format!("index rebuild failed: {}", e));
                None
            }
        };

        let outcome = if downloads.len() == Category::ALL.len() {
            Outcome::Complete
        } else {
            Outcome::Partial {
                message: format!(
                    "obtained {} of {} categories, missing: {}",
                    downloads.len(),
                    Category::ALL.len(),
                    package.failed_types.join(", ")
                ),
            }
        };

        tracing::info!(
            "bundle download finished: {} files, {} quotes",
            package.files_amount,
            package.amount
        );

        BundleReport {
            outcome,
            package,
            downloads,
            absent,
            failures,
            index_entries,
            warnings,
        }
    }
}

/// CLI entry point: download the bundle over HTTP and print a summary.
pub fn run_bundle_get(
    bundle: &Bundle,
    source: Mirror,
    timeout: Duration,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let client = ReqwestClient::with_timeout(timeout)?;
    println!("Fetching bundle from {} ({})", source.key(), source.name());

    let report = Downloader::new(&client, bundle, progress).download_bundle(source)?;

    match &report.outcome {
        Outcome::Complete => println!("Bundle complete."),
        Outcome::Partial { message } => println!("Bundle partially downloaded: {}", message),
    }
    println!("  directory:  {}", bundle.root().display());
    println!("  files:      {}", report.package.files_amount);
    println!("  quotes:     {}", report.package.amount);
    println!("  source:     {}", report.package.source);
    let usage: Vec<String> = report
        .package
        .source_usage
        .iter()
        .map(|(mirror, n)| format!("{} {}", mirror, n))
        .collect();
    println!("  mirrors:    {}", usage.join(", "));
    if !report.absent.is_empty() {
        let absent: Vec<String> = report.absent.iter().map(|c| c.to_string()).collect();
        println!("  not found:  {}", absent.join(", "));
    }
    for failure in &report.failures {
        println!("  failed:     {}", failure);
    }
    if let Some(n) = report.index_entries {
        println!("  indexed:    {}", n);
    }
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }

    Ok(())
}

/// Mirror that supplied the most files; ties go to the earlier mirror in
/// `order`.
fn majority_mirror(order: &[Mirror], downloads: &[CategoryDownload]) -> Option<Mirror> {
    let mut best: Option<(Mirror, usize)> = None;
    for &mirror in order {
        let n = downloads.iter().filter(|d| d.mirror == mirror).count();
        if n > 0 && best.map_or(true, |(_, b)| n > b) {
            best = Some((mirror, n));
        }
    }
    best.map(|(mirror, _)| mirror)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::fetch::category_url;
    use crate::http::tests::MockHttpClient;
    use crate::progress::{NoProgress, RecordingProgress};
    use tempfile::TempDir;

    fn cat(letter: char) -> Category {
        Category::from_letter(letter).unwrap()
    }

    fn body(category: Category) -> Vec<u8> {
        let n = category.letter() as i64;
        format!(
            r#"[{{"id":{},"uuid":"u-{}","hitokoto":"quote {}","type":"{}"}}]"#,
            n, category, category, category
        )
        .into_bytes()
    }

    fn serve_all(mut client: MockHttpClient, mirror: Mirror) -> MockHttpClient {
        for category in Category::ALL {
            client = client.with(&category_url(mirror, category), Ok(body(category)));
        }
        client
    }

    fn requests_for(client: &MockHttpClient, category: Category) -> Vec<String> {
        let suffix = format!("/sentences/{}", category.file_name());
        client
            .requests
            .borrow()
            .iter()
            .filter(|u| u.ends_with(&suffix))
            .cloned()
            .collect()
    }

    #[test]
    fn not_found_on_primary_never_tries_another_mirror() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let client = serve_all(MockHttpClient::default(), Mirror::GitHub).with(
            &category_url(Mirror::Official, cat('f')),
            Err(HttpError::NotFound),
        );
        let downloader = Downloader::new(&client, &bundle, &NoProgress);

        let failure = downloader
            .download_category(cat('f'), Mirror::Official)
            .unwrap_err();
        assert!(failure.is_absent());
        assert_eq!(client.requests.borrow().len(), 1);
    }

    #[test]
    fn transient_failure_fails_over_in_retry_order() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let client = MockHttpClient::default()
            .with(
                &category_url(Mirror::Official, cat('a')),
                Err(HttpError::Status(503)),
            )
            .with(
                &category_url(Mirror::GitHub, cat('a')),
                Err(HttpError::NotFound),
            )
            .with(&category_url(Mirror::JsDelivr, cat('a')), Ok(body(cat('a'))));
        let downloader = Downloader::new(&client, &bundle, &NoProgress);

        let download = downloader
            .download_category(cat('a'), Mirror::Official)
            .unwrap();
        assert_eq!(download.mirror, Mirror::JsDelivr);
        assert_eq!(download.count, 1);
        assert_eq!(
            *client.requests.borrow(),
            vec![
                category_url(Mirror::Official, cat('a')),
                category_url(Mirror::GitHub, cat('a')),
                category_url(Mirror::JsDelivr, cat('a')),
            ]
        );
    }

    #[test]
    fn exhausted_category_retries_primary_last() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let client = MockHttpClient::default();
        let downloader = Downloader::new(&client, &bundle, &NoProgress);

        let failure = downloader
            .download_category(cat('b'), Mirror::GitHub)
            .unwrap_err();
        assert!(matches!(failure, CategoryFailure::Exhausted { .. }));
        let requests = client.requests.borrow();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[3], category_url(Mirror::GitHub, cat('b')));
    }

    #[test]
    fn complete_download_writes_metadata_and_index() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path().join("bundle"));
        let client = serve_all(MockHttpClient::default(), Mirror::GitHub);
        let progress = RecordingProgress::default();
        let downloader = Downloader::new(&client, &bundle, &progress);

        let report = downloader.download_bundle(Mirror::GitHub).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.index_entries, Some(12));
        assert!(report.warnings.is_empty());
        assert_eq!(report.package.source, "gh");
        assert_eq!(report.package.files_amount, 12);
        assert_eq!(report.package.amount, 12);
        assert!(report.package.failed_types.is_empty());
        assert!(report.package.files.iter().all(|f| f.sha256.is_some()));

        let saved = bundle.load_package_info().unwrap().unwrap();
        assert_eq!(saved, report.package);
        assert!(bundle.index_path().is_file());

        let events = progress.events();
        assert_eq!(
            events[0],
            ProgressEvent::PassStarted {
                primary: Mirror::GitHub
            }
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::Downloaded { .. }))
                .count(),
            12
        );
    }

    #[test]
    fn partial_download_tracks_absent_and_hard_failures() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let mut client = MockHttpClient::default();
        for category in Category::ALL {
            let url = category_url(Mirror::Official, category);
            client = match category.letter() {
                'k' => client.with(&url, Err(HttpError::NotFound)),
                'l' => client.with(&url, Err(HttpError::Transport("reset".to_string()))),
                _ => client.with(&url, Ok(body(category))),
            };
        }
        let downloader = Downloader::new(&client, &bundle, &NoProgress);

        let report = downloader.download_bundle(Mirror::Official).unwrap();
        match &report.outcome {
            Outcome::Partial { message } => assert!(message.contains("10 of 12")),
            other => panic!("expected partial outcome, got {:?}", other),
        }
        assert_eq!(report.absent, vec![cat('k')]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category(), cat('l'));
        assert_eq!(report.package.failed_types, vec!["k", "l"]);
        assert_eq!(report.package.source_usage.get("of"), Some(&10));
        assert_eq!(report.index_entries, Some(10));
    }

    #[test]
    fn empty_pass_promotes_next_mirror() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let mut client = serve_all(MockHttpClient::default(), Mirror::GitHub);
        for category in Category::ALL {
            client = client.with(
                &category_url(Mirror::Official, category),
                Err(HttpError::NotFound),
            );
        }
        let progress = RecordingProgress::default();
        let downloader = Downloader::new(&client, &bundle, &progress);

        let report = downloader.download_bundle(Mirror::Official).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.package.source, "gh");
        assert!(report.absent.is_empty());
        let passes: Vec<Mirror> = progress
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::PassStarted { primary } => Some(primary),
                _ => None,
            })
            .collect();
        assert_eq!(passes, vec![Mirror::Official, Mirror::GitHub]);
        assert_eq!(requests_for(&client, cat('a')).len(), 2);
    }

    #[test]
    fn nothing_anywhere_is_total_failure() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let client = MockHttpClient::default();
        let downloader = Downloader::new(&client, &bundle, &NoProgress);

        let err = downloader.download_bundle(Mirror::GitHub).unwrap_err();
        assert!(matches!(err, DownloadError::NothingDownloaded { .. }));
        assert!(!bundle.exists());
    }

    #[test]
    fn majority_ties_follow_try_order() {
        let downloads = vec![
            CategoryDownload {
                category: cat('a'),
                mirror: Mirror::JsDelivr,
                count: 1,
            },
            CategoryDownload {
                category: cat('b'),
                mirror: Mirror::Official,
                count: 1,
            },
        ];
        let order = try_order(Mirror::GitHub);
        assert_eq!(majority_mirror(&order, &downloads), Some(Mirror::JsDelivr));
        assert_eq!(majority_mirror(&order, &[]), None);
    }
}
