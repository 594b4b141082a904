//! Bundle integrity check.
//!
//! Cross-checks `package-info.json` against the category files on disk and
//! the presence of the index. Every finding is collected; the check never
//! stops at the first problem.

use anyhow::{bail, Result};
use chrono::Utc;

use crate::bundle::Bundle;
use crate::error::{IntegrityError, IntegrityIssue};

/// Summary of a passing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPassed {
    pub files_checked: usize,
    pub quotes: u64,
}

/// Check the bundle against its metadata.
///
/// On success the metadata's `last_check` timestamp is refreshed.
pub fn check_integrity(bundle: &Bundle) -> Result<CheckPassed, IntegrityError> {
    let mut info = bundle
        .load_package_info()?
        .ok_or_else(|| IntegrityError::MissingMetadata {
            path: bundle.package_info_path(),
        })?;

    let issues = collect_issues(bundle, &info);
    if !issues.is_empty() {
        tracing::warn!("integrity check found {} issue(s)", issues.len());
        return Err(IntegrityError::Issues(issues));
    }

    info.last_check = Utc::now();
    if let Err(e) = bundle.save_package_info(&info) {
        tracing::warn!("could not record last_check: {}", e);
    }

    tracing::info!("integrity check passed for {} files", info.files.len());
    Ok(CheckPassed {
        files_checked: info.files.len(),
        quotes: info.amount,
    })
}

/// CLI entry point: run the check and print every finding.
pub fn run_check(bundle: &Bundle) -> Result<()> {
    match check_integrity(bundle) {
        Ok(passed) => {
            println!(
                "Bundle OK: {} files, {} quotes.",
                passed.files_checked, passed.quotes
            );
            Ok(())
        }
        Err(IntegrityError::Issues(issues)) => {
            println!("Bundle check found {} issue(s):", issues.len());
            for issue in &issues {
                println!("  - {}", issue);
            }
            bail!("bundle integrity check failed, run `hitokoto bundle get` to repair it")
        }
        Err(e) => Err(e.into()),
    }
}

/// All issues for `info` against the files in `bundle`, in metadata order,
/// with a missing index reported last.
pub fn collect_issues(bundle: &Bundle, info: &crate::models::PackageInfo) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    for file in &info.files {
        let name = file.name.clone();
        let path = match bundle.file_path(&name) {
            Some(path) => path,
            None => {
                tracing::warn!("metadata lists an unusable file name: {:?}", name);
                issues.push(IntegrityIssue::MissingFile { name });
                continue;
            }
        };

        if !path.is_file() {
            tracing::warn!("missing file: {}", name);
            issues.push(IntegrityIssue::MissingFile { name });
            continue;
        }

        let value = match bundle.read_json(&path) {
            Ok(Some(value)) => value,
            Ok(None) => {
                issues.push(IntegrityIssue::MissingFile { name });
                continue;
            }
            Err(e) => {
                tracing::warn!("{}: read failed: {}", name, e);
                issues.push(IntegrityIssue::ReadError {
                    name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let actual = value.as_array().map(|a| a.len() as u64).unwrap_or(0);
        if actual != file.amount {
            tracing::warn!("{}: expected {} quotes, found {}", name, file.amount, actual);
            issues.push(IntegrityIssue::CountMismatch {
                name: name.clone(),
                expected: file.amount,
                actual,
            });
        } else {
            tracing::debug!("{}: {} quotes, ok", name, actual);
        }

        if let Some(expected) = &file.sha256 {
            match bundle.file_digest(&path) {
                Ok(actual) if &actual != expected => {
                    issues.push(IntegrityIssue::ChecksumMismatch {
                        name,
                        expected: expected.clone(),
                        actual,
                    });
                }
                Ok(_) => {}
                Err(e) => issues.push(IntegrityIssue::ReadError {
                    name,
                    reason: e.to_string(),
                }),
            }
        }
    }

    if !bundle.index_path().is_file() {
        tracing::warn!("missing index file");
        issues.push(IntegrityIssue::MissingIndex);
    }

    issues
}
