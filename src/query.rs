//! Index-backed quote lookup.
//!
//! Every query reads `index.jsonl` to pick entries, then resolves full
//! records from the category file each entry names. An entry whose file no
//! longer contains a matching record resolves to nothing rather than an
//! error; the index is only a projection of the files.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use crate::bundle::Bundle;
use crate::error::BundleError;
use crate::index::load_index;
use crate::models::{Category, IndexEntry, Quote};

/// Inclusive length bounds. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl LengthRange {
    pub fn new(min: Option<u64>, max: Option<u64>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, length: u64) -> bool {
        self.min.map_or(true, |min| length >= min) && self.max.map_or(true, |max| length <= max)
    }
}

/// `true` when `entry` belongs to one of `categories` (empty means all) and
/// its length is within `range`.
pub fn entry_matches(entry: &IndexEntry, categories: &[Category], range: LengthRange) -> bool {
    let in_category =
        categories.is_empty() || categories.iter().any(|c| entry.category == c.to_string());
    in_category && range.contains(entry.length)
}

/// Resolves index entries to records, loading each category file once.
pub struct Resolver<'a> {
    bundle: &'a Bundle,
    cache: HashMap<String, Option<Vec<Quote>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(bundle: &'a Bundle) -> Self {
        Self {
            bundle,
            cache: HashMap::new(),
        }
    }

    /// The record in `entry.file` whose `id` equals `entry.id`.
    pub fn resolve(&mut self, entry: &IndexEntry) -> Option<Quote> {
        self.find_in(&entry.file, |q| q.id() == Some(entry.id))
    }

    /// The record in `entry.file` whose `uuid` equals `entry.uuid`.
    pub fn resolve_uuid(&mut self, entry: &IndexEntry) -> Option<Quote> {
        self.find_in(&entry.file, |q| q.uuid() == Some(entry.uuid.as_str()))
    }

    fn find_in(&mut self, file: &str, pred: impl Fn(&Quote) -> bool) -> Option<Quote> {
        let found = self.records(file)?.iter().find(|q| pred(*q)).cloned();
        if found.is_none() {
            tracing::warn!("index entry has no matching record in {}", file);
        }
        found
    }

    fn records(&mut self, file: &str) -> Option<&[Quote]> {
        if !self.cache.contains_key(file) {
            let loaded = load_records(self.bundle, file);
            self.cache.insert(file.to_string(), loaded);
        }
        self.cache.get(file).and_then(|records| records.as_deref())
    }
}

fn load_records(bundle: &Bundle, file: &str) -> Option<Vec<Quote>> {
    let path = bundle.file_path(file)?;
    let value = match bundle.read_json(&path) {
        Ok(Some(value)) => value,
        Ok(None) => {
            tracing::warn!("indexed file {} does not exist", path.display());
            return None;
        }
        Err(e) => {
            tracing::warn!("cannot read {}: {}", path.display(), e);
            return None;
        }
    };

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => {
            tracing::warn!("{} is not a JSON array", path.display());
            return None;
        }
    };

    Some(
        items
            .into_iter()
            .filter_map(Quote::from_value)
            .collect(),
    )
}

pub fn find_by_id(bundle: &Bundle, id: i64) -> Result<Option<Quote>, BundleError> {
    let entries = load_index(bundle)?;
    let Some(entry) = entries.iter().find(|e| e.id == id) else {
        tracing::debug!("id {} not in index", id);
        return Ok(None);
    };
    Ok(Resolver::new(bundle).resolve(entry))
}

pub fn find_by_uuid(bundle: &Bundle, uuid: &str) -> Result<Option<Quote>, BundleError> {
    let entries = load_index(bundle)?;
    let Some(entry) = entries.iter().find(|e| e.uuid == uuid) else {
        tracing::debug!("uuid {} not in index", uuid);
        return Ok(None);
    };
    Ok(Resolver::new(bundle).resolve_uuid(entry))
}

/// Index entries in `categories` (all when empty) within `range`, unresolved.
pub fn list_by_categories(
    bundle: &Bundle,
    categories: &[Category],
    range: LengthRange,
) -> Result<Vec<IndexEntry>, BundleError> {
    let entries = load_index(bundle)?;
    Ok(entries
        .into_iter()
        .filter(|e| entry_matches(e, categories, range))
        .collect())
}

/// Uniformly random quote among the entries that pass the filters.
pub fn random_quote<R: Rng + ?Sized>(
    bundle: &Bundle,
    category: Option<Category>,
    range: LengthRange,
    rng: &mut R,
) -> Result<Option<Quote>, BundleError> {
    let categories: Vec<Category> = category.into_iter().collect();
    let candidates = list_by_categories(bundle, &categories, range)?;
    tracing::debug!("{} candidate entries", candidates.len());

    match candidates.choose(rng) {
        Some(entry) => Ok(Resolver::new(bundle).resolve(entry)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::rebuild_index;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_bundle() -> (TempDir, Bundle) {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let a = json!([
            {"id": 1, "uuid": "u1", "type": "a", "hitokoto": "short", "from": "A", "creator": "x"},
            {"id": 2, "uuid": "u2", "type": "a", "hitokoto": "exactly ten", "length": 10},
            {"id": 3, "uuid": "u3", "type": "a", "hitokoto": "twenty", "length": 20}
        ]);
        let b = json!([
            {"id": 4, "uuid": "u4", "type": "b", "hitokoto": "fifteen", "length": 15},
            {"id": 5, "uuid": "u5", "type": "b", "hitokoto": "too long", "length": 21}
        ]);
        std::fs::write(bundle.root().join("a.json"), a.to_string()).unwrap();
        std::fs::write(bundle.root().join("b.json"), b.to_string()).unwrap();
        rebuild_index(&bundle).unwrap();
        (tmp, bundle)
    }

    #[test]
    fn length_range_is_inclusive() {
        let r = LengthRange::new(Some(10), Some(20));
        assert!(r.contains(10));
        assert!(r.contains(20));
        assert!(!r.contains(9));
        assert!(!r.contains(21));
        assert!(LengthRange::default().contains(u64::MAX));
    }

    #[test]
    fn find_by_id_returns_record_unchanged() {
        let (_tmp, bundle) = sample_bundle();
        let quote = find_by_id(&bundle, 1).unwrap().unwrap();
        assert_eq!(quote.text(), "short");
        assert_eq!(quote.get("creator"), Some(&json!("x")));
        assert!(find_by_id(&bundle, 99).unwrap().is_none());
    }

    #[test]
    fn lookup_returns_record_without_added_fields() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let raw = r#"[{"id":1,"uuid":"u1","hitokoto":"x","type":"a"},{"id":2,"uuid":"u2","hitokoto":null,"from":7}]"#;
        std::fs::write(bundle.root().join("a.json"), raw).unwrap();
        rebuild_index(&bundle).unwrap();

        let stored: Vec<serde_json::Value> = serde_json::from_str(raw).unwrap();
        let first = find_by_id(&bundle, 1).unwrap().unwrap();
        assert_eq!(serde_json::to_value(&first).unwrap(), stored[0]);
        let second = find_by_uuid(&bundle, "u2").unwrap().unwrap();
        assert_eq!(serde_json::to_value(&second).unwrap(), stored[1]);
    }

    #[test]
    fn find_by_uuid_works() {
        let (_tmp, bundle) = sample_bundle();
        assert_eq!(find_by_uuid(&bundle, "u4").unwrap().unwrap().id(), Some(4));
        assert!(find_by_uuid(&bundle, "nope").unwrap().is_none());
    }

    #[test]
    fn index_file_disagreement_resolves_to_none() {
        let (_tmp, bundle) = sample_bundle();
        std::fs::write(bundle.root().join("b.json"), "[]").unwrap();
        assert!(find_by_id(&bundle, 4).unwrap().is_none());
    }

    #[test]
    fn random_respects_length_bounds() {
        let (_tmp, bundle) = sample_bundle();
        let range = LengthRange::new(Some(10), Some(20));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let quote = random_quote(&bundle, None, range, &mut rng).unwrap().unwrap();
            assert!(range.contains(quote.length()));
        }
    }

    #[test]
    fn random_with_category_filter() {
        let (_tmp, bundle) = sample_bundle();
        let mut rng = StdRng::seed_from_u64(1);
        let b = Category::from_letter('b').unwrap();
        for _ in 0..20 {
            let quote = random_quote(&bundle, Some(b), LengthRange::default(), &mut rng)
                .unwrap()
                .unwrap();
            assert_eq!(quote.category(), Some("b"));
        }
        let c = Category::from_letter('c').unwrap();
        assert!(random_quote(&bundle, Some(c), LengthRange::default(), &mut rng)
            .unwrap()
            .is_none());
    }

    #[test]
    fn empty_index_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(random_quote(&bundle, None, LengthRange::default(), &mut rng)
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_with_no_categories_means_all() {
        let (_tmp, bundle) = sample_bundle();
        assert_eq!(
            list_by_categories(&bundle, &[], LengthRange::default())
                .unwrap()
                .len(),
            5
        );
        let a = Category::from_letter('a').unwrap();
        let listed = list_by_categories(&bundle, &[a], LengthRange::new(Some(6), None)).unwrap();
        let ids: Vec<i64> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn resolver_handles_legacy_bundle_prefixed_paths() {
        let (_tmp, bundle) = sample_bundle();
        let entry = IndexEntry {
            id: 4,
            uuid: "u4".to_string(),
            category: "b".to_string(),
            file: "bundle/b.json".to_string(),
            length: 15,
        };
        assert_eq!(Resolver::new(&bundle).resolve(&entry).unwrap().id(), Some(4));
    }
}
