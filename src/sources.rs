//! Mirror registry for the sentence bundle.
//!
//! Three independent hosts serve identical copies of the bundle. The order
//! in which they are tried is built by [`try_order`] (per download) and
//! [`retry_order`] (per category after a failed primary attempt).

use anyhow::Result;
use std::fmt;
use std::str::FromStr;

use crate::api::ApiRegion;

/// A named bundle mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mirror {
    Official,
    GitHub,
    JsDelivr,
}

impl Mirror {
    /// All mirrors in registry order.
    pub const ALL: [Mirror; 3] = [Mirror::Official, Mirror::GitHub, Mirror::JsDelivr];

    /// Short key used on the command line and in `package-info.json`.
    pub fn key(self) -> &'static str {
        match self {
            Mirror::Official => "of",
            Mirror::GitHub => "gh",
            Mirror::JsDelivr => "jsd",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mirror::Official => "official",
            Mirror::GitHub => "GitHub",
            Mirror::JsDelivr => "jsDelivr CDN",
        }
    }

    /// Base URL, always ending in `/`.
    pub fn base_url(self) -> &'static str {
        match self {
            Mirror::Official => "https://sentences-bundle.hitokoto.cn/",
            Mirror::GitHub => {
                "https://raw.githubusercontent.com/hitokoto-osc/sentences-bundle/master/"
            }
            Mirror::JsDelivr => "https://cdn.jsdelivr.net/gh/hitokoto-osc/sentences-bundle@latest/",
        }
    }

    pub fn from_key(key: &str) -> Option<Mirror> {
        Mirror::ALL.into_iter().find(|m| m.key() == key)
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Mirror {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mirror::from_key(s.trim()).ok_or_else(|| {
            let keys: Vec<&str> = Mirror::ALL.iter().map(|m| m.key()).collect();
            format!("unknown source '{}', supported: {}", s, keys.join(", "))
        })
    }
}

/// Mirror precedence for a bundle download.
///
/// GitHub is the preferred default: asking for it yields
/// `[gh, jsd, of]`. Any other request is tried first, then GitHub, then
/// the remaining mirrors in registry order.
pub fn try_order(requested: Mirror) -> Vec<Mirror> {
    if requested == Mirror::GitHub {
        return vec![Mirror::GitHub, Mirror::JsDelivr, Mirror::Official];
    }

    let mut order = vec![requested, Mirror::GitHub];
    for mirror in Mirror::ALL {
        if !order.contains(&mirror) {
            order.push(mirror);
        }
    }
    order
}

/// Mirrors to try after `primary` failed for one category: every other
/// mirror in registry order, then `primary` once more.
pub fn retry_order(primary: Mirror) -> Vec<Mirror> {
    let mut order: Vec<Mirror> = Mirror::ALL
        .into_iter()
        .filter(|m| *m != primary)
        .collect();
    order.push(primary);
    order
}

pub fn list_sources() -> Result<()> {
    println!("{:<8} {:<16} URL", "SOURCE", "NAME");
    for mirror in Mirror::ALL {
        println!(
            "{:<8} {:<16} {}",
            mirror.key(),
            mirror.name(),
            mirror.base_url()
        );
    }

    println!();
    println!("{:<8} {:<16} URL", "API", "NAME");
    for region in ApiRegion::ALL {
        println!(
            "{:<8} {:<16} {}",
            region.key(),
            region.name(),
            region.endpoint()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_request_prefers_cdn_then_official() {
        assert_eq!(
            try_order(Mirror::GitHub),
            vec![Mirror::GitHub, Mirror::JsDelivr, Mirror::Official]
        );
    }

    #[test]
    fn other_requests_fall_back_to_github_first() {
        assert_eq!(
            try_order(Mirror::Official),
            vec![Mirror::Official, Mirror::GitHub, Mirror::JsDelivr]
        );
        assert_eq!(
            try_order(Mirror::JsDelivr),
            vec![Mirror::JsDelivr, Mirror::GitHub, Mirror::Official]
        );
    }

    #[test]
    fn try_order_has_no_duplicates() {
        for mirror in Mirror::ALL {
            let order = try_order(mirror);
            assert_eq!(order.len(), 3);
            for m in Mirror::ALL {
                assert!(order.contains(&m));
            }
        }
    }

    #[test]
    fn retry_order_ends_with_primary() {
        assert_eq!(
            retry_order(Mirror::Official),
            vec![Mirror::GitHub, Mirror::JsDelivr, Mirror::Official]
        );
        assert_eq!(
            retry_order(Mirror::JsDelivr),
            vec![Mirror::Official, Mirror::GitHub, Mirror::JsDelivr]
        );
    }

    #[test]
    fn parse_keys() {
        assert_eq!("gh".parse::<Mirror>().unwrap(), Mirror::GitHub);
        assert_eq!("jsd".parse::<Mirror>().unwrap(), Mirror::JsDelivr);
        assert!("npm".parse::<Mirror>().is_err());
    }

    #[test]
    fn base_urls_end_with_slash() {
        for m in Mirror::ALL {
            assert!(m.base_url().ends_with('/'));
        }
    }
}
