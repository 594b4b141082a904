//! Remote hitokoto API client.
//!
//! Two public endpoints serve the same API. Without an explicit region the
//! international endpoint is tried first and the China endpoint second.

use reqwest::Url;
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{Category, Quote};
use crate::query::LengthRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRegion {
    International,
    China,
}

impl ApiRegion {
    pub const ALL: [ApiRegion; 2] = [ApiRegion::International, ApiRegion::China];

    pub fn key(self) -> &'static str {
        match self {
            ApiRegion::International => "in",
            ApiRegion::China => "cn",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ApiRegion::International => "international",
            ApiRegion::China => "China",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            ApiRegion::International => "https://international.v1.hitokoto.cn/",
            ApiRegion::China => "https://v1.hitokoto.cn/",
        }
    }
}

impl fmt::Display for ApiRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ApiRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApiRegion::ALL
            .into_iter()
            .find(|r| r.key() == s.trim())
            .ok_or_else(|| format!("unknown API '{}', expected in or cn", s))
    }
}

/// Endpoints to try, in order.
pub fn endpoints_for(region: Option<ApiRegion>) -> Vec<ApiRegion> {
    match region {
        Some(region) => vec![region],
        None => ApiRegion::ALL.to_vec(),
    }
}

/// Request URL with the `c`, `min_length` and `max_length` parameters that
/// are set.
pub fn build_url(
    region: ApiRegion,
    category: Option<Category>,
    range: LengthRange,
) -> Result<Url, ApiError> {
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(category) = category {
        params.push(("c", category.to_string()));
    }
    if let Some(min) = range.min {
        params.push(("min_length", min.to_string()));
    }
    if let Some(max) = range.max {
        params.push(("max_length", max.to_string()));
    }

    let mut url = Url::parse(region.endpoint()).map_err(|e| ApiError::Url(e.to_string()))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(&params);
    }
    Ok(url)
}

/// Fetch one quote, falling back across endpoints.
pub fn fetch_quote(
    client: &dyn HttpClient,
    region: Option<ApiRegion>,
    category: Option<Category>,
    range: LengthRange,
) -> Result<Quote, ApiError> {
    let mut last = String::from("no endpoint was attempted");

    for region in endpoints_for(region) {
        let url = build_url(region, category, range)?;
        tracing::debug!("GET {}", url);

        let body = match client.get(url.as_str()) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("API call failed: {} - {}", url, e);
                last = format!("{}: {}", region.name(), e);
                continue;
            }
        };

        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(value) => match Quote::from_value(value) {
                Some(quote) => {
                    tracing::info!("quote received from {}", region.endpoint());
                    return Ok(quote);
                }
                None => {
                    tracing::error!("API response from {} is not an object", url);
                    last = format!("{}: response is not a JSON object", region.name());
                }
            },
            Err(e) => {
                tracing::error!("invalid JSON from {}: {}", url, e);
                last = format!("{}: invalid JSON: {}", region.name(), e);
            }
        }
    }

    Err(ApiError::AllEndpointsFailed { last })
}
