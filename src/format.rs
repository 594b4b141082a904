//! Quote rendering for stdout and export files.

use std::str::FromStr;

use crate::models::Quote;

/// Output encoding selected with `--encode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown encoding '{}', expected text or json",
                other
            )),
        }
    }
}

/// Attribution value as stored, or `None` for missing, blank, or literal
/// `"null"`.
fn attribution(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty() && *v != "null")
}

/// Render a quote as one line of text, optionally with its attribution.
pub fn render_text(quote: &Quote, include_source: bool) -> String {
    let text = quote.text();
    if !include_source {
        return text.to_string();
    }

    match (
        attribution(quote.from_who()),
        attribution(quote.from()),
    ) {
        (Some(who), Some(from)) => format!("{} ——{}「{}」", text, who, from),
        (Some(who), None) => format!("{} ——{}", text, who),
        (None, Some(from)) => format!("{} ——「{}」", text, from),
        (None, None) => text.to_string(),
    }
}

/// Pretty-printed JSON of the full record, non-ASCII kept literal.
pub fn render_json(quote: &Quote) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(quote)
}

pub fn render(quote: &Quote, format: OutputFormat, include_source: bool) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(quote, include_source)),
        OutputFormat::Json => render_json(quote),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(value: serde_json::Value) -> Quote {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn null_author_is_dropped() {
        let q = quote(serde_json::json!({"hitokoto": "foo", "from_who": "null", "from": "bar"}));
        assert_eq!(render_text(&q, true), "foo ——「bar」");
    }

    #[test]
    fn full_attribution() {
        let q = quote(serde_json::json!({"hitokoto": "foo", "from_who": "me", "from": "bar"}));
        assert_eq!(render_text(&q, true), "foo ——me「bar」");
    }

    #[test]
    fn author_only_and_blank_source() {
        let q = quote(serde_json::json!({"hitokoto": "foo", "from_who": "me", "from": "  "}));
        assert_eq!(render_text(&q, true), "foo ——me");
    }

    #[test]
    fn attribution_is_printed_as_stored() {
        let q = quote(serde_json::json!({"hitokoto": "foo", "from_who": " me ", "from": "bar "}));
        assert_eq!(render_text(&q, true), "foo —— me 「bar 」");
    }

    #[test]
    fn json_output_is_the_record_unchanged() {
        let raw = r#"{"id":1,"uuid":"u1","hitokoto":"x","type":"a"}"#;
        let q: Quote = serde_json::from_str(raw).unwrap();
        let out: serde_json::Value = serde_json::from_str(&render_json(&q).unwrap()).unwrap();
        assert_eq!(out, serde_json::from_str::<serde_json::Value>(raw).unwrap());
        assert!(out.get("from").is_none());
    }

    #[test]
    fn no_attribution_or_disabled() {
        let q = quote(serde_json::json!({"hitokoto": "foo", "from_who": null}));
        assert_eq!(render_text(&q, true), "foo");
        let q = quote(serde_json::json!({"hitokoto": "foo", "from_who": "me", "from": "bar"}));
        assert_eq!(render_text(&q, false), "foo");
    }

    #[test]
    fn json_keeps_extra_fields_and_unicode() {
        let q = quote(serde_json::json!({"id": 7, "hitokoto": "你好", "creator": "x"}));
        let out = render_json(&q).unwrap();
        assert!(out.contains("你好"));
        assert!(out.contains("\"creator\": \"x\""));
    }

    #[test]
    fn parse_format() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
