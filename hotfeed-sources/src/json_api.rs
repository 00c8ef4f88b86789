//! Sources backed by a JSON HTTP endpoint.
//!
//! The endpoint's response is walked down `items_path` to an array; each
//! element becomes one [`FetchedItem`] by reading the configured fields.

use async_trait::async_trait;
use hotfeed_core::FetchedItem;
use hotfeed_fetch::{FetchError, FetchKind, Fetchable, HttpClient, http::header_map};
use hotfeed_store::SourceConfig;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, instrument};

/// A [`Fetchable`] configured entirely by a [`SourceConfig`].
#[derive(Debug, Clone)]
pub struct JsonApiSource {
    config: SourceConfig,
    http: HttpClient,
    headers: HeaderMap,
}

impl JsonApiSource {
    /// Creates a source sharing `http`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured header is not a valid HTTP header.
    pub fn new(config: SourceConfig, http: HttpClient) -> Result<Self, FetchError> {
        let headers = header_map(
            config
                .headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )?;
        Ok(Self {
            config,
            http,
            headers,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

#[async_trait]
impl Fetchable for JsonApiSource {
    fn kind(&self) -> FetchKind {
        FetchKind::Api
    }

    #[instrument(skip(self), fields(source = %self.config.id))]
    async fn fetch(&self) -> Result<Vec<FetchedItem>, FetchError> {
        let body: Value = self
            .http
            .get_json(&self.config.url, self.headers.clone())
            .await?;
        let items = parse_items(&self.config, &body)?;
        debug!(count = items.len(), "Parsed items");
        Ok(items)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Extracts items from a response body.
///
/// Elements without a usable title are skipped.
///
/// # Errors
///
/// Returns [`FetchError::InvalidResponse`] if `items_path` does not lead
/// to an array.
pub fn parse_items(config: &SourceConfig, body: &Value) -> Result<Vec<FetchedItem>, FetchError> {
    let array = walk(body, &config.items_path)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FetchError::InvalidResponse(format!(
                "no array at '{}' in response from {}",
                config.items_path, config.url
            ))
        })?;

    Ok(array.iter().filter_map(|entry| to_item(config, entry)).collect())
}

/// Follows a dotted path. Numeric segments index arrays.
fn walk<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => current.get(segment),
        })
}

/// Renders a scalar as text. Objects, arrays and null yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_text(entry: &Value, field: &str) -> Option<String> {
    walk(entry, field).and_then(scalar_text)
}

fn to_item(config: &SourceConfig, entry: &Value) -> Option<FetchedItem> {
    let title = field_text(entry, &config.title_field).filter(|t| !t.is_empty())?;

    let url = match config.url_template {
        Some(ref template) => render_template(template, entry),
        None => field_text(entry, &config.url_field).unwrap_or_default(),
    };

    let mut item = FetchedItem::new(title, url);
    if let Some(info) = config
        .info_field
        .as_deref()
        .and_then(|field| field_text(entry, field))
    {
        item = item.with_info(info);
    }
    for field in &config.extra_fields {
        if let Some(value) = walk(entry, field) {
            item = item.with_extra(field.clone(), value.clone());
        }
    }
    Some(item)
}

/// Replaces `{field}` placeholders with the URL-encoded field value.
/// Unknown fields render as empty text.
fn render_template(template: &str, entry: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        let field = &rest[open + 1..close];
        let value = field_text(entry, field).unwrap_or_default();
        out.extend(url::form_urlencoded::byte_serialize(value.as_bytes()));
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weibo_config() -> SourceConfig {
        let mut config =
            SourceConfig::new("weibo", "Weibo", "https://weibo.com/ajax/side/hotSearch");
        config.items_path = "data.realtime".to_string();
        config.title_field = "word".to_string();
        config.url_template = Some("https://s.weibo.com/weibo?q={word}".to_string());
        config.info_field = Some("num".to_string());
        config.extra_fields = vec!["label_name".to_string()];
        config
    }

    #[test]
    fn test_parse_nested_items_path() {
        let body = json!({
            "ok": 1,
            "data": {"realtime": [
                {"word": "Rust 2024", "num": 123_456, "label_name": "hot"},
                {"word": "", "num": 1},
                {"num": 2},
                {"word": "tokio 2", "num": 99}
            ]}
        });

        let items = parse_items(&weibo_config(), &body).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Rust 2024");
        assert_eq!(items[0].url, "https://s.weibo.com/weibo?q=Rust+2024");
        assert_eq!(items[0].info(), Some("123456"));
        assert_eq!(items[0].extra["label_name"], json!("hot"));
        assert!(!items[1].extra.contains_key("label_name"));
    }

    #[test]
    fn test_parse_root_array_with_url_field() {
        let config = SourceConfig::new("hn", "Hacker News", "https://hn.example.com/top.json");
        let body = json!([
            {"title": "Show HN", "url": "https://a.test"},
            {"title": "Ask HN"}
        ]);

        let items = parse_items(&config, &body).unwrap();
        assert_eq!(items[0].url, "https://a.test");
        assert_eq!(items[1].url, "");
        assert_eq!(items[1].info(), None);
    }

    #[test]
    fn test_parse_missing_array_is_invalid_response() {
        let body = json!({"data": {"realtime": null}});
        assert!(matches!(
            parse_items(&weibo_config(), &body),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_walk_indexes_arrays() {
        let body = json!({"data": [{"list": [1, 2]}]});
        assert_eq!(walk(&body, "data.0.list.1"), Some(&json!(2)));
        assert_eq!(walk(&body, "data.x"), None);
        assert_eq!(walk(&body, ""), Some(&body));
    }

    #[test]
    fn test_render_template() {
        let entry = json!({"id": 42, "q": "a&b"});
        assert_eq!(
            render_template("https://x.test/{id}?q={q}&z={missing}", &entry),
            "https://x.test/42?q=a%26b&z="
        );
        assert_eq!(render_template("https://x.test/{open", &entry), "https://x.test/{open");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut config = weibo_config();
        config.headers.insert("Bad Header".to_string(), "v".to_string());
        let http = HttpClient::new().unwrap();
        assert!(JsonApiSource::new(config, http).is_err());
    }
}
