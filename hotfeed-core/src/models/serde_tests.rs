//! Serialization format tests for the core models.

use serde_json::json;

use super::{FetchedItem, SourceInfo};

#[test]
fn test_item_without_extra_omits_field() {
    let item = FetchedItem::new("Title", "https://example.com/a");
    let value = serde_json::to_value(&item).unwrap();
    assert_eq!(value, json!({"title": "Title", "url": "https://example.com/a"}));
}

#[test]
fn test_item_missing_extra_defaults() {
    let item: FetchedItem =
        serde_json::from_value(json!({"title": "T", "url": "https://x"})).unwrap();
    assert!(item.extra.is_empty());
}

#[test]
fn test_item_extra_preserved() {
    let raw = json!({
        "title": "T",
        "url": "https://x",
        "extra": {"info": "99+", "rank": 3, "tags": ["a", "b"]}
    });
    let item: FetchedItem = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(item.info(), Some("99+"));
    assert_eq!(item.extra["rank"], json!(3));
    assert_eq!(serde_json::to_value(&item).unwrap(), raw);
}

#[test]
fn test_list_from_value_rejects_object() {
    assert!(FetchedItem::list_from_value(json!({"title": "T"})).is_err());
}

#[test]
fn test_list_value_conversion() {
    let items = vec![
        FetchedItem::new("A", "https://a").with_info("hot"),
        FetchedItem::new("B", "https://b"),
    ];
    let value = FetchedItem::list_to_value(&items).unwrap();
    assert!(value.is_array());
    assert_eq!(FetchedItem::list_from_value(value).unwrap(), items);
}

#[test]
fn test_source_info_home_url_optional() {
    let info: SourceInfo = serde_json::from_value(json!({"id": "zhihu", "name": "Zhihu"})).unwrap();
    assert_eq!(info.home_url, None);
    let value = serde_json::to_value(info.with_home_url("https://www.zhihu.com")).unwrap();
    assert_eq!(value["home_url"], json!("https://www.zhihu.com"));
}
