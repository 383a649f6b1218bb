//! Typed accessors over the site's unversioned JSON payloads
//!
//! Each accessor looks a collection up by key anywhere in the document and
//! degrades to an empty result when the key is missing, null, or shaped
//! differently than expected.

use crate::model::Amenity;
use serde_json::Value;

/// Amenities collection in the page-embedded state
pub const ORGANIZED_PROPERTIES_KEY: &str = r#"organizedProperties({"clientPlatform":"WWW"})"#;

/// Highlights collection in the auxiliary business document
pub const BUSINESS_HIGHLIGHTS_KEY: &str = "businessHighlights";

/// Related searches collection in the page-embedded state
pub const ASSOCIATED_SEARCHES_KEY: &str =
    r#"associatedSearchesV2({"type":"people_found_biz_search_type_v1"})"#;

/// Finds the first value stored under `key` at any depth
///
/// Objects are checked for the key before their children are searched, and
/// children are visited in document order.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|child| find_key(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
        _ => None,
    }
}

/// `[{ "properties": [{ "displayText", "isActive" }, ...] }, ...]` → amenities
/// of the first group
pub fn amenities(state: &Value) -> Vec<Amenity> {
    find_key(state, ORGANIZED_PROPERTIES_KEY)
        .and_then(Value::as_array)
        .and_then(|groups| groups.first())
        .and_then(|group| group.get("properties"))
        .and_then(Value::as_array)
        .map(|properties| {
            properties
                .iter()
                .filter_map(|p| {
                    Some(Amenity {
                        name: p.get("displayText")?.as_str()?.to_string(),
                        available: p.get("isActive")?.as_bool()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `[{ "title": ... }, ...]` → highlight titles
pub fn highlights(props: &Value) -> Vec<String> {
    string_field_list(find_key(props, BUSINESS_HIGHLIGHTS_KEY), "title")
}

/// `[{ "searchPhrase": ... }, ...]` → related search phrases
pub fn related_search_terms(state: &Value) -> Vec<String> {
    string_field_list(find_key(state, ASSOCIATED_SEARCHES_KEY), "searchPhrase")
}

fn string_field_list(collection: Option<&Value>, field: &str) -> Vec<String> {
    collection
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field)?.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
