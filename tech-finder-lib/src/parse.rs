//! Normalization of technology lookup responses.
//!
//! The response schema is owned by the remote API, so nothing here trusts
//! it. The raw JSON document is classified into a `LookupOutcome` and each
//! element of `data` is read field by field.

use crate::types::{Category, LookupOutcome, ParsedTechnology, Technology};
use serde_json::Value;

/// Classify a raw lookup response.
///
/// # Arguments
///
/// * `response` - The JSON document returned by the lookup client
///
/// # Returns
///
/// A `LookupOutcome` describing the response shape.
pub fn parse_response(response: &Value) -> LookupOutcome {
    let Some(object) = response.as_object() else {
        return LookupOutcome::InvalidResponse;
    };

    match object.get("data").and_then(Value::as_array) {
        None => LookupOutcome::NoData,
        Some(items) if items.is_empty() => LookupOutcome::Empty,
        Some(items) => LookupOutcome::Technologies(items.iter().map(parse_technology).collect()),
    }
}

/// Parse one element of the `data` array.
pub fn parse_technology(item: &Value) -> ParsedTechnology {
    let Some(fields) = item.as_object() else {
        return ParsedTechnology::Malformed;
    };

    let category = fields
        .get("categories")
        .and_then(Value::as_object)
        .map(|categories| Category {
            id: categories.get("id").and_then(|id| match id {
                Value::Number(n) => Some(n.clone()),
                _ => None,
            }),
            slug: categories.get("slug").and_then(text_field),
            name: categories.get("name").and_then(text_field),
        });

    ParsedTechnology::Known(Technology {
        slug: fields.get("slug").and_then(text_field),
        name: fields.get("name").and_then(text_field),
        icon: fields.get("icon").and_then(text_field),
        website: fields.get("website").and_then(text_field),
        category,
    })
}

/// Read a loosely typed scalar as text.
///
/// Empty strings, zero, `false` and `null` count as absent. Numbers and
/// `true` are rendered as text. Arrays and objects are not scalar text and
/// are treated as absent.
fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_is_invalid() {
        assert_eq!(parse_response(&json!(null)), LookupOutcome::InvalidResponse);
        assert_eq!(parse_response(&json!("oops")), LookupOutcome::InvalidResponse);
        assert_eq!(parse_response(&json!([1, 2])), LookupOutcome::InvalidResponse);
    }

    #[test]
    fn test_missing_or_non_array_data() {
        assert_eq!(parse_response(&json!({})), LookupOutcome::NoData);
        assert_eq!(parse_response(&json!({"data": null})), LookupOutcome::NoData);
        assert_eq!(parse_response(&json!({"data": {"slug": "x"}})), LookupOutcome::NoData);
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(parse_response(&json!({"data": []})), LookupOutcome::Empty);
    }

    #[test]
    fn test_full_technology() {
        let response = json!({
            "data": [{
                "slug": "react",
                "name": "React",
                "icon": "React.svg",
                "website": "https://reactjs.org",
                "categories": {"id": 1, "slug": "js-framework", "name": "JS Framework"}
            }]
        });

        let LookupOutcome::Technologies(items) = parse_response(&response) else {
            panic!("expected technologies");
        };
        assert_eq!(items.len(), 1);
        let ParsedTechnology::Known(tech) = &items[0] else {
            panic!("expected a known technology");
        };
        assert_eq!(tech.slug.as_deref(), Some("react"));
        assert_eq!(tech.name.as_deref(), Some("React"));
        assert_eq!(tech.icon.as_deref(), Some("React.svg"));
        assert_eq!(tech.website.as_deref(), Some("https://reactjs.org"));
        let category = tech.category.as_ref().unwrap();
        assert_eq!(category.id, Some(serde_json::Number::from(1)));
        assert_eq!(category.slug.as_deref(), Some("js-framework"));
        assert_eq!(category.name.as_deref(), Some("JS Framework"));
    }

    #[test]
    fn test_non_object_elements_are_malformed() {
        let response = json!({"data": [42, {"name": "Nginx"}, null, "x"]});
        let LookupOutcome::Technologies(items) = parse_response(&response) else {
            panic!("expected technologies");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], ParsedTechnology::Malformed);
        assert!(matches!(items[1], ParsedTechnology::Known(_)));
        assert_eq!(items[2], ParsedTechnology::Malformed);
        assert_eq!(items[3], ParsedTechnology::Malformed);
    }

    #[test]
    fn test_loose_field_types() {
        let tech = parse_technology(&json!({
            "slug": "",
            "name": 5,
            "icon": false,
            "website": ["a"],
            "categories": {"id": "7", "slug": 0, "name": true}
        }));
        let ParsedTechnology::Known(tech) = tech else {
            panic!("expected a known technology");
        };
        assert_eq!(tech.slug, None);
        assert_eq!(tech.name.as_deref(), Some("5"));
        assert_eq!(tech.icon, None);
        assert_eq!(tech.website, None);
        let category = tech.category.unwrap();
        // A string id is not a number
        assert_eq!(category.id, None);
        assert_eq!(category.slug, None);
        assert_eq!(category.name.as_deref(), Some("true"));
    }

    #[test]
    fn test_categories_must_be_object() {
        let ParsedTechnology::Known(tech) =
            parse_technology(&json!({"name": "PHP", "categories": "lang"}))
        else {
            panic!("expected a known technology");
        };
        assert_eq!(tech.category, None);
    }
}
