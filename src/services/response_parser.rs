//! Strict-shape parsing of classifier replies.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::errors::ResponseError;
use crate::domain::models::{Classification, Taxonomy};

/// Strip markdown fences and surrounding prose, leaving the JSON payload.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    // First opener that starts a complete object or array of objects;
    // bracketed asides like `[1]` are skipped.
    for (open, _) in trimmed.match_indices(['{', '[']) {
        let rest = &trimmed[open..];
        let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            if is_payload(&value) {
                return &rest[..values.byte_offset()];
            }
        }
    }
    trimmed
}

fn is_payload(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().all(Value::is_object),
        _ => false,
    }
}

/// Parse a taxonomy extraction reply: `{"domains": [...]}`.
pub fn parse_taxonomy(text: &str) -> Result<Taxonomy, ResponseError> {
    let taxonomy: Taxonomy = serde_json::from_str(extract_json(text))?;

    if taxonomy.is_empty() {
        return Err(ResponseError::Malformed("taxonomy has no domains".to_string()));
    }
    for (position, domain) in taxonomy.domains.iter().enumerate() {
        if domain.name.trim().is_empty() {
            return Err(ResponseError::EmptyName {
                field: "domain",
                position,
            });
        }
        if let Some(position) = domain.features.iter().position(|f| f.name.trim().is_empty()) {
            return Err(ResponseError::EmptyName {
                field: "feature",
                position,
            });
        }
    }

    Ok(taxonomy)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchReply {
    Bare(Vec<Classification>),
    Wrapped {
        #[serde(alias = "results", alias = "tests")]
        classifications: Vec<Classification>,
    },
}

/// Parse a batch reply: one `{domain, feature}` per requested test, in
/// request order. Either a bare array or `{"classifications": [...]}`.
pub fn parse_batch(text: &str, expected: usize) -> Result<Vec<Classification>, ResponseError> {
    let reply: BatchReply = serde_json::from_str(extract_json(text))?;
    let classifications = match reply {
        BatchReply::Bare(items) | BatchReply::Wrapped { classifications: items } => items,
    };

    for (position, item) in classifications.iter().enumerate() {
        if item.domain.trim().is_empty() {
            return Err(ResponseError::EmptyName {
                field: "domain",
                position,
            });
        }
        if item.feature.trim().is_empty() {
            return Err(ResponseError::EmptyName {
                field: "feature",
                position,
            });
        }
    }

    if classifications.len() != expected {
        return Err(ResponseError::CountMismatch {
            expected,
            actual: classifications.len(),
        });
    }

    Ok(classifications
        .into_iter()
        .map(|c| Classification::new(c.domain.trim(), c.feature.trim()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let text = r#"[{"domain":"Auth","feature":"Login"},{"domain":"Auth","feature":" Logout "}]"#;
        let parsed = parse_batch(text, 2).unwrap();
        assert_eq!(parsed[1], Classification::new("Auth", "Logout"));
    }

    #[test]
    fn test_parse_fenced_wrapped_object() {
        let text = "Here you go:\n```json\n{\"classifications\":[{\"domain\":\"Db\",\"feature\":\"Pool\"}]}\n```\n";
        let parsed = parse_batch(text, 1).unwrap();
        assert_eq!(parsed[0].domain, "Db");
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let text = "Sure! [{\"domain\":\"Db\",\"feature\":\"Pool\"}] Hope that helps.";
        assert_eq!(parse_batch(text, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_bracketed_aside_before_payload() {
        let text = "Note [1]: see below.\n[{\"domain\":\"Db\",\"feature\":\"Pool\"}] (per [2])";
        let parsed = parse_batch(text, 1).unwrap();
        assert_eq!(parsed[0], Classification::new("Db", "Pool"));

        let text = "Domains {see notes} follow: {\"domains\":[{\"name\":\"Search\",\"features\":[]}]}";
        assert_eq!(parse_taxonomy(text).unwrap().domains[0].name, "Search");
    }

    #[test]
    fn test_count_mismatch() {
        let text = r#"[{"domain":"Auth","feature":"Login"}]"#;
        assert_eq!(
            parse_batch(text, 3).unwrap_err(),
            ResponseError::CountMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_names_rejected() {
        let text = r#"[{"domain":"Auth","feature":"Login"},{"domain":"","feature":"x"}]"#;
        assert_eq!(
            parse_batch(text, 2).unwrap_err(),
            ResponseError::EmptyName {
                field: "domain",
                position: 1
            }
        );

        let text = r#"[{"domain":"Auth","feature":"  "}]"#;
        assert!(matches!(
            parse_batch(text, 1).unwrap_err(),
            ResponseError::EmptyName { field: "feature", .. }
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_batch("I cannot help with that.", 1).unwrap_err(),
            ResponseError::Malformed(_)
        ));
    }

    #[test]
    fn test_parse_taxonomy() {
        let text = r#"```json
{"domains":[{"name":"Authentication","description":"Login flows","fileIndices":[0],
  "features":[{"name":"Login","description":"","fileIndices":[0]}]}]}
```"#;
        let taxonomy = parse_taxonomy(text).unwrap();
        assert_eq!(taxonomy.domains[0].features[0].name, "Login");
    }

    #[test]
    fn test_parse_taxonomy_rejects_empty() {
        assert!(parse_taxonomy(r#"{"domains":[]}"#).is_err());
        assert!(matches!(
            parse_taxonomy(r#"{"domains":[{"name":"A","features":[{"name":""}]}]}"#).unwrap_err(),
            ResponseError::EmptyName { field: "feature", .. }
        ));
    }
}
