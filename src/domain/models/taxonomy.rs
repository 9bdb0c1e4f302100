//! Shape-only taxonomy: domains and features, independent of test placement.

use serde::{Deserialize, Serialize};

/// A sub-category within a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyFeature {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Positions into `Phase1Input::files`.
    #[serde(default)]
    pub file_indices: Vec<usize>,
}

/// A top-level functional category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyDomain {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_indices: Vec<usize>,
    #[serde(default)]
    pub features: Vec<TaxonomyFeature>,
}

/// Where a taxonomy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomySource {
    /// Fresh extraction from the classifier.
    Extracted,
    /// Served from the taxonomy cache.
    Cached,
    /// Derived from file paths after extraction failed.
    Heuristic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub domains: Vec<TaxonomyDomain>,
}

impl Taxonomy {
    pub fn new(domains: Vec<TaxonomyDomain>) -> Self {
        Self { domains }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.domains.iter().map(|d| d.features.len()).sum()
    }

    /// Every domain and feature must carry a non-blank name.
    pub fn validate_names(&self) -> Result<(), String> {
        for (di, domain) in self.domains.iter().enumerate() {
            if domain.name.trim().is_empty() {
                return Err(format!("domain #{di} has an empty name"));
            }
            for (fi, feature) in domain.features.iter().enumerate() {
                if feature.name.trim().is_empty() {
                    return Err(format!(
                        "feature #{fi} of domain '{}' has an empty name",
                        domain.name
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(name: &str, features: &[&str]) -> TaxonomyDomain {
        TaxonomyDomain {
            name: name.to_string(),
            description: String::new(),
            file_indices: vec![],
            features: features
                .iter()
                .map(|f| TaxonomyFeature {
                    name: (*f).to_string(),
                    description: String::new(),
                    file_indices: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_names() {
        let ok = Taxonomy::new(vec![domain("Auth", &["Login"])]);
        assert!(ok.validate_names().is_ok());
        assert_eq!(ok.feature_count(), 1);

        let blank_domain = Taxonomy::new(vec![domain("  ", &["Login"])]);
        assert!(blank_domain.validate_names().is_err());

        let blank_feature = Taxonomy::new(vec![domain("Auth", &[""])]);
        assert!(blank_feature.validate_names().unwrap_err().contains("Auth"));
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let json = r#"{"domains":[{"name":"Billing","features":[{"name":"Invoices"}]}]}"#;
        let taxonomy: Taxonomy = serde_json::from_str(json).unwrap();
        assert_eq!(taxonomy.domains[0].features[0].name, "Invoices");
        assert!(taxonomy.domains[0].description.is_empty());
    }
}
