//! Combines the taxonomy shape with per-batch assignments.
//!
//! Names are matched after trimming and lowercasing, so `Auth`, `auth` and
//! ` AUTH ` collapse into the first spelling seen (taxonomy spellings win).
//! Taxonomy domains come first in taxonomy order; domains and features the
//! taxonomy never named are appended in the order assignments introduced
//! them. Every test index in `0..total` is placed exactly once.

use tracing::warn;

use crate::domain::models::{
    AssignmentResult, ClassificationOutput, OutputDomain, OutputFeature, Taxonomy,
};

/// Domain and feature name for tests nothing else could place.
pub const UNCATEGORIZED: &str = "Uncategorized";

const UNCATEGORIZED_DESCRIPTION: &str = "Tests that could not be placed in a more specific domain";

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug)]
struct FeatureSlot {
    key: String,
    name: String,
    indices: Vec<usize>,
}

#[derive(Debug)]
struct DomainSlot {
    key: String,
    name: String,
    description: String,
    features: Vec<FeatureSlot>,
}

impl DomainSlot {
    fn new(name: &str, description: &str) -> Self {
        Self {
            key: normalize(name),
            name: name.trim().to_string(),
            description: description.to_string(),
            features: Vec::new(),
        }
    }

    fn feature_mut(&mut self, name: &str) -> &mut FeatureSlot {
        let key = normalize(name);
        let position = match self.features.iter().position(|f| f.key == key) {
            Some(position) => position,
            None => {
                self.features.push(FeatureSlot {
                    key,
                    name: name.trim().to_string(),
                    indices: Vec::new(),
                });
                self.features.len() - 1
            }
        };
        &mut self.features[position]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultMerger {
    default_confidence: f64,
}

impl ResultMerger {
    pub const fn new(default_confidence: f64) -> Self {
        Self { default_confidence }
    }

    pub fn merge<'a>(
        &self,
        taxonomy: Option<&Taxonomy>,
        assignments: impl IntoIterator<Item = &'a AssignmentResult>,
        total_tests: usize,
    ) -> ClassificationOutput {
        let Some(taxonomy) = taxonomy.filter(|t| !t.is_empty()) else {
            return self.catch_all((0..total_tests).collect());
        };

        let mut slots: Vec<DomainSlot> = Vec::new();
        for domain in &taxonomy.domains {
            let key = normalize(&domain.name);
            let position = match slots.iter().position(|s| s.key == key) {
                Some(position) => position,
                None => {
                    slots.push(DomainSlot::new(&domain.name, &domain.description));
                    slots.len() - 1
                }
            };
            for feature in &domain.features {
                slots[position].feature_mut(&feature.name);
            }
        }

        let mut placed = vec![false; total_tests];
        let mut duplicates = 0usize;
        let mut out_of_range = 0usize;

        for assignment in assignments {
            let key = normalize(&assignment.domain);
            let position = match slots.iter().position(|s| s.key == key) {
                Some(position) => position,
                None => {
                    slots.push(DomainSlot::new(&assignment.domain, ""));
                    slots.len() - 1
                }
            };
            let feature = slots[position].feature_mut(&assignment.feature);

            for &index in &assignment.test_indices {
                match placed.get_mut(index) {
                    None => out_of_range += 1,
                    Some(true) => duplicates += 1,
                    Some(slot) => {
                        *slot = true;
                        feature.indices.push(index);
                    }
                }
            }
        }

        if duplicates > 0 || out_of_range > 0 {
            warn!(duplicates, out_of_range, "Dropped test indices during merge");
        }

        let mut domains: Vec<OutputDomain> = slots
            .into_iter()
            .filter_map(|slot| self.emit(slot))
            .collect();

        let missing: Vec<usize> = placed
            .iter()
            .enumerate()
            .filter_map(|(index, &done)| (!done).then_some(index))
            .collect();

        if domains.is_empty() {
            return self.catch_all((0..total_tests).collect());
        }
        if !missing.is_empty() {
            warn!(missing = missing.len(), "Unplaced tests moved to catch-all domain");
            self.add_to_catch_all(&mut domains, missing);
        }

        ClassificationOutput { domains }
    }

    /// Drop empty features; drop the domain if nothing is left.
    fn emit(&self, slot: DomainSlot) -> Option<OutputDomain> {
        let features: Vec<OutputFeature> = slot
            .features
            .into_iter()
            .filter(|f| !f.indices.is_empty())
            .map(|mut f| {
                f.indices.sort_unstable();
                OutputFeature {
                    name: f.name,
                    confidence: self.default_confidence,
                    test_indices: f.indices,
                }
            })
            .collect();

        (!features.is_empty()).then(|| OutputDomain {
            name: slot.name,
            description: slot.description,
            confidence: self.default_confidence,
            features,
        })
    }

    fn catch_all(&self, indices: Vec<usize>) -> ClassificationOutput {
        if indices.is_empty() {
            return ClassificationOutput::default();
        }
        ClassificationOutput {
            domains: vec![self.catch_all_domain(indices)],
        }
    }

    fn catch_all_domain(&self, indices: Vec<usize>) -> OutputDomain {
        OutputDomain {
            name: UNCATEGORIZED.to_string(),
            description: UNCATEGORIZED_DESCRIPTION.to_string(),
            confidence: self.default_confidence,
            features: vec![OutputFeature {
                name: UNCATEGORIZED.to_string(),
                confidence: self.default_confidence,
                test_indices: indices,
            }],
        }
    }

    fn add_to_catch_all(&self, domains: &mut Vec<OutputDomain>, missing: Vec<usize>) {
        let key = normalize(UNCATEGORIZED);
        let Some(domain) = domains.iter_mut().find(|d| normalize(&d.name) == key) else {
            domains.push(self.catch_all_domain(missing));
            return;
        };

        match domain.features.iter_mut().find(|f| normalize(&f.name) == key) {
            Some(feature) => {
                feature.test_indices.extend(missing);
                feature.test_indices.sort_unstable();
            }
            None => domain.features.push(OutputFeature {
                name: UNCATEGORIZED.to_string(),
                confidence: self.default_confidence,
                test_indices: missing,
            }),
        }
    }
}

impl Default for ResultMerger {
    fn default() -> Self {
        Self::new(0.7)
    }
}
