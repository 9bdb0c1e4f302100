//! Default prompt templates for taxonomy extraction and batch classification.

use std::fmt::Write as _;

use crate::domain::ports::{BatchRequest, Prompt, PromptBuilder, TaxonomyRequest};

const TAXONOMY_SYSTEM: &str = "You organise automated test suites into a functional taxonomy. \
Group files into business domains and, within each domain, into features. \
Respond with JSON only, no prose.";

const BATCH_SYSTEM: &str = "You classify automated tests into a functional taxonomy of domains \
and features. Reuse an existing domain name whenever one fits. Never leave a name empty. \
Respond with JSON only, no prose.";

/// Renders structured requests into plain prompt text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPromptBuilder;

impl PromptBuilder for DefaultPromptBuilder {
    fn taxonomy_prompt(&self, request: &TaxonomyRequest) -> Prompt {
        let mut user = format!(
            "Language: {}\n\n## Test files\n",
            request.language
        );
        for file in &request.files {
            let _ = writeln!(user, "[{}] {}", file.file_index, file.path);
            for name in &file.test_names {
                let _ = writeln!(user, "  - {name}");
            }
        }
        user.push_str(
            "\n## Output format\n\
{\"domains\":[{\"name\":\"...\",\"description\":\"...\",\"fileIndices\":[0],\
\"features\":[{\"name\":\"...\",\"description\":\"...\",\"fileIndices\":[0]}]}]}\n",
        );

        Prompt {
            system: TAXONOMY_SYSTEM.to_string(),
            user,
        }
    }

    fn batch_prompt(&self, request: &BatchRequest<'_>) -> Prompt {
        let mut user = format!("Language: {}\n\n", request.language);

        if !request.existing_domains.is_empty() {
            user.push_str("## Existing domains\n");
            for domain in request.existing_domains {
                match &domain.description {
                    Some(description) if !description.is_empty() => {
                        let _ = writeln!(user, "- {}: {}", domain.name, description);
                    }
                    _ => {
                        let _ = writeln!(user, "- {}", domain.name);
                    }
                }
            }
            user.push('\n');
        }

        user.push_str("## Tests\n");
        for (position, test) in request.tests.iter().enumerate() {
            let _ = writeln!(user, "{}. {} :: {}", position + 1, test.file_path, test.name);
        }
        let _ = write!(
            user,
            "\n## Output format\nA JSON array with exactly {} objects, one per test in the order above:\n\
[{{\"domain\":\"...\",\"feature\":\"...\"}}]\n",
            request.tests.len()
        );

        Prompt {
            system: BATCH_SYSTEM.to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DomainSummary, TestRef};
    use crate::domain::ports::TaxonomyFileSummary;

    #[test]
    fn test_batch_prompt_lists_anchors_and_tests() {
        let tests = vec![TestRef {
            index: 7,
            file_path: "auth/login_test.go".into(),
            name: "TestLogin".into(),
        }];
        let anchors = vec![DomainSummary {
            name: "Authentication".into(),
            description: Some("Sign-in flows".into()),
        }];
        let prompt = DefaultPromptBuilder.batch_prompt(&BatchRequest {
            language: "go",
            tests: &tests,
            existing_domains: &anchors,
        });

        assert!(prompt.user.contains("- Authentication: Sign-in flows"));
        assert!(prompt.user.contains("1. auth/login_test.go :: TestLogin"));
        assert!(prompt.user.contains("exactly 1 objects"));
    }

    #[test]
    fn test_taxonomy_prompt_is_deterministic() {
        let request = TaxonomyRequest {
            language: "python".into(),
            files: vec![TaxonomyFileSummary {
                file_index: 0,
                path: "tests/test_api.py".into(),
                test_names: vec!["test_get".into()],
            }],
        };
        let a = DefaultPromptBuilder.taxonomy_prompt(&request);
        let b = DefaultPromptBuilder.taxonomy_prompt(&request);
        assert_eq!(a, b);
        assert!(a.user.contains("[0] tests/test_api.py"));
    }
}
