//! Deterministic, non-AI classification from file-path structure.
//!
//! Used when taxonomy extraction fails and as the last step of the batch
//! fallback chain, so every test always lands somewhere.

use std::collections::BTreeMap;

use crate::domain::models::{
    AssignmentResult, Classification, Phase1Input, TestRef, Taxonomy, TaxonomyDomain,
    TaxonomyFeature,
};

/// Domain and feature for files with no meaningful directory.
pub const CATCH_ALL_NAME: &str = "General";

/// Directory names that hold tests without saying anything about them.
const CONTAINER_DIRS: &[&str] = &[
    "src", "lib", "libs", "test", "tests", "spec", "specs", "__tests__", "pkg", "internal",
    "app", "source", "main", "java", "kotlin", "unit", "t",
];

/// Human-readable domain name for well-known directory names.
fn known_domain(segment: &str) -> Option<&'static str> {
    let name = match segment {
        "auth" | "authn" | "authz" | "authentication" | "login" | "session" | "sessions" => {
            "Authentication"
        }
        "db" | "database" | "databases" | "sql" | "migrations" | "repository" | "repositories" => {
            "Database"
        }
        "api" | "apis" | "rest" | "graphql" | "rpc" | "grpc" => "API",
        "http" | "server" | "handlers" | "routes" | "controllers" | "middleware" => "HTTP",
        "ui" | "components" | "views" | "pages" | "frontend" | "web" => "User Interface",
        "user" | "users" | "accounts" | "account" | "profile" | "profiles" => "User Management",
        "billing" | "payment" | "payments" | "invoices" | "subscriptions" => "Billing",
        "config" | "configuration" | "settings" => "Configuration",
        "cache" | "caching" => "Caching",
        "storage" | "store" | "files" | "uploads" => "Storage",
        "util" | "utils" | "helpers" | "common" | "shared" => "Utilities",
        "models" | "model" | "entities" | "domain" => "Data Models",
        "notifications" | "notification" | "email" | "mail" | "sms" => "Notifications",
        "search" | "indexing" => "Search",
        "admin" => "Administration",
        "cli" | "cmd" | "commands" => "Command Line",
        "queue" | "queues" | "jobs" | "workers" | "worker" => "Background Jobs",
        "security" | "crypto" => "Security",
        "integration" | "integrations" => "Integrations",
        "e2e" | "end_to_end" | "acceptance" => "End-to-End",
        _ => return None,
    };
    Some(name)
}

/// Path split into directory segments and file name.
fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    let file = segments.pop().unwrap_or("");
    (segments, file)
}

/// `user_profile-settings` → `User Profile Settings`, `UserService` → `User Service`.
pub fn humanize(raw: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in raw.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(String::as_str)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Domain name for a test file path.
pub fn domain_for_path(path: &str) -> String {
    let (dirs, _) = split_path(path);
    let meaningful = dirs
        .iter()
        .find(|segment| !CONTAINER_DIRS.contains(&segment.to_lowercase().as_str()));

    match meaningful {
        None => CATCH_ALL_NAME.to_string(),
        Some(segment) => {
            let lowered = segment.to_lowercase();
            match known_domain(&lowered) {
                Some(name) => name.to_string(),
                None => {
                    let name = humanize(segment);
                    if name.is_empty() {
                        CATCH_ALL_NAME.to_string()
                    } else {
                        name
                    }
                }
            }
        }
    }
}

/// Feature name for a test file path: the file stem without test affixes.
pub fn feature_for_path(path: &str) -> String {
    let (_, file) = split_path(path);
    let mut stem = file.split('.').next().unwrap_or("");

    for suffix in ["_test", "_tests", "_spec", "-test", "-spec", "Tests", "Test", "Spec", "IT"] {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            if !stripped.is_empty() {
                stem = stripped;
                break;
            }
        }
    }
    for prefix in ["test_", "Test", "test-"] {
        if let Some(stripped) = stem.strip_prefix(prefix) {
            // `Testing` is a word, `TestLogin` is a prefixed name.
            let boundary = prefix != "Test" || stripped.starts_with(char::is_uppercase);
            if !stripped.is_empty() && boundary {
                stem = stripped;
                break;
            }
        }
    }

    let name = humanize(stem);
    if name.is_empty() {
        CATCH_ALL_NAME.to_string()
    } else {
        name
    }
}

/// Path-based verdict for a single test.
pub fn classify_test(test: &TestRef) -> Classification {
    Classification::new(domain_for_path(&test.file_path), feature_for_path(&test.file_path))
}

/// Path-based assignments for a set of tests, grouped by `(domain, feature)`
/// in alphabetical order.
pub fn heuristic_assignments(tests: &[TestRef]) -> Vec<AssignmentResult> {
    let mut grouped: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for test in tests {
        let verdict = classify_test(test);
        grouped
            .entry((verdict.domain, verdict.feature))
            .or_default()
            .push(test.index);
    }
    grouped
        .into_iter()
        .map(|((domain, feature), test_indices)| AssignmentResult {
            domain,
            feature,
            test_indices,
        })
        .collect()
}

/// Path-based taxonomy for a whole input. Domains and features are sorted
/// alphabetically so identical path lists always produce identical output.
pub fn heuristic_taxonomy(input: &Phase1Input) -> Taxonomy {
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<usize>>> = BTreeMap::new();

    for (file_index, file) in input.files.iter().enumerate() {
        grouped
            .entry(domain_for_path(&file.path))
            .or_default()
            .entry(feature_for_path(&file.path))
            .or_default()
            .push(file_index);
    }

    let domains = grouped
        .into_iter()
        .map(|(domain, features)| {
            let mut file_indices: Vec<usize> = features.values().flatten().copied().collect();
            file_indices.sort_unstable();
            TaxonomyDomain {
                description: format!("Tests grouped by path under {domain}"),
                name: domain,
                file_indices,
                features: features
                    .into_iter()
                    .map(|(name, file_indices)| TaxonomyFeature {
                        name,
                        description: String::new(),
                        file_indices,
                    })
                    .collect(),
            }
        })
        .collect();

    Taxonomy::new(domains)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_directories_map_to_readable_names() {
        assert_eq!(domain_for_path("auth/login_test.go"), "Authentication");
        assert_eq!(domain_for_path("src/db/pool_test.go"), "Database");
        assert_eq!(domain_for_path("tests/api/v1/test_users.py"), "API");
    }

    #[test]
    fn test_unknown_directory_is_capitalized() {
        assert_eq!(domain_for_path("inventory/stock_test.go"), "Inventory");
        assert_eq!(domain_for_path("src/order_history/x.rs"), "Order History");
    }

    #[test]
    fn test_root_level_and_container_only_go_to_catch_all() {
        assert_eq!(domain_for_path("main_test.go"), CATCH_ALL_NAME);
        assert_eq!(domain_for_path("tests/test_main.py"), CATCH_ALL_NAME);
        assert_eq!(domain_for_path("./src/lib/x_test.go"), CATCH_ALL_NAME);
    }

    #[test]
    fn test_windows_separators() {
        assert_eq!(domain_for_path(r"src\auth\LoginTest.java"), "Authentication");
        assert_eq!(feature_for_path(r"src\auth\LoginTest.java"), "Login");
    }

    #[test]
    fn test_feature_strips_test_affixes() {
        assert_eq!(feature_for_path("auth/login_test.go"), "Login");
        assert_eq!(feature_for_path("tests/test_user_profile.py"), "User Profile");
        assert_eq!(feature_for_path("web/Button.spec.tsx"), "Button");
        assert_eq!(feature_for_path("svc/UserServiceTest.java"), "User Service");
        assert_eq!(feature_for_path("svc/test.go"), "Test");
        assert_eq!(feature_for_path("svc/Testing.java"), "Testing");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("user_profile-settings"), "User Profile Settings");
        assert_eq!(humanize("HTTPServer"), "HTTPServer");
        assert_eq!(humanize("v2api"), "V2api");
        assert_eq!(humanize("___"), "");
    }

    #[test]
    fn test_heuristic_taxonomy_is_sorted_and_deterministic() {
        let input = Phase1Input::from_files(
            "a",
            "go",
            vec![
                ("payments/refund_test.go", vec!["TestRefund"]),
                ("auth/login_test.go", vec!["TestLogin"]),
                ("auth/logout_test.go", vec!["TestLogout"]),
                ("main_test.go", vec!["TestMain"]),
            ],
        );

        let first = heuristic_taxonomy(&input);
        let second = heuristic_taxonomy(&input);
        assert_eq!(first, second);

        let names: Vec<&str> = first.domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Authentication", "Billing", "General"]);

        let auth = &first.domains[0];
        assert_eq!(auth.file_indices, vec![1, 2]);
        assert_eq!(auth.features.len(), 2);
        assert_eq!(auth.features[0].name, "Login");
    }

    #[test]
    fn test_heuristic_assignments_group_by_pair() {
        let input = Phase1Input::from_files(
            "a",
            "go",
            vec![
                ("auth/login_test.go", vec!["TestA", "TestB"]),
                ("auth/logout_test.go", vec!["TestC"]),
            ],
        );
        let assignments = heuristic_assignments(&input.tests());
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].feature, "Login");
        assert_eq!(assignments[0].test_indices, vec![0, 1]);
    }

    #[test]
    fn test_classify_test() {
        let test = TestRef {
            index: 0,
            file_path: "cache/lru_test.go".into(),
            name: "TestEvict".into(),
        };
        assert_eq!(classify_test(&test), Classification::new("Caching", "Lru"));
    }
}
