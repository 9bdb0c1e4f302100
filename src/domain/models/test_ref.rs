//! Request-scoped input model: test references grouped by file.

use serde::{Deserialize, Serialize};

/// A single extracted test identifier.
///
/// `index` is dense and zero-based within one classification request and is
/// the unit of completeness tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRef {
    pub index: usize,
    pub file_path: String,
    pub name: String,
}

/// All tests extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFile {
    pub path: String,
    pub tests: Vec<TestRef>,
}

/// Immutable input to one classification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase1Input {
    #[serde(rename = "analysisID")]
    pub analysis_id: String,
    pub language: String,
    pub files: Vec<TestFile>,
}

impl Phase1Input {
    /// Build an input from `(path, test names)` pairs, assigning dense test
    /// indices in file order.
    pub fn from_files<I, P, N>(analysis_id: impl Into<String>, language: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<N>)>,
        P: Into<String>,
        N: Into<String>,
    {
        let mut next_index = 0usize;
        let files = files
            .into_iter()
            .map(|(path, names)| {
                let path = path.into();
                let tests = names
                    .into_iter()
                    .map(|name| {
                        let test = TestRef {
                            index: next_index,
                            file_path: path.clone(),
                            name: name.into(),
                        };
                        next_index += 1;
                        test
                    })
                    .collect();
                TestFile { path, tests }
            })
            .collect();

        Self {
            analysis_id: analysis_id.into(),
            language: language.into(),
            files,
        }
    }

    /// All tests flattened in index order.
    pub fn tests(&self) -> Vec<TestRef> {
        let mut tests: Vec<TestRef> = self
            .files
            .iter()
            .flat_map(|f| f.tests.iter().cloned())
            .collect();
        tests.sort_by_key(|t| t.index);
        tests
    }

    pub fn test_count(&self) -> usize {
        self.files.iter().map(|f| f.tests.len()).sum()
    }

    /// Check that test indices form exactly `0..N` with no duplicates.
    pub fn has_dense_indices(&self) -> bool {
        let mut seen = vec![false; self.test_count()];
        for test in self.files.iter().flat_map(|f| f.tests.iter()) {
            match seen.get_mut(test.index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }
}

/// On-disk manifest accepted by the CLI: test names per file, no indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestManifest {
    #[serde(default, rename = "analysisID")]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    pub files: Vec<ManifestFile>,
}

/// One file entry of a [`TestManifest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,
    #[serde(default)]
    pub tests: Vec<String>,
}

impl TestManifest {
    pub fn into_input(self, analysis_id: impl Into<String>, language: impl Into<String>) -> Phase1Input {
        Phase1Input::from_files(
            analysis_id,
            language,
            self.files.into_iter().map(|f| (f.path, f.tests)),
        )
    }
}
