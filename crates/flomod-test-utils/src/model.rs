//! [`TestModel`] builder for model-file test scenarios.
//!
//! Writes canonical fixture files into a temporary directory so crate test
//! suites do not each hand-roll the fixed-format layouts.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary model directory with helper methods for test setup and
/// assertion.
///
/// # Example
///
/// ```rust,no_run
/// use flomod_test_utils::TestModel;
///
/// let model = TestModel::new();
/// let dat = model.write_dat("baseline.dat", &["1.067", "1.068"]);
/// assert!(dat.exists());
/// ```
pub struct TestModel {
    temp_dir: TempDir,
}

impl Default for TestModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TestModel {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `lines` to `name` (relative to the root), with a trailing
    /// newline, creating parent directories as needed.
    pub fn write_file(&self, name: &str, lines: &[&str]) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&path, content).unwrap();
        path
    }

    /// Read a file back as lines, without the trailing newline.
    pub fn read_file(&self, name: &str) -> Vec<String> {
        let path = self.root().join(name);
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        content
            .strip_suffix('\n')
            .unwrap_or(&content)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Write a canonical unit-collection file containing a header, one
    /// river section per label, and an initial-conditions table with one
    /// row per label.
    pub fn write_dat(&self, name: &str, labels: &[&str]) -> PathBuf {
        let lines = dat_lines(labels);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.write_file(name, &refs)
    }

    /// Assert that `name` (relative to the root) exists.
    pub fn assert_file_exists(&self, name: &str) {
        let path = self.root().join(name);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert that the file at `name` contains `content`.
    pub fn assert_file_contains(&self, name: &str, content: &str) {
        let path = self.root().join(name);
        let file_content = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        assert!(
            file_content.contains(content),
            "Expected {} to contain {:?}",
            path.display(),
            content
        );
    }
}

/// Canonical unit-collection lines: header with a node count matching the
/// label list, a river section per label, and an initial-conditions row
/// per label.
pub fn dat_lines(labels: &[&str]) -> Vec<String> {
    let mut lines = vec![
        "Fixture model".to_string(),
        "#REVISION#1".to_string(),
        format!(
            "{:>10}     0.750     0.900     0.100     0.001        12SI",
            labels.len()
        ),
    ];
    for label in labels {
        lines.push(format!("RIVER section {label}"));
        lines.push("SECTION".to_string());
        lines.push((*label).to_string());
        lines.push(String::new());
        lines.push(format!("{:>10}", 2));
        lines.push(format!("{:>10.3}{:>10.3}{:>10.3}", 0.0, 10.0, 0.035));
        lines.push(format!("{:>10.3}{:>10.3}{:>10.3}", 12.5, 10.0, 0.035));
    }
    lines.push("INITIAL CONDITIONS".to_string());
    lines.push(
        " label             flow     stage    froude  velocity     umode    ustate         z"
            .to_string(),
    );
    for label in labels {
        let mut line = format!("{label:<12}");
        for value in [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 9.5] {
            line.push_str(&format!("{value:>10.3}"));
        }
        lines.push(line);
    }
    lines
}

/// Canonical control-file lines: variables, a file reference, and a
/// scenario chain.
pub fn tcf_lines() -> Vec<String> {
    vec![
        "! fixture control file".to_string(),
        "Tutorial Model == ON".to_string(),
        "Geometry Control File == model.tgc".to_string(),
        "If Scenario == DEV | BASE".to_string(),
        "\tCell Size == 5".to_string(),
        "Else".to_string(),
        "\tCell Size == 1".to_string(),
        "End If".to_string(),
        "Start Time == 0".to_string(),
    ]
}
