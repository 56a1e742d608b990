//! Project-scoped settings persistence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const PROJECT_FILE: &str = "project.json";
/// Section of the project data owned by this tool.
pub const SECTION: &str = "AddToSearch";
const ADD_TO: &str = "add_to";

/// Free-form project data; sections other than [`SECTION`] are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectData(pub Map<String, Value>);

impl ProjectData {
    fn section(&self) -> Map<String, Value> {
        match self.0.get(SECTION) {
            Some(Value::Object(section)) => section.clone(),
            _ => Map::new(),
        }
    }
}

/// Read/merge/write view over the [`SECTION`] of a project.
///
/// Reads prefer values written through this view; nothing reaches the project
/// until [`ProjectSettings::apply`] is called.
#[derive(Debug, Clone, Default)]
pub struct ProjectSettings {
    stored: Map<String, Value>,
    pending: Map<String, Value>,
}

impl ProjectSettings {
    /// Snapshot the settings section of `project`.
    pub fn read(project: &ProjectData) -> Self {
        Self {
            stored: project.section(),
            pending: Map::new(),
        }
    }

    /// Target aggregation document, if one is configured.
    pub fn add_to(&self) -> Option<&str> {
        non_empty_str(&self.pending, ADD_TO).or_else(|| non_empty_str(&self.stored, ADD_TO))
    }

    pub fn set_add_to(&mut self, path: impl Into<String>) {
        self.pending.insert(ADD_TO.to_owned(), Value::String(path.into()));
    }

    /// Merge pending writes over the stored section and return the updated project.
    pub fn apply(self, project: &ProjectData) -> ProjectData {
        let mut section = project.section();
        section.extend(self.pending);
        let mut updated = project.clone();
        updated.0.insert(SECTION.to_owned(), Value::Object(section));
        updated
    }
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Persists project data to `<root>/<state_dir>/project.json`.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
    path: PathBuf,
}

impl ProjectStore {
    /// Create a new store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>, state_dir: &str) -> Self {
        let root = root.into();
        let path = root.join(state_dir).join(PROJECT_FILE);
        Self { root, path }
    }

    /// Location of the persisted project file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load project data, empty when nothing has been saved yet.
    pub fn load(&self) -> Result<ProjectData> {
        if !self.path.exists() {
            return Ok(ProjectData::default());
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read project file at {}", self.path.display()))?;
        let project = serde_json::from_str(&data)
            .with_context(|| format!("invalid project data in {}", self.path.display()))?;
        Ok(project)
    }

    /// Persist `project`, creating parent directories as needed.
    pub fn save(&self, project: &ProjectData) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create project directory {}", dir.display()))?;

        let data =
            serde_json::to_string_pretty(project).context("failed to serialize project data")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write project file to {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved project settings");
        Ok(())
    }
}
