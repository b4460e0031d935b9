//! Pack manifest parsing.
//!
//! The manifest is produced by the pack unpacker (`manifest.json` at the root
//! of a CurseForge pack archive). Only the parts the acquisition engine needs
//! are modelled; unknown fields are ignored.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a manifest. Always fatal for the run.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or misses required fields.
    #[error("manifest {} is corrupt: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Identity of one artifact in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Catalog project the file belongs to.
    #[serde(rename = "projectID")]
    pub project_id: u64,
    /// Specific file (version) of the project.
    #[serde(rename = "fileID")]
    pub file_id: u64,
}

impl ArtifactReference {
    /// Create a new reference.
    pub fn new(project_id: u64, file_id: u64) -> Self {
        Self {
            project_id,
            file_id,
        }
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid:{} fid:{}", self.project_id, self.file_id)
    }
}

/// A mod loader the pack requires (e.g. `forge-14.23.5.2859`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModLoader {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

/// The `minecraft` section of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftSection {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoader>,
}

/// One entry of the manifest's `files` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ManifestFile {
    #[serde(rename = "projectID")]
    pub project_id: u64,
    #[serde(rename = "fileID")]
    pub file_id: u64,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ManifestFile {
    /// The catalog identity of this entry.
    pub fn reference(&self) -> ArtifactReference {
        ArtifactReference::new(self.project_id, self.file_id)
    }
}

/// Parsed pack manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub minecraft: MinecraftSection,
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| ManifestError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse manifest JSON.
    pub fn parse(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Artifact references in manifest order.
    pub fn references(&self) -> Vec<ArtifactReference> {
        self.files.iter().map(ManifestFile::reference).collect()
    }

    /// Ids of the mod loaders the pack needs.
    pub fn mod_loader_ids(&self) -> Vec<&str> {
        self.minecraft
            .mod_loaders
            .iter()
            .map(|l| l.id.as_str())
            .collect()
    }

    /// Message telling the user which mod loaders to install, if any.
    pub fn install_hint(&self) -> Option<String> {
        let ids = self.mod_loader_ids();
        if ids.is_empty() {
            None
        } else {
            Some(format!("You need to install: {}", ids.join(" ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "minecraft": {
            "version": "1.12.2",
            "modLoaders": [{"id": "forge-14.23.5.2859", "primary": true}]
        },
        "manifestType": "minecraftModpack",
        "name": "Test Pack",
        "version": "1.0.0",
        "files": [
            {"projectID": 238222, "fileID": 2803400, "required": true},
            {"projectID": 32274, "fileID": 2797651}
        ],
        "overrides": "overrides"
    }"#;

    #[test]
    fn test_parse_sample_manifest() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("Test Pack"));
        assert_eq!(manifest.files.len(), 2);
        assert!(manifest.files[1].required);
        assert_eq!(
            manifest.references(),
            vec![
                ArtifactReference::new(238222, 2803400),
                ArtifactReference::new(32274, 2797651),
            ]
        );
    }

    #[test]
    fn test_install_hint_lists_loaders() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(
            manifest.install_hint().as_deref(),
            Some("You need to install: forge-14.23.5.2859")
        );
    }

    #[test]
    fn test_install_hint_none_without_loaders() {
        let manifest = Manifest::parse(r#"{"minecraft": {}, "files": []}"#).unwrap();
        assert!(manifest.install_hint().is_none());
    }

    #[test]
    fn test_missing_files_is_parse_error() {
        assert!(Manifest::parse(r#"{"minecraft": {}}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Manifest::load(&temp.path().join("manifest.json"));
        assert!(matches!(result, Err(ManifestError::Read { .. })));
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();

        match Manifest::load(&path) {
            Err(ManifestError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_display() {
        let reference = ArtifactReference::new(1, 2);
        assert_eq!(reference.to_string(), "pid:1 fid:2");
    }
}
