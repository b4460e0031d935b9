//! Catalog response types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Fallback project page when the catalog publishes no web links.
const FALLBACK_PROJECT_URL: &str = "https://www.curseforge.com/projects";

/// One published web link of a project or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLink {
    #[serde(default)]
    pub name: Option<String>,
    pub link: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl WebLink {
    fn is_website(&self) -> bool {
        let is_site = |s: &Option<String>| {
            s.as_deref().is_some_and(|v| {
                v.eq_ignore_ascii_case("website") || v.eq_ignore_ascii_case("websiteUrl")
            })
        };
        is_site(&self.kind) || is_site(&self.name)
    }
}

/// Links as the catalog sends them: a list of link objects, or an object
/// mapping link names to URLs (`{"websiteUrl": "..."}`).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLinks {
    List(Vec<WebLink>),
    Map(BTreeMap<String, serde_json::Value>),
    Other(serde_json::Value),
}

/// Normalized web links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLinks")]
pub struct WebLinks {
    pub entries: Vec<WebLink>,
}

impl From<RawLinks> for WebLinks {
    fn from(raw: RawLinks) -> Self {
        let entries = match raw {
            RawLinks::List(entries) => entries,
            RawLinks::Map(map) => map
                .into_iter()
                .filter_map(|(name, value)| {
                    value.as_str().map(|link| WebLink {
                        name: Some(name.clone()),
                        link: link.to_string(),
                        kind: Some(name),
                    })
                })
                .collect(),
            RawLinks::Other(_) => Vec::new(),
        };
        Self { entries }
    }
}

impl WebLinks {
    /// The project's website. CurseForge pages come first since only they
    /// serve `/download/{fileID}`, then links typed "website", then the first.
    pub fn website_url(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|l| l.link.contains("curseforge.com"))
            .or_else(|| self.entries.iter().find(|l| l.is_website()))
            .or_else(|| self.entries.first())
            .map(|l| l.link.as_str())
    }
}

/// Metadata for one file (version) of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: u64,
    /// File name; also the cache key. Empty when the catalog withholds it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Direct download URL. `None` when the author disabled third-party
    /// downloads for this file.
    #[serde(default)]
    pub url: Option<String>,
    /// Expected size in bytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    /// Expected SHA-1 digest as hex.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sha1: String,
    #[serde(default)]
    pub links: WebLinks,
}

impl VersionRecord {
    /// The download URL, if the catalog publishes a non-empty one.
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// The file name, if the catalog publishes a non-empty one.
    pub fn file_name(&self) -> Option<&str> {
        Some(self.name.trim()).filter(|n| !n.is_empty())
    }
}

/// Project metadata as returned by `GET {base}/mod/{id}`.
///
/// Versions that fail to parse are skipped so one malformed sibling does not
/// hide the rest of the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_versions")]
    pub versions: Vec<VersionRecord>,
    #[serde(default)]
    pub links: WebLinks,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_versions<'de, D>(deserializer: D) -> Result<Vec<VersionRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<VersionRecord>(value) {
            Ok(version) => Some(version),
            Err(e) => {
                debug!(error = %e, "Skipping malformed catalog version");
                None
            }
        })
        .collect())
}

impl ProjectInfo {
    /// All versions whose id equals `file_id`.
    ///
    /// Anything other than exactly one match is a structural mismatch the
    /// caller has to classify.
    pub fn versions_matching(&self, file_id: u64) -> Vec<&VersionRecord> {
        self.versions.iter().filter(|v| v.id == file_id).collect()
    }

    /// User-facing page from which `file_id` can be downloaded by hand.
    pub fn manual_download_url(&self, project_id: u64, file_id: u64) -> String {
        manual_download_url(Some(self), project_id, file_id)
    }
}

/// Derive the manual download URL for a file, with or without project info.
pub fn manual_download_url(
    project: Option<&ProjectInfo>,
    project_id: u64,
    file_id: u64,
) -> String {
    let base = project
        .and_then(|p| p.links.website_url())
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| format!("{}/{}", FALLBACK_PROJECT_URL, project_id));
    format!("{}/download/{}", base, file_id)
}
