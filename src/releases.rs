//! Release catalog access and asset resolution.
//!
//! The catalog is a GitHub-releases-style JSON feed, assumed pre-sorted
//! descending by recency. The core only needs version filtering and asset
//! selection over the feed; fetch failures degrade to a sentinel instead of
//! failing the caller's validation.

use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::version;

/// Sentinel returned when no downloadable asset can be resolved.
pub const ASSET_NOT_FOUND: &str = "NOT FOUND";

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(default)]
    pub browser_download_url: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Release feed client over a GitHub-style releases API.
#[derive(Clone)]
pub struct GithubCatalog {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl GithubCatalog {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            token,
        }
    }

    async fn fetch(&self) -> Result<Vec<Release>> {
        let mut req = self
            .client
            .get(&self.url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "keygate");

        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Catalog request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(msg::CATALOG_UNAVAILABLE.into()));
        }

        response
            .json::<Vec<Release>>()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse catalog response: {}", e)))
    }
}

/// The release catalog as seen by the engine and handlers. The fixed variant
/// backs tests and offline deployments.
#[derive(Clone)]
pub enum Catalog {
    Github(GithubCatalog),
    Fixed(Vec<Release>),
}

impl Catalog {
    pub async fn releases(&self) -> Result<Vec<Release>> {
        match self {
            Catalog::Github(c) => c.fetch().await,
            Catalog::Fixed(releases) => Ok(releases.clone()),
        }
    }
}

/// Asset-name substrings per platform, checked lowercased.
const WINDOWS_PATTERNS: &[&str] = &[".exe", ".msi", "windows", "win"];
const MAC_PATTERNS: &[&str] = &[".dmg", ".pkg", "mac", "macos", "darwin"];
const LINUX_PATTERNS: &[&str] = &[".deb", ".rpm", ".appimage", "linux"];

fn matches_any(name: &str, patterns: &[&str]) -> bool {
    let name = name.to_lowercase();
    patterns.iter().any(|p| name.contains(p))
}

/// Derive platform tags from a release's asset names.
pub fn platform_tags(assets: &[ReleaseAsset]) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if assets.iter().any(|a| matches_any(&a.name, WINDOWS_PATTERNS)) {
        tags.push("windows");
    }
    if assets.iter().any(|a| matches_any(&a.name, MAC_PATTERNS)) {
        tags.push("mac");
    }
    if assets.iter().any(|a| matches_any(&a.name, LINUX_PATTERNS)) {
        tags.push("linux");
    }
    tags
}

/// Find the asset matching a platform, falling back to the first asset when
/// nothing platform-specific exists.
pub fn find_platform_asset<'a>(
    assets: &'a [ReleaseAsset],
    platform: &str,
) -> Option<&'a ReleaseAsset> {
    let patterns = match platform {
        "mac" => MAC_PATTERNS,
        "linux" => LINUX_PATTERNS,
        _ => WINDOWS_PATTERNS,
    };

    assets
        .iter()
        .find(|a| matches_any(&a.name, patterns))
        .or_else(|| assets.first())
}

/// Find the migration-script asset within a release, by naming convention.
pub fn find_migration_asset(assets: &[ReleaseAsset]) -> Option<&ReleaseAsset> {
    assets
        .iter()
        .find(|a| a.name.to_lowercase().contains("migrationscripturl"))
}

fn first_download_url(release: &Release) -> Option<&str> {
    release
        .assets
        .iter()
        .find_map(|a| a.browser_download_url.as_deref())
}

/// Resolve the download asset for a validation response: the release whose
/// tag matches `installed_version` if one exists and has assets, else the
/// most recent release. Returns the sentinel when nothing is downloadable.
pub fn resolve_asset(releases: &[Release], installed_version: Option<&str>) -> String {
    let matched = installed_version.and_then(|v| {
        releases
            .iter()
            .find(|r| version::tags_equal(&r.tag_name, v))
            .filter(|r| first_download_url(r).is_some())
    });

    matched
        .or_else(|| releases.first())
        .and_then(first_download_url)
        .map(String::from)
        .unwrap_or_else(|| ASSET_NOT_FOUND.to_string())
}

/// One entry in the version listing, with derived platform tags.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub tag_name: String,
    pub platforms: Vec<&'static str>,
    pub published_at: Option<String>,
    pub is_prerelease: bool,
    pub is_draft: bool,
    pub release_notes: Option<String>,
    pub release_url: Option<String>,
    pub asset_count: usize,
    pub asset: Option<String>,
    pub migration_script_url: Option<String>,
}

impl From<Release> for VersionInfo {
    fn from(release: Release) -> Self {
        let platforms = platform_tags(&release.assets);
        let migration_script_url = find_migration_asset(&release.assets)
            .and_then(|a| a.browser_download_url.clone());
        let asset = release
            .assets
            .first()
            .and_then(|a| a.browser_download_url.clone());

        Self {
            version: version::strip_tag_prefix(&release.tag_name).to_string(),
            tag_name: release.tag_name,
            platforms,
            published_at: release.published_at,
            is_prerelease: release.prerelease,
            is_draft: release.draft,
            release_notes: release.body,
            release_url: release.html_url,
            asset_count: release.assets.len(),
            asset,
            migration_script_url,
        }
    }
}

/// Map releases to version entries, optionally restricted to
/// `[current, upgrade]` and sorted ascending. Without bounds the feed order
/// (newest first) is preserved; wanting only the newest entry is caller
/// policy.
pub fn version_listing(
    releases: Vec<Release>,
    current: Option<&str>,
    upgrade: Option<&str>,
) -> Vec<VersionInfo> {
    let entries: Vec<VersionInfo> = releases.into_iter().map(VersionInfo::from).collect();

    if current.is_none() && upgrade.is_none() {
        return entries;
    }
    version::select_and_sort(entries, current, upgrade, |e| e.version.as_str())
}
