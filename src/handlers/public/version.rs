use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::releases::{self, VersionInfo};
use crate::version;

#[derive(Debug, Deserialize)]
pub struct VersionListQuery {
    #[serde(default)]
    pub current_version: Option<String>,
    #[serde(default)]
    pub upgrade_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VersionListResponse {
    pub versions: Vec<VersionInfo>,
    pub total: usize,
}

/// List catalog versions with derived platform tags. Without bounds the feed
/// order (newest first) is kept; with a `[current, upgrade]` range the result
/// is filtered and sorted ascending, the order an updater applies them in.
pub async fn list_versions(
    State(state): State<AppState>,
    Query(query): Query<VersionListQuery>,
) -> Result<Json<VersionListResponse>> {
    let feed = state.catalog.releases().await?;

    let versions = releases::version_listing(
        feed,
        query.current_version.as_deref(),
        query.upgrade_version.as_deref(),
    );

    Ok(Json(VersionListResponse {
        total: versions.len(),
        versions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VersionAssetQuery {
    pub v: String,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VersionAssetResponse {
    pub version: String,
    pub asset_name: String,
    pub asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// Resolve the download asset for one version and platform.
pub async fn version_asset(
    State(state): State<AppState>,
    Query(query): Query<VersionAssetQuery>,
) -> Result<Json<VersionAssetResponse>> {
    let feed = state.catalog.releases().await?;

    let release = feed
        .iter()
        .find(|r| version::tags_equal(&r.tag_name, &query.v))
        .ok_or_else(|| AppError::NotFound(format!("Version {} not found", query.v)))?;

    let platform = query.platform.as_deref().unwrap_or("windows");
    let asset = releases::find_platform_asset(&release.assets, platform)
        .and_then(|a| a.browser_download_url.as_deref().map(|url| (a, url)))
        .ok_or_else(|| AppError::NotFound("No downloadable asset found".into()))?;

    Ok(Json(VersionAssetResponse {
        version: version::strip_tag_prefix(&release.tag_name).to_string(),
        asset_name: asset.0.name.clone(),
        asset: asset.1.to_string(),
        size: asset.0.size,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MigrationQuery {
    /// Single version to resolve the migration script for.
    #[serde(default)]
    pub version: Option<String>,
    /// Range start (exclusive) when collecting scripts across an upgrade.
    #[serde(default)]
    pub current_version: Option<String>,
    /// Range end (inclusive).
    #[serde(default)]
    pub required_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MigrationScript {
    pub version: String,
    pub migration_script_url: String,
}

#[derive(Debug, Serialize)]
pub struct MigrationResponse {
    pub scripts: Vec<MigrationScript>,
}

/// Resolve migration scripts, either for one version or for every version an
/// upgrade passes through (above current, up to and including required),
/// ascending so scripts apply in order. Versions without a migration asset
/// are skipped.
pub async fn migration_assets(
    State(state): State<AppState>,
    Query(query): Query<MigrationQuery>,
) -> Result<Json<MigrationResponse>> {
    let feed = state.catalog.releases().await?;

    let mut scripts: Vec<MigrationScript> = feed
        .iter()
        .filter(|r| {
            if let Some(ref v) = query.version {
                return version::tags_equal(&r.tag_name, v);
            }
            let tag = version::strip_tag_prefix(&r.tag_name);
            let above_current = query
                .current_version
                .as_deref()
                .map(|c| version::compare(tag, c) == std::cmp::Ordering::Greater)
                .unwrap_or(true);
            above_current && version::in_range(tag, None, query.required_version.as_deref())
        })
        .filter_map(|r| {
            releases::find_migration_asset(&r.assets)
                .and_then(|a| a.browser_download_url.clone())
                .map(|url| MigrationScript {
                    version: version::strip_tag_prefix(&r.tag_name).to_string(),
                    migration_script_url: url,
                })
        })
        .collect();

    scripts.sort_by(|a, b| version::compare(&a.version, &b.version));

    if scripts.is_empty() {
        return Err(AppError::NotFound("No migration scripts found".into()));
    }

    Ok(Json(MigrationResponse { scripts }))
}
