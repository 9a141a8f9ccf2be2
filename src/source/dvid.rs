//! HTTP adapter for the DVID REST API.
//!
//! Implements [`VolumeSource`] against a DVID server:
//!
//! - `GET /api/repos/info` - repo DAG, walked client-side to resolve the
//!   master branch tip (DVID has no dedicated latest-version endpoint)
//! - `GET /api/node/{uuid}/{segmentation}/sparsevol-coarse/{body}` - coarse
//!   RLE occupancy summary
//! - `GET /api/node/{uuid}/{segmentation}/sparsevol/{body}?scale={level}` -
//!   fine RLE payload, inflated into a dense mask
//! - `POST /api/node/{uuid}/{store}/key/{key}` - key-value mesh write
//!
//! Every call carries `u={user}` and `app={app}` query parameters (DVID's
//! auditing convention) and forwards the inbound `Authorization` header when
//! one was supplied.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

use crate::error::SourceError;
use crate::voxel::VolumeMask;

use super::{rle, CoarseExtent, SourceContext, VolumeSource};

/// Application name reported to DVID on every call.
pub const APP_NAME: &str = "cloud-meshgen";

/// DVID REST client.
///
/// Holds only the shared HTTP connection pool; the target server comes from
/// the per-request [`SourceContext`], so one client serves requests against
/// any number of DVID servers.
#[derive(Debug, Clone)]
pub struct DvidClient {
    http: reqwest::Client,
}

impl DvidClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Issue a GET and return the body bytes, mapping non-2xx statuses.
    async fn get_bytes(&self, ctx: &SourceContext, url: String) -> Result<Bytes, SourceError> {
        let mut request = self
            .http
            .get(&url)
            .query(&[("u", ctx.user.as_str()), ("app", APP_NAME)]);
        if let Some(ref auth) = ctx.authorization {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl VolumeSource for DvidClient {
    async fn latest_version(&self, ctx: &SourceContext) -> Result<String, SourceError> {
        let base = normalize_server(&ctx.server);
        let url = format!("{base}/api/repos/info");
        let payload = self.get_bytes(ctx, url).await?;

        let repos: HashMap<String, RepoInfo> = serde_json::from_slice(&payload)
            .map_err(|e| SourceError::Decode(format!("invalid repos/info JSON: {e}")))?;

        let uuid = master_tip(&repos).ok_or_else(|| SourceError::NoMasterVersion {
            server: ctx.server.clone(),
        })?;
        debug!(server = %ctx.server, uuid = %uuid, "Resolved master version");
        Ok(uuid)
    }

    async fn coarse_extent(
        &self,
        ctx: &SourceContext,
        version: &str,
        segmentation: &str,
        body: u64,
    ) -> Result<CoarseExtent, SourceError> {
        let base = normalize_server(&ctx.server);
        let url = format!("{base}/api/node/{version}/{segmentation}/sparsevol-coarse/{body}");
        let payload = self.get_bytes(ctx, url).await?;
        let spans = rle::decode_spans(&payload)?;
        Ok(CoarseExtent::new(spans))
    }

    async fn fetch_mask(
        &self,
        ctx: &SourceContext,
        version: &str,
        segmentation: &str,
        body: u64,
        level: u8,
    ) -> Result<VolumeMask, SourceError> {
        let base = normalize_server(&ctx.server);
        let url = format!(
            "{base}/api/node/{version}/{segmentation}/sparsevol/{body}?scale={level}"
        );
        let payload = self.get_bytes(ctx, url).await?;
        let spans = rle::decode_spans(&payload)?;
        rle::inflate(&spans)
    }

    async fn store_mesh(
        &self,
        ctx: &SourceContext,
        version: &str,
        store: &str,
        key: &str,
        bytes: Bytes,
    ) -> Result<(), SourceError> {
        let base = normalize_server(&ctx.server);
        let url = format!("{base}/api/node/{version}/{store}/key/{key}");

        let mut request = self
            .http
            .post(&url)
            .query(&[("u", ctx.user.as_str()), ("app", APP_NAME)])
            .body(bytes);
        if let Some(ref auth) = ctx.authorization {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Repo DAG parsing
// =============================================================================

/// Subset of DVID's repo info we need for master resolution.
#[derive(Debug, Deserialize)]
pub struct RepoInfo {
    #[serde(rename = "DAG")]
    pub dag: Dag,
}

#[derive(Debug, Deserialize)]
pub struct Dag {
    #[serde(rename = "Nodes")]
    pub nodes: HashMap<String, DagNode>,
}

#[derive(Debug, Deserialize)]
pub struct DagNode {
    #[serde(rename = "UUID")]
    pub uuid: String,

    /// Branch name; DVID uses the empty string for the master branch, some
    /// deployments name it explicitly.
    #[serde(rename = "Branch", default)]
    pub branch: String,

    #[serde(rename = "VersionID")]
    pub version_id: u64,

    #[serde(rename = "Locked", default)]
    pub locked: bool,
}

impl DagNode {
    fn on_master(&self) -> bool {
        self.branch.is_empty() || self.branch == "master"
    }
}

/// Walk all repo DAGs and return the UUID of the newest master-branch node.
///
/// The tip is the master node with the highest version id; an open (not yet
/// locked) tip is still the effective latest version, matching how DVID
/// clients resolve "master".
pub fn master_tip(repos: &HashMap<String, RepoInfo>) -> Option<String> {
    repos
        .values()
        .flat_map(|repo| repo.dag.nodes.values())
        .filter(|node| node.on_master())
        .max_by_key(|node| node.version_id)
        .map(|node| node.uuid.clone())
}

/// Prefix bare `host:port` servers with http:// and drop trailing slashes.
fn normalize_server(server: &str) -> String {
    let trimmed = server.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

// =============================================================================
// Tests
// =============================================================================
