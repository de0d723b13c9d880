//! GitHub release proxy
//!
//! Lists releases for the changelog page, resolves the latest release, and
//! matches installer assets per OS by filename so the download endpoint can
//! stream the right artifact. Upstream calls are single request/response,
//! never retried; failures surface as proxy errors.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::types::{KioskError, Result};

const GITHUB_API: &str = "https://api.github.com";

static WINDOWS_ASSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(msi|exe)$").expect("windows asset regex"));
static MACOS_ASSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.dmg$").expect("macos asset regex"));
static LINUX_ASSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(AppImage|deb)$").expect("linux asset regex"));

/// Installer target, taken from the download URL path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetOs {
    Windows,
    Macos,
    Linux,
}

impl TargetOs {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Windows => &WINDOWS_ASSET_RE,
            Self::Macos => &MACOS_ASSET_RE,
            Self::Linux => &LINUX_ASSET_RE,
        }
    }
}

impl FromStr for TargetOs {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "windows" => Ok(Self::Windows),
            "macos" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            other => Err(KioskError::Validation(format!(
                "Unknown OS '{}': expected windows, macos, or linux",
                other
            ))),
        }
    }
}

/// Downloadable artifact attached to a release
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub browser_download_url: String,
}

/// GitHub release, as returned by the releases API
#[derive(Deserialize, Clone, Debug)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Trimmed release data served to the changelog page
#[derive(Serialize, Clone, Debug)]
pub struct ChangelogEntry {
    pub tag: String,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
    pub assets: Vec<ReleaseAsset>,
}

impl From<Release> for ChangelogEntry {
    fn from(release: Release) -> Self {
        Self {
            tag: release.tag_name,
            name: release.name,
            notes: release.body,
            date: release.published_at,
            assets: release.assets,
        }
    }
}

/// Match an installer asset by per-OS filename pattern.
/// First match in asset order wins.
pub fn match_asset(assets: &[ReleaseAsset], os: TargetOs) -> Option<&ReleaseAsset> {
    let pattern = os.pattern();
    assets.iter().find(|asset| pattern.is_match(&asset.name))
}

/// Authenticated client for the upstream release source
pub struct ReleaseClient {
    http: reqwest::Client,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl ReleaseClient {
    pub fn from_args(args: &Args) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.request_timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            owner: args.github_owner.clone(),
            repo: args.github_repo.clone(),
            token: args.github_token.clone(),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("kiosk/", env!("CARGO_PKG_VERSION")));
        if let Some(ref token) = self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    /// List published releases, drafts filtered out
    pub async fn list_releases(&self) -> Result<Vec<Release>> {
        let url = format!("{}/repos/{}/{}/releases", GITHUB_API, self.owner, self.repo);
        debug!(url = %url, "Fetching release list");

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(KioskError::Upstream(format!(
                "Release list returned {}",
                response.status()
            )));
        }

        let releases: Vec<Release> = response.json().await?;
        Ok(releases.into_iter().filter(|r| !r.draft).collect())
    }

    /// Fetch the latest published release
    pub async fn latest(&self) -> Result<Release> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            GITHUB_API, self.owner, self.repo
        );
        debug!(url = %url, "Fetching latest release");

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(KioskError::Upstream(format!(
                "Latest release returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Open a download stream for a matched asset. The caller streams the
    /// body back to the client frame by frame.
    pub async fn download(&self, asset: &ReleaseAsset) -> Result<reqwest::Response> {
        debug!(asset = %asset.name, url = %asset.browser_download_url, "Proxying asset download");

        let response = self
            .http
            .get(&asset.browser_download_url)
            .header("User-Agent", concat!("kiosk/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(KioskError::Upstream(format!(
                "Asset download returned {}",
                response.status()
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            size: Some(1024),
            browser_download_url: format!("https://example.com/{}", name),
        }
    }

    #[test]
    fn os_parsing() {
        assert_eq!("windows".parse::<TargetOs>().unwrap(), TargetOs::Windows);
        assert_eq!("macos".parse::<TargetOs>().unwrap(), TargetOs::Macos);
        assert_eq!("linux".parse::<TargetOs>().unwrap(), TargetOs::Linux);
        assert!("freebsd".parse::<TargetOs>().is_err());
    }

    #[test]
    fn asset_matching_per_os() {
        let assets = vec![
            asset("Skiff-1.2.0.dmg"),
            asset("Skiff-1.2.0-setup.exe"),
            asset("Skiff-1.2.0.AppImage"),
            asset("Skiff-1.2.0.deb"),
            asset("checksums.txt"),
        ];

        assert_eq!(
            match_asset(&assets, TargetOs::Windows).unwrap().name,
            "Skiff-1.2.0-setup.exe"
        );
        assert_eq!(
            match_asset(&assets, TargetOs::Macos).unwrap().name,
            "Skiff-1.2.0.dmg"
        );
        // First match in asset order wins
        assert_eq!(
            match_asset(&assets, TargetOs::Linux).unwrap().name,
            "Skiff-1.2.0.AppImage"
        );
    }

    #[test]
    fn asset_matching_is_case_insensitive() {
        let assets = vec![asset("SKIFF-SETUP.EXE")];
        assert!(match_asset(&assets, TargetOs::Windows).is_some());

        let assets = vec![asset("skiff.appimage")];
        assert!(match_asset(&assets, TargetOs::Linux).is_some());
    }

    #[test]
    fn no_match_for_missing_asset_type() {
        let assets = vec![asset("Skiff-1.2.0.dmg")];
        assert!(match_asset(&assets, TargetOs::Windows).is_none());
    }

    #[test]
    fn changelog_entry_trims_release() {
        let json = serde_json::json!({
            "tag_name": "v1.2.0",
            "name": "Skiff 1.2.0",
            "body": "- fixed things",
            "draft": false,
            "published_at": "2026-08-01T12:00:00Z",
            "assets": [
                { "name": "Skiff-1.2.0.dmg", "size": 42, "browser_download_url": "https://example.com/Skiff-1.2.0.dmg" }
            ],
            "html_url": "https://github.com/skiff-app/skiff/releases/v1.2.0",
            "author": { "login": "bot" }
        });

        let release: Release = serde_json::from_value(json).unwrap();
        let entry = ChangelogEntry::from(release);
        assert_eq!(entry.tag, "v1.2.0");
        assert_eq!(entry.name.as_deref(), Some("Skiff 1.2.0"));
        assert_eq!(entry.notes.as_deref(), Some("- fixed things"));
        assert_eq!(entry.assets.len(), 1);
    }
}
