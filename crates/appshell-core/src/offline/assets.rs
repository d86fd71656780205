//! Asset lists used to pre-populate the offline cache.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

/// Resources every install caches, ahead of the build manifest.
pub const SEED_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/main.dart.js",
    "/flutter.js",
    "/flutter_bootstrap.js",
    "/manifest.json",
    "/assets/AssetManifest.json",
    "/assets/FontManifest.json",
    "/assets/NOTICES",
];

/// Base used to canonicalize relative keys. Only its path and query survive.
const KEY_BASE: &str = "http://appshell.invalid/";

/// Reduce any request URL to the path-and-query form used as a cache key.
///
/// Absolute URLs lose scheme and host, relative paths gain a leading slash,
/// fragments are dropped. Repeated leading slashes collapse to one so a key
/// can never name another host, and paths are percent-encoded the way an
/// incoming request line is, so `assets/my logo.png` and
/// `/assets/my%20logo.png` are the same key.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(url) = Url::parse(raw) {
        if url.has_host() {
            return path_and_query(&url);
        }
    }

    let without_fragment = raw.split('#').next().unwrap_or_default();
    let relative = without_fragment.trim_start_matches(['/', '\\']);
    match Url::parse(KEY_BASE).and_then(|base| base.join(&format!("/{}", relative))) {
        Ok(url) => path_and_query(&url),
        Err(_) => format!("/{}", relative),
    }
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Ordered, duplicate-free sequence of cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetList {
    urls: Vec<String>,
}

impl AssetList {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        list.extend(urls);
        list
    }

    /// The fixed seed list
    pub fn seed() -> Self {
        Self::new(SEED_ASSETS)
    }

    /// Keys of a build manifest object, in document order.
    ///
    /// Anything other than a JSON object (including `null`) yields an empty list.
    pub fn from_manifest_json(json: &str) -> Result<Self> {
        let manifest: Value =
            serde_json::from_str(json).context("Failed to parse asset manifest")?;

        Ok(match manifest {
            Value::Object(entries) => Self::new(entries.keys()),
            _ => Self::default(),
        })
    }

    /// Load a manifest file; a missing file is an empty list.
    pub fn load_manifest(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(?path, "No asset manifest found, caching seed assets only");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read asset manifest: {}", path.display()))?;
        let list = Self::from_manifest_json(&contents)?;
        debug!(count = list.len(), "Asset manifest loaded");
        Ok(list)
    }

    /// Seed list followed by `assets`, duplicates removed
    pub fn with_seed(assets: &AssetList) -> Self {
        let mut list = Self::seed();
        list.extend(assets.iter());
        list
    }

    pub fn extend<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: HashSet<String> = self.urls.iter().cloned().collect();
        for url in urls {
            let key = normalize_url(url.as_ref());
            if seen.insert(key.clone()) {
                self.urls.push(key);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        let key = normalize_url(url);
        self.urls.iter().any(|u| *u == key)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url(""), "/");
        assert_eq!(normalize_url("/"), "/");
        assert_eq!(normalize_url("index.html"), "/index.html");
        assert_eq!(normalize_url("/assets/a.png#frag"), "/assets/a.png");
        assert_eq!(normalize_url("/search?q=1"), "/search?q=1");
        assert_eq!(
            normalize_url("https://app.example.com/assets/logo.png?v=3"),
            "/assets/logo.png?v=3"
        );
        assert_eq!(normalize_url("https://app.example.com"), "/");
    }

    #[test]
    fn test_normalize_url_never_names_another_host() {
        assert_eq!(normalize_url("//evil.example.com/secret"), "/evil.example.com/secret");
        assert_eq!(normalize_url("///x"), "/x");
        assert_eq!(normalize_url("/\\\\evil.example.com/x"), "/evil.example.com/x");
    }

    #[test]
    fn test_normalize_url_percent_encodes_like_requests() {
        assert_eq!(normalize_url("assets/my logo.png"), "/assets/my%20logo.png");
        assert_eq!(normalize_url("/assets/my%20logo.png"), "/assets/my%20logo.png");
        assert_eq!(normalize_url("/search?q=a b"), "/search?q=a%20b");

        let list = AssetList::new(["assets/my logo.png"]);
        assert!(list.contains("/assets/my%20logo.png"));
    }

    #[test]
    fn test_seed_list() {
        let seed = AssetList::seed();
        assert_eq!(seed.len(), 9);
        assert_eq!(seed.iter().next(), Some("/"));
        assert!(seed.contains("/flutter_bootstrap.js"));
        assert!(seed.contains("assets/NOTICES"));
    }

    #[test]
    fn test_manifest_keys_keep_document_order() {
        let json = r#"{
            "assets/z.png": "hash1",
            "assets/a.png": "hash2",
            "canvaskit/canvaskit.wasm": "hash3"
        }"#;
        let list = AssetList::from_manifest_json(json).unwrap();
        let urls: Vec<&str> = list.iter().collect();
        assert_eq!(
            urls,
            vec!["/assets/z.png", "/assets/a.png", "/canvaskit/canvaskit.wasm"]
        );
    }

    #[test]
    fn test_non_object_manifest_is_empty() {
        assert!(AssetList::from_manifest_json("null").unwrap().is_empty());
        assert!(AssetList::from_manifest_json("[1, 2]").unwrap().is_empty());
        assert!(AssetList::from_manifest_json("{not json").is_err());
    }

    #[test]
    fn test_missing_manifest_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = AssetList::load_manifest(&dir.path().join("absent.json")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_manifest_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"assets/fonts/Roboto.ttf": "abc"}"#).unwrap();

        let list = AssetList::load_manifest(&path).unwrap();
        assert!(list.contains("/assets/fonts/Roboto.ttf"));
    }

    #[test]
    fn test_with_seed_removes_duplicates() {
        let manifest = AssetList::new(["index.html", "/assets/a.png", "/"]);
        let all = AssetList::with_seed(&manifest);
        assert_eq!(all.len(), 10);
        let last: Vec<&str> = all.iter().skip(9).collect();
        assert_eq!(last, vec!["/assets/a.png"]);
    }
}
