//! Deploy bundles: a manifest plus a packed app, reduced to bytes.
//!
//! Deployment is serialization. A bundle holds nothing live, so turning
//! it into bytes and back is the whole deploy protocol; anything that
//! cannot survive that trip fails at build time on the deploying side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use ferry_core::{Envelope, TransportError};

use crate::app::AgentApp;

/// Kind tag bundles travel under.
pub const BUNDLE_KIND: &str = "deploy-bundle";

/// Env var keys that never enter a manifest; the platform owns them.
pub const RESERVED_ENV_KEYS: &[&str] = &["FERRY_PROJECT", "FERRY_LOCATION", "FERRY_STAGING_DIR"];

/// Env var prefixes that never enter a manifest.
pub const RESERVED_ENV_PREFIXES: &[&str] = &["OTEL_", "FERRY_ENGINE_"];

/// Requirements every deployed app gets, whatever else it asks for.
const BASE_REQUIREMENTS: &[&str] = &["ferry-sdk"];

/// Directories that never ride along as extra files.
const EXCLUDED_DIRS: &[&str] = &["target", "node_modules", "__pycache__", "venv"];

/// Whether an env key is platform-owned.
pub fn is_reserved_env_key(key: &str) -> bool {
    RESERVED_ENV_KEYS.contains(&key)
        || RESERVED_ENV_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}

/// Parse `.env`-style content into key/value pairs, in file order.
///
/// Blank lines and `#` comments are skipped, the first `=` splits key
/// from value, and one layer of matching quotes is stripped from the
/// value. Malformed lines are skipped with a warning rather than failing
/// the whole file.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = %line, "Skipping env line without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            warn!(line = %line, "Skipping env line with empty key");
            continue;
        }
        vars.push((key.to_string(), strip_quotes(value.trim()).to_string()));
    }
    vars
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// List files in a directory worth shipping alongside an app.
///
/// One level deep, sorted. Dotfiles and build directories stay behind.
pub fn detect_extra_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_bundleable(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn is_bundleable(name: &str) -> bool {
    !name.starts_with('.') && !EXCLUDED_DIRS.contains(&name)
}

/// Metadata travelling with a deployed app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployManifest {
    /// Name shown in engine listings
    pub display_name: String,

    /// Environment for the deployed app, already filtered of reserved keys
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,

    /// Package requirements of the deployed app
    #[serde(default)]
    pub requirements: Vec<String>,

    /// Support files shipped alongside the app
    #[serde(default)]
    pub extra_files: Vec<String>,

    /// When the bundle was built
    pub created_at: DateTime<Utc>,
}

/// A deployable unit: manifest plus the packed app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployBundle {
    /// Deployment metadata
    pub manifest: DeployManifest,
    /// The packed app, exactly as [`AgentApp::pack`] produced it
    pub app: Envelope,
}

impl DeployBundle {
    /// Start building a bundle.
    pub fn builder(display_name: impl Into<String>) -> BundleBuilder {
        BundleBuilder::new(display_name)
    }

    /// The bundle as bytes, ready to hand to a host.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        Envelope::encode(BUNDLE_KIND, self)?.to_bytes()
    }

    /// Decode a bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        Envelope::from_bytes(bytes)?.open(BUNDLE_KIND)
    }
}

/// Builder assembling a manifest around an app.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    display_name: String,
    env_vars: BTreeMap<String, String>,
    requirements: Vec<String>,
    extra_files: Vec<String>,
}

impl BundleBuilder {
    /// A builder for the given display name.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            env_vars: BTreeMap::new(),
            requirements: BASE_REQUIREMENTS.iter().map(|s| s.to_string()).collect(),
            extra_files: Vec::new(),
        }
    }

    /// Add one env var. Reserved keys are dropped with a warning.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if is_reserved_env_key(&key) {
            warn!(key = %key, "Skipping reserved env var; the platform sets it");
            return self;
        }
        self.env_vars.insert(key, value.into());
        self
    }

    /// Merge vars parsed from `.env`-style content.
    pub fn env_file(mut self, content: &str) -> Self {
        for (key, value) in parse_env_file(content) {
            self = self.env_var(key, value);
        }
        self
    }

    /// Add a package requirement.
    pub fn requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Record a support file to ship alongside the app.
    pub fn extra_file(mut self, path: impl Into<String>) -> Self {
        self.extra_files.push(path.into());
        self
    }

    /// Pack the app and finish the bundle.
    ///
    /// This is where a live engine surfaces: packing an already-started
    /// app fails with [`TransportError::NonTransportableResource`].
    pub fn pack(self, app: &AgentApp) -> Result<DeployBundle, TransportError> {
        let mut requirements = self.requirements;
        requirements.sort();
        requirements.dedup();

        Ok(DeployBundle {
            manifest: DeployManifest {
                display_name: self.display_name,
                env_vars: self.env_vars,
                requirements,
                extra_files: self.extra_files,
                created_at: Utc::now(),
            },
            app: app.pack()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::AppBlueprint;
    use crate::config::HostEnv;

    fn sample_app() -> AgentApp {
        AgentApp::new(
            AppBlueprint::new("notes", "Keep notes."),
            HostEnv::default(),
        )
    }

    #[test]
    fn env_file_parsing_handles_the_usual_mess() {
        let content = r#"
            # database settings
            DB_URL=postgres://localhost/app

            QUOTED="hello world"
            SINGLE='one two'
            EDGE=a=b=c
            DANGLING
            =nokey
        "#;

        let vars = parse_env_file(content);
        assert_eq!(
            vars,
            vec![
                ("DB_URL".to_string(), "postgres://localhost/app".to_string()),
                ("QUOTED".to_string(), "hello world".to_string()),
                ("SINGLE".to_string(), "one two".to_string()),
                ("EDGE".to_string(), "a=b=c".to_string()),
            ]
        );
    }

    #[test]
    fn reserved_vars_never_enter_the_manifest() {
        let builder = BundleBuilder::new("demo")
            .env_var("FERRY_PROJECT", "acme-prod")
            .env_var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://otel:4317")
            .env_var("FERRY_ENGINE_ID", "e-1")
            .env_var("DB_URL", "postgres://localhost/app");

        let bundle = builder.pack(&sample_app()).unwrap();
        let keys: Vec<_> = bundle.manifest.env_vars.keys().cloned().collect();
        assert_eq!(keys, vec!["DB_URL".to_string()]);
    }

    #[test]
    fn requirements_are_seeded_sorted_and_deduped() {
        let bundle = BundleBuilder::new("demo")
            .requirement("serde")
            .requirement("ferry-sdk")
            .requirement("serde")
            .pack(&sample_app())
            .unwrap();

        assert_eq!(
            bundle.manifest.requirements,
            vec!["ferry-sdk".to_string(), "serde".to_string()]
        );
    }

    #[test]
    fn bundle_round_trips_through_bytes() {
        let bundle = BundleBuilder::new("demo")
            .env_var("DB_URL", "postgres://localhost/app")
            .extra_file("prompts/system.txt")
            .pack(&sample_app())
            .unwrap();

        let bytes = bundle.to_bytes().unwrap();
        let back = DeployBundle::from_bytes(&bytes).unwrap();
        assert_eq!(back, bundle);

        let app = AgentApp::unpack(&back.app).unwrap();
        assert_eq!(app.blueprint().name, "notes");
        assert!(!app.is_ready());
    }

    #[tokio::test]
    async fn live_app_fails_the_pack() {
        let app = sample_app();
        app.set_up().await.unwrap();

        let err = BundleBuilder::new("demo").pack(&app).unwrap_err();
        assert!(err.is_non_transportable());
    }

    #[test]
    fn foreign_bytes_are_rejected() {
        let envelope = Envelope::encode("toolset", &serde_json::json!({})).unwrap();
        let err = DeployBundle::from_bytes(&envelope.to_bytes().unwrap()).unwrap_err();
        assert!(err.is_kind_mismatch());
    }

    #[test]
    fn dotfiles_and_build_dirs_stay_behind() {
        assert!(is_bundleable("prompts"));
        assert!(is_bundleable("data.csv"));
        assert!(!is_bundleable(".env"));
        assert!(!is_bundleable(".git"));
        assert!(!is_bundleable("target"));
        assert!(!is_bundleable("node_modules"));
    }
}
