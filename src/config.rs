//! Configuration for vidslot.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VIDSLOT_HOME, VIDSLOT_API_KEY_ENV)
//! 2. Config file (.vidslot/config.yaml)
//! 3. Defaults (~/.vidslot)
//!
//! Config file discovery:
//! - Searches current directory and parents for .vidslot/config.yaml
//! - Paths in config file are relative to the .vidslot/ directory
//!
//! `demos/seed.yaml` holds the three initial slot videos; set
//! `registry.seed` to it to start with a populated registry.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::gemini::GeminiSettings;
use crate::core::{GenerationLimits, VersionPolicy};
use crate::domain::Asset;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    #[serde(default)]
    pub generation: Option<GenerationConfig>,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .vidslot/)
    pub home: Option<String>,
    /// Blob directory (relative to .vidslot/)
    pub blobs: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub video_model: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub poll_interval_seconds: Option<u64>,
    pub max_wait_seconds: Option<u64>,
    pub max_polls: Option<u32>,
    pub max_reference_bytes: Option<u64>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub number_of_videos: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub version_policy: VersionPolicy,
    /// YAML list of initial assets (relative to .vidslot/)
    pub seed: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to vidslot home
    pub home: PathBuf,
    /// Absolute path to the blob directory
    pub blobs: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Provider models and output settings
    pub provider: GeminiSettings,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Polling bounds
    pub limits: GenerationLimits,
    pub version_policy: VersionPolicy,
    /// Seed file for the registry
    pub seed: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".vidslot").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Overlay provider and generation sections onto the defaults
fn provider_settings(
    provider: Option<&ProviderConfig>,
    generation: Option<&GenerationConfig>,
) -> GeminiSettings {
    let mut settings = GeminiSettings::default();

    if let Some(p) = provider {
        if let Some(ref v) = p.base_url {
            settings.base_url = v.clone();
        }
        if let Some(ref v) = p.video_model {
            settings.video_model = v.clone();
        }
        if let Some(ref v) = p.text_model {
            settings.text_model = v.clone();
        }
        if let Some(ref v) = p.image_model {
            settings.image_model = v.clone();
        }
    }
    if let Some(g) = generation {
        if let Some(ref v) = g.resolution {
            settings.resolution = v.clone();
        }
        if let Some(ref v) = g.aspect_ratio {
            settings.aspect_ratio = v.clone();
        }
        if let Some(v) = g.number_of_videos {
            settings.number_of_videos = v;
        }
    }

    settings
}

fn generation_limits(generation: Option<&GenerationConfig>) -> GenerationLimits {
    let defaults = GenerationLimits::default();
    match generation {
        Some(g) => GenerationLimits {
            poll_interval_seconds: g
                .poll_interval_seconds
                .unwrap_or(defaults.poll_interval_seconds),
            max_wait_seconds: g.max_wait_seconds.unwrap_or(defaults.max_wait_seconds),
            max_polls: g.max_polls.unwrap_or(defaults.max_polls),
            max_reference_bytes: g
                .max_reference_bytes
                .unwrap_or(defaults.max_reference_bytes),
        },
        None => defaults,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".vidslot");

    let config_file = find_config_file();
    let env_home = std::env::var("VIDSLOT_HOME").ok().map(PathBuf::from);
    let env_key = std::env::var("VIDSLOT_API_KEY_ENV")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let mut resolved = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;
        let config_dir = config_path.parent().unwrap_or(Path::new("."));

        let home = match (env_home, config.paths.home.as_deref()) {
            (Some(home), _) => home,
            (None, Some(home_path)) => resolve_path(config_dir, home_path),
            (None, None) => default_home,
        };
        let blobs = config
            .paths
            .blobs
            .as_deref()
            .map(|p| resolve_path(config_dir, p))
            .unwrap_or_else(|| home.join("blobs"));

        let registry = config.registry.as_ref();

        ResolvedConfig {
            blobs,
            config_file: config_file.clone(),
            provider: provider_settings(config.provider.as_ref(), config.generation.as_ref()),
            api_key_env: config
                .provider
                .as_ref()
                .and_then(|p| p.api_key_env.clone())
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            limits: generation_limits(config.generation.as_ref()),
            version_policy: registry.map(|r| r.version_policy).unwrap_or_default(),
            seed: registry
                .and_then(|r| r.seed.as_deref())
                .map(|p| resolve_path(config_dir, p)),
            home,
        }
    } else {
        let home = env_home.unwrap_or(default_home);

        ResolvedConfig {
            blobs: home.join("blobs"),
            home,
            config_file: None,
            provider: GeminiSettings::default(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            limits: GenerationLimits::default(),
            version_policy: VersionPolicy::default(),
            seed: None,
        }
    };

    if let Some(var) = env_key {
        resolved.api_key_env = var;
    }

    Ok(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Read a YAML list of assets
pub fn read_seed(path: &Path) -> Result<Vec<Asset>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse seed file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let vidslot_dir = temp.path().join(".vidslot");
        std::fs::create_dir_all(&vidslot_dir).unwrap();

        let config_path = vidslot_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
  blobs: ../media
provider:
  video_model: veo-3.0-generate-preview
  api_key_env: STUDIO_KEY
generation:
  poll_interval_seconds: 10
  max_polls: 30
  resolution: 1080p
registry:
  version_policy: restart
  seed: seed.yaml
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.blobs, Some("../media".to_string()));

        let registry = config.registry.as_ref().unwrap();
        assert_eq!(registry.version_policy, VersionPolicy::Restart);
        assert_eq!(registry.seed.as_deref(), Some("seed.yaml"));

        let settings = provider_settings(config.provider.as_ref(), config.generation.as_ref());
        assert_eq!(settings.video_model, "veo-3.0-generate-preview");
        assert_eq!(settings.text_model, "gemini-2.5-flash");
        assert_eq!(settings.resolution, "1080p");
        assert_eq!(settings.aspect_ratio, "16:9");

        let limits = generation_limits(config.generation.as_ref());
        assert_eq!(limits.poll_interval_seconds, 10);
        assert_eq!(limits.max_polls, 30);
        assert_eq!(limits.max_wait_seconds, 600);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ConfigFile = serde_yaml::from_str("version: \"1.0\"\n").unwrap();

        assert!(config.registry.is_none());
        assert_eq!(
            provider_settings(config.provider.as_ref(), config.generation.as_ref()),
            GeminiSettings::default()
        );
        assert_eq!(
            generation_limits(config.generation.as_ref()),
            GenerationLimits::default()
        );
    }

    #[test]
    fn test_reload_without_file_uses_defaults() {
        let config = reload_config().unwrap();

        // Only meaningful when no .vidslot/ exists above the test directory
        if config.config_file.is_none() {
            assert_eq!(config.blobs, config.home.join("blobs"));
            assert_eq!(config.limits, GenerationLimits::default());
            assert_eq!(config.version_policy, VersionPolicy::Continue);
            assert!(config.seed.is_none());
        }
    }

    #[test]
    fn test_read_seed() {
        let temp = TempDir::new().unwrap();
        let seed_path = temp.path().join("seed.yaml");
        std::fs::write(
            &seed_path,
            r#"
- id: v1
  category: brand
  title: Brand Identity Video v1
  locator: /videos/flow.mp4
  version: 1
  updated_at: "2025-01-01T00:00:00Z"
  play_count: 1240
"#,
        )
        .unwrap();

        let seed = read_seed(&seed_path).unwrap();
        assert_eq!(seed.len(), 1);
        assert_eq!(seed[0].category, Category::Brand);
        assert_eq!(seed[0].play_count, 1240);
        assert!(read_seed(&temp.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_bundled_seed_fills_every_slot() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/seed.yaml");
        let seed = read_seed(&path).unwrap();

        let views: Vec<_> = seed.iter().map(|a| (a.category, a.play_count)).collect();
        assert_eq!(
            views,
            vec![
                (Category::Brand, 1240),
                (Category::UseCase, 856),
                (Category::Vision, 542)
            ]
        );
        assert!(seed.iter().all(|a| a.title == Asset::title_for(a.category, 1)));
        assert!(crate::core::SlotRegistry::with_seed(VersionPolicy::Continue, seed).is_ok());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project/.vidslot");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            resolve_path(&base, "./state"),
            PathBuf::from("/home/user/project/.vidslot/./state")
        );
    }
}
