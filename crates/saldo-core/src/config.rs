//! Runtime settings
//!
//! Settings are resolved once at startup and passed down explicitly. Each key
//! is taken from the first source that has it:
//!
//! 1. Explicit overrides (CLI flags)
//! 2. Environment (`SALDO_*`, plus the legacy `SUPABASE_URL`, `SUPABASE_KEY`
//!    and `GEMINI_KEY` names)
//! 3. The TOML secrets file (`--config`, `SALDO_CONFIG`, or
//!    `<config_dir>/saldo/secrets.toml`)
//! 4. Built-in defaults (never for secrets)

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::ai::BackendKind;
use crate::error::{Error, Result};
use crate::labeler::{LabelPolicy, RetryPolicy};
use crate::statement::ParserRules;

pub const DEFAULT_DATABASE_URL: &str = "saldo.db";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MODEL_HOST: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TABLE: &str = "transacoes";
pub const DEFAULT_ISSUER: &str = "Nubank";
pub const DEFAULT_NOTE: &str = "Upload via SaaS Dashboard";
pub const DEFAULT_THROTTLE_SECS: u64 = 4;

/// Environment variable naming an alternate secrets file
pub const CONFIG_ENV: &str = "SALDO_CONFIG";

/// Scalar keys and the environment variables that may supply them
const ENV_KEYS: &[(&str, &[&str])] = &[
    ("database_url", &["SALDO_DATABASE_URL", "SUPABASE_URL"]),
    ("database_key", &["SALDO_DATABASE_KEY", "SUPABASE_KEY"]),
    ("model_api_key", &["SALDO_MODEL_API_KEY", "GEMINI_KEY"]),
    ("ai_backend", &["SALDO_AI_BACKEND"]),
    ("model", &["SALDO_MODEL"]),
    ("model_host", &["SALDO_MODEL_HOST"]),
    ("table", &["SALDO_TABLE"]),
    ("issuer", &["SALDO_ISSUER"]),
    ("note", &["SALDO_NOTE"]),
    ("throttle_secs", &["SALDO_THROTTLE_SECS"]),
    ("label_policy", &["SALDO_LABEL_POLICY"]),
];

const SECRET_KEYS: &[&str] = &["database_key", "model_api_key"];

/// Where a setting came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Override,
    Environment(String),
    SecretsFile(PathBuf),
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Override => write!(f, "command line"),
            ConfigSource::Environment(var) => write!(f, "env {}", var),
            ConfigSource::SecretsFile(path) => write!(f, "{}", path.display()),
            ConfigSource::Default => write!(f, "default"),
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub ai_backend: Option<String>,
    pub model: Option<String>,
    pub throttle_secs: Option<u64>,
}

impl Overrides {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "database_url" => self.database_url.clone(),
            "ai_backend" => self.ai_backend.clone(),
            "model" => self.model.clone(),
            "throttle_secs" => self.throttle_secs.map(|s| s.to_string()),
            _ => None,
        }
    }
}

/// Secrets file layout
///
/// Keys also accept the upper-case names used by hosted secret stores.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(alias = "SUPABASE_URL")]
    database_url: Option<String>,
    #[serde(alias = "SUPABASE_KEY")]
    database_key: Option<String>,
    #[serde(alias = "GEMINI_KEY")]
    model_api_key: Option<String>,
    ai_backend: Option<String>,
    model: Option<String>,
    model_host: Option<String>,
    table: Option<String>,
    issuer: Option<String>,
    note: Option<String>,
    throttle_secs: Option<u64>,
    label_policy: Option<String>,
    retry: Option<RawRetry>,
    parser: Option<ParserRules>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRetry {
    max_attempts: Option<u32>,
    backoff_secs: Option<u64>,
    rate_limit_markers: Option<Vec<String>>,
}

impl RawConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "database_url" => self.database_url.clone(),
            "database_key" => self.database_key.clone(),
            "model_api_key" => self.model_api_key.clone(),
            "ai_backend" => self.ai_backend.clone(),
            "model" => self.model.clone(),
            "model_host" => self.model_host.clone(),
            "table" => self.table.clone(),
            "issuer" => self.issuer.clone(),
            "note" => self.note.clone(),
            "throttle_secs" => self.throttle_secs.map(|s| s.to_string()),
            "label_policy" => self.label_policy.clone(),
            _ => None,
        }
    }
}

/// Resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite path (optionally `sqlite://`) or `http(s)://` PostgREST base URL
    pub database_url: String,
    /// SQLCipher passphrase (SQLite) or API key (REST)
    pub database_key: Option<String>,
    pub model_api_key: Option<String>,
    pub ai_backend: BackendKind,
    pub model: String,
    pub model_host: String,
    /// REST table name
    pub table: String,
    /// Value stored in each record's `source`
    pub issuer: String,
    /// Value stored in each record's `note`
    pub note: String,
    pub label_policy: LabelPolicy,
    pub retry: RetryPolicy,
    /// Delay after each classified line
    pub throttle: Duration,
    pub parser: ParserRules,
    sources: BTreeMap<&'static str, ConfigSource>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_key: None,
            model_api_key: None,
            ai_backend: BackendKind::default(),
            model: DEFAULT_MODEL.to_string(),
            model_host: DEFAULT_MODEL_HOST.to_string(),
            table: DEFAULT_TABLE.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            note: DEFAULT_NOTE.to_string(),
            label_policy: LabelPolicy::default(),
            retry: RetryPolicy::default(),
            throttle: Duration::from_secs(DEFAULT_THROTTLE_SECS),
            parser: ParserRules::default(),
            sources: BTreeMap::new(),
        }
    }
}

/// Default secrets file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("saldo").join("secrets.toml"))
}

impl Settings {
    /// Resolve settings from the process environment and the secrets file
    ///
    /// `config_path` is an explicit `--config`; a missing explicit file is an
    /// error, a missing default file is not.
    pub fn load(overrides: &Overrides, config_path: Option<&Path>) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();

        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| env.get(CONFIG_ENV).map(PathBuf::from));

        let file = match explicit {
            Some(path) => Some((read_config(&path)?, path)),
            None => match default_config_path() {
                Some(path) if path.exists() => Some((read_config(&path)?, path)),
                _ => None,
            },
        };

        Self::resolve(overrides, &env, file)
    }

    /// Resolve settings from explicit sources
    pub fn resolve(
        overrides: &Overrides,
        env: &HashMap<String, String>,
        file: Option<(RawConfigFile, PathBuf)>,
    ) -> Result<Self> {
        let (raw, file_path) = match file {
            Some((RawConfigFile(raw), path)) => (raw, Some(path)),
            None => (RawConfig::default(), None),
        };

        let mut settings = Settings::default();
        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();

        for (key, vars) in ENV_KEYS {
            let picked = overrides
                .get(key)
                .map(|v| (v, ConfigSource::Override))
                .or_else(|| {
                    vars.iter().find_map(|var| {
                        env.get(*var)
                            .filter(|v| !v.trim().is_empty())
                            .map(|v| (v.clone(), ConfigSource::Environment(var.to_string())))
                    })
                })
                .or_else(|| {
                    let path = file_path.clone()?;
                    raw.get(key).map(|v| (v, ConfigSource::SecretsFile(path)))
                });

            match picked {
                Some((value, source)) => {
                    values.insert(*key, value);
                    settings.sources.insert(*key, source);
                }
                None => {
                    settings.sources.insert(*key, ConfigSource::Default);
                }
            }
        }

        if let Some(v) = values.remove("database_url") {
            settings.database_url = v;
        }
        settings.database_key = values.remove("database_key");
        settings.model_api_key = values.remove("model_api_key");
        if let Some(v) = values.remove("ai_backend") {
            settings.ai_backend = v.parse().map_err(Error::Config)?;
        }
        if let Some(v) = values.remove("model") {
            settings.model = v;
        }
        if let Some(v) = values.remove("model_host") {
            settings.model_host = v;
        }
        if let Some(v) = values.remove("table") {
            settings.table = v;
        }
        if let Some(v) = values.remove("issuer") {
            settings.issuer = v;
        }
        if let Some(v) = values.remove("note") {
            settings.note = v;
        }
        if let Some(v) = values.remove("throttle_secs") {
            let secs: u64 = v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid throttle_secs: {}", v)))?;
            settings.throttle = Duration::from_secs(secs);
        }
        if let Some(v) = values.remove("label_policy") {
            settings.label_policy = v.parse().map_err(Error::Config)?;
        }

        if let Some(retry) = raw.retry {
            if let Some(n) = retry.max_attempts {
                if n == 0 {
                    return Err(Error::Config("retry.max_attempts must be at least 1".into()));
                }
                settings.retry.max_attempts = n;
            }
            if let Some(secs) = retry.backoff_secs {
                settings.retry.backoff = Duration::from_secs(secs);
            }
            if let Some(markers) = retry.rate_limit_markers {
                settings.retry.rate_limit_markers = markers;
            }
        }
        if let Some(parser) = raw.parser {
            settings.parser = parser;
        }

        debug!(
            database_url = %settings.database_url,
            backend = settings.ai_backend.as_str(),
            model = %settings.model,
            "Settings resolved"
        );
        Ok(settings)
    }

    /// True when the store is a hosted REST table
    pub fn uses_rest_store(&self) -> bool {
        self.database_url.starts_with("http://") || self.database_url.starts_with("https://")
    }

    /// Where `key` came from (None for keys that only exist in the file)
    pub fn source(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    /// Key / display value / source rows, with secrets masked
    pub fn describe(&self) -> Vec<(String, String, String)> {
        let value_of = |key: &str| -> Option<String> {
            match key {
                "database_url" => Some(self.database_url.clone()),
                "database_key" => self.database_key.clone(),
                "model_api_key" => self.model_api_key.clone(),
                "ai_backend" => Some(self.ai_backend.as_str().to_string()),
                "model" => Some(self.model.clone()),
                "model_host" => Some(self.model_host.clone()),
                "table" => Some(self.table.clone()),
                "issuer" => Some(self.issuer.clone()),
                "note" => Some(self.note.clone()),
                "throttle_secs" => Some(self.throttle.as_secs().to_string()),
                "label_policy" => Some(format!("{:?}", self.label_policy).to_lowercase()),
                _ => None,
            }
        };

        ENV_KEYS
            .iter()
            .map(|(key, _)| {
                let display = match value_of(key) {
                    Some(v) if SECRET_KEYS.contains(key) => mask(&v),
                    Some(v) => v,
                    None => "(not set)".to_string(),
                };
                let source = self
                    .sources
                    .get(key)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| ConfigSource::Default.to_string());
                (key.to_string(), display, source)
            })
            .collect()
    }
}

/// A parsed secrets file
#[derive(Debug, Default)]
pub struct RawConfigFile(RawConfig);

impl RawConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(Self(toml::from_str(content)?))
    }
}

fn read_config(path: &Path) -> Result<RawConfigFile> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    RawConfigFile::parse(&content)
}

/// Keep the first four characters of a secret
fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn file(content: &str) -> Option<(RawConfigFile, PathBuf)> {
        Some((
            RawConfigFile::parse(content).unwrap(),
            PathBuf::from("/etc/saldo/secrets.toml"),
        ))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&Overrides::default(), &env(&[]), None).unwrap();
        assert_eq!(settings.database_url, "saldo.db");
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.table, "transacoes");
        assert_eq!(settings.issuer, "Nubank");
        assert_eq!(settings.note, "Upload via SaaS Dashboard");
        assert_eq!(settings.throttle, Duration::from_secs(4));
        assert_eq!(settings.retry, RetryPolicy::default());
        assert!(settings.database_key.is_none());
        assert!(settings.model_api_key.is_none());
        assert_eq!(settings.source("model"), Some(&ConfigSource::Default));
    }

    #[test]
    fn test_precedence_override_env_file() {
        let overrides = Overrides {
            model: Some("from-flag".into()),
            ..Default::default()
        };
        let env = env(&[("SALDO_MODEL", "from-env"), ("SALDO_TABLE", "env_table")]);
        let file = file(
            r#"
            model = "from-file"
            table = "file_table"
            issuer = "Inter"
            "#,
        );

        let settings = Settings::resolve(&overrides, &env, file).unwrap();
        assert_eq!(settings.model, "from-flag");
        assert_eq!(settings.table, "env_table");
        assert_eq!(settings.issuer, "Inter");
        assert_eq!(settings.source("model"), Some(&ConfigSource::Override));
        assert_eq!(
            settings.source("table"),
            Some(&ConfigSource::Environment("SALDO_TABLE".into()))
        );
        assert_eq!(
            settings.source("issuer"),
            Some(&ConfigSource::SecretsFile(PathBuf::from("/etc/saldo/secrets.toml")))
        );
    }

    #[test]
    fn test_legacy_env_names() {
        let env = env(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_KEY", "anon-key"),
            ("GEMINI_KEY", "gem-key"),
        ]);
        let settings = Settings::resolve(&Overrides::default(), &env, None).unwrap();
        assert_eq!(settings.database_url, "https://abc.supabase.co");
        assert_eq!(settings.database_key.as_deref(), Some("anon-key"));
        assert_eq!(settings.model_api_key.as_deref(), Some("gem-key"));
        assert!(settings.uses_rest_store());
    }

    #[test]
    fn test_saldo_names_win_over_legacy() {
        let env = env(&[("GEMINI_KEY", "old"), ("SALDO_MODEL_API_KEY", "new")]);
        let settings = Settings::resolve(&Overrides::default(), &env, None).unwrap();
        assert_eq!(settings.model_api_key.as_deref(), Some("new"));
    }

    #[test]
    fn test_file_accepts_upper_case_keys() {
        let file = file(
            r#"
            SUPABASE_URL = "https://xyz.supabase.co"
            SUPABASE_KEY = "k1"
            GEMINI_KEY = "k2"
            "#,
        );
        let settings = Settings::resolve(&Overrides::default(), &env(&[]), file).unwrap();
        assert_eq!(settings.database_url, "https://xyz.supabase.co");
        assert_eq!(settings.database_key.as_deref(), Some("k1"));
        assert_eq!(settings.model_api_key.as_deref(), Some("k2"));
    }

    #[test]
    fn test_retry_and_parser_tables() {
        let file = file(
            r#"
            throttle_secs = 0
            label_policy = "lenient"

            [retry]
            max_attempts = 5
            backoff_secs = 2

            [parser]
            exclusions = ["Saldo", "Total de", "Limite disponível"]
            "#,
        );
        let settings = Settings::resolve(&Overrides::default(), &env(&[]), file).unwrap();
        assert_eq!(settings.throttle, Duration::ZERO);
        assert_eq!(settings.label_policy, LabelPolicy::Lenient);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.backoff, Duration::from_secs(2));
        assert_eq!(settings.retry.rate_limit_markers.len(), 2);
        assert_eq!(settings.parser.exclusions.len(), 3);
        assert_eq!(settings.parser.months.len(), 12);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let bad_backend = env(&[("SALDO_AI_BACKEND", "skynet")]);
        assert!(Settings::resolve(&Overrides::default(), &bad_backend, None).is_err());

        let bad_throttle = env(&[("SALDO_THROTTLE_SECS", "soon")]);
        assert!(Settings::resolve(&Overrides::default(), &bad_throttle, None).is_err());

        let zero_attempts = file("[retry]\nmax_attempts = 0");
        assert!(Settings::resolve(&Overrides::default(), &env(&[]), zero_attempts).is_err());
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let env = env(&[("SALDO_MODEL", "  ")]);
        let settings = Settings::resolve(&Overrides::default(), &env, None).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_describe_masks_secrets() {
        let env = env(&[("SALDO_MODEL_API_KEY", "AIzaSyVerySecret")]);
        let settings = Settings::resolve(&Overrides::default(), &env, None).unwrap();
        let rows = settings.describe();

        let key_row = rows.iter().find(|(k, _, _)| k == "model_api_key").unwrap();
        assert_eq!(key_row.1, "AIza****");
        assert_eq!(key_row.2, "env SALDO_MODEL_API_KEY");

        let db_key_row = rows.iter().find(|(k, _, _)| k == "database_key").unwrap();
        assert_eq!(db_key_row.1, "(not set)");
        assert!(!rows.iter().any(|(_, v, _)| v.contains("VerySecret")));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "table = \"from_load\"\n").unwrap();

        let settings = Settings::load(&Overrides::default(), Some(&path)).unwrap();
        if std::env::var("SALDO_TABLE").is_err() {
            assert_eq!(settings.table, "from_load");
        }
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = Settings::load(&Overrides::default(), Some(Path::new("/nonexistent/s.toml")))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("abcdefgh"), "abcd****");
    }
}
