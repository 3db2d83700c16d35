// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use config::{Config as ConfigFile, File, Environment};
use url::Url;

use crate::credential::Credential;
use crate::error::ConfigurationError;
use crate::store::CookieScope;

const DEFAULT_COOKIE_NAME: &str = "access_token";
const DEFAULT_QUERY_PARAM: &str = "token";
// Two hours
const DEFAULT_COOKIE_MAX_AGE: i64 = 7200;
const DEFAULT_IDENTITY_PATH: &str = "/me";
const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;

/// Deployment environment. Selects the environment-specific config file and
/// the cookie defaults; nothing else branches on it at runtime.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

/// What the edge does with a navigation that carries no credential at all.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Send the browser to the configured login URL.
    #[default]
    RedirectToLogin,
    /// Let the request through unauthenticated and log a warning.
    PassThrough,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CookieSameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// Raw settings as layered by the `config` crate, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigSource {
    pub run_mode: Option<RunMode>,
    pub web_server_addr: Option<String>,
    pub api_base_url: Option<String>,
    pub app_url: Option<String>,
    pub login_url: Option<String>,
    pub gate: GatePolicy,
    pub excluded_prefixes: Option<Vec<String>>,
    pub credential: CredentialSection,
    pub identity: IdentitySection,
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialSection {
    pub cookie_name: Option<String>,
    pub query_param: Option<String>,
    pub max_age_secs: Option<i64>,
    pub cookie_secure: Option<bool>,
    pub cookie_same_site: Option<CookieSameSite>,
    pub cookie_http_only: Option<bool>,
    pub fallback_credential: Option<String>,
    pub allow_local_credential_fallback: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    pub path: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

/// Credential transport policy, resolved once from the run mode and overrides.
#[derive(Clone, Debug)]
pub struct CredentialPolicy {
    pub cookie_name: String,
    pub query_param: String,
    pub max_age_secs: i64,
    pub cookie_secure: bool,
    pub cookie_same_site: CookieSameSite,
    pub cookie_http_only: bool,
    pub fallback_credential: Option<Credential>,
    pub allow_local_credential_fallback: bool,
}

#[derive(Clone, Debug)]
pub struct IdentitySettings {
    pub path: String,
    pub timeout: Duration,
}

/// Validated configuration shared by the web server and the dashboard client.
#[derive(Clone, Debug)]
pub struct Config {
    pub run_mode: RunMode,
    pub web_server_addr: String,
    pub api_base_url: Url,
    pub app_url: Url,
    pub login_url: Url,
    pub gate: GatePolicy,
    pub excluded_prefixes: Vec<String>,
    pub credential: CredentialPolicy,
    pub identity: IdentitySettings,
    pub static_files: StaticFilesConfig,
}

impl Config {
    /// Load configuration from file and environment, then validate it.
    pub fn load() -> Result<Self, ConfigurationError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let source: ConfigSource = ConfigFile::builder()
            .set_default("run_mode", run_mode.as_str())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. APP__API_BASE_URL, APP__CREDENTIAL__FALLBACK_CREDENTIAL
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Self::from_source(source)
    }

    /// Validate raw settings. Fails on the first missing or malformed value.
    pub fn from_source(source: ConfigSource) -> Result<Self, ConfigurationError> {
        let run_mode = source.run_mode.unwrap_or_default();
        let production = run_mode == RunMode::Production;

        let api_base_url = required_url("api_base_url", source.api_base_url)?;
        let app_url = required_url("app_url", source.app_url)?;
        let login_url = required_url("login_url", source.login_url)?;

        let raw = source.credential;
        let cookie_secure = raw.cookie_secure.unwrap_or(production);
        let cookie_same_site = raw.cookie_same_site.unwrap_or_default();
        if cookie_same_site == CookieSameSite::None && !cookie_secure {
            return Err(ConfigurationError::InsecureSameSiteNone);
        }

        // Blank values count as unset
        let fallback_credential = raw
            .fallback_credential
            .as_deref()
            .map(str::trim)
            .and_then(Credential::new);
        if production && (fallback_credential.is_some() || raw.allow_local_credential_fallback) {
            return Err(ConfigurationError::FallbackInProduction);
        }

        #[cfg(not(feature = "dev-fallback"))]
        if fallback_credential.is_some() || raw.allow_local_credential_fallback {
            tracing::warn!("Development credential fallback configured but not compiled in; ignoring");
        }

        let credential = CredentialPolicy {
            cookie_name: non_blank(raw.cookie_name).unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            query_param: non_blank(raw.query_param).unwrap_or_else(|| DEFAULT_QUERY_PARAM.to_string()),
            max_age_secs: raw.max_age_secs.unwrap_or(DEFAULT_COOKIE_MAX_AGE).max(0),
            cookie_secure,
            cookie_same_site,
            cookie_http_only: raw.cookie_http_only.unwrap_or(production),
            fallback_credential,
            allow_local_credential_fallback: raw.allow_local_credential_fallback,
        };

        let identity = IdentitySettings {
            path: non_blank(source.identity.path).unwrap_or_else(|| DEFAULT_IDENTITY_PATH.to_string()),
            timeout: Duration::from_secs(
                source.identity.timeout_secs.unwrap_or(DEFAULT_IDENTITY_TIMEOUT_SECS).max(1),
            ),
        };

        let excluded_prefixes = source.excluded_prefixes.unwrap_or_else(|| {
            ["/assets", "/api", "/favicon.ico", "/auth"]
                .iter()
                .map(|p| p.to_string())
                .collect()
        });

        Ok(Self {
            run_mode,
            web_server_addr: non_blank(source.web_server_addr)
                .unwrap_or_else(|| "127.0.0.1:8081".to_string()),
            api_base_url,
            app_url,
            login_url,
            gate: source.gate,
            excluded_prefixes,
            credential,
            identity,
            static_files: source.static_files,
        })
    }

    /// Cookie attributes every credential write uses.
    pub fn cookie_scope(&self) -> CookieScope {
        CookieScope {
            name: self.credential.cookie_name.clone(),
            path: "/".to_string(),
            max_age_secs: self.credential.max_age_secs,
            same_site: self.credential.cookie_same_site,
            secure: self.credential.cookie_secure,
            http_only: self.credential.cookie_http_only,
        }
    }

    pub fn is_production(&self) -> bool {
        self.run_mode == RunMode::Production
    }
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required_url(key: &'static str, value: Option<String>) -> Result<Url, ConfigurationError> {
    let value = non_blank(value).ok_or(ConfigurationError::Missing(key))?;
    let url = Url::parse(value.trim()).map_err(|e| ConfigurationError::MalformedUrl {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigurationError::MalformedUrl {
            key,
            value,
            reason: "expected an http(s) URL with a host".to_string(),
        });
    }

    Ok(url)
}
