//! Resolver configuration (environment-driven).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::MissingRolePolicy;

pub const ENV_API_URL: &str = "ESGADMIN_API_URL";
pub const ENV_IDENTITY_PATH: &str = "ESGADMIN_IDENTITY_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "ESGADMIN_CACHE_TTL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ESGADMIN_REQUEST_TIMEOUT_SECS";
pub const ENV_MISSING_ROLE_POLICY: &str = "ESGADMIN_MISSING_ROLE_POLICY";
pub const ENV_SESSION_FILE: &str = "ESGADMIN_SESSION_FILE";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_IDENTITY_PATH: &str = "/api/auth/me";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub api_url: String,
    pub identity_path: String,
    /// How long a verified actor is served from cache.
    pub cache_ttl: Duration,
    /// Upper bound on a single identity request.
    pub request_timeout: Duration,
    pub missing_role_policy: MissingRolePolicy,
    pub session_file: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            identity_path: DEFAULT_IDENTITY_PATH.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            missing_role_policy: MissingRolePolicy::default(),
            session_file: default_session_file(),
        }
    }
}

impl ResolverConfig {
    /// Load from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Unparseable numeric or policy values are logged and replaced by their
    /// defaults; empty URL/path values and zero durations are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup(ENV_API_URL).unwrap_or(defaults.api_url);
        if api_url.trim().is_empty() {
            return Err(ConfigError::Empty(ENV_API_URL));
        }

        let identity_path = lookup(ENV_IDENTITY_PATH).unwrap_or(defaults.identity_path);
        if identity_path.trim().is_empty() {
            return Err(ConfigError::Empty(ENV_IDENTITY_PATH));
        }

        let cache_ttl = seconds(&lookup, ENV_CACHE_TTL_SECS, defaults.cache_ttl);
        if cache_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration(ENV_CACHE_TTL_SECS));
        }
        let request_timeout = seconds(&lookup, ENV_REQUEST_TIMEOUT_SECS, defaults.request_timeout);
        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration(ENV_REQUEST_TIMEOUT_SECS));
        }

        let missing_role_policy = match lookup(ENV_MISSING_ROLE_POLICY) {
            None => defaults.missing_role_policy,
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("{err}; using '{:?}'", defaults.missing_role_policy);
                defaults.missing_role_policy
            }),
        };

        let session_file = lookup(ENV_SESSION_FILE)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        Ok(Self {
            api_url,
            identity_path,
            cache_ttl,
            request_timeout,
            missing_role_policy,
            session_file,
        })
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                tracing::warn!("{key}={raw:?} is not a whole number of seconds; using {}s", default.as_secs());
                default
            }
        },
    }
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("esgadmin")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = ResolverConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, "http://localhost:8000");
        assert_eq!(cfg.identity_path, "/api/auth/me");
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.missing_role_policy, MissingRolePolicy::Deny);
        assert!(cfg.session_file.ends_with("esgadmin/session.json"));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = ResolverConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://esg.example.org"),
            (ENV_CACHE_TTL_SECS, "5"),
            (ENV_REQUEST_TIMEOUT_SECS, "2"),
            (ENV_MISSING_ROLE_POLICY, "admin"),
            (ENV_SESSION_FILE, "/tmp/s.json"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, "https://esg.example.org");
        assert_eq!(cfg.cache_ttl, Duration::from_secs(5));
        assert_eq!(cfg.request_timeout, Duration::from_secs(2));
        assert_eq!(cfg.missing_role_policy, MissingRolePolicy::Admin);
        assert_eq!(cfg.session_file, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let cfg = ResolverConfig::from_lookup(lookup(&[
            (ENV_CACHE_TTL_SECS, "soon"),
            (ENV_MISSING_ROLE_POLICY, "allow-all"),
        ]))
        .unwrap();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.missing_role_policy, MissingRolePolicy::Deny);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            ResolverConfig::from_lookup(lookup(&[(ENV_API_URL, " ")])),
            Err(ConfigError::Empty(ENV_API_URL))
        );
        assert_eq!(
            ResolverConfig::from_lookup(lookup(&[(ENV_REQUEST_TIMEOUT_SECS, "0")])),
            Err(ConfigError::ZeroDuration(ENV_REQUEST_TIMEOUT_SECS))
        );
        assert_eq!(
            ResolverConfig::from_lookup(lookup(&[(ENV_CACHE_TTL_SECS, "0")])),
            Err(ConfigError::ZeroDuration(ENV_CACHE_TTL_SECS))
        );
    }
}
