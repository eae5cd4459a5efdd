use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::guard::AuthGuard;
use crate::interceptor::Interceptor;
use crate::navigation::DEFAULT_LOGIN_ROUTE;
use crate::public::{PublicPaths, LOGIN_PATH, METRICS_PATH, REFRESH_PATH, REGISTER_PATH};
use crate::store::{FileTokenStore, MemoryTokenStore, TokenStore};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Origin of the backend, e.g. `https://backend-nutritrack.onrender.com`.
    pub api_base_url: String,
    /// Client-side route unauthenticated users are sent to.
    pub login_route: String,
    /// Path prefixes that never receive a bearer token.
    pub public_paths: Vec<String>,
    /// Persist tokens here. Tokens are kept in memory when unset.
    pub token_file: Option<PathBuf>,
}

impl Config {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            public_paths: [REGISTER_PATH, LOGIN_PATH, REFRESH_PATH, METRICS_PATH]
                .into_iter()
                .map(String::from)
                .collect(),
            token_file: None,
        }
    }

    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    /// Read `NUTRITRACK_*` variables from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = load(&lookup, "NUTRITRACK_API_BASE_URL", DEFAULT_API_BASE_URL);
        Url::parse(&api_base_url).map_err(|e| Error::Config {
            key: "NUTRITRACK_API_BASE_URL",
            message: e.to_string(),
        })?;

        let mut config = Self::new(api_base_url)
            .login_route(load(&lookup, "NUTRITRACK_LOGIN_ROUTE", DEFAULT_LOGIN_ROUTE));
        if let Some(paths) = lookup("NUTRITRACK_PUBLIC_PATHS") {
            config.public_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        config.token_file = lookup("NUTRITRACK_TOKEN_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Ok(config)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base_url)
    }

    pub fn refresh_endpoint(&self) -> String {
        self.url(REFRESH_PATH)
    }

    pub fn public_paths(&self) -> PublicPaths {
        PublicPaths::with_paths(&self.api_base_url, self.public_paths.iter().cloned())
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match &self.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        }
    }

    /// An interceptor over a fresh token store, redirecting to `login_route`.
    pub fn interceptor(&self) -> Interceptor {
        Interceptor::new(self.token_store(), self.public_paths()).login_route(&self.login_route)
    }

    /// A guard sharing `store`, redirecting to `login_route`.
    pub fn guard(&self, store: Arc<dyn TokenStore>) -> AuthGuard {
        AuthGuard::new(store).login_route(&self.login_route)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

fn load(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::navigation::RecordingNavigator;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.refresh_endpoint(), "http://localhost:8080/api/auth/refresh");
        assert_eq!(config.login_route, "/login");
        assert!(config.public_paths().is_public("/api/metrics"));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("NUTRITRACK_API_BASE_URL", "https://backend-nutritrack.onrender.com/"),
            ("NUTRITRACK_PUBLIC_PATHS", "/api/auth/login, /api/health"),
            ("NUTRITRACK_TOKEN_FILE", "/tmp/nutritrack/tokens.json"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://backend-nutritrack.onrender.com");
        assert_eq!(config.url("/api/meals"), "https://backend-nutritrack.onrender.com/api/meals");
        assert_eq!(config.public_paths, vec!["/api/auth/login", "/api/health"]);
        assert_eq!(config.token_file, Some(PathBuf::from("/tmp/nutritrack/tokens.json")));

        let paths = config.public_paths();
        assert!(paths.is_public("/api/health"));
        assert!(!paths.is_public("/api/metrics"));
    }

    #[test]
    fn login_route_reaches_the_redirect() {
        let config = Config::from_lookup(lookup(&[("NUTRITRACK_LOGIN_ROUTE", "/signin")])).unwrap();
        assert_eq!(config.login_route, "/signin");

        let nav = Arc::new(RecordingNavigator::new());
        let guard = config.guard(config.token_store()).with_navigator(nav.clone());
        assert!(!guard.can_activate(None));
        assert_eq!(nav.last().as_deref(), Some("/signin?auth=required"));
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = Config::from_lookup(lookup(&[("NUTRITRACK_API_BASE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, Error::Config { key: "NUTRITRACK_API_BASE_URL", .. }));
    }
}
