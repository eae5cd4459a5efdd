use url::{Origin, Url};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const ME_PATH: &str = "/api/auth/me";
pub const METRICS_PATH: &str = "/api/metrics";

const FALLBACK_BASE: &str = "http://localhost";

/// Decides which requests are ours to authorize.
#[derive(Debug, Clone)]
pub struct PublicPaths {
    /// `None` when the configured base url does not parse.
    origin: Option<Origin>,
    base: Url,
    paths: Vec<String>,
}

impl PublicPaths {
    pub fn new(api_base_url: &str) -> Self {
        Self::with_paths(
            api_base_url,
            [REGISTER_PATH, LOGIN_PATH, REFRESH_PATH, METRICS_PATH],
        )
    }

    pub fn with_paths<I, S>(api_base_url: &str, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let configured = Url::parse(api_base_url).ok();
        let origin = configured.as_ref().map(Url::origin);
        let base = configured
            .or_else(|| Url::parse(FALLBACK_BASE).ok())
            .expect("fallback base is a valid url");
        Self {
            origin,
            base,
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Relative paths and absolute urls on the api origin (scheme, host and
    /// port). Scheme-relative `//host/..` urls are resolved, not trusted.
    pub fn is_backend(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(absolute) => self.origin.as_ref() == Some(&absolute.origin()),
            Err(_) if url.starts_with('/') => self
                .base
                .join(url)
                .is_ok_and(|resolved| resolved.origin() == self.base.origin()),
            Err(_) => false,
        }
    }

    /// Requests that must never carry a bearer token.
    pub fn is_public(&self, url: &str) -> bool {
        let Some(path) = self.path_of(url) else {
            return false;
        };
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Login and refresh calls. A 401 from these is final.
    pub fn is_auth_call(&self, url: &str) -> bool {
        self.path_of(url)
            .is_some_and(|path| path.starts_with(LOGIN_PATH) || path.starts_with(REFRESH_PATH))
    }

    fn path_of(&self, url: &str) -> Option<String> {
        self.base.join(url).ok().map(|u| u.path().to_string())
    }
}
