use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Why the user is being sent to the login view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginReason {
    /// A protected view was opened without a session.
    Required,
    /// The session existed but could not be renewed.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRedirect {
    #[serde(rename = "auth")]
    pub reason: LoginReason,
    /// Where to send the user after a successful login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl LoginRedirect {
    pub fn required() -> Self {
        Self {
            reason: LoginReason::Required,
            redirect: None,
        }
    }

    pub fn expired() -> Self {
        Self {
            reason: LoginReason::Expired,
            redirect: None,
        }
    }

    pub fn return_to(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }

    /// Render as `{login_route}?auth=...`.
    pub fn to_url(&self, login_route: &str) -> String {
        match serde_qs::to_string(self) {
            Ok(query) if !query.is_empty() => format!("{login_route}?{query}"),
            _ => login_route.to_string(),
        }
    }
}

/// Client-side navigation. Only installed where navigation is possible;
/// headless contexts run without one.
pub trait Navigator: Send + Sync + Debug {
    /// `url` is the login route with its query, e.g. `/login?auth=expired`.
    fn navigate_to_login(&self, url: &str);
}

/// Keeps every requested login url instead of acting on it.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.redirects.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to_login(&self, url: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_reason_query() {
        assert_eq!(LoginRedirect::expired().to_url("/login"), "/login?auth=expired");
        assert_eq!(LoginRedirect::required().to_url("/login"), "/login?auth=required");
    }

    #[test]
    fn includes_return_path() {
        let url = LoginRedirect::required().return_to("profile").to_url("/login");
        assert_eq!(url, "/login?auth=required&redirect=profile");
    }

    #[test]
    fn custom_login_route() {
        let url = LoginRedirect::expired().to_url("/signin");
        assert_eq!(url, "/signin?auth=expired");
    }

    #[test]
    fn recording_navigator_keeps_history() {
        let nav = RecordingNavigator::new();
        assert_eq!(nav.last(), None);
        nav.navigate_to_login(&LoginRedirect::required().to_url(DEFAULT_LOGIN_ROUTE));
        nav.navigate_to_login(&LoginRedirect::expired().to_url(DEFAULT_LOGIN_ROUTE));
        assert_eq!(nav.count(), 2);
        assert_eq!(nav.last().as_deref(), Some("/login?auth=expired"));
    }
}
