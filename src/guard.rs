use std::sync::Arc;

use tracing::debug;

use crate::navigation::{LoginRedirect, Navigator, DEFAULT_LOGIN_ROUTE};
use crate::store::TokenStore;

/// Decides whether a protected view may open.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    store: Arc<dyn TokenStore>,
    navigator: Option<Arc<dyn Navigator>>,
    login_route: String,
}

impl AuthGuard {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            navigator: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    /// Without a navigator there is nothing to guard (headless rendering),
    /// so every view is allowed.
    pub fn can_activate(&self, return_to: Option<&str>) -> bool {
        let Some(navigator) = &self.navigator else {
            return true;
        };
        if self.store.access_token().is_some() {
            return true;
        }
        debug!(?return_to, "no session, sending to login");
        let mut redirect = LoginRedirect::required();
        redirect.redirect = return_to.map(String::from);
        navigator.navigate_to_login(&redirect.to_url(&self.login_route));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::session::SessionTokens;
    use crate::store::MemoryTokenStore;

    #[test]
    fn allows_with_session() {
        let store = Arc::new(MemoryTokenStore::with_tokens(SessionTokens::new("A1", "R1")));
        let nav = Arc::new(RecordingNavigator::new());
        let guard = AuthGuard::new(store).with_navigator(nav.clone());
        assert!(guard.can_activate(None));
        assert_eq!(nav.count(), 0);
    }

    #[test]
    fn redirects_without_session() {
        let nav = Arc::new(RecordingNavigator::new());
        let guard = AuthGuard::new(Arc::new(MemoryTokenStore::new())).with_navigator(nav.clone());
        assert!(!guard.can_activate(Some("/profile")));
        assert_eq!(nav.last().as_deref(), Some("/login?auth=required&redirect=%2Fprofile"));
    }

    #[test]
    fn redirects_to_configured_route() {
        let nav = Arc::new(RecordingNavigator::new());
        let guard = AuthGuard::new(Arc::new(MemoryTokenStore::new()))
            .with_navigator(nav.clone())
            .login_route("/signin");
        assert!(!guard.can_activate(None));
        assert_eq!(nav.last().as_deref(), Some("/signin?auth=required"));
    }

    #[test]
    fn headless_always_allows() {
        let guard = AuthGuard::new(Arc::new(MemoryTokenStore::new()));
        assert!(guard.can_activate(None));
    }
}
