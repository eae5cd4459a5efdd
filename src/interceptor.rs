use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::navigation::{LoginRedirect, Navigator, DEFAULT_LOGIN_ROUTE};
use crate::public::PublicPaths;
use crate::refresh::{RefreshCoordinator, RefreshOutcome, Turn};
use crate::session::SessionTokens;
use crate::store::TokenStore;

const UNAUTHORIZED: u16 = 401;

/// An outbound request the interceptor can inspect and authorize.
pub trait AuthRequest: Clone + Send {
    fn url(&self) -> String;
    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    fn set_bearer(&mut self, token: &str);
}

pub trait HttpStatus {
    fn status_code(&self) -> u16;
}

pub type RefreshCallback = Arc<dyn Fn(&SessionTokens) + Send + Sync>;

/// Attaches bearer tokens to backend requests and recovers from expired
/// access tokens with at most one refresh in flight.
pub struct Interceptor {
    store: Arc<dyn TokenStore>,
    paths: PublicPaths,
    coordinator: RefreshCoordinator,
    navigator: Option<Arc<dyn Navigator>>,
    login_route: String,
    on_refresh: Option<RefreshCallback>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("store", &self.store)
            .field("paths", &self.paths)
            .field("coordinator", &self.coordinator)
            .field("navigator", &self.navigator)
            .field("login_route", &self.login_route)
            .field("on_refresh", &self.on_refresh.is_some())
            .finish()
    }
}

impl Interceptor {
    pub fn new(store: Arc<dyn TokenStore>, paths: PublicPaths) -> Self {
        Self {
            store,
            paths,
            coordinator: RefreshCoordinator::new(),
            navigator: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            on_refresh: None,
        }
    }

    /// Redirects to login are only attempted with a navigator installed.
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn on_refresh(mut self, callback: impl Fn(&SessionTokens) + Send + Sync + 'static) -> Self {
        self.on_refresh = Some(Arc::new(callback));
        self
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn paths(&self) -> &PublicPaths {
        &self.paths
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Send `request`, authorizing it when it targets a protected backend
    /// route.
    ///
    /// A 401 is answered by refreshing the session (or joining a refresh that
    /// is already running) and retrying the request once. When the session
    /// cannot be recovered the original 401 response is returned, after the
    /// stored tokens have been cleared. Transport errors are returned as-is.
    pub async fn intercept<R, S, E, Dispatch, DispatchFut, Refresh, RefreshFut>(
        &self,
        request: R,
        send: Dispatch,
        refresh: Refresh,
    ) -> Result<S, E>
    where
        R: AuthRequest,
        S: HttpStatus,
        Dispatch: Fn(R) -> DispatchFut,
        DispatchFut: Future<Output = Result<S, E>>,
        Refresh: FnOnce(String) -> RefreshFut,
        RefreshFut: Future<Output = Result<SessionTokens>>,
    {
        let url = request.url();
        if !self.paths.is_backend(&url) || self.paths.is_public(&url) {
            return send(request).await;
        }

        let sent_token = self.store.access_token();
        let mut authorized = request.clone();
        if let Some(token) = &sent_token {
            authorized.set_bearer(token);
        }
        let response = send(authorized).await?;
        if response.status_code() != UNAUTHORIZED {
            return Ok(response);
        }
        if self.paths.is_auth_call(&url) {
            debug!(%url, "auth call rejected, not refreshing");
            return Ok(response);
        }

        let ticket = match self.coordinator.begin() {
            Turn::Wait(waiter) => {
                debug!(%url, "waiting for in-flight token refresh");
                return match waiter.outcome().await {
                    RefreshOutcome::Refreshed(token) => retry(request, &token, &send).await,
                    RefreshOutcome::Failed => Ok(response),
                };
            }
            Turn::Lead(ticket) => ticket,
        };

        // Another request refreshed between our send and our 401.
        let current = self.store.access_token();
        if let Some(current) = current.filter(|t| Some(t) != sent_token.as_ref()) {
            debug!(%url, "access token already rotated, retrying");
            ticket.settle(RefreshOutcome::Refreshed(current.clone()));
            return retry(request, &current, &send).await;
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            info!(%url, "no refresh token, ending session");
            self.end_session();
            ticket.settle(RefreshOutcome::Failed);
            return Ok(response);
        };

        match refresh(refresh_token.clone()).await {
            Ok(tokens) => {
                let tokens = tokens.or_refresh_token(Some(refresh_token));
                self.store.set_tokens(&tokens);
                if let Some(callback) = &self.on_refresh {
                    callback(&tokens);
                }
                info!("access token refreshed");
                ticket.settle(RefreshOutcome::Refreshed(tokens.access_token.clone()));
                retry(request, &tokens.access_token, &send).await
            }
            Err(e) => {
                warn!(%url, error = %e, "token refresh failed, ending session");
                self.end_session();
                ticket.settle(RefreshOutcome::Failed);
                Ok(response)
            }
        }
    }

    fn end_session(&self) {
        self.store.clear();
        if let Some(navigator) = &self.navigator {
            navigator.navigate_to_login(&LoginRedirect::expired().to_url(&self.login_route));
        }
    }
}

/// The retried response is final, whatever its status.
async fn retry<R, S, E, Dispatch, DispatchFut>(
    mut request: R,
    token: &str,
    send: &Dispatch,
) -> Result<S, E>
where
    R: AuthRequest,
    Dispatch: Fn(R) -> DispatchFut,
    DispatchFut: Future<Output = Result<S, E>>,
{
    request.set_bearer(token);
    send(request).await
}
