//! Authenticated request pipeline for the NutriTrack API.
//!
//! There are two key structs in this crate: `Interceptor` and `AuthClient`.
//! `Interceptor` attaches bearer tokens to backend requests and renews the
//! session when the backend answers 401, with at most one refresh in flight.
//! `AuthClient` wraps an `httpclient::Client` with the interceptor installed
//! as middleware, and adds the login, register, me and logout calls.
//!
//! ```no_run
//! # async fn run() -> nutritrack_auth::Result<()> {
//! use nutritrack_auth::{AuthClient, Config, LoginRequest};
//!
//! let auth = AuthClient::new(Config::from_env()?);
//! auth.login(&LoginRequest {
//!     email: "ana@example.com".into(),
//!     password: "hunter22".into(),
//! })
//! .await?;
//! let me = auth.me().await?;
//! # let _ = me;
//! # Ok(())
//! # }
//! ```
pub use auth::{AuthClient, LoginRequest, RegisterRequest, RegisterResponse};
pub use config::{Config, DEFAULT_API_BASE_URL};
pub use error::{Error, Result};
pub use guard::AuthGuard;
pub use interceptor::{AuthRequest, HttpStatus, Interceptor};
pub use middleware::AuthMiddleware;
pub use navigation::{LoginReason, LoginRedirect, Navigator, RecordingNavigator, DEFAULT_LOGIN_ROUTE};
pub use public::{PublicPaths, LOGIN_PATH, ME_PATH, METRICS_PATH, REFRESH_PATH, REGISTER_PATH};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshTicket, RefreshWaiter, Turn};
pub use session::{SessionTokens, Sex, UserProfile};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

mod auth;
mod config;
mod error;
mod guard;
mod interceptor;
mod middleware;
mod navigation;
mod public;
mod refresh;
mod session;
mod store;
