use std::fmt;
use std::sync::Arc;

use httpclient::{Client, InMemoryResponseExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::interceptor::Interceptor;
use crate::middleware::AuthMiddleware;
use crate::navigation::Navigator;
use crate::public::{LOGIN_PATH, ME_PATH, REGISTER_PATH};
use crate::session::{SessionTokens, Sex, UserProfile};
use crate::store::TokenStore;

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// ISO `yyyy-mm-dd`.
    pub dob: String,
    pub sex: Sex,
    pub height_cm: f64,
    pub weight_kg: f64,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("dob", &self.dob)
            .field("sex", &self.sex)
            .field("height_cm", &self.height_cm)
            .field("weight_kg", &self.weight_kg)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the backend's `/api/auth` endpoints.
///
/// Every request made through [`AuthClient::client`] runs through the
/// [`AuthMiddleware`], so application code can use the same client for
/// `/api/meals`, `/api/goals` and `/api/practices`.
pub struct AuthClient {
    client: Client,
    config: Config,
    interceptor: Arc<Interceptor>,
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("config", &self.config)
            .field("interceptor", &self.interceptor)
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    pub fn new(config: Config) -> Self {
        let interceptor = config.interceptor();
        Self::from_interceptor(config, interceptor)
    }

    /// Send the user to `config.login_route` when the session cannot be renewed.
    pub fn with_navigator(config: Config, navigator: Arc<dyn Navigator>) -> Self {
        let interceptor = config.interceptor().with_navigator(navigator);
        Self::from_interceptor(config, interceptor)
    }

    pub fn from_interceptor(config: Config, interceptor: Interceptor) -> Self {
        let interceptor = Arc::new(interceptor);
        let client = Client::new().with_middleware(AuthMiddleware::new(
            interceptor.clone(),
            config.refresh_endpoint(),
        ));
        Self {
            client,
            config,
            interceptor,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        self.interceptor.store()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().access_token().is_some()
    }

    /// Exchange credentials for a session and store it.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<SessionTokens> {
        let res = self
            .client
            .post(&self.config.url(LOGIN_PATH))
            .json(credentials)
            .await?;
        let payload: Value = res.json()?;
        let tokens = SessionTokens::from_payload(payload)?;
        self.store().set_tokens(&tokens);
        info!(email = %credentials.email, "logged in");
        Ok(tokens)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let res = self
            .client
            .post(&self.config.url(REGISTER_PATH))
            .json(request)
            .await?;
        let response: RegisterResponse = res.json()?;
        info!(email = %request.email, id = ?response.id, "registered");
        Ok(response)
    }

    pub async fn me(&self) -> Result<UserProfile> {
        if !self.is_authenticated() {
            return Err(Error::Unauthorized);
        }
        let res = self.client.get(&self.config.url(ME_PATH)).await?;
        let payload: Value = res.json()?;
        UserProfile::from_payload(payload)
    }

    pub fn logout(&self) {
        self.store().clear();
        info!("logged out");
    }
}
