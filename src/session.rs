//! Canonical records for what the backend hands us.
//!
//! The backend is not consistent about field naming (snake_case on the auth
//! endpoints, camelCase elsewhere, sometimes wrapped in a `session` object).
//! Everything is mapped into the types below on receipt; nothing else in the
//! crate reads raw payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Tokens issued by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "oasgen", derive(oasgen::OaSchema))]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct RawTokens {
    #[serde(alias = "accessToken")]
    access_token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(default, alias = "expiresIn")]
    expires_in: Option<u64>,
}

impl SessionTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: Some(refresh_token.into()),
            expires_in: None,
        }
    }

    /// Map a login or refresh response body into tokens.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let payload = match payload {
            Value::Object(mut map) if map.get("session").is_some_and(Value::is_object) => {
                map.remove("session").unwrap_or_default()
            }
            other => other,
        };
        let raw: RawTokens = serde_json::from_value(payload)?;
        Ok(Self {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token.filter(|t| !t.is_empty()),
            expires_in: raw.expires_in,
        })
    }

    /// Keep the previous refresh token when the backend did not rotate it.
    pub fn or_refresh_token(mut self, previous: Option<String>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "oasgen", derive(oasgen::OaSchema))]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[serde(alias = "FEMALE")]
    Female,
    #[serde(alias = "MALE")]
    Male,
}

/// The signed-in user, as returned by `/api/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "oasgen", derive(oasgen::OaSchema))]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default, alias = "heightCm")]
    pub height_cm: Option<f64>,
    #[serde(default, alias = "weightKg")]
    pub weight_kg: Option<f64>,
    #[serde(default, alias = "dateOfBirth")]
    pub dob: Option<String>,
}

impl UserProfile {
    pub fn from_payload(payload: Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn snake_case_tokens() {
        let tokens = SessionTokens::from_payload(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "expires_in": 900,
        }))
        .unwrap();
        assert_eq!(tokens.access_token, "A1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("R1"));
        assert_eq!(tokens.expires_in, Some(900));
    }

    #[test]
    fn camel_case_nested_in_session() {
        let tokens = SessionTokens::from_payload(json!({
            "session": { "accessToken": "A2", "refreshToken": "R2" },
            "user": { "id": "u1" },
        }))
        .unwrap();
        assert_eq!(tokens, SessionTokens::new("A2", "R2"));
    }

    #[test]
    fn missing_access_token_is_malformed() {
        let err = SessionTokens::from_payload(json!({ "refresh_token": "R1" })).unwrap_err();
        assert!(matches!(err, crate::Error::MalformedPayload(_)));
    }

    #[test]
    fn unrotated_refresh_token_is_kept() {
        let tokens = SessionTokens::from_payload(json!({ "access_token": "A2", "refresh_token": "" }))
            .unwrap()
            .or_refresh_token(Some("R1".into()));
        assert_eq!(tokens.refresh_token.as_deref(), Some("R1"));
    }

    #[test]
    fn profile_accepts_both_conventions() {
        let profile = UserProfile::from_payload(json!({
            "id": "u1",
            "email": "ana@example.com",
            "sex": "FEMALE",
            "heightCm": 165.0,
            "weight_kg": 60.5,
        }))
        .unwrap();
        assert_eq!(profile.sex, Some(Sex::Female));
        assert_eq!(profile.height_cm, Some(165.0));
        assert_eq!(profile.weight_kg, Some(60.5));
        assert_eq!(profile.username, None);
    }
}
