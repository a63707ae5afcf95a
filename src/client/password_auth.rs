//! Direct username/password authentication against a Cognito endpoint.
//!
//! Local Cognito emulators do not implement the SRP challenge-response flow,
//! so local builds call `InitiateAuth` with `USER_PASSWORD_AUTH` directly.
//! This sends the raw password; production builds use
//! [`ChallengeResponseAuth`](crate::client::cognito::ChallengeResponseAuth).

use crate::CognitoConfig;
use crate::client::auth::AuthenticationError;
use crate::client::jwt::decode_id_token_to_user;
use crate::client::session::SessionStore;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing;

/// `X-Amz-Target` of the Cognito `InitiateAuth` operation
pub const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";

/// Content type of AWS JSON 1.1 requests
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Message used when a rejection carries no message of its own
pub const GENERIC_FAILURE_MESSAGE: &str = "Authentication failed";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    client_id: &'a str,
    auth_flow: &'static str,
    auth_parameters: AuthParameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct AuthParameters<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
}

/// Error body returned by Cognito.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Password flow strategy.
#[derive(Clone, Debug)]
pub struct PasswordAuth {
    http: reqwest::Client,
    url: String,
    client_id: String,
    session: SessionStore,
}

impl PasswordAuth {
    pub fn new(config: &CognitoConfig, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.initiate_auth_url(),
            client_id: config.client_id.clone(),
            session,
        }
    }

    /// Authenticates with a single `InitiateAuth` call and stores the session.
    ///
    /// No retry: a failed attempt must be retried by the caller.
    ///
    /// # Errors
    ///
    /// - `Rejected` with the remote message on a non-success status
    /// - `Transport` when the request or the response body fails
    /// - `ChallengeRequired` when Cognito asks for a further challenge
    /// - `MissingToken` when the response has no `AuthenticationResult.IdToken`
    /// - `MalformedToken` when the ID token cannot be decoded
    /// - `Storage` when the session cannot be persisted
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthenticationError> {
        tracing::trace!("Initiating password flow login at {}", self.url);

        let request = InitiateAuthRequest {
            client_id: &self.client_id,
            auth_flow: "USER_PASSWORD_AUTH",
            auth_parameters: AuthParameters {
                username: email,
                password,
            },
        };

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            // Set before `json()`, which only fills in a missing content type
            .json(&request)
            .send()
            .await
            .inspect_err(|e| tracing::error!("Login request failed: {}", e))?;

        let status = response.status();
        tracing::trace!("InitiateAuth response status: {}", status);

        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());

            tracing::error!("Authentication rejected ({}): {}", status, message);
            return Err(AuthenticationError::Rejected(message));
        }

        let body: InitiateAuthResponse = response.json().await?;

        let id_token = match (body.authentication_result, body.challenge_name) {
            (Some(result), _) => result.id_token,
            (None, Some(challenge)) => {
                tracing::warn!("Login requires further challenge: {}", challenge);
                return Err(AuthenticationError::ChallengeRequired(challenge));
            }
            (None, None) => return Err(AuthenticationError::MissingToken),
        };

        let user = decode_id_token_to_user(&id_token)
            .inspect_err(|e| tracing::error!("Failed to decode ID token: {}", e))?;

        tracing::trace!("Password flow login succeeded for user {}", user.id);
        self.session.set_session(user, id_token)?;
        Ok(())
    }

    /// Clears the session. Never fails.
    pub fn logout(&self) {
        tracing::trace!("Logging out (password flow)");
        self.session.clear_session();
    }

    pub fn get_token(&self) -> Option<String> {
        self.session.get_token()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}
