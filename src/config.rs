//! Cognito and API configuration.
//!
//! Values are baked in at compile time by `build.rs` (a browser build has no
//! process environment), but can also be assembled from any key lookup for
//! native hosts and tests.

use serde::{Deserialize, Serialize};

/// Error returned when configuration cannot be assembled.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set (or is empty)
    #[error("Missing required configuration variable: {0}")]
    Missing(&'static str),

    /// The user pool id is not of the form `<region>_<id>`
    #[error("Invalid Cognito user pool id '{0}': expected '<region>_<id>'")]
    InvalidUserPoolId(String),

    /// The challenge-response flow was selected but no provider library was supplied
    #[error("Challenge-response login needs a UserPool; supply one or set USE_PASSWORD_FLOW")]
    MissingUserPool,
}

/// Configuration for Cognito authentication and the GraphQL API.
///
/// # Fields
///
/// - `endpoint`: Cognito endpoint override (e.g. a local emulator)
/// - `client_id`: Cognito app client id
/// - `user_pool_id`: Cognito user pool id, `<region>_<id>`
/// - `api_url`: GraphQL endpoint URL
/// - `use_password_flow`: authenticate with `USER_PASSWORD_AUTH` instead of the
///   challenge-response handshake
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CognitoConfig {
    /// Endpoint override. `None` means the regional AWS endpoint.
    pub endpoint: Option<String>,

    /// Cognito app client id (public identifier).
    pub client_id: String,

    /// Cognito user pool id.
    pub user_pool_id: String,

    /// GraphQL API URL.
    pub api_url: String,

    /// Selects the password flow strategy. Fixed for the life of the process.
    pub use_password_flow: bool,
}

impl CognitoConfig {
    /// Creates a configuration using the challenge-response flow and the
    /// regional endpoint.
    ///
    /// # Example
    ///
    /// ```
    /// # use dxcognito::CognitoConfig;
    /// let config = CognitoConfig::new(
    ///     "client".to_string(),
    ///     "eu-west-1_AbC".to_string(),
    ///     "https://api.example.com/query".to_string(),
    /// );
    /// assert!(!config.use_password_flow);
    /// assert_eq!(config.endpoint(), "https://cognito-idp.eu-west-1.amazonaws.com");
    /// ```
    pub fn new(client_id: String, user_pool_id: String, api_url: String) -> Self {
        Self {
            endpoint: None,
            client_id,
            user_pool_id,
            api_url,
            use_password_flow: false,
        }
    }

    /// Overrides the Cognito endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Enables or disables the password flow.
    pub fn with_password_flow(mut self, enabled: bool) -> Self {
        self.use_password_flow = enabled;
        self
    }

    /// Assembles configuration from a key lookup.
    ///
    /// Recognized keys: `COGNITO_ENDPOINT`, `COGNITO_CLIENT_ID`,
    /// `COGNITO_USER_POOL_ID`, `API_URL`, `USE_PASSWORD_FLOW`. Empty values
    /// count as unset.
    ///
    /// # Example
    ///
    /// ```
    /// # use dxcognito::CognitoConfig;
    /// let config = CognitoConfig::from_lookup(|key| match key {
    ///     "COGNITO_CLIENT_ID" => Some("client".to_string()),
    ///     "COGNITO_USER_POOL_ID" => Some("local_pool".to_string()),
    ///     "API_URL" => Some("http://localhost:8080/query".to_string()),
    ///     "USE_PASSWORD_FLOW" => Some("true".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert!(config.use_password_flow);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let client_id = require("COGNITO_CLIENT_ID")?;
        let user_pool_id = require("COGNITO_USER_POOL_ID")?;
        let api_url = require("API_URL")?;

        if region_of(&user_pool_id).is_none() {
            return Err(ConfigError::InvalidUserPoolId(user_pool_id));
        }

        Ok(Self {
            endpoint: get("COGNITO_ENDPOINT"),
            client_id,
            user_pool_id,
            api_url,
            use_password_flow: get("USE_PASSWORD_FLOW")
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        })
    }

    /// Loads configuration from compile-time environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| {
            let value = match key {
                "COGNITO_ENDPOINT" => option_env!("COGNITO_ENDPOINT"),
                "COGNITO_CLIENT_ID" => option_env!("COGNITO_CLIENT_ID"),
                "COGNITO_USER_POOL_ID" => option_env!("COGNITO_USER_POOL_ID"),
                "API_URL" => option_env!("API_URL"),
                "USE_PASSWORD_FLOW" => option_env!("USE_PASSWORD_FLOW"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }

    /// Loads configuration from compile-time environment variables or panics.
    ///
    /// # Panics
    ///
    /// Panics with the offending variable when configuration is incomplete.
    /// Use this where Cognito configuration is mandatory.
    pub fn from_env_or_panic() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(e) => panic!(
                "Cognito configuration not found: {}. Set the following environment variables at compile time:\n\
                 - COGNITO_CLIENT_ID\n\
                 - COGNITO_USER_POOL_ID\n\
                 - API_URL\n\
                 - COGNITO_ENDPOINT (optional)\n\
                 - USE_PASSWORD_FLOW (optional)",
                e
            ),
        }
    }

    /// Returns the AWS region encoded in the user pool id.
    pub fn region(&self) -> Option<&str> {
        region_of(&self.user_pool_id)
    }

    /// Returns the Cognito endpoint without a trailing slash.
    ///
    /// Falls back to the regional AWS endpoint when no override is set.
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "https://cognito-idp.{}.amazonaws.com",
                self.region().unwrap_or("us-east-1")
            ),
        }
    }

    /// Returns the URL the password flow posts `InitiateAuth` to.
    ///
    /// # Example
    ///
    /// ```
    /// # use dxcognito::CognitoConfig;
    /// let config = CognitoConfig::new(
    ///     "client".to_string(),
    ///     "local_pool".to_string(),
    ///     "http://localhost:8080/query".to_string(),
    /// )
    /// .with_endpoint("http://localhost:9229/");
    /// assert_eq!(config.initiate_auth_url(), "http://localhost:9229/");
    /// ```
    pub fn initiate_auth_url(&self) -> String {
        format!("{}/", self.endpoint())
    }
}

fn region_of(user_pool_id: &str) -> Option<&str> {
    match user_pool_id.split_once('_') {
        Some((region, id)) if !region.is_empty() && !id.is_empty() => Some(region),
        _ => None,
    }
}

/// Parses a boolean switch: `1`, `true`, `yes`, `on` (any case) enable it.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
