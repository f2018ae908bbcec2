use core_config::{ConfigError, FromEnv, env_optional, env_required};

/// Credentials accepted by the admin gate.
///
/// Loaded from environment variables:
/// - `ADMIN_USERNAME` (required)
/// - `ADMIN_PASSWORD` (required, HTTP Basic)
/// - `ADMIN_TOKEN` (optional, enables `Authorization: Bearer`)
#[derive(Clone)]
pub struct AdminAuthConfig {
    pub username: String,
    pub password: String,
    pub token: Option<String>,
}

impl AdminAuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for AdminAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl FromEnv for AdminAuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let username = env_required("ADMIN_USERNAME")?;
        let password = env_required("ADMIN_PASSWORD")?;

        if password.is_empty() {
            return Err(ConfigError::ParseError {
                key: "ADMIN_PASSWORD".to_string(),
                details: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            username,
            password,
            token: env_optional("ADMIN_TOKEN"),
        })
    }
}
