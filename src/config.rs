use std::env;

pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Credential snapshot taken once at process start. Missing values are not
/// a startup failure; they surface as an authentication error on the first
/// fetch attempt.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub security_token: Option<String>,
    pub login_url: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            username: env::var("SF_USERNAME_PRO").ok(),
            password: env::var("SF_PASSWORD_PRO").ok(),
            security_token: env::var("SF_SECURITY_TOKEN_PRO").ok(),
            login_url: env::var("SF_LOGIN_URL").ok(),
        }
    }

    pub fn login_url(&self) -> &str {
        self.login_url.as_deref().unwrap_or(DEFAULT_LOGIN_URL)
    }
}

pub fn port_from_env() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080)
}
