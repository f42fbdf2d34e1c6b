use crate::provider::{NewAccount, SearchProvider};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Owner name used for a cookie session when `X_USER` is not set.
const COOKIE_ACCOUNT_FALLBACK: &str = "cookie_user";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "No active accounts and .env missing required values.\n\
         Tried to load: {env_path}\n\
         Fix: set X_COOKIES (auth_token & ct0). The built-in X client only signs in with \
         session cookies; X_USER/X_PASS/X_EMAIL/X_EMAIL_PASS alone are not enough."
    )]
    MissingCredentials { env_path: String },

    #[error(
        "Login verification failed (still no active accounts): {reason}\n\
         The built-in X client only supports cookie sessions; password login \
         (X_USER/X_PASS/X_EMAIL/X_EMAIL_PASS) is not supported.\n\
         Double-check that X_COOKIES is 'auth_token=...;ct0=...' (no spaces/trailing ;) \
         and that the cookies are still valid."
    )]
    VerificationFailed { reason: String },

    #[error("Could not register account: {0}")]
    Registration(String),
}

/// Login material read from the environment. Missing values are empty strings.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub email: String,
    pub email_password: String,
    pub cookies: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            user: var("X_USER"),
            password: var("X_PASS"),
            email: var("X_EMAIL"),
            email_password: var("X_EMAIL_PASS"),
            cookies: var("X_COOKIES"),
        }
    }

    fn has_full_login(&self) -> bool {
        [&self.user, &self.password, &self.email, &self.email_password]
            .iter()
            .all(|v| !v.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &mask(&self.user))
            .field("password", &mask(&self.password))
            .field("email", &mask(&self.email))
            .field("email_password", &mask(&self.email_password))
            .field("cookies", &mask(&self.cookies))
            .finish()
    }
}

/// Trim `;`-separated cookie segments, drop empty ones and put `auth_token` first.
pub fn normalize_cookies(raw: &str) -> Option<String> {
    let mut parts: Vec<&str> = raw
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    // stable: other segments keep their relative order
    parts.sort_by_key(|p| !p.starts_with("auth_token="));
    Some(parts.join(";"))
}

/// Show the first and last two characters of a secret, `(missing)` when empty.
pub fn mask(value: &str) -> String {
    if value.is_empty() {
        return "(missing)".to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    let head: String = chars[..len.min(2)].iter().collect();
    let tail: String = chars[len.saturating_sub(2)..].iter().collect();
    format!("{}{}{}", head, "*".repeat(len.saturating_sub(4)), tail)
}

/// Make sure the provider has at least one working session.
///
/// Order: reuse existing sessions, then cookies from the environment, then a
/// full username/password/email login. Stops at the first verified session.
pub async fn ensure_login(
    provider: &dyn SearchProvider,
    creds: &Credentials,
    env_path: Option<&Path>,
) -> Result<(), AuthError> {
    match reuse_sessions(provider).await {
        Ok(()) => {
            tracing::info!("Reusing existing session");
            return Ok(());
        }
        Err(reason) => tracing::debug!(%reason, "No reusable session"),
    }

    let env_path = env_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no .env found)".to_string());
    let cookies = normalize_cookies(&creds.cookies);

    tracing::info!("[env] from: {}", env_path);
    tracing::info!(
        "[env] X_USER={}  X_PASS={}  X_EMAIL={}  X_EMAIL_PASS={}",
        mask(&creds.user),
        mask(&creds.password),
        mask(&creds.email),
        mask(&creds.email_password)
    );
    tracing::info!(
        "[env] X_COOKIES={}",
        if cookies.is_some() { "present" } else { "missing" }
    );

    let account = if let Some(cookies) = cookies {
        let username = if creds.user.is_empty() {
            COOKIE_ACCOUNT_FALLBACK.to_string()
        } else {
            creds.user.clone()
        };
        NewAccount::Cookies { username, cookies }
    } else if creds.has_full_login() {
        NewAccount::Credentials {
            username: creds.user.clone(),
            password: creds.password.clone(),
            email: creds.email.clone(),
            email_password: creds.email_password.clone(),
        }
    } else {
        return Err(AuthError::MissingCredentials { env_path });
    };

    tracing::info!(username = account.username(), "Registering account from .env");
    provider
        .add_account(account)
        .await
        .map_err(|e| AuthError::Registration(e.to_string()))?;

    reuse_sessions(provider)
        .await
        .map_err(|reason| AuthError::VerificationFailed { reason })
}

async fn reuse_sessions(provider: &dyn SearchProvider) -> Result<(), String> {
    provider.login_all().await.map_err(|e| e.to_string())?;
    provider.probe().await.map_err(|e| e.to_string())
}
