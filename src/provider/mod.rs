pub mod x_api;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

pub use x_api::XClient;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No active accounts")]
    NoActiveAccount,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

/// Author of a post as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostAuthor {
    pub username: Option<String>,
    pub display_name: Option<String>,
}

/// A search result. Every field is optional; the collector decides what is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: Option<u64>,
    pub author: Option<PostAuthor>,
    /// Full, untruncated text when the provider has it.
    pub raw_content: Option<String>,
    /// Display text; used when `raw_content` is missing or empty.
    pub content: Option<String>,
    pub reply_count: Option<i64>,
    pub retweet_count: Option<i64>,
    pub like_count: Option<i64>,
    pub date: Option<DateTime<Utc>>,
}

/// Account registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewAccount {
    Cookies {
        username: String,
        cookies: String,
    },
    Credentials {
        username: String,
        password: String,
        email: String,
        email_password: String,
    },
}

impl NewAccount {
    pub fn username(&self) -> &str {
        match self {
            NewAccount::Cookies { username, .. } | NewAccount::Credentials { username, .. } => {
                username
            }
        }
    }
}

/// Outcome of a bulk session activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginSummary {
    pub total: usize,
    pub active: usize,
}

/// Search and session capability of a social platform.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Lazily page through results for `query`, yielding at most `limit` posts.
    fn search<'a>(&'a self, query: &'a str, limit: usize) -> BoxStream<'a, Result<Post>>;

    /// Try to activate every registered account.
    async fn login_all(&self) -> Result<LoginSummary>;

    /// Cheap authenticated read used to confirm a usable session exists.
    async fn probe(&self) -> Result<()>;

    async fn add_account(&self, account: NewAccount) -> Result<()>;
}
