use crate::auth::{ensure_login, AuthError, Credentials};
use crate::config::Config;
use crate::provider::{Post, SearchProvider};
use crate::row::Row;
use crate::text::{extract_emojis, format_timestamp};
use chrono_tz::Tz;
use futures::StreamExt;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Why a search result did not become a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    Duplicate,
    ExcludedAuthor(String),
    EmptyText,
    MissingKeyword,
    MissingTimestamp,
    Provider(String),
}

impl SkipReason {
    /// Short label used when tallying skips.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingId => "missing_id",
            SkipReason::Duplicate => "duplicate",
            SkipReason::ExcludedAuthor(_) => "excluded_author",
            SkipReason::EmptyText => "empty_text",
            SkipReason::MissingKeyword => "missing_keyword",
            SkipReason::MissingTimestamp => "missing_timestamp",
            SkipReason::Provider(_) => "provider_error",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ExcludedAuthor(handle) => write!(f, "excluded author @{}", handle),
            SkipReason::Provider(msg) => write!(f, "provider error: {}", msg),
            other => f.write_str(other.label()),
        }
    }
}

/// Author and keyword rules applied to each post.
pub struct Filters {
    exclude_authors: HashSet<String>,
    keyword: Regex,
}

impl Filters {
    pub fn from_config(config: &Config) -> Result<Self, regex::Error> {
        let alternation = config
            .keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            exclude_authors: config
                .exclude_authors
                .iter()
                .map(|a| a.to_lowercase())
                .collect(),
            keyword: Regex::new(&format!(r"(?i)\b({})\b", alternation))?,
        })
    }

    fn is_excluded(&self, handle: &str) -> bool {
        self.exclude_authors.contains(&handle.to_lowercase())
    }

    fn has_keyword(&self, text: &str) -> bool {
        self.keyword.is_match(text)
    }
}

/// Rows from one search run, plus a tally of what was dropped.
#[derive(Debug, Default)]
pub struct Collected {
    pub rows: Vec<Row>,
    pub seen: usize,
    pub skipped: BTreeMap<&'static str, usize>,
}

/// Map one post to a row. Identifier checks and deduplication happen in `collect_rows`.
pub fn map_post(post: Post, filters: &Filters, tz: Tz) -> Result<Row, SkipReason> {
    let author = post.author.unwrap_or_default();
    let handle = author.username.as_deref().unwrap_or("").trim().to_string();
    let name = author.display_name.as_deref().unwrap_or("").trim().to_string();
    if filters.is_excluded(&handle) {
        return Err(SkipReason::ExcludedAuthor(handle));
    }

    let text = post
        .raw_content
        .filter(|t| !t.is_empty())
        .or(post.content)
        .unwrap_or_default()
        .trim()
        .to_string();
    if text.is_empty() {
        return Err(SkipReason::EmptyText);
    }
    if !filters.has_keyword(&text) {
        return Err(SkipReason::MissingKeyword);
    }

    let count = |value: Option<i64>| value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0);
    let comments = count(post.reply_count);
    let retweets = count(post.retweet_count);
    let likes = count(post.like_count);

    let date = post.date.ok_or(SkipReason::MissingTimestamp)?;

    Ok(Row {
        name,
        handle: if handle.is_empty() {
            String::new()
        } else {
            format!("@{}", handle)
        },
        timestamp: format_timestamp(date, tz),
        emojis: extract_emojis(&text),
        text,
        comments,
        retweets,
        likes,
    })
}

/// Authenticate, then run the search and collect matching rows, newest first.
pub async fn collect(
    provider: &dyn SearchProvider,
    config: &Config,
    creds: &Credentials,
    env_path: Option<&Path>,
) -> Result<Collected, CollectError> {
    let filters = Filters::from_config(config)?;
    ensure_login(provider, creds, env_path).await?;
    Ok(collect_rows(provider, config, &filters).await)
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid keyword pattern: {0}")]
    Keywords(#[from] regex::Error),
}

/// Consume the search stream without touching authentication.
pub async fn collect_rows(
    provider: &dyn SearchProvider,
    config: &Config,
    filters: &Filters,
) -> Collected {
    let query = config.search_query();
    tracing::info!(%query, tab = config.search_tab.product(), limit = config.limit, "Searching");

    let mut collected = Collected::default();
    let mut seen_ids: HashSet<u64> = HashSet::new();
    let mut results = provider.search(&query, config.limit).take(config.limit);

    while let Some(item) = results.next().await {
        collected.seen += 1;

        let outcome = match item {
            Err(e) => {
                tracing::warn!(error = %e, "Search stream returned an error");
                Err(SkipReason::Provider(e.to_string()))
            }
            Ok(post) => match post.id {
                None => Err(SkipReason::MissingId),
                Some(id) if !seen_ids.insert(id) => Err(SkipReason::Duplicate),
                Some(_) => map_post(post, filters, config.timezone),
            },
        };

        match outcome {
            Ok(row) => collected.rows.push(row),
            Err(reason) => {
                tracing::debug!(%reason, "Skipped post");
                *collected.skipped.entry(reason.label()).or_default() += 1;
            }
        }
    }

    // ISO-8601 strings in one zone sort chronologically.
    collected
        .rows
        .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    tracing::info!(
        seen = collected.seen,
        kept = collected.rows.len(),
        skipped = ?collected.skipped,
        "Search finished"
    );
    collected
}
