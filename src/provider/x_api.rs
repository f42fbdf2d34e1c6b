use super::{LoginSummary, NewAccount, Post, ProviderError, Result, SearchProvider};
use crate::config::SearchTab;
use crate::timeline_parser::{parse_search_timeline, user_lookup_succeeded};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;

const GRAPHQL_BASE: &str = "https://x.com/i/api/graphql";

/// Public bearer token of the X web client.
const WEB_BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

const OP_SEARCH_TIMELINE: &str = "U3QTLwGF8sZCHDuWIMSAmg/SearchTimeline";
const OP_USER_BY_SCREEN_NAME: &str = "32pL5BWe9WKeSK1MoPvFQQ/UserByScreenName";

/// Account looked up by the session probe.
const PROBE_SCREEN_NAME: &str = "twitter";

const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
struct Account {
    username: String,
    cookies: Option<String>,
    has_password: bool,
    active: bool,
}

impl Account {
    /// The CSRF token X expects in `x-csrf-token`, taken from the `ct0` cookie.
    fn csrf_token(&self) -> Option<&str> {
        cookie_value(self.cookies.as_deref()?, "ct0")
    }
}

/// Cookie-authenticated client for X's web GraphQL API.
///
/// Accounts live in memory for the lifetime of the client. An account becomes
/// active when its cookie string carries both `auth_token` and `ct0`.
pub struct XClient {
    client: reqwest::Client,
    accounts: Mutex<Vec<Account>>,
    search_tab: SearchTab,
}

impl XClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            accounts: Mutex::new(Vec::new()),
            search_tab: SearchTab::default(),
        }
    }

    /// Search the given tab instead of `Latest`.
    pub fn with_search_tab(mut self, tab: SearchTab) -> Self {
        self.search_tab = tab;
        self
    }

    async fn active_account(&self) -> Result<Account> {
        self.accounts
            .lock()
            .await
            .iter()
            .find(|a| a.active)
            .cloned()
            .ok_or(ProviderError::NoActiveAccount)
    }

    async fn graphql_get(&self, operation: &str, variables: &Value) -> Result<Value> {
        let account = self.active_account().await?;
        let (cookies, csrf) = match (account.cookies.as_deref(), account.csrf_token()) {
            (Some(cookies), Some(csrf)) => (cookies.to_string(), csrf.to_string()),
            _ => return Err(ProviderError::NoActiveAccount),
        };

        let url = format!(
            "{}/{}?variables={}&features={}",
            GRAPHQL_BASE,
            operation,
            urlencoding::encode(&variables.to_string()),
            urlencoding::encode(&graphql_features().to_string()),
        );

        let resp = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {}", WEB_BEARER_TOKEN))
            .header("x-csrf-token", csrf)
            .header("x-twitter-auth-type", "OAuth2Session")
            .header("x-twitter-active-user", "yes")
            .header("cookie", cookies)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if matches!(status.as_u16(), 401 | 403) {
                self.deactivate(&account.username).await;
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    async fn deactivate(&self, username: &str) {
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.iter_mut().find(|a| a.username == username) {
            tracing::warn!(username, "Session rejected, marking account inactive");
            account.active = false;
        }
    }

    async fn fetch_search_page(&self, query: &str, cursor: Option<&str>) -> Result<Value> {
        let variables = search_variables(query, self.search_tab, cursor);
        self.graphql_get(OP_SEARCH_TIMELINE, &variables).await
    }
}

impl Default for XClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Paging state for `search`.
enum Cursor {
    Start,
    Next(String),
    Done,
}

#[async_trait]
impl SearchProvider for XClient {
    fn search<'a>(&'a self, query: &'a str, limit: usize) -> BoxStream<'a, Result<Post>> {
        let pages = stream::unfold(Cursor::Start, move |cursor| async move {
            let current = match cursor {
                Cursor::Start => None,
                Cursor::Next(c) => Some(c),
                Cursor::Done => return None,
            };

            match self.fetch_search_page(query, current.as_deref()).await {
                Ok(body) => {
                    let page = parse_search_timeline(&body);
                    tracing::debug!(
                        posts = page.posts.len(),
                        has_cursor = page.bottom_cursor.is_some(),
                        "Fetched search page"
                    );
                    let next = match page.bottom_cursor {
                        _ if page.posts.is_empty() => Cursor::Done,
                        Some(c) if current.as_deref() != Some(c.as_str()) => Cursor::Next(c),
                        _ => Cursor::Done,
                    };
                    let items: Vec<Result<Post>> = page.posts.into_iter().map(Ok).collect();
                    Some((items, next))
                }
                // A failed page ends the search after reporting the error once.
                Err(e) => Some((vec![Err(e)], Cursor::Done)),
            }
        });

        pages.flat_map(stream::iter).take(limit).boxed()
    }

    async fn login_all(&self) -> Result<LoginSummary> {
        let mut accounts = self.accounts.lock().await;
        for account in accounts.iter_mut() {
            let has_session = account
                .cookies
                .as_deref()
                .is_some_and(|c| cookie_value(c, "auth_token").is_some() && cookie_value(c, "ct0").is_some());

            account.active = has_session;
            if !has_session {
                let reason = if account.has_password {
                    "interactive password login is not supported, provide session cookies"
                } else {
                    "cookie string lacks auth_token or ct0"
                };
                tracing::warn!(username = %account.username, reason, "Account left inactive");
            }
        }

        let summary = LoginSummary {
            total: accounts.len(),
            active: accounts.iter().filter(|a| a.active).count(),
        };
        tracing::info!(total = summary.total, active = summary.active, "Activated accounts");
        Ok(summary)
    }

    async fn probe(&self) -> Result<()> {
        let variables = json!({
            "screen_name": PROBE_SCREEN_NAME,
            "withSafetyModeUserFields": true,
        });
        let body = self.graphql_get(OP_USER_BY_SCREEN_NAME, &variables).await?;
        if user_lookup_succeeded(&body) {
            Ok(())
        } else {
            Err(ProviderError::Parse(format!(
                "user lookup for '{}' returned no user",
                PROBE_SCREEN_NAME
            )))
        }
    }

    async fn add_account(&self, new: NewAccount) -> Result<()> {
        let account = match new {
            NewAccount::Cookies { username, cookies } => Account {
                username,
                cookies: Some(cookies),
                has_password: false,
                active: false,
            },
            NewAccount::Credentials {
                username, password, ..
            } => Account {
                username,
                cookies: None,
                has_password: !password.is_empty(),
                active: false,
            },
        };

        let mut accounts = self.accounts.lock().await;
        // Re-adding a username replaces the earlier entry.
        accounts.retain(|a| a.username != account.username);
        tracing::info!(username = %account.username, "Registered account");
        accounts.push(account);
        Ok(())
    }
}

fn search_variables(query: &str, tab: SearchTab, cursor: Option<&str>) -> Value {
    let mut variables = json!({
        "rawQuery": query,
        "count": PAGE_SIZE,
        "product": tab.product(),
        "querySource": "typed_query",
    });
    if let Some(cursor) = cursor {
        variables["cursor"] = Value::String(cursor.to_string());
    }
    variables
}

fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Feature switches the web client sends with every GraphQL call.
fn graphql_features() -> Value {
    json!({
        "rweb_lists_timeline_redesign_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "tweetypie_unmention_optimization_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": false,
        "tweet_awards_web_tipping_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_media_download_video_enabled": false,
        "responsive_web_enhance_cards_enabled": false,
        "hidden_profile_likes_enabled": true,
        "hidden_profile_subscriptions_enabled": true,
        "highlights_tweets_tab_ui_enabled": true,
        "subscriptions_verification_info_verified_since_enabled": true,
        "subscriptions_verification_info_is_identity_verified_enabled": false,
        "responsive_web_twitter_article_notes_tab_enabled": false,
    })
}
