use crate::provider::{Post, PostAuthor};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One page of a SearchTimeline response.
#[derive(Debug, Default)]
pub struct TimelinePage {
    pub posts: Vec<Post>,
    pub bottom_cursor: Option<String>,
}

/// Parse a SearchTimeline GraphQL payload.
/// Expected shape:
/// data.search_by_raw_query.search_timeline.timeline.instructions[]
///   TimelineAddEntries   -> entries[] (tweet-* items and cursor-* items)
///   TimelineReplaceEntry -> entry (refreshed cursors on later pages)
pub fn parse_search_timeline(body: &Value) -> TimelinePage {
    let mut page = TimelinePage::default();

    let instructions = body
        .pointer("/data/search_by_raw_query/search_timeline/timeline/instructions")
        .and_then(Value::as_array);

    for instruction in instructions.into_iter().flatten() {
        let entries: Vec<&Value> = match instruction.get("type").and_then(Value::as_str) {
            Some("TimelineAddEntries") => instruction
                .get("entries")
                .and_then(Value::as_array)
                .map(|entries| entries.iter().collect())
                .unwrap_or_default(),
            Some("TimelineReplaceEntry") => instruction.get("entry").into_iter().collect(),
            _ => continue,
        };

        for entry in entries {
            let entry_id = entry.get("entryId").and_then(Value::as_str).unwrap_or("");

            if entry_id.starts_with("cursor-bottom") {
                if let Some(cursor) = entry.pointer("/content/value").and_then(Value::as_str) {
                    page.bottom_cursor = Some(cursor.to_string());
                }
            } else if entry_id.starts_with("tweet-") {
                if let Some(result) = entry.pointer("/content/itemContent/tweet_results/result") {
                    if let Some(post) = parse_tweet_result(result) {
                        page.posts.push(post);
                    }
                }
            }
        }
    }

    page
}

/// Convert a `tweet_results.result` object into a post.
/// Returns None for tombstones and other non-tweet results.
pub fn parse_tweet_result(result: &Value) -> Option<Post> {
    let tweet = match result.get("__typename").and_then(Value::as_str) {
        Some("TweetWithVisibilityResults") => result.get("tweet")?,
        Some("Tweet") | None => result,
        Some(_) => return None,
    };

    let legacy = tweet.get("legacy")?;

    let id = tweet
        .get("rest_id")
        .or_else(|| legacy.get("id_str"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u64>().ok());

    let content = legacy
        .get("full_text")
        .and_then(Value::as_str)
        .map(str::to_string);

    // Long posts carry their full text separately; legacy.full_text is truncated.
    let raw_content = tweet
        .pointer("/note_tweet/note_tweet_results/result/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| content.clone());

    let user = tweet.pointer("/core/user_results/result");
    let author = user.map(|user| PostAuthor {
        username: user_field(user, "screen_name"),
        display_name: user_field(user, "name"),
    });

    Some(Post {
        id,
        author,
        raw_content,
        content,
        reply_count: legacy.get("reply_count").and_then(Value::as_i64),
        retweet_count: legacy.get("retweet_count").and_then(Value::as_i64),
        like_count: legacy.get("favorite_count").and_then(Value::as_i64),
        date: legacy
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_created_at),
    })
}

/// Newer payloads moved screen_name/name from `legacy` to `core`.
fn user_field(user: &Value, key: &str) -> Option<String> {
    user.get("core")
        .and_then(|core| core.get(key))
        .or_else(|| user.get("legacy").and_then(|legacy| legacy.get(key)))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Parse X's `created_at` format: `Wed Oct 10 20:19:24 +0000 2018`.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True when a UserByScreenName payload resolved to a user.
pub fn user_lookup_succeeded(body: &Value) -> bool {
    body.pointer("/data/user/result/rest_id").is_some()
}
