use crate::text::sanitize;

/// Column order of the exported CSV.
pub const HEADER: [&str; 8] = [
    "UserName",
    "Handle",
    "Timestamp",
    "Text",
    "Emojis",
    "Comments",
    "Retweets",
    "Likes",
];

/// One exported post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub handle: String,
    pub timestamp: String,
    pub text: String,
    pub emojis: String,
    pub comments: u64,
    pub retweets: u64,
    pub likes: u64,
}

impl Row {
    /// Field values in `HEADER` order, text sanitized for the writer.
    pub fn to_record(&self) -> [String; 8] {
        [
            sanitize(&self.name),
            sanitize(&self.handle),
            sanitize(&self.timestamp),
            sanitize(&self.text),
            sanitize(&self.emojis),
            self.comments.to_string(),
            self.retweets.to_string(),
            self.likes.to_string(),
        ]
    }
}
