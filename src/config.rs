use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "x-search.toml";

const DEFAULT_QUERY: &str =
    r#"(indihome OR "IndiHome" OR telkomsel OR tsel) lang:id -filter:retweets -filter:replies"#;
const DEFAULT_EXCLUDE_AUTHORS: [&str; 2] = ["telkomsel", "indihome"];
const DEFAULT_KEYWORDS: [&str; 3] = ["indihome", "tsel", "telkomsel"];
const DEFAULT_LIMIT: usize = 1500;
const DEFAULT_OUT_PREFIX: &str = "Indihome";
const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unknown timezone '{0}' (expected an IANA name such as Asia/Jakarta)")]
    Timezone(String),

    #[error("Keyword list must not be empty")]
    NoKeywords,

    #[error("Invalid date '{0}' (expected YYYY-MM-DD or DD-MM-YYYY)")]
    Date(String),

    #[error("Date range is empty: since {since} is after until {until}")]
    DateRange { since: NaiveDate, until: NaiveDate },
}

/// Result ordering of X search, matching the web client's tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SearchTab {
    #[default]
    #[serde(alias = "LATEST", alias = "latest")]
    Latest,
    #[serde(alias = "TOP", alias = "top")]
    Top,
}

impl SearchTab {
    /// Value of the `product` variable in a SearchTimeline request.
    pub fn product(self) -> &'static str {
        match self {
            SearchTab::Latest => "Latest",
            SearchTab::Top => "Top",
        }
    }
}

/// Run settings. Built once at startup and handed to each stage by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub query: String,
    /// Lower-cased handles whose posts are dropped.
    pub exclude_authors: HashSet<String>,
    /// Whole-word, case-insensitive terms; a post must contain at least one.
    pub keywords: Vec<String>,
    pub limit: usize,
    pub out_prefix: String,
    pub out_dir: PathBuf,
    pub timezone: Tz,
    pub delimiter: u8,
    pub quote: u8,
    pub search_tab: SearchTab,
    /// Inclusive lower bound, sent as a `since:` operator.
    pub since: Option<NaiveDate>,
    /// Exclusive upper bound, sent as an `until:` operator.
    pub until: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            exclude_authors: DEFAULT_EXCLUDE_AUTHORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            limit: DEFAULT_LIMIT,
            out_prefix: DEFAULT_OUT_PREFIX.to_string(),
            out_dir: PathBuf::from("."),
            timezone: DEFAULT_TIMEZONE,
            delimiter: b';',
            quote: b'"',
            search_tab: SearchTab::default(),
            since: None,
            until: None,
        }
    }
}

/// Optional overrides read from `x-search.toml`. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    query: Option<String>,
    exclude_authors: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
    limit: Option<usize>,
    out_prefix: Option<String>,
    out_dir: Option<PathBuf>,
    timezone: Option<String>,
    search_tab: Option<SearchTab>,
    since: Option<String>,
    until: Option<String>,
}

impl Config {
    /// Defaults, overridden by the first `x-search.toml` found walking up from `start`.
    pub fn discover(start: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match find_upward(start, CONFIG_FILE_NAME) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        Self::default().merge(file)
    }

    fn merge(mut self, file: FileConfig) -> Result<Self, ConfigError> {
        if let Some(query) = file.query {
            self.query = query;
        }
        if let Some(authors) = file.exclude_authors {
            self.exclude_authors = authors
                .iter()
                .map(|a| a.trim().trim_start_matches('@').to_lowercase())
                .filter(|a| !a.is_empty())
                .collect();
        }
        if let Some(keywords) = file.keywords {
            let keywords: Vec<String> = keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(ConfigError::NoKeywords);
            }
            self.keywords = keywords;
        }
        if let Some(limit) = file.limit {
            self.limit = limit;
        }
        if let Some(prefix) = file.out_prefix {
            self.out_prefix = prefix;
        }
        if let Some(dir) = file.out_dir {
            self.out_dir = dir;
        }
        if let Some(tz) = file.timezone {
            self.timezone = tz.parse().map_err(|_| ConfigError::Timezone(tz))?;
        }
        if let Some(tab) = file.search_tab {
            self.search_tab = tab;
        }
        if let Some(since) = file.since {
            self.since = Some(parse_date(&since)?);
        }
        if let Some(until) = file.until {
            self.until = Some(parse_date(&until)?);
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(ConfigError::DateRange { since, until });
            }
        }
        Ok(self)
    }

    /// The query sent to the provider: `query` plus any date-range operators.
    pub fn search_query(&self) -> String {
        let mut query = self.query.trim().to_string();
        if let Some(since) = self.since {
            query.push_str(&format!(" since:{}", since.format("%Y-%m-%d")));
        }
        if let Some(until) = self.until {
            query.push_str(&format!(" until:{}", until.format("%Y-%m-%d")));
        }
        query
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    let value = value.trim();
    ["%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| ConfigError::Date(value.to_string()))
}

/// Look for `file_name` in `start` and each of its ancestors.
pub fn find_upward(start: &Path, file_name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}
