pub mod auth;
pub mod collector;
pub mod config;
pub mod env_loader;
pub mod export;
pub mod provider;
pub mod row;
pub mod text;
pub mod timeline_parser;

pub use auth::{AuthError, Credentials};
pub use collector::{collect, CollectError, Collected, SkipReason};
pub use config::{Config, SearchTab};
pub use env_loader::EnvFile;
pub use export::{validate_csv, write_csv, ExportError};
pub use provider::{Post, PostAuthor, SearchProvider, XClient};
pub use row::{Row, HEADER};
