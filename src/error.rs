use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Chapter \"{0}\" already exists")]
    DuplicateChapter(String),

    #[error("Cannot remove the last admin user")]
    LastAdmin,

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Admin role required")]
    Forbidden,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    #[diagnostic(help("weights files are toml, e.g. `threshold = 0.3`"))]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
