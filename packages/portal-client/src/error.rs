use thiserror::Error;

pub type Result<T> = std::result::Result<T, PortalError>;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("portal returned {status} for {url}")]
    Status { status: u16, url: String },

    /// The login form was submitted but the portal bounced back to the login page
    #[error("login rejected by portal")]
    LoginRejected,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
