use thiserror::Error;
use url::Url;

/// Errors from validating a URL before it is fetched or opened.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Parse `raw` and require an `http`/`https` URL with a host.
///
/// Used for the catalog endpoint and for image links carried by entities.
///
/// ```
/// use digidex::util::validate_http_url;
///
/// assert!(validate_http_url("https://digimon-api.vercel.app/api/digimon").is_ok());
/// assert!(validate_http_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_http_url(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_owned())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}

/// Validate a URL before handing it to the desktop opener.
///
/// SEC: `open::that` passes its argument to a platform launcher, so only
/// well-formed http(s) URLs without embedded whitespace are let through.
pub fn validate_url_for_open(raw: &str) -> Result<Url, UrlValidationError> {
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(UrlValidationError::InvalidUrl(url::ParseError::InvalidDomainCharacter));
    }
    validate_http_url(raw)
}
