use thiserror::Error;

use relay_core::error::RelayError;
use relay_provider::ProviderError;

/// Errors that can occur while crawling one template.
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Transport failure or non-200 answer from the catalog.
    #[error("fetch error: {0}")]
    Fetch(String),
    /// The catalog answered 200 with a body we cannot read.
    #[error("malformed template: {0}")]
    Malformed(String),
    #[error("model error: {0}")]
    Model(#[from] ProviderError),
    #[error("storage error: {0}")]
    Storage(#[from] RelayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_fetch() {
        let e = CrawlerError::Fetch("status 404".to_string());
        assert_eq!(e.to_string(), "fetch error: status 404");
    }

    #[test]
    fn test_error_from_provider() {
        let e: CrawlerError = ProviderError::InvalidResponse("empty".into()).into();
        assert!(matches!(e, CrawlerError::Model(_)));
        assert_eq!(e.to_string(), "model error: invalid provider response: empty");
    }

    #[test]
    fn test_error_from_storage() {
        let e: CrawlerError = RelayError::Storage("disk full".into()).into();
        assert!(e.to_string().contains("disk full"));
    }
}
