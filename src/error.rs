use thiserror::Error;

/// Failures of a single grounded request. The display text is what the user sees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("There's an issue with the API key. It might be missing, invalid, or expired. Please check your environment configuration.")]
    ApiKey,
    #[error("Failed to fetch a response from the Gemini API. Please check your network connection and try again.")]
    Request { detail: String },
}

impl SearchError {
    /// Sort a raw failure message into the credential or generic bucket
    pub fn classify(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if detail.to_lowercase().contains("api key") {
            SearchError::ApiKey
        } else {
            SearchError::Request { detail }
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::classify(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_api_key_message() {
        let err = SearchError::classify("API key not valid. Please pass a valid API key.");
        assert_eq!(err, SearchError::ApiKey);
        assert!(err.to_string().starts_with("There's an issue with the API key"));
    }

    #[test]
    fn test_classify_generic_failure_keeps_detail() {
        let err = SearchError::classify("connection refused");
        assert_eq!(
            err,
            SearchError::Request {
                detail: "connection refused".to_string()
            }
        );
        assert!(err.to_string().contains("check your network connection"));
    }
}
