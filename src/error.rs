use thiserror::Error;

// ---------------------------------------------------------------------------
// CensusError – every way a load or a query can fail
// ---------------------------------------------------------------------------

/// Tagged failure kinds. The `Display` text of each variant is the one-line
/// diagnostic written to the log.
#[derive(Debug, Error)]
pub enum CensusError {
    /// Neither a url nor a source was configured, or a setting is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("The URL provided is not a valid URL. {0}")]
    InvalidUrl(String),

    /// Connection refused, timeout, too many redirects or a non-2xx status.
    #[error("There is an error with the URL or the connection. {0}")]
    Transport(String),

    #[error("Could not read the data file. {0}")]
    Io(String),

    #[error("The data is not in a valid JSON format. {0}")]
    MalformedPayload(String),

    #[error("The key '{0}' is not present in the record.")]
    MissingKey(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// An upstream step legitimately produced nothing.
    #[error("The function {0} did not provide a result.")]
    NoResult(&'static str),
}

impl CensusError {
    /// Whether this failure came from retrieving the payload.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            CensusError::InvalidUrl(_)
                | CensusError::Transport(_)
                | CensusError::Io(_)
                | CensusError::MalformedPayload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_result_names_the_function() {
        let err = CensusError::NoResult("filter_by_year");
        assert_eq!(
            err.to_string(),
            "The function filter_by_year did not provide a result."
        );
    }

    #[test]
    fn retrieval_kinds() {
        assert!(CensusError::Transport("refused".into()).is_retrieval());
        assert!(CensusError::InvalidUrl("x".into()).is_retrieval());
        assert!(!CensusError::MissingKey("Year".into()).is_retrieval());
    }
}
