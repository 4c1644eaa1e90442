use thiserror::Error;

/// Terminal failures of a request. Translation and speech synthesis never
/// produce one of these; they degrade through `SoftResult` instead.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Please specify a district for {0} information.")]
    RegionRequired(&'static str),

    #[error("location not found: {0}")]
    RegionNotFound(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Could not understand audio")]
    Unintelligible,

    #[error("{service} is temporarily unavailable. Please try again.")]
    Upstream {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Upstream,
}

impl AssistantError {
    pub fn upstream(service: &'static str, source: anyhow::Error) -> Self {
        Self::Upstream { service, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Upstream { .. } => ErrorKind::Upstream,
            _ => ErrorKind::User,
        }
    }

    /// Stable machine-readable code for transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::RegionRequired(_) => "region_required",
            Self::RegionNotFound(_) => "region_not_found",
            Self::UnsupportedLanguage(_) => "unsupported_language",
            Self::Unintelligible => "unintelligible_audio",
            Self::Upstream { .. } => "upstream_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_hides_source() {
        let err = AssistantError::upstream(
            "Weather service",
            anyhow::anyhow!("connection reset by 10.0.0.7"),
        );
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(!err.to_string().contains("10.0.0.7"));
        assert!(err.to_string().contains("try again"));
    }

    #[test]
    fn region_required_names_the_topic() {
        let err = AssistantError::RegionRequired("weather");
        assert_eq!(err.kind(), ErrorKind::User);
        assert_eq!(
            err.to_string(),
            "Please specify a district for weather information."
        );
    }
}
