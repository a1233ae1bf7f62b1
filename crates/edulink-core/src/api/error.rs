use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport failure calling {method}: {message}")]
    Transport { method: String, message: String },

    #[error("Unexpected HTTP status {status} from {method}: {body}")]
    Status {
        method: String,
        status: u16,
        body: String,
    },

    #[error("Failed to encode request for {method}: {message}")]
    InvalidRequest { method: String, message: String },

    #[error("Invalid response from {method}: {message}")]
    InvalidResponse { method: String, message: String },

    #[error("API call failed: {method}")]
    CallFailed { method: String },
}

/// Maximum length for response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(method: &str, status: u16, body: &str) -> Self {
        ApiError::Status {
            method: method.to_string(),
            status,
            body: Self::truncate_body(body),
        }
    }

    /// The API method this error is attributed to.
    pub fn method(&self) -> &str {
        match self {
            ApiError::Transport { method, .. }
            | ApiError::Status { method, .. }
            | ApiError::InvalidRequest { method, .. }
            | ApiError::InvalidResponse { method, .. }
            | ApiError::CallFailed { method } => method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(ApiError::truncate_body("short"), "short");

        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_error_names_method() {
        let err = ApiError::CallFailed {
            method: "EduLink.Behaviour".to_string(),
        };
        assert_eq!(err.method(), "EduLink.Behaviour");
        assert_eq!(err.to_string(), "API call failed: EduLink.Behaviour");

        let err = ApiError::from_status("EduLink.Login", 502, "Bad gateway");
        assert_eq!(err.method(), "EduLink.Login");
        assert!(err.to_string().contains("502"));
    }
}
