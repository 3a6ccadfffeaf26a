use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("malformed payload: {}", err);
        unexpected_error()
    }
}

impl Error {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Internal and transport failures, as opposed to rejections of the caller's request.
    pub fn is_internal(&self) -> bool {
        (1..=99).contains(&self.code)
    }

    pub fn is_invalid_state_error(&self) -> bool {
        self.code == 100
    }

    pub fn is_invalid_input_error(&self) -> bool {
        self.code == 101
    }

    pub fn is_missing_route_error(&self) -> bool {
        self.code == 102
    }

    pub fn is_directions_error(&self) -> bool {
        self.code == 103
    }
}

pub fn invalid_state_error() -> Error {
    Error {
        code: 100,
        message: "invalid state".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

pub fn missing_route_error() -> Error {
    Error {
        code: 102,
        message: "no optimized route returned".into(),
    }
}

pub fn directions_error(status: &str) -> Error {
    Error {
        code: 103,
        message: format!("directions request failed due to {}", status),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn reqwest_error<T: Debug>(err: T) -> Error {
    tracing::debug!("transport failure: {:?}", err);

    Error {
        code: 3,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

#[test]
fn internal_codes_are_separated_from_caller_errors() {
    assert!(upstream_error().is_internal());
    assert!(reqwest_error("boom").is_internal());
    assert!(!invalid_input_error().is_internal());
    assert!(!missing_route_error().is_internal());
    assert!(directions_error("ZERO_RESULTS").is_directions_error());
    assert_eq!(
        directions_error("ZERO_RESULTS").message,
        "directions request failed due to ZERO_RESULTS"
    );
}
