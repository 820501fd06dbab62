#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error(transparent)]
    Family(#[from] famgrid_core::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::Io { .. } | Self::Output(_) => 3,
            Self::Json { .. } => 4,
            Self::Family(famgrid_core::Error::FocalNotFound(_)) => 5,
            Self::Family(_) => 6,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use famgrid_core::{Error, PersonId};

    #[test]
    fn invalid_constructor_preserves_message() {
        let error = CliError::invalid("no focal");
        assert_eq!(error.exit_code(), 2);
        assert_eq!(error.to_string(), "invalid argument: no focal");
    }

    #[test]
    fn missing_focal_has_its_own_exit_code() {
        let error = CliError::from(Error::FocalNotFound(PersonId::from("p9")));
        assert_eq!(error.exit_code(), 5);
        assert!(error.to_string().contains("p9"));

        let error = CliError::from(Error::DuplicatePerson(PersonId::from("p1")));
        assert_eq!(error.exit_code(), 6);
    }

    #[test]
    fn io_error_names_the_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = CliError::io("family.json", source);
        assert_eq!(error.exit_code(), 3);
        assert!(error.to_string().contains("family.json"));
    }
}
