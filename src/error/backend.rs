use std::fmt;

use crate::error::BackendError;

/// Render a backend error, keeping the backend's message verbatim.
///
/// Used by the parent module's `Display` implementation for
/// `DocshError::Backend`.
pub fn format_backend_error(f: &mut fmt::Formatter<'_>, error: &BackendError) -> fmt::Result {
    match (&error.code_name, error.code) {
        (Some(name), Some(code)) => write!(f, "BackendError[{name}({code})]: {}", error.message),
        (Some(name), None) => write!(f, "BackendError[{name}]: {}", error.message),
        (None, Some(code)) => write!(f, "BackendError[{code}]: {}", error.message),
        (None, None) => write!(f, "BackendError: {}", error.message),
    }
}

/// Extract structured information from a driver error using the driver API.
///
/// Typed error structures are read directly so the server message reaches
/// the renderer untouched.
pub fn from_driver_error(error: &mongodb::error::Error) -> BackendError {
    use mongodb::error::{ErrorKind, WriteFailure};

    let mut info = BackendError::default();

    match error.kind.as_ref() {
        ErrorKind::Write(write_failure) => match write_failure {
            WriteFailure::WriteError(write_error) => {
                info.code = Some(write_error.code);
                info.message = write_error.message.clone();
            }
            WriteFailure::WriteConcernError(wc_error) => {
                info.code = Some(wc_error.code);
                info.message = wc_error.message.clone();
            }
            _ => info.message = error.to_string(),
        },
        ErrorKind::Command(command_error) => {
            info.code = Some(command_error.code);
            info.code_name = Some(command_error.code_name.clone());
            info.message = command_error.message.clone();
        }
        ErrorKind::InsertMany(insert_error) => {
            if let Some(first_error) = insert_error
                .write_errors
                .as_ref()
                .and_then(|errors| errors.first())
            {
                info.code = Some(first_error.code);
                info.message = first_error.message.clone();
            } else if let Some(wc_error) = &insert_error.write_concern_error {
                info.code = Some(wc_error.code);
                info.message = wc_error.message.clone();
            } else {
                info.message = error.to_string();
            }
        }
        ErrorKind::Authentication { message, .. } => info.message = message.clone(),
        ErrorKind::InvalidArgument { message, .. } => info.message = message.clone(),
        ErrorKind::ServerSelection { message, .. } => info.message = message.clone(),
        _ => info.message = error.to_string(),
    }

    if info.code_name.is_none() {
        info.code_name = info.code.and_then(error_name);
    }

    info
}

/// Human-readable name for well-known server error codes.
fn error_name(code: i32) -> Option<String> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        48 => "NamespaceExists",
        50 => "MaxTimeMSExpired",
        59 => "CommandNotFound",
        121 => "DocumentValidationFailure",
        _ => return None,
    };

    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocshError;

    #[test]
    fn test_message_kept_verbatim() {
        let err = DocshError::Backend(BackendError {
            message: "no such command: 'repairDatabase'".to_string(),
            code: Some(59),
            code_name: Some("CommandNotFound".to_string()),
        });
        assert_eq!(
            err.to_string(),
            "BackendError[CommandNotFound(59)]: no such command: 'repairDatabase'"
        );
    }

    #[test]
    fn test_plain_message() {
        let err = DocshError::Backend(BackendError::new("not running with --replSet"));
        assert_eq!(err.to_string(), "BackendError: not running with --replSet");
    }

    #[test]
    fn test_error_names() {
        assert_eq!(error_name(11000).as_deref(), Some("DuplicateKey"));
        assert_eq!(error_name(59).as_deref(), Some("CommandNotFound"));
        assert_eq!(error_name(1), None);
    }
}
