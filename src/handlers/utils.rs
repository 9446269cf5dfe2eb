use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::ApiError;

/// Unwrap a JSON body, turning axum's rejection into our error envelope
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(ApiError::from)
}

/// A required string field; absent or blank after trimming is a validation error.
/// The value is returned as sent.
pub fn required_text(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ApiError::missing_field(field)),
    }
}

/// An optional string field that, when present, must not be blank.
pub fn non_blank(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        Some(text) if text.trim().is_empty() => Err(ApiError::validation_error(
            format!("{} cannot be blank", field),
            None,
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(required_text("title", Some("Dishes".into())).unwrap(), "Dishes");
        assert!(matches!(required_text("title", None), Err(ApiError::ValidationError { .. })));
        assert!(matches!(required_text("title", Some("  ".into())), Err(ApiError::ValidationError { .. })));
    }

    #[test]
    fn non_blank_allows_absent() {
        assert_eq!(non_blank("name", None).unwrap(), None);
        assert_eq!(non_blank("name", Some("Soup".into())).unwrap(), Some("Soup".to_string()));
        assert!(non_blank("name", Some("".into())).is_err());
    }
}
