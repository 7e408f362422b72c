use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(String),
    NotFound(String),
    InvalidRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        crate::api::metrics::increment_error_count();

        let status = self.status_code();
        if status.is_server_error() {
            log::error!("❌ {}", self);
        }

        HttpResponse::build(status).json(serde_json::json!({
            "success": false,
            "error": self.to_string()
        }))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        AppError::DatabaseError(format!("Failed to encode document: {}", e))
    }
}

impl From<mongodb::bson::de::Error> for AppError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        AppError::DatabaseError(format!("Failed to decode document: {}", e))
    }
}

/// Turns a unique-index violation (E11000) into a 409; anything else stays a database error.
pub fn conflict_on_duplicate(e: mongodb::error::Error, message: &str) -> AppError {
    use mongodb::error::{ErrorKind, WriteFailure};

    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000 => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::from(e),
    }
}

/// Parses a hex ObjectId coming from a path or body field.
pub fn parse_object_id(raw: &str, what: &str) -> Result<mongodb::bson::oid::ObjectId, AppError> {
    mongodb::bson::oid::ObjectId::parse_str(raw)
        .map_err(|_| AppError::InvalidRequest(format!("Invalid {} ID", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::DatabaseError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_error_body_envelope() {
        let resp = AppError::NotFound("Container".into()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Not found: Container");
    }

    #[test]
    fn test_duplicate_key_becomes_conflict() {
        use mongodb::error::{Error, ErrorKind, WriteError, WriteFailure};

        let write_error: WriteError = mongodb::bson::from_document(mongodb::bson::doc! {
            "code": 11000,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: aqro.users index: email_1"
        })
        .unwrap();
        let duplicate = Error::from(ErrorKind::Write(WriteFailure::WriteError(write_error)));
        match conflict_on_duplicate(duplicate, "User already exists") {
            AppError::Conflict(msg) => assert_eq!(msg, "User already exists"),
            other => panic!("unexpected: {:?}", other),
        }

        let other = Error::custom("connection reset");
        assert!(matches!(
            conflict_on_duplicate(other, "User already exists"),
            AppError::DatabaseError(_)
        ));
    }

    #[test]
    fn test_parse_object_id() {
        assert!(parse_object_id("65a1f0c2e4b0a1b2c3d4e5f6", "container").is_ok());
        match parse_object_id("nope", "container") {
            Err(AppError::InvalidRequest(msg)) => assert_eq!(msg, "Invalid container ID"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
