use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use bloodline_core::DomainError;

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => domain_status(e),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.kind(),
            ApiError::Internal(_) => "internal_error",
        }
    }
}

pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InsufficientInventory { .. } | DomainError::CapacityExceeded { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DomainError::ModelNotTrained
        | DomainError::InsufficientData { .. }
        | DomainError::TrainingInProgress => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
        }
        json_error(self.status(), self.code(), self.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse an optional query/body value, mapping failures to a validation error.
pub fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Ok(Some(s.parse()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodline_core::{BloodType, HospitalId, RiskLevel};

    #[test]
    fn domain_errors_map_to_stable_statuses() {
        let cases = [
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("hospital 9"), StatusCode::NOT_FOUND),
            (DomainError::ModelNotTrained, StatusCode::CONFLICT),
            (DomainError::TrainingInProgress, StatusCode::CONFLICT),
            (
                DomainError::InsufficientInventory {
                    hospital: HospitalId::new(1),
                    blood_type: BloodType::OPos,
                    available: 1,
                    requested: 2,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn optional_values_parse_or_reject() {
        assert_eq!(parse_opt::<RiskLevel>(None).unwrap(), None);
        assert_eq!(parse_opt::<RiskLevel>(Some("  ")).unwrap(), None);
        assert_eq!(parse_opt::<RiskLevel>(Some("high")).unwrap(), Some(RiskLevel::High));
        assert_eq!(parse_opt::<BloodType>(Some("AB-")).unwrap(), Some(BloodType::AbNeg));
        assert_eq!(parse_opt::<BloodType>(Some("Z")).unwrap_err().code(), "validation_error");
    }
}
