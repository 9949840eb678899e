//! JSON extractor that runs `validator` rules before the handler.

use crate::errors::AppError;
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Deserializes the body as `T` and validates it.
///
/// Both malformed JSON and rule violations are answered with a failed
/// envelope; rule violations list one `"field: message"` entry per failure.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct AddItem {
///     #[validate(length(min = 1))]
///     title: String,
/// }
///
/// async fn add(ValidatedJson(input): ValidatedJson<AddItem>) { /* ... */ }
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::from(rejection).into_response())?;

        data.validate()
            .map_err(|errors| AppError::from(errors).into_response())?;

        Ok(ValidatedJson(data))
    }
}
