//! Request extractors

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use fieldnotes_common::errors::AppError;
use serde::de::DeserializeOwned;

/// [`Query`] whose rejection is an [`AppError`], so a malformed query
/// string gets the usual JSON error body
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
