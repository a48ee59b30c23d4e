use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};

use accountd_core::Payload;

// -------------------------
// Request DTOs
// -------------------------

/// Raw JSON request body.
///
/// Payloads stay untyped until the validator pipeline runs, so field-level
/// errors (missing, cast, format) are reported in pipeline order rather than
/// as deserializer failures. Malformed JSON is carried inside the [`Payload`]
/// and surfaces only once the caller is authorized. An empty body reads as `{}`.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Payload);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(Payload::from_slice(&bytes)))
    }
}
