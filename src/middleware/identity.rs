use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity resolved by the upstream gateway
#[derive(Clone, Debug, PartialEq)]
pub struct CallerIdentity {
    pub user_id: String,
}

/// Require an `X-User-ID` header and expose it to handlers as `CallerIdentity`
pub async fn identity_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = extract_user_id(&headers)?;
    tracing::debug!("Request from user {}", user_id);
    request.extensions_mut().insert(CallerIdentity { user_id });
    Ok(next.run(request).await)
}

fn extract_user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing X-User-ID header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("X-User-ID header is not valid text"))?
        .trim();

    if raw.is_empty() {
        return Err(ApiError::unauthorized("X-User-ID header is empty"));
    }
    Ok(raw.to_string())
}
