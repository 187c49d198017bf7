use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::authenticate;
use crate::app::AppState;
use crate::error::ApiError;

/// Gate for `/api/root/*`: requires a bearer token with root access.
pub async fn root_access_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(request.headers(), &state.config.security.jwt_secret)?
        .ok_or_else(|| ApiError::unauthorized("Root token required"))?;

    if user.access != crate::auth::ROOT_ACCESS {
        tracing::warn!(
            "Denied root route {} to {} with access '{}'",
            request.uri().path(),
            user.subject,
            user.access
        );
        return Err(ApiError::forbidden("Root access required"));
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
