use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use db::models::user::User;

use crate::{AppState, error::ApiError};

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Verifies the bearer token and resolves its subject. Everything behind this
/// layer can count on an `Extension<User>` being present.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer);

    let Some(token) = token else {
        tracing::warn!(
            path = %request.uri().path(),
            method = %request.method(),
            "Request without bearer token"
        );
        return Err(ApiError::Unauthorized);
    };

    let claims = state.tokens().verify(token)?;

    let Some(user) = User::find_by_uuid(&state.db().db, claims.sub).await? else {
        tracing::warn!(user_id = %claims.sub, "Token subject no longer exists");
        return Err(ApiError::Unauthorized);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
