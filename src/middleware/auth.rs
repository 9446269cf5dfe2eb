use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::app::AppState;
use crate::database::models::{FamilyScoped, User};
use crate::error::ApiError;

/// Caller resolved from the bearer token, valid for the current request only
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub family_id: i64,
    pub is_accepted: bool,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            family_id: user.family_id,
            is_accepted: user.is_accepted,
        }
    }
}

impl AuthUser {
    /// Mutations are reserved for accepted family members
    pub fn require_accepted(&self) -> Result<(), ApiError> {
        if self.is_accepted {
            Ok(())
        } else {
            tracing::debug!("Rejected mutation by unaccepted user {}", self.id);
            Err(ApiError::forbidden("Your family membership has not been accepted yet"))
        }
    }

    /// Ownership check applied to every lookup by id.
    ///
    /// A record that belongs to another family is reported exactly like a
    /// missing one, so ids never reveal what other families have.
    pub fn owned<T: FamilyScoped>(&self, record: Option<T>, what: &str) -> Result<T, ApiError> {
        match record {
            Some(record) if record.family_id() == self.family_id => Ok(record),
            _ => Err(ApiError::not_found(format!("{} not found", what))),
        }
    }
}

/// Bearer authentication middleware: verifies the token, resolves the user and
/// injects `AuthUser` into the request extensions
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = state.signer.verify(token)?;

    // Store failures while resolving the subject are reported as an invalid credential
    let user = match state.store.find_user(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Token subject {} does not resolve to a user", claims.sub);
            return Err(ApiError::unauthorized("Token is invalid!"));
        }
        Err(e) => {
            tracing::error!("Failed to resolve token subject {}: {}", claims.sub, e);
            return Err(ApiError::unauthorized("Token is invalid!"));
        }
    };

    let auth_user = AuthUser::from(user);
    tracing::debug!("Authenticated user {} in family {}", auth_user.id, auth_user.family_id);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Token is missing!"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(ApiError::unauthorized("Token is missing!")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Task;
    use axum::http::HeaderValue;

    fn caller(accepted: bool) -> AuthUser {
        AuthUser {
            id: 1,
            username: "alice".to_string(),
            family_id: 10,
            is_accepted: accepted,
        }
    }

    fn task(family_id: i64) -> Task {
        Task {
            id: 5,
            title: "Dishes".to_string(),
            description: None,
            completed: false,
            family_id,
            author_id: 1,
            assigned_user_id: None,
        }
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(extract_bearer_token(&headers), Err(ApiError::Unauthorized(_))));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(matches!(extract_bearer_token(&headers), Err(ApiError::Unauthorized(_))));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(matches!(extract_bearer_token(&headers), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn other_family_records_look_missing() {
        let me = caller(true);
        assert!(me.owned(Some(task(10)), "Task").is_ok());

        let err = me.owned(Some(task(11)), "Task").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg == "Task not found"));

        let err = me.owned(None::<Task>, "Task").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn unaccepted_members_cannot_mutate() {
        assert!(caller(true).require_accepted().is_ok());
        assert!(matches!(caller(false).require_accepted(), Err(ApiError::Forbidden(_))));
    }
}
