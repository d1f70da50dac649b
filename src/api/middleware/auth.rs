use crate::AppState;
use crate::api::error::AppError;
use crate::entities::{prelude::Users, users};
use crate::services::summary_service::Actor;
use crate::utils::auth::{TokenError, validate_jwt};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Authenticated caller, inserted as a request extension by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == users::ROLE_ADMIN
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            is_admin: self.is_admin(),
        }
    }
}

impl From<users::Model> for AuthUser {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Authentication state of one request
#[derive(Debug, Clone)]
pub enum Session {
    Absent,
    PendingValidation(String),
    Valid(AuthUser),
    Expired,
}

impl Session {
    /// Bearer header first, then the `token` query parameter.
    pub fn from_parts(headers: &HeaderMap, query: Option<&str>) -> Self {
        let bearer = headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string());

        let token = bearer.or_else(|| {
            serde_urlencoded::from_str::<AuthQuery>(query.unwrap_or_default())
                .ok()
                .and_then(|q| q.token)
        });

        match token.filter(|t| !t.is_empty()) {
            Some(token) => Session::PendingValidation(token),
            None => Session::Absent,
        }
    }

    pub async fn validate(self, db: &DatabaseConnection, secret: &str) -> Result<Self, DbErr> {
        let Session::PendingValidation(token) = self else {
            return Ok(self);
        };

        let claims = match validate_jwt(&token, secret) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Ok(Session::Expired),
            Err(TokenError::Invalid) => {
                tracing::debug!("Rejected malformed or forged token");
                return Ok(Session::Absent);
            }
        };

        let Some(user_id) = claims.user_id() else {
            return Ok(Session::Absent);
        };

        match Users::find_by_id(user_id).one(db).await? {
            Some(user) => Ok(Session::Valid(user.into())),
            None => {
                tracing::warn!("Token for unknown user {}", user_id);
                Ok(Session::Absent)
            }
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Session::Valid(user) => Some(user),
            _ => None,
        }
    }
}

/// Resolves the caller's session for every request. Never rejects.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = Session::from_parts(req.headers(), req.uri().query())
        .validate(&state.db, &state.config.jwt_secret)
        .await?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Rejects requests without a valid session and exposes the [`AuthUser`].
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user = match req.extensions().get::<Session>() {
        Some(Session::Valid(user)) => user.clone(),
        Some(Session::Expired) => {
            return Err(AppError::Unauthorized("הטוקן פג תוקף".to_string()));
        }
        _ => return Err(AppError::Unauthorized("לא סופק טוקן אימות".to_string())),
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
