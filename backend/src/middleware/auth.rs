//! Identity middleware
//!
//! Authentication is owned by the upstream gateway, which terminates the
//! session and forwards the caller's identity as trusted headers. This
//! middleware turns those headers into an [`AuthUser`] for handlers.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{ErrorDetail, ErrorResponse};

/// Header carrying the authenticated user id
pub const HEADER_USER_ID: &str = "x-user-id";
/// Header carrying the caller's role
pub const HEADER_USER_ROLE: &str = "x-user-role";
/// Header carrying the operator's assigned warehouse, when any
pub const HEADER_MAGASIN_ID: &str = "x-magasin-id";

/// Caller roles recognised by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Manager,
    Operator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Operator => "operator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "manager" => Some(UserRole::Manager),
            "operator" => Some(UserRole::Operator),
            _ => None,
        }
    }
}

/// Authenticated caller identity forwarded by the gateway
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    /// Warehouse an operator is assigned to; None for managers and admins
    pub magasin_id: Option<Uuid>,
}

impl AuthUser {
    /// Warehouse scope applied to listings: operators only see their own
    /// warehouse, other roles see everything.
    pub fn magasin_scope(&self) -> Option<Uuid> {
        match self.role {
            UserRole::Operator => self.magasin_id,
            _ => None,
        }
    }

    pub fn est_operateur(&self) -> bool {
        self.role == UserRole::Operator
    }
}

/// Identity middleware validating the gateway headers
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let header_str = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned)
    };

    let user_id = match header_str(HEADER_USER_ID).map(|v| Uuid::parse_str(&v)) {
        Some(Ok(id)) => id,
        _ => return unauthorized_response("Missing or invalid x-user-id header"),
    };

    let role = match header_str(HEADER_USER_ROLE).as_deref().map(UserRole::from_str) {
        Some(Some(role)) => role,
        _ => return unauthorized_response("Missing or invalid x-user-role header"),
    };

    let magasin_id = match header_str(HEADER_MAGASIN_ID) {
        Some(v) => match Uuid::parse_str(&v) {
            Ok(id) => Some(id),
            Err(_) => return unauthorized_response("Invalid x-magasin-id header"),
        },
        None => None,
    };

    let auth_user = AuthUser {
        user_id,
        role,
        magasin_id,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse::new(ErrorDetail {
        code: "UNAUTHORIZED".to_string(),
        message: message.to_string(),
        message_fr: "Authentification requise".to_string(),
        field: None,
        disponible: None,
        demande: None,
    });

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Role guard for use in handlers
/// Returns an error if the caller's role is not one of the allowed ones
pub fn exiger_role(user: &AuthUser, roles: &[UserRole]) -> Result<(), crate::error::AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(crate::error::AppError::Forbidden {
            message: format!(
                "Role '{}' is not allowed to perform this action",
                user.role.as_str()
            ),
            message_fr: "Vous n'avez pas les droits pour cette action".to_string(),
        })
    }
}

/// Extractor for the authenticated caller
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse::new(ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Authentication required".to_string(),
                    message_fr: "Authentification requise".to_string(),
                    field: None,
                    disponible: None,
                    demande: None,
                });
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("manager"), Some(UserRole::Manager));
        assert_eq!(UserRole::from_str("operator"), Some(UserRole::Operator));
        assert_eq!(UserRole::from_str("root"), None);
    }

    #[test]
    fn test_magasin_scope() {
        let magasin = Uuid::new_v4();
        let operator = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Operator,
            magasin_id: Some(magasin),
        };
        let manager = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Manager,
            magasin_id: Some(magasin),
        };
        assert_eq!(operator.magasin_scope(), Some(magasin));
        assert_eq!(manager.magasin_scope(), None);
    }
}
