use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Manager,
    Admin,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Role floor check. Admin satisfies every floor.
    pub fn require(&self, floor: Role) -> AppResult<()> {
        if self.role >= floor {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "Forbidden: insufficient role for this action.".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    role: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Resolve the caller identity from the request headers.
///
/// Engine operations are never reachable without an identity; a missing or
/// unparseable token is a 401, a token carrying an unknown role a 403.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<AuthUser> {
    if state.config.auth_dev_overrides_enabled() {
        if let Some(user) = dev_override(headers) {
            return Ok(user);
        }
    }

    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized: missing bearer token.".to_string()))?;

    let token = decode::<Claims>(
        bearer,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|error| match error.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token has expired.".to_string())
        }
        _ => AppError::Unauthorized("Invalid token.".to_string()),
    })?;

    let role = Role::parse(&token.claims.role).ok_or_else(|| {
        AppError::Forbidden(format!(
            "Forbidden: role '{}' is not allowed for this action.",
            token.claims.role
        ))
    })?;

    Ok(AuthUser {
        id: token.claims.sub,
        role,
    })
}

fn dev_override(headers: &HeaderMap) -> Option<AuthUser> {
    let id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())?;
    let role = headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse)
        .unwrap_or(Role::Manager);
    Some(AuthUser { id, role })
}

#[cfg(test)]
mod tests {
    use super::{AuthUser, Role};
    use uuid::Uuid;

    #[test]
    fn admin_satisfies_manager_floor() {
        let admin = AuthUser {
            id: Uuid::nil(),
            role: Role::Admin,
        };
        assert!(admin.require(Role::Manager).is_ok());
        assert!(admin.require(Role::Admin).is_ok());
    }

    #[test]
    fn manager_is_rejected_at_admin_floor() {
        let manager = AuthUser {
            id: Uuid::nil(),
            role: Role::Manager,
        };
        assert!(manager.require(Role::Manager).is_ok());
        assert!(manager.require(Role::Admin).is_err());
    }

    #[test]
    fn parses_known_roles_only() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("manager"), Some(Role::Manager));
        assert_eq!(Role::parse("tenant"), None);
    }
}
