//! Bearer-token verification and role gating.
//!
//! Every protected handler takes an [`AuthUser`] extractor, which decodes
//! the `Authorization: Bearer` header into an immutable [`Claims`] value,
//! then calls [`Claims::require`] with its role allow-list. Missing or
//! invalid tokens reject with 401 before any database work happens; a
//! valid token with a role outside the allow-list rejects with 403.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::error::ApiError;

const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Supervisor,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Employee => "employee",
        }
    }

    /// Case- and whitespace-insensitive parse; the role set is closed.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "supervisor" => Some(Role::Supervisor),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub role: String,
    pub department: String,
    pub exp: i64,
}

impl Claims {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Gate the request: the decoded role must be in `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        match self.role() {
            Some(role) if allowed.contains(&role) => Ok(()),
            _ => Err(ApiError::Forbidden("Forbidden: Access denied".to_string())),
        }
    }
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string())
}

pub fn issue_token(id: i32, role: &str, department: &str) -> Result<String, ApiError> {
    let claims = Claims {
        id,
        role: role.to_string(),
        department: department.to_string(),
        exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
}

pub fn verify_token(token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Unauthorized: Invalid token".to_string()))
}

/// Authenticated caller extracted from the bearer header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        Ok(AuthUser(verify_token(token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_role_parse_normalizes_case_and_whitespace() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("SUPERVISOR"), Some(Role::Supervisor));
        assert_eq!(Role::parse("employee"), Some(Role::Employee));
        assert_eq!(Role::parse("manager"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_token_roundtrip() {
        let token = issue_token(42, "supervisor", "Engineering").unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.role, "supervisor");
        assert_eq!(claims.department, "Engineering");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = verify_token("not.a.token").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = issue_token(1, "employee", "Sales").unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(verify_token(&tampered).is_err());
    }

    #[test]
    fn test_require_role_gate() {
        let claims = Claims {
            id: 1,
            role: " Employee ".to_string(),
            department: "Sales".to_string(),
            exp: Utc::now().timestamp() + 60,
        };
        assert!(claims.require(&[Role::Employee, Role::Admin]).is_ok());
        let err = claims.require(&[Role::Admin]).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_unknown_role_is_forbidden_everywhere() {
        let claims = Claims {
            id: 1,
            role: "contractor".to_string(),
            department: "Sales".to_string(),
            exp: Utc::now().timestamp() + 60,
        };
        assert!(claims
            .require(&[Role::Admin, Role::Supervisor, Role::Employee])
            .is_err());
    }
}
