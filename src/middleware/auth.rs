use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{validate_jwt, Claims, TenantMembership};
use crate::error::ApiError;

/// Authenticated caller extracted from the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub roles: Vec<String>,
    pub tenants: Vec<TenantMembership>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            roles: claims.roles,
            tenants: claims.tenants,
        }
    }
}

impl AuthUser {
    pub fn has_any_role(&self, roles: &[String]) -> bool {
        self.roles.iter().any(|r| roles.contains(r))
    }

    pub fn is_member_of(&self, tenant: &str) -> bool {
        self.tenants.iter().any(|m| m.tenant == tenant)
    }

    /// Tenant a request operates on. Elevated callers may name any tenant or
    /// none (all tenants). Everyone else is confined to their memberships; a
    /// single membership is used when the request names none.
    pub fn scope_tenant(&self, requested: Option<&str>, elevated_roles: &[String]) -> Result<Option<String>, ApiError> {
        if self.has_any_role(elevated_roles) {
            return Ok(requested.map(str::to_string));
        }

        match requested {
            Some(tenant) if self.is_member_of(tenant) => Ok(Some(tenant.to_string())),
            Some(tenant) => Err(ApiError::forbidden(format!("Not a member of tenant '{}'", tenant))),
            None => match self.tenants.as_slice() {
                [only] => Ok(Some(only.tenant.clone())),
                [] => Err(ApiError::forbidden("Caller has no tenant membership")),
                _ => Err(ApiError::forbidden("Caller belongs to several tenants; specify one")),
            },
        }
    }

    /// Like `scope_tenant`, for writes that must land in exactly one tenant
    pub fn write_tenant(&self, requested: Option<&str>, elevated_roles: &[String]) -> Result<String, ApiError> {
        self.scope_tenant(requested, elevated_roles)?
            .ok_or_else(|| ApiError::bad_request("tenant is required"))
    }

    /// Access check for an existing record owned by `tenant`
    pub fn ensure_access(&self, tenant: &str, elevated_roles: &[String]) -> Result<(), ApiError> {
        if self.has_any_role(elevated_roles) || self.is_member_of(tenant) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("Not a member of tenant '{}'", tenant)))
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let claims = validate_jwt(&token, &state.jwt_secret).map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str], tenants: &[&str]) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Registrar".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            tenants: tenants
                .iter()
                .map(|t| TenantMembership { tenant: t.to_string(), roles: vec![] })
                .collect(),
        }
    }

    fn elevated() -> Vec<String> {
        vec!["super-admin".to_string()]
    }

    #[test]
    fn single_membership_is_implicit() {
        let u = user(&[], &["school-a"]);
        assert_eq!(u.scope_tenant(None, &elevated()).unwrap(), Some("school-a".into()));
        assert!(u.scope_tenant(Some("school-b"), &elevated()).is_err());
    }

    #[test]
    fn several_memberships_need_an_explicit_tenant() {
        let u = user(&[], &["school-a", "school-b"]);
        assert!(u.scope_tenant(None, &elevated()).is_err());
        assert_eq!(u.scope_tenant(Some("school-b"), &elevated()).unwrap(), Some("school-b".into()));
    }

    #[test]
    fn elevated_callers_may_span_tenants() {
        let u = user(&["super-admin"], &[]);
        assert_eq!(u.scope_tenant(None, &elevated()).unwrap(), None);
        assert!(u.write_tenant(None, &elevated()).is_err());
        assert!(u.ensure_access("school-z", &elevated()).is_ok());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Token abc".parse().unwrap());
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc");
    }
}
