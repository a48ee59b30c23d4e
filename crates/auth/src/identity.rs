//! Identity resolver: bearer credential -> principal.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use accountd_core::DomainError;

use crate::jwt::TokenValidator;
use crate::Principal;

const INVALID_TOKEN: &str = "Authentication failed due to missing or invalid token.";

/// Resolves `Authorization` header values into principals.
#[derive(Clone)]
pub struct IdentityResolver {
    validator: Arc<dyn TokenValidator>,
}

impl IdentityResolver {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }

    /// Resolve a raw `Authorization` header value.
    ///
    /// Absent, empty, non-bearer or unverifiable credentials all fail with
    /// the same `Unauthorized` error.
    pub fn resolve(&self, authorization: Option<&str>, now: DateTime<Utc>) -> Result<Principal, DomainError> {
        let token = extract_bearer(authorization).ok_or_else(|| DomainError::unauthorized(INVALID_TOKEN))?;

        let claims = self.validator.validate(token, now).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            DomainError::unauthorized(INVALID_TOKEN)
        })?;

        Ok(claims.principal())
    }
}

fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{Hs256Jwt, TokenIssuer};
    use crate::Role;
    use accountd_core::AccountId;

    fn resolver() -> (IdentityResolver, Arc<Hs256Jwt>) {
        let jwt = Arc::new(Hs256Jwt::new(b"secret", chrono::Duration::minutes(5)));
        (IdentityResolver::new(jwt.clone()), jwt)
    }

    #[test]
    fn resolves_valid_bearer() {
        let (resolver, jwt) = resolver();
        let principal = Principal::new(AccountId::new(), Role::Family);
        let now = Utc::now();
        let token = jwt.issue(&principal, now).unwrap();

        let header = format!("Bearer {token}");
        assert_eq!(resolver.resolve(Some(&header), now), Ok(principal));
    }

    #[test]
    fn missing_empty_or_malformed_is_unauthorized() {
        let (resolver, _) = resolver();
        let now = Utc::now();
        for header in [None, Some(""), Some("Bearer "), Some("Basic abc"), Some("Bearer abc.def.ghi")] {
            let err = resolver.resolve(header, now).unwrap_err();
            assert_eq!(err.code(), "unauthorized", "{header:?}");
        }
    }
}
