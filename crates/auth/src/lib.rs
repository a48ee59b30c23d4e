//! `accountd-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, decide, explain_authorization, AuthzError, Decision, Rule, POLICY};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use identity::IdentityResolver;
pub use jwt::{Hs256Jwt, TokenError, TokenIssuer, TokenValidator};
pub use password::{Argon2PasswordHasher, PasswordHashError, PasswordHasher};
pub use permissions::{Action, Permission, ResourceType};
pub use principal::Principal;
pub use roles::Role;
