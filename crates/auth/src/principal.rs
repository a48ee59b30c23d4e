use serde::{Deserialize, Serialize};

use accountd_core::AccountId;

use crate::Role;

/// A fully resolved principal for authorization decisions.
///
/// Produced by the identity resolver from a verified bearer token; carries
/// exactly what the policy needs and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject_id: AccountId,
    pub role: Role,
}

impl Principal {
    pub fn new(subject_id: AccountId, role: Role) -> Self {
        Self { subject_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
