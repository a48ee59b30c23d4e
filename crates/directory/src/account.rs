//! Accounts: one struct for the shared fields, one tagged union for the
//! role-specific ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use accountd_auth::Role;
use accountd_core::{AccountId, Entity, InstitutionId};

use crate::Institution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Role-specific account data. The variant *is* the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Profile {
    Admin,
    Child { gender: Gender, age: u32 },
    Educator,
    HealthProfessional,
    Family { children: Vec<AccountId> },
    Application { application_name: String },
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Admin => Role::Admin,
            Profile::Child { .. } => Role::Child,
            Profile::Educator => Role::Educator,
            Profile::HealthProfessional => Role::HealthProfessional,
            Profile::Family { .. } => Role::Family,
            Profile::Application { .. } => Role::Application,
        }
    }
}

/// A persisted account.
///
/// # Invariants
/// - `username` is unique across every role.
/// - Roles for which [`Role::requires_institution`] holds always carry an
///   `institution_id` that resolved when it was written.
/// - `password_hash` is a PHC string; the plaintext is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub institution_id: Option<InstitutionId>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub profile: Profile,
}

impl Account {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn is_child(&self) -> bool {
        matches!(self.profile, Profile::Child { .. })
    }

    /// Public representation. The password hash never leaves the core;
    /// `institution` is embedded as a full document when it resolves.
    pub fn to_json(&self, institution: Option<&Institution>) -> serde_json::Value {
        let institution = match (institution, self.institution_id) {
            (Some(inst), _) => inst.to_json(),
            (None, Some(id)) => json!({ "id": id.to_string() }),
            (None, None) => serde_json::Value::Null,
        };

        let mut out = json!({
            "id": self.id.to_string(),
            "username": self.username,
            "type": self.role().as_str(),
            "institution": institution,
            "last_login": self.last_login,
        });

        if let Some(obj) = out.as_object_mut() {
            match &self.profile {
                Profile::Child { gender, age } => {
                    obj.insert("gender".to_string(), json!(gender));
                    obj.insert("age".to_string(), json!(age));
                }
                Profile::Family { children } => {
                    obj.insert(
                        "children".to_string(),
                        json!(children.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
                    );
                }
                Profile::Application { application_name } => {
                    obj.insert("application_name".to_string(), json!(application_name));
                }
                Profile::Admin | Profile::Educator | Profile::HealthProfessional => {}
            }
        }
        out
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn resource_name() -> &'static str {
        "user"
    }
}
