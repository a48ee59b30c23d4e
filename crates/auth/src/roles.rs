use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of an authenticated account. Closed set; every account has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Child,
    Educator,
    HealthProfessional,
    Family,
    Application,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Child,
        Role::Educator,
        Role::HealthProfessional,
        Role::Family,
        Role::Application,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Child => "child",
            Role::Educator => "educator",
            Role::HealthProfessional => "health_professional",
            Role::Family => "family",
            Role::Application => "application",
        }
    }

    /// Whether accounts of this role must reference an institution.
    pub fn requires_institution(&self) -> bool {
        matches!(
            self,
            Role::Child | Role::Educator | Role::HealthProfessional | Role::Family
        )
    }

    /// Whether accounts of this role may own children groups.
    pub fn can_own_groups(&self) -> bool {
        matches!(self, Role::Educator | Role::HealthProfessional)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}
