use serde::{Deserialize, Serialize};

use crate::Role;

/// Operation requested on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    /// Fetch a single resource by id.
    Read,
    List,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::List,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::List => "list",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Resource types governed by the policy.
///
/// `Account` addresses an account of unknown role (the role-agnostic
/// `DELETE /users/:id` path). `Password` is the password-change sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Institution,
    Admin,
    Child,
    Educator,
    HealthProfessional,
    Family,
    Application,
    Account,
    Password,
    ChildrenGroup,
}

impl ResourceType {
    pub const ALL: [ResourceType; 10] = [
        ResourceType::Institution,
        ResourceType::Admin,
        ResourceType::Child,
        ResourceType::Educator,
        ResourceType::HealthProfessional,
        ResourceType::Family,
        ResourceType::Application,
        ResourceType::Account,
        ResourceType::Password,
        ResourceType::ChildrenGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Institution => "institutions",
            ResourceType::Admin => "admins",
            ResourceType::Child => "children",
            ResourceType::Educator => "educators",
            ResourceType::HealthProfessional => "healthprofessionals",
            ResourceType::Family => "families",
            ResourceType::Application => "applications",
            ResourceType::Account => "users",
            ResourceType::Password => "users.password",
            ResourceType::ChildrenGroup => "children.groups",
        }
    }

    /// The account resource type holding accounts of `role`.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => ResourceType::Admin,
            Role::Child => ResourceType::Child,
            Role::Educator => ResourceType::Educator,
            Role::HealthProfessional => ResourceType::HealthProfessional,
            Role::Family => ResourceType::Family,
            Role::Application => ResourceType::Application,
        }
    }
}

/// A (resource, action) pair, rendered as `"children.create"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: ResourceType,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: ResourceType, action: Action) -> Self {
        Self { resource, action }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.resource.as_str(), self.action.as_str())
    }
}
