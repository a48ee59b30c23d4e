//! Policy engine: one static permission table, one authorize function.
//!
//! The table lists every grant explicitly. Anything not listed is denied.
//! Some grants are conditional on identity: the target account must be the
//! caller (`SelfOnly`) or the caller must own the addressed resource
//! (`OwnerOnly`).

use serde::Serialize;
use thiserror::Error;

use accountd_core::{AccountId, DomainError};

use crate::{Action, Permission, Principal, ResourceType, Role};

/// How a grant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Unconditional.
    Allow,
    /// Only when the addressed account is the caller itself.
    SelfOnly,
    /// Only when the caller owns the addressed resource.
    OwnerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub role: Role,
    pub permission: Permission,
    pub rule: Rule,
}

const fn grant(role: Role, resource: ResourceType, action: Action, rule: Rule) -> Grant {
    Grant {
        role,
        permission: Permission::new(resource, action),
        rule,
    }
}

use crate::Action::{Create, Delete, List, Read, Update};
use crate::ResourceType as R;
use self::Rule::{Allow, OwnerOnly, SelfOnly};

/// The permission matrix.
pub static POLICY: &[Grant] = &[
    // Institutions: admin manages, everyone authenticated may read.
    grant(Role::Admin, R::Institution, Create, Allow),
    grant(Role::Admin, R::Institution, Read, Allow),
    grant(Role::Admin, R::Institution, List, Allow),
    grant(Role::Admin, R::Institution, Update, Allow),
    grant(Role::Admin, R::Institution, Delete, Allow),
    grant(Role::Child, R::Institution, Read, Allow),
    grant(Role::Child, R::Institution, List, Allow),
    grant(Role::Educator, R::Institution, Read, Allow),
    grant(Role::Educator, R::Institution, List, Allow),
    grant(Role::HealthProfessional, R::Institution, Read, Allow),
    grant(Role::HealthProfessional, R::Institution, List, Allow),
    grant(Role::Family, R::Institution, Read, Allow),
    grant(Role::Family, R::Institution, List, Allow),
    grant(Role::Application, R::Institution, Read, Allow),
    grant(Role::Application, R::Institution, List, Allow),
    // Accounts: admin-only surface.
    grant(Role::Admin, R::Admin, Create, Allow),
    grant(Role::Admin, R::Admin, Read, Allow),
    grant(Role::Admin, R::Admin, List, Allow),
    grant(Role::Admin, R::Admin, Update, Allow),
    grant(Role::Admin, R::Child, Create, Allow),
    grant(Role::Admin, R::Child, Read, Allow),
    grant(Role::Admin, R::Child, List, Allow),
    grant(Role::Admin, R::Child, Update, Allow),
    grant(Role::Admin, R::Educator, Create, Allow),
    grant(Role::Admin, R::Educator, Read, Allow),
    grant(Role::Admin, R::Educator, List, Allow),
    grant(Role::Admin, R::Educator, Update, Allow),
    grant(Role::Admin, R::HealthProfessional, Create, Allow),
    grant(Role::Admin, R::HealthProfessional, Read, Allow),
    grant(Role::Admin, R::HealthProfessional, List, Allow),
    grant(Role::Admin, R::HealthProfessional, Update, Allow),
    grant(Role::Admin, R::Family, Create, Allow),
    grant(Role::Admin, R::Family, Read, Allow),
    grant(Role::Admin, R::Family, List, Allow),
    grant(Role::Admin, R::Family, Update, Allow),
    grant(Role::Admin, R::Application, Create, Allow),
    grant(Role::Admin, R::Application, Read, Allow),
    grant(Role::Admin, R::Application, List, Allow),
    grant(Role::Admin, R::Application, Update, Allow),
    grant(Role::Admin, R::Account, Delete, Allow),
    grant(Role::Admin, R::Password, Update, Allow),
    // The one self-access exception.
    grant(Role::Child, R::Child, Read, SelfOnly),
    // Children groups belong to their educator / health professional.
    grant(Role::Educator, R::ChildrenGroup, Create, OwnerOnly),
    grant(Role::Educator, R::ChildrenGroup, Read, OwnerOnly),
    grant(Role::Educator, R::ChildrenGroup, List, OwnerOnly),
    grant(Role::Educator, R::ChildrenGroup, Update, OwnerOnly),
    grant(Role::Educator, R::ChildrenGroup, Delete, OwnerOnly),
    grant(Role::HealthProfessional, R::ChildrenGroup, Create, OwnerOnly),
    grant(Role::HealthProfessional, R::ChildrenGroup, Read, OwnerOnly),
    grant(Role::HealthProfessional, R::ChildrenGroup, List, OwnerOnly),
    grant(Role::HealthProfessional, R::ChildrenGroup, Update, OwnerOnly),
    grant(Role::HealthProfessional, R::ChildrenGroup, Delete, OwnerOnly),
];

/// Outcome of a policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' may not perform '{permission}'")]
    Forbidden { role: Role, permission: Permission },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden { .. } => {
                DomainError::forbidden("You do not have permission to perform this operation.")
            }
        }
    }
}

/// Look up the grant for `(role, permission)`, if any.
pub fn find_grant(role: Role, permission: Permission) -> Option<&'static Grant> {
    POLICY
        .iter()
        .find(|g| g.role == role && g.permission == permission)
}

/// Pure policy decision.
///
/// `target` is the account the request addresses: the account itself for
/// account resources, the owner for owned resources. An unparseable target
/// is passed as `None` and never satisfies an identity-conditional grant.
pub fn decide(principal: &Principal, permission: Permission, target: Option<&AccountId>) -> Decision {
    let Some(grant) = find_grant(principal.role, permission) else {
        return Decision::Deny;
    };

    let allowed = match grant.rule {
        Rule::Allow => true,
        Rule::SelfOnly | Rule::OwnerOnly => target == Some(&principal.subject_id),
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

/// Authorize a principal for `permission` on `target`.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(
    principal: &Principal,
    permission: Permission,
    target: Option<&AccountId>,
) -> Result<(), AuthzError> {
    match decide(principal, permission, target) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            let explanation = explain_authorization(principal, permission, target);
            tracing::warn!(
                subject = %principal.subject_id,
                role = %principal.role,
                permission = %permission,
                reason = %explanation.reason,
                "authorization denied"
            );
            Err(AuthzError::Forbidden {
                role: principal.role,
                permission,
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub permission: String,
    pub role: Role,
    pub decision: Decision,
    pub rule: Option<Rule>,
    pub reason: String,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain_authorization(
    principal: &Principal,
    permission: Permission,
    target: Option<&AccountId>,
) -> AuthorizationExplanation {
    let grant = find_grant(principal.role, permission);
    let decision = decide(principal, permission, target);

    let reason = match (grant.map(|g| g.rule), decision) {
        (None, _) => format!("role '{}' has no grant for '{}'", principal.role, permission),
        (Some(Rule::Allow), _) => format!("role '{}' is granted '{}'", principal.role, permission),
        (Some(Rule::SelfOnly), Decision::Allow) => "target account is the caller".to_string(),
        (Some(Rule::SelfOnly), Decision::Deny) => {
            format!("'{}' is granted only on the caller's own account", permission)
        }
        (Some(Rule::OwnerOnly), Decision::Allow) => "caller owns the target resource".to_string(),
        (Some(Rule::OwnerOnly), Decision::Deny) => {
            format!("'{}' is granted only to the resource owner", permission)
        }
    };

    AuthorizationExplanation {
        permission: permission.to_string(),
        role: principal.role,
        decision,
        rule: grant.map(|g| g.rule),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ACCOUNT_RESOURCES: [ResourceType; 5] = [
        ResourceType::Child,
        ResourceType::Educator,
        ResourceType::HealthProfessional,
        ResourceType::Family,
        ResourceType::Application,
    ];

    fn principal(role: Role) -> Principal {
        Principal::new(AccountId::new(), role)
    }

    #[test]
    fn table_has_no_duplicate_entries() {
        let mut seen = HashSet::new();
        for g in POLICY {
            assert!(
                seen.insert((g.role, g.permission)),
                "duplicate grant for {} {}",
                g.role,
                g.permission
            );
        }
    }

    #[test]
    fn only_admin_creates_and_deletes_institutions() {
        for role in Role::ALL {
            let p = principal(role);
            for action in [Action::Create, Action::Delete, Action::Update] {
                let expected = if role == Role::Admin {
                    Decision::Allow
                } else {
                    Decision::Deny
                };
                assert_eq!(
                    decide(&p, Permission::new(ResourceType::Institution, action), None),
                    expected,
                    "{role} {action:?}"
                );
            }
        }
    }

    #[test]
    fn only_admin_creates_lists_and_updates_accounts() {
        for role in Role::ALL {
            let p = principal(role);
            for resource in ACCOUNT_RESOURCES {
                for action in [Action::Create, Action::List, Action::Update] {
                    // Even targeting themselves.
                    let decision = decide(&p, Permission::new(resource, action), Some(&p.subject_id));
                    let expected = if role == Role::Admin {
                        Decision::Allow
                    } else {
                        Decision::Deny
                    };
                    assert_eq!(decision, expected, "{role} {resource:?} {action:?}");
                }
            }
        }
    }

    #[test]
    fn child_reads_only_itself() {
        let child = principal(Role::Child);
        let read = Permission::new(ResourceType::Child, Action::Read);

        assert_eq!(decide(&child, read, Some(&child.subject_id)), Decision::Allow);
        assert_eq!(decide(&child, read, Some(&AccountId::new())), Decision::Deny);
        assert_eq!(decide(&child, read, None), Decision::Deny);
    }

    #[test]
    fn no_other_role_gets_self_access() {
        for role in [Role::Educator, Role::HealthProfessional, Role::Family, Role::Application] {
            let p = principal(role);
            let own = ResourceType::for_role(role);
            assert_eq!(
                decide(&p, Permission::new(own, Action::Read), Some(&p.subject_id)),
                Decision::Deny,
                "{role}"
            );
        }
    }

    #[test]
    fn groups_are_mutable_only_by_their_owner() {
        let owner = principal(Role::Educator);
        let peer = principal(Role::Educator);
        let hp = principal(Role::HealthProfessional);
        let admin = principal(Role::Admin);

        for action in [Action::Create, Action::Update, Action::Delete] {
            let perm = Permission::new(ResourceType::ChildrenGroup, action);
            assert_eq!(decide(&owner, perm, Some(&owner.subject_id)), Decision::Allow);
            assert_eq!(decide(&peer, perm, Some(&owner.subject_id)), Decision::Deny);
            assert_eq!(decide(&hp, perm, Some(&owner.subject_id)), Decision::Deny);
            assert_eq!(decide(&admin, perm, Some(&owner.subject_id)), Decision::Deny);
        }
    }

    #[test]
    fn only_admin_changes_passwords_including_own() {
        let perm = Permission::new(ResourceType::Password, Action::Update);
        for role in Role::ALL {
            let p = principal(role);
            let expected = if role == Role::Admin {
                Decision::Allow
            } else {
                Decision::Deny
            };
            assert_eq!(decide(&p, perm, Some(&p.subject_id)), expected, "{role}");
        }
    }

    #[test]
    fn authorize_maps_to_forbidden_domain_error() {
        let family = principal(Role::Family);
        let err = authorize(&family, Permission::new(ResourceType::Child, Action::Create), None)
            .unwrap_err();
        assert_eq!(DomainError::from(err).code(), "forbidden");
    }

    #[test]
    fn explanation_names_the_rule() {
        let child = principal(Role::Child);
        let exp = explain_authorization(
            &child,
            Permission::new(ResourceType::Child, Action::Read),
            Some(&AccountId::new()),
        );
        assert_eq!(exp.decision, Decision::Deny);
        assert_eq!(exp.rule, Some(Rule::SelfOnly));
        assert_eq!(exp.permission, "children.read");
    }

    #[test]
    fn unlisted_combinations_are_denied() {
        for role in Role::ALL {
            let p = principal(role);
            for resource in ResourceType::ALL {
                for action in Action::ALL {
                    let perm = Permission::new(resource, action);
                    if find_grant(role, perm).is_none() {
                        assert_eq!(
                            decide(&p, perm, Some(&p.subject_id)),
                            Decision::Deny,
                            "{role} {perm}"
                        );
                    }
                }
            }
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn any_permission() -> impl Strategy<Value = (Role, Permission)> {
            (
                prop::sample::select(Role::ALL.to_vec()),
                prop::sample::select(ResourceType::ALL.to_vec()),
                prop::sample::select(Action::ALL.to_vec()),
            )
                .prop_map(|(role, resource, action)| (role, Permission::new(resource, action)))
        }

        proptest! {
            #[test]
            fn decision_is_deterministic((role, perm) in any_permission(), own in any::<bool>()) {
                let p = principal(role);
                let other = AccountId::new();
                let target = if own { p.subject_id } else { other };
                let first = decide(&p, perm, Some(&target));
                prop_assert_eq!(first, decide(&p, perm, Some(&target)));
                prop_assert_eq!(first == Decision::Allow, authorize(&p, perm, Some(&target)).is_ok());
            }

            #[test]
            fn foreign_target_only_passes_unconditional_grants((role, perm) in any_permission()) {
                let p = principal(role);
                let allowed = decide(&p, perm, Some(&AccountId::new())) == Decision::Allow;
                let unconditional = find_grant(role, perm).is_some_and(|g| g.rule == Rule::Allow);
                prop_assert_eq!(allowed, unconditional);
            }
        }
    }
}
