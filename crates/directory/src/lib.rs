//! Account directory model: accounts, institutions, children groups, and the
//! validator pipeline that turns raw payloads into typed inputs for them.

pub mod account;
pub mod group;
pub mod institution;
pub mod validation;

pub use account::{Account, Gender, Profile};
pub use group::{ChildrenGroup, dedup_ordered};
pub use institution::Institution;
pub use validation::{
    AccountPatch, Credentials, GroupPatch, InstitutionPatch, NewAccount, NewGroup, NewInstitution,
    PasswordChange,
};
