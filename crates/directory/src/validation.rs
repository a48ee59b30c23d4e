//! Validator pipeline: raw JSON payloads -> typed, shape-checked inputs.
//!
//! Create payloads check required fields in a fixed order per resource type
//! and report only the first failure. Patch payloads check only the fields
//! that were supplied. Nothing here touches storage: referenced ids are
//! checked for shape, existence is the consistency checker's job.

use serde_json::{Map, Value as JsonValue};

use accountd_auth::Role;
use accountd_core::{AccountId, InstitutionId, ValidationError};

use crate::account::{Gender, Profile};
use crate::group::dedup_ordered;

type Payload = Map<String, JsonValue>;

// ─────────────────────────────────────────────────────────────────────────────
// Validated inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Shape-checked account creation request. `password` is still plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub institution_id: Option<InstitutionId>,
    pub profile: Profile,
}

/// Shape-checked partial account update. `None` = leave untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub institution_id: Option<InstitutionId>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub children: Option<Vec<AccountId>>,
    pub application_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInstitution {
    pub institution_type: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstitutionPatch {
    pub institution_type: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub school_class: Option<String>,
    pub children: Vec<AccountId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub school_class: Option<String>,
    pub children: Option<Vec<AccountId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Validate an account creation payload for `role`.
///
/// Field order: `username`, `password`, then the role-specific fields
/// (child: `gender`, `age`, `institution_id`; educator / health professional:
/// `institution_id`; family: `institution_id`, `children`; application:
/// `application_name`, optional `institution_id`).
pub fn validate_new_account(role: Role, payload: &JsonValue) -> Result<NewAccount, ValidationError> {
    let obj = as_object(payload)?;

    let username = required_string(obj, "username")?;
    let password = required_secret(obj, "password")?;

    let (profile, institution_id) = match role {
        Role::Admin => (Profile::Admin, None),
        Role::Child => {
            let gender = required_gender(obj)?;
            let age = required_age(obj)?;
            let institution = required_id::<InstitutionId>(obj, "institution_id")?;
            (Profile::Child { gender, age }, Some(institution))
        }
        Role::Educator => (Profile::Educator, Some(required_id(obj, "institution_id")?)),
        Role::HealthProfessional => (
            Profile::HealthProfessional,
            Some(required_id(obj, "institution_id")?),
        ),
        Role::Family => {
            let institution = required_id::<InstitutionId>(obj, "institution_id")?;
            let children = optional_id_list(obj, "children")?.unwrap_or_default();
            (Profile::Family { children }, Some(institution))
        }
        Role::Application => {
            let application_name = required_string(obj, "application_name")?;
            let institution = optional_id::<InstitutionId>(obj, "institution_id")?;
            (Profile::Application { application_name }, institution)
        }
    };

    Ok(NewAccount {
        username,
        password,
        institution_id,
        profile,
    })
}

/// Validate a partial account update for an account of `role`.
///
/// `password` is rejected (it has its own operation); `id` and fields that
/// do not belong to `role` are ignored.
pub fn validate_account_patch(role: Role, payload: &JsonValue) -> Result<AccountPatch, ValidationError> {
    let obj = as_object(payload)?;

    if obj.contains_key("password") {
        return Err(ValidationError::ReadOnlyField("password".to_string()));
    }

    let mut patch = AccountPatch {
        username: optional_string(obj, "username")?,
        ..AccountPatch::default()
    };

    match role {
        Role::Admin => {}
        Role::Child => {
            patch.gender = optional_gender(obj)?;
            patch.age = optional_age(obj)?;
            patch.institution_id = optional_id(obj, "institution_id")?;
        }
        Role::Educator | Role::HealthProfessional => {
            patch.institution_id = optional_id(obj, "institution_id")?;
        }
        Role::Family => {
            patch.institution_id = optional_id(obj, "institution_id")?;
            patch.children = optional_id_list(obj, "children")?;
        }
        Role::Application => {
            patch.application_name = optional_string(obj, "application_name")?;
            patch.institution_id = optional_id(obj, "institution_id")?;
        }
    }

    Ok(patch)
}

// ─────────────────────────────────────────────────────────────────────────────
// Institutions
// ─────────────────────────────────────────────────────────────────────────────

/// Field order: `type`, `name`; `address`, `latitude`, `longitude` optional.
pub fn validate_new_institution(payload: &JsonValue) -> Result<NewInstitution, ValidationError> {
    let obj = as_object(payload)?;

    Ok(NewInstitution {
        institution_type: required_string(obj, "type")?,
        name: required_string(obj, "name")?,
        address: optional_string(obj, "address")?,
        latitude: optional_number(obj, "latitude")?,
        longitude: optional_number(obj, "longitude")?,
    })
}

pub fn validate_institution_patch(payload: &JsonValue) -> Result<InstitutionPatch, ValidationError> {
    let obj = as_object(payload)?;

    Ok(InstitutionPatch {
        institution_type: optional_string(obj, "type")?,
        name: optional_string(obj, "name")?,
        address: optional_string(obj, "address")?,
        latitude: optional_number(obj, "latitude")?,
        longitude: optional_number(obj, "longitude")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Children groups
// ─────────────────────────────────────────────────────────────────────────────

/// Field order: `name`, `children` (non-empty); `school_class` optional.
pub fn validate_new_group(payload: &JsonValue) -> Result<NewGroup, ValidationError> {
    let obj = as_object(payload)?;

    let name = required_string(obj, "name")?;
    let children = optional_id_list(obj, "children")?.ok_or_else(|| ValidationError::missing("children"))?;
    if children.is_empty() {
        return Err(ValidationError::invalid("children", "at least one child id is expected"));
    }

    Ok(NewGroup {
        name,
        school_class: optional_string(obj, "school_class")?,
        children,
    })
}

pub fn validate_group_patch(payload: &JsonValue) -> Result<GroupPatch, ValidationError> {
    let obj = as_object(payload)?;

    let children = optional_id_list(obj, "children")?;
    if matches!(&children, Some(c) if c.is_empty()) {
        return Err(ValidationError::invalid("children", "at least one child id is expected"));
    }

    Ok(GroupPatch {
        name: optional_string(obj, "name")?,
        school_class: optional_string(obj, "school_class")?,
        children,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Login payload. Missing fields are validation errors naming the field,
/// distinct from a wrong-credential authentication failure.
pub fn validate_credentials(payload: &JsonValue) -> Result<Credentials, ValidationError> {
    let obj = as_object(payload)?;
    Ok(Credentials {
        username: required_string(obj, "username")?,
        password: required_secret(obj, "password")?,
    })
}

pub fn validate_password_change(payload: &JsonValue) -> Result<PasswordChange, ValidationError> {
    let obj = as_object(payload)?;

    let old_password = optional_secret(obj, "old_password")
        .map_err(|_| ValidationError::OldPasswordNotProvided)?
        .ok_or(ValidationError::OldPasswordNotProvided)?;
    let new_password = optional_secret(obj, "new_password")
        .map_err(|_| ValidationError::NewPasswordNotProvided)?
        .ok_or(ValidationError::NewPasswordNotProvided)?;

    Ok(PasswordChange {
        old_password,
        new_password,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Field helpers
// ─────────────────────────────────────────────────────────────────────────────

fn as_object(payload: &JsonValue) -> Result<&Payload, ValidationError> {
    payload
        .as_object()
        .ok_or_else(|| ValidationError::invalid("body", "a JSON object is expected"))
}

/// Absent and `null` are both "not supplied".
fn supplied<'a>(obj: &'a Payload, field: &str) -> Option<&'a JsonValue> {
    obj.get(field).filter(|v| !v.is_null())
}

fn required_string(obj: &Payload, field: &str) -> Result<String, ValidationError> {
    optional_string(obj, field)?.ok_or_else(|| ValidationError::missing(field))
}

fn optional_string(obj: &Payload, field: &str) -> Result<Option<String>, ValidationError> {
    match supplied(obj, field) {
        None => Ok(None),
        Some(JsonValue::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::invalid(field, "must not be empty"))
        }
        Some(JsonValue::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ValidationError::cast(field, "string")),
    }
}

/// Passwords are taken verbatim: surrounding whitespace is part of the secret.
fn required_secret(obj: &Payload, field: &str) -> Result<String, ValidationError> {
    optional_secret(obj, field)?.ok_or_else(|| ValidationError::missing(field))
}

fn optional_secret(obj: &Payload, field: &str) -> Result<Option<String>, ValidationError> {
    match supplied(obj, field) {
        None => Ok(None),
        Some(JsonValue::String(s)) if s.is_empty() => Err(ValidationError::invalid(field, "must not be empty")),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::cast(field, "string")),
    }
}

fn optional_number(obj: &Payload, field: &str) -> Result<Option<f64>, ValidationError> {
    match supplied(obj, field) {
        None => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| ValidationError::cast(field, "number")),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(|| ValidationError::cast(field, "number")),
        Some(_) => Err(ValidationError::cast(field, "number")),
    }
}

fn required_gender(obj: &Payload) -> Result<Gender, ValidationError> {
    optional_gender(obj)?.ok_or_else(|| ValidationError::missing("gender"))
}

fn optional_gender(obj: &Payload) -> Result<Option<Gender>, ValidationError> {
    match supplied(obj, "gender") {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(Gender::parse)
            .map(Some)
            .ok_or_else(|| ValidationError::invalid("gender", "the allowed values are: male, female")),
    }
}

fn required_age(obj: &Payload) -> Result<u32, ValidationError> {
    optional_age(obj)?.ok_or_else(|| ValidationError::missing("age"))
}

fn optional_age(obj: &Payload) -> Result<Option<u32>, ValidationError> {
    let raw = match supplied(obj, "age") {
        None => return Ok(None),
        Some(JsonValue::Number(n)) => n.as_i64(),
        Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    let age = raw.ok_or_else(|| ValidationError::cast("age", "integer"))?;
    if age < 0 {
        return Err(ValidationError::invalid("age", "age cannot be negative"));
    }
    u32::try_from(age)
        .map(Some)
        .map_err(|_| ValidationError::invalid("age", "age is out of range"))
}

/// Ids parse through `FromStr`, which reports `InvalidIdFormat`.
trait ParseId: Sized {
    fn parse_id(field: &str, raw: &str) -> Result<Self, ValidationError>;
}

impl ParseId for InstitutionId {
    fn parse_id(field: &str, raw: &str) -> Result<Self, ValidationError> {
        InstitutionId::parse_field(field, raw)
    }
}

impl ParseId for AccountId {
    fn parse_id(field: &str, raw: &str) -> Result<Self, ValidationError> {
        AccountId::parse_field(field, raw)
    }
}

fn required_id<T: ParseId>(obj: &Payload, field: &str) -> Result<T, ValidationError> {
    optional_id(obj, field)?.ok_or_else(|| ValidationError::missing(field))
}

fn optional_id<T: ParseId>(obj: &Payload, field: &str) -> Result<Option<T>, ValidationError> {
    match supplied(obj, field) {
        None => Ok(None),
        Some(JsonValue::String(s)) => T::parse_id(field, s).map(Some),
        Some(other) => Err(ValidationError::invalid_id(field, other.to_string())),
    }
}

fn optional_id_list(obj: &Payload, field: &str) -> Result<Option<Vec<AccountId>>, ValidationError> {
    let items = match supplied(obj, field) {
        None => return Ok(None),
        Some(JsonValue::Array(items)) => items,
        Some(_) => return Err(ValidationError::cast(field, "array")),
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = match item {
            JsonValue::String(s) => AccountId::parse_field(field, s)?,
            other => return Err(ValidationError::invalid_id(field, other.to_string())),
        };
        ids.push(id);
    }
    Ok(Some(dedup_ordered(ids)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn child_payload() -> JsonValue {
        json!({
            "username": "c1",
            "password": "p1",
            "gender": "male",
            "age": 11,
            "institution_id": InstitutionId::new().to_string(),
        })
    }

    #[test]
    fn valid_child_payload() {
        let new = validate_new_account(Role::Child, &child_payload()).unwrap();
        assert_eq!(new.username, "c1");
        assert_eq!(
            new.profile,
            Profile::Child {
                gender: Gender::Male,
                age: 11
            }
        );
        assert!(new.institution_id.is_some());
    }

    #[test]
    fn first_missing_field_is_reported() {
        let err = validate_new_account(Role::Child, &json!({})).unwrap_err();
        assert_eq!(err, ValidationError::missing("username"));

        let err = validate_new_account(Role::Child, &json!({"username": "c1"})).unwrap_err();
        assert_eq!(err, ValidationError::missing("password"));

        let mut payload = child_payload();
        payload.as_object_mut().unwrap().remove("gender");
        payload.as_object_mut().unwrap().remove("institution_id");
        let err = validate_new_account(Role::Child, &payload).unwrap_err();
        assert_eq!(err, ValidationError::missing("gender"));
    }

    #[test]
    fn null_counts_as_missing() {
        let mut payload = child_payload();
        payload["age"] = JsonValue::Null;
        let err = validate_new_account(Role::Child, &payload).unwrap_err();
        assert_eq!(err, ValidationError::missing("age"));
    }

    #[test]
    fn non_numeric_age_is_cast_error_not_missing() {
        let mut payload = child_payload();
        payload["age"] = json!("eleven");
        let err = validate_new_account(Role::Child, &payload).unwrap_err();
        assert_eq!(err.code(), "cast_error");
    }

    #[test]
    fn numeric_string_age_is_accepted() {
        let mut payload = child_payload();
        payload["age"] = json!("9");
        let new = validate_new_account(Role::Child, &payload).unwrap();
        assert!(matches!(new.profile, Profile::Child { age: 9, .. }));
    }

    #[test]
    fn unknown_gender_is_invalid() {
        let mut payload = child_payload();
        payload["gender"] = json!("robot");
        let err = validate_new_account(Role::Child, &payload).unwrap_err();
        assert_eq!(err.code(), "invalid_value");
    }

    #[test]
    fn malformed_institution_id_is_invalid_id_format() {
        let mut payload = child_payload();
        payload["institution_id"] = json!("123");
        let err = validate_new_account(Role::Child, &payload).unwrap_err();
        assert_eq!(err, ValidationError::invalid_id("institution_id", "123"));
    }

    #[test]
    fn application_requires_name_but_not_institution() {
        let err = validate_new_account(Role::Application, &json!({"username": "a", "password": "p"}))
            .unwrap_err();
        assert_eq!(err, ValidationError::missing("application_name"));

        let new = validate_new_account(
            Role::Application,
            &json!({"username": "a", "password": "p", "application_name": "tracker"}),
        )
        .unwrap();
        assert_eq!(new.institution_id, None);
    }

    #[test]
    fn educator_and_family_require_institution() {
        for role in [Role::Educator, Role::HealthProfessional, Role::Family] {
            let err = validate_new_account(role, &json!({"username": "u", "password": "p"})).unwrap_err();
            assert_eq!(err, ValidationError::missing("institution_id"), "{role}");
        }
    }

    #[test]
    fn patch_only_checks_supplied_fields() {
        let patch = validate_account_patch(Role::Child, &json!({"age": 12})).unwrap();
        assert_eq!(
            patch,
            AccountPatch {
                age: Some(12),
                ..AccountPatch::default()
            }
        );

        let patch = validate_account_patch(Role::Educator, &json!({})).unwrap();
        assert_eq!(patch, AccountPatch::default());
    }

    #[test]
    fn patch_rejects_password_and_negative_age() {
        let err = validate_account_patch(Role::Child, &json!({"password": "x"})).unwrap_err();
        assert_eq!(err.code(), "read_only_field");

        let err = validate_account_patch(Role::Child, &json!({"age": -1})).unwrap_err();
        assert_eq!(err.code(), "invalid_value");
    }

    #[test]
    fn institution_coordinates_must_be_numeric() {
        let err = validate_new_institution(&json!({"type": "School", "name": "A", "latitude": "north"}))
            .unwrap_err();
        assert_eq!(err, ValidationError::cast("latitude", "number"));

        let ok = validate_new_institution(
            &json!({"type": "School", "name": "A", "latitude": "-7.25", "longitude": -35.9}),
        )
        .unwrap();
        assert_eq!(ok.latitude, Some(-7.25));
        assert_eq!(ok.longitude, Some(-35.9));
    }

    #[test]
    fn institution_type_checked_before_name() {
        let err = validate_new_institution(&json!({})).unwrap_err();
        assert_eq!(err, ValidationError::missing("type"));
    }

    #[test]
    fn group_requires_name_then_children() {
        let err = validate_new_group(&json!({})).unwrap_err();
        assert_eq!(err, ValidationError::missing("name"));

        let err = validate_new_group(&json!({"name": "G"})).unwrap_err();
        assert_eq!(err, ValidationError::missing("children"));

        let err = validate_new_group(&json!({"name": "G", "children": []})).unwrap_err();
        assert_eq!(err.code(), "invalid_value");
    }

    #[test]
    fn any_malformed_child_id_aborts() {
        let good = AccountId::new().to_string();
        let err = validate_new_group(&json!({"name": "G", "children": [good, "nope"]})).unwrap_err();
        assert_eq!(err, ValidationError::invalid_id("children", "nope"));
    }

    #[test]
    fn login_reports_missing_field_by_name() {
        let err = validate_credentials(&json!({"password": "p"})).unwrap_err();
        assert_eq!(err, ValidationError::missing("username"));
        let err = validate_credentials(&json!({"username": "u"})).unwrap_err();
        assert_eq!(err, ValidationError::missing("password"));
    }

    #[test]
    fn passwords_keep_surrounding_whitespace() {
        let creds = validate_credentials(&json!({"username": " root ", "password": " p1 "})).unwrap();
        assert_eq!(creds.username, "root");
        assert_eq!(creds.password, " p1 ");

        let change = validate_password_change(&json!({"old_password": "o ", "new_password": " n"})).unwrap();
        assert_eq!(change.old_password, "o ");
        assert_eq!(change.new_password, " n");

        let new = validate_new_account(Role::Admin, &json!({"username": "a", "password": "\tp"})).unwrap();
        assert_eq!(new.password, "\tp");
    }

    #[test]
    fn password_change_names_missing_side() {
        let err = validate_password_change(&json!({"new_password": "n"})).unwrap_err();
        assert_eq!(err, ValidationError::OldPasswordNotProvided);
        let err = validate_password_change(&json!({"old_password": "o"})).unwrap_err();
        assert_eq!(err, ValidationError::NewPasswordNotProvided);
        assert_ne!(
            ValidationError::OldPasswordNotProvided.code(),
            ValidationError::NewPasswordNotProvided.code()
        );
    }

    proptest! {
        #[test]
        fn negative_age_always_rejected(age in i64::MIN..0) {
            let mut payload = child_payload();
            payload["age"] = json!(age);
            let err = validate_new_account(Role::Child, &payload).unwrap_err();
            prop_assert_eq!(err.code(), "invalid_value");
        }

        #[test]
        fn gender_outside_enum_always_rejected(gender in "[a-z]{1,10}") {
            prop_assume!(gender != "male" && gender != "female");
            let mut payload = child_payload();
            payload["gender"] = json!(gender);
            let err = validate_new_account(Role::Child, &payload).unwrap_err();
            prop_assert_eq!(err.code(), "invalid_value");
        }
    }
}
