//! Role entity
//!
//! Roles are the reference entity of the service: a unique name, an optional
//! description and an enable flag. The generic use case and router are
//! instantiated over [`Role`] by the binary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StructuredError;
use crate::repository::{Entity, EntityChanges, FilterValue, NewEntity};

/// Longest accepted role name, in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// A tenant's role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Identifier assigned on create
    pub id: Uuid,
    /// Unique among the tenant's live roles
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Whether the role can be assigned
    pub enable: bool,
    /// Set from the clock on create
    pub created_at: Option<DateTime<Utc>>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Body of a create request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRole {
    /// Role name, trimmed before it is stored
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Defaults to enabled
    pub enable: Option<bool>,
}

/// Body of an update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRole {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New enabled state
    pub enable: Option<bool>,
}

fn check_name(name: &str, messages: &mut Vec<String>) {
    let name = name.trim();
    if name.is_empty() {
        messages.push("name: must not be empty".to_string());
    } else if name.chars().count() > MAX_NAME_LENGTH {
        messages.push(format!("name: must be at most {MAX_NAME_LENGTH} characters"));
    }
}

fn check_description(description: Option<&str>, messages: &mut Vec<String>) {
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
        messages.push(format!(
            "description: must be at most {MAX_DESCRIPTION_LENGTH} characters"
        ));
    }
}

fn outcome(messages: Vec<String>) -> Result<(), StructuredError> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(StructuredError::validation_failed(Role::NAME, messages))
    }
}

impl Entity for Role {
    type Create = CreateRole;
    type Update = UpdateRole;

    const NAME: &'static str = "role";
    const TABLE: &'static str = "roles";
    const UNIQUE_COLUMN: &'static str = "name";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }

    fn field(&self, column: &str) -> Option<FilterValue> {
        let value = match column {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "description" => self.description.clone().into(),
            "enable" => self.enable.into(),
            "created_at" => self.created_at.into(),
            "deleted_at" => self.deleted_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

impl NewEntity<Role> for CreateRole {
    fn validate(&self) -> Result<(), StructuredError> {
        let mut messages = Vec::new();
        check_name(&self.name, &mut messages);
        check_description(self.description.as_deref(), &mut messages);
        outcome(messages)
    }

    fn unique_key(&self) -> &str {
        self.name.trim()
    }

    fn into_entity(self, id: Uuid, created_at: DateTime<Utc>) -> Role {
        Role {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            enable: self.enable.unwrap_or(true),
            created_at: Some(created_at),
            deleted_at: None,
        }
    }
}

impl EntityChanges<Role> for UpdateRole {
    fn validate(&self) -> Result<(), StructuredError> {
        let mut messages = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut messages);
        }
        check_description(self.description.as_deref(), &mut messages);
        outcome(messages)
    }

    fn unique_key(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim)
    }

    fn apply(self, role: &mut Role) {
        if let Some(name) = self.name {
            role.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            role.description = Some(description);
        }
        if let Some(enable) = self.enable {
            role.enable = enable;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_create_role_validation_collects_messages() {
        let input = CreateRole {
            name: "  ".to_string(),
            description: Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1)),
            enable: None,
        };
        let error = input.validate().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValidationFailed);
        assert_eq!(
            error.messages(),
            [
                "name: must not be empty".to_string(),
                "description: must be at most 255 characters".to_string(),
            ]
        );
    }

    #[test]
    fn test_name_length_limit() {
        let ok = CreateRole {
            name: "é".repeat(MAX_NAME_LENGTH),
            ..CreateRole::default()
        };
        assert!(ok.validate().is_ok());

        let too_long = UpdateRole {
            name: Some("a".repeat(MAX_NAME_LENGTH + 1)),
            ..UpdateRole::default()
        };
        let error = too_long.validate().unwrap_err();
        assert_eq!(error.messages(), ["name: must be at most 100 characters".to_string()]);
    }

    #[test]
    fn test_into_entity_defaults() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let id = Uuid::new_v4();
        let role = CreateRole {
            name: " Gerencia ".to_string(),
            ..CreateRole::default()
        }
        .into_entity(id, at);

        assert_eq!(role.id, id);
        assert_eq!(role.name, "Gerencia");
        assert!(role.enable);
        assert_eq!(role.created_at, Some(at));
        assert!(role.deleted_at.is_none());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut role = CreateRole {
            name: "Ventas".to_string(),
            description: Some("sales".to_string()),
            enable: Some(true),
        }
        .into_entity(Uuid::new_v4(), Utc::now());

        UpdateRole {
            enable: Some(false),
            ..UpdateRole::default()
        }
        .apply(&mut role);

        assert_eq!(role.name, "Ventas");
        assert_eq!(role.description.as_deref(), Some("sales"));
        assert!(!role.enable);
    }

    #[test]
    fn test_serializes_camel_case() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let role = CreateRole {
            name: "Gerencia".to_string(),
            ..CreateRole::default()
        }
        .into_entity(Uuid::nil(), at);

        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["createdAt"], "2024-05-01T08:00:00Z");
        assert!(json.get("deletedAt").is_none());
        assert_eq!(json["enable"], true);
    }

    #[test]
    fn test_missing_name_deserializes_to_validation_error() {
        let input: CreateRole = serde_json::from_str(r#"{"description":"d"}"#).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_field_lookup() {
        let role = CreateRole {
            name: "Gerencia".to_string(),
            ..CreateRole::default()
        }
        .into_entity(Uuid::nil(), Utc::now());

        assert_eq!(role.field("name"), Some(FilterValue::String("Gerencia".into())));
        assert_eq!(role.field("description"), Some(FilterValue::Null));
        assert_eq!(role.field("enable"), Some(FilterValue::Boolean(true)));
        assert!(role.field("salary").is_none());
    }
}
