//! Payloads returned by the remote case-management API.
//!
//! Only the fields the sync engine reads are modeled; everything else in a
//! matter payload is kept in `extra` and stored as metadata.
//!
//! # Examples
//!
//! ```
//! use docket_core::remote::RemoteMatter;
//!
//! let json = r#"{
//!     "id": 981,
//!     "title": "I-130 Petition",
//!     "client_id": 12,
//!     "status": "Case Filed",
//!     "priority": "high"
//! }"#;
//!
//! let matter: RemoteMatter = serde_json::from_str(json).unwrap();
//! assert_eq!(matter.id, 981);
//! assert_eq!(matter.status_label().as_deref(), Some("Case Filed"));
//! assert!(matter.extra.contains_key("priority"));
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{NewCategory, NewContact, NewMatterStatus, NewMatterType, NewUser, display_name};

/// Fallback display name when nothing better is known.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A related entity embedded in a remote record.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RemoteRef {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
}

impl RemoteRef {
    /// Best display name this embedded object offers, if any.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        let resolved = display_name(
            self.company_name.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            "",
        );
        (!resolved.is_empty()).then_some(resolved)
    }
}

/// An embedded reference that the API renders either as an object or as a
/// bare label.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Embedded {
    Object(RemoteRef),
    Label(String),
}

impl Embedded {
    pub fn id(&self) -> Option<i64> {
        match self {
            Embedded::Object(r) => r.id,
            Embedded::Label(_) => None,
        }
    }

    pub fn display_name(&self) -> Option<String> {
        match self {
            Embedded::Object(r) => r.display_name(),
            Embedded::Label(label) => {
                let label = label.trim();
                (!label.is_empty()).then(|| label.to_string())
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteUser {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "is_active")]
    pub active: Option<bool>,
}

impl From<RemoteUser> for NewUser {
    fn from(user: RemoteUser) -> Self {
        let fallback = user.email.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let full_name = display_name(
            None,
            user.first_name.as_deref(),
            user.last_name.as_deref(),
            &fallback,
        );
        NewUser {
            remote_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name,
            role: user.role,
            active: user.active.unwrap_or(true),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteContact {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "type")]
    pub contact_type: Option<String>,
}

impl From<RemoteContact> for NewContact {
    fn from(contact: RemoteContact) -> Self {
        let display_name = display_name(
            contact.company_name.as_deref(),
            contact.first_name.as_deref(),
            contact.last_name.as_deref(),
            UNKNOWN_NAME,
        );
        NewContact {
            remote_id: contact.id,
            first_name: contact.first_name,
            last_name: contact.last_name,
            company_name: contact.company_name,
            display_name,
            email: contact.email,
            phone: contact.phone,
            contact_type: contact.contact_type,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteMatterType {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category: Option<Embedded>,
}

impl From<RemoteMatterType> for NewMatterType {
    fn from(matter_type: RemoteMatterType) -> Self {
        let category_id = matter_type
            .category_id
            .or_else(|| matter_type.category.as_ref().and_then(Embedded::id));
        NewMatterType {
            remote_id: matter_type.id,
            name: matter_type.name,
            category_id,
            category_name: matter_type.category.and_then(|c| c.display_name()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteMatterStatus {
    pub id: i64,
    pub name: String,
    pub matter_type_id: Option<i64>,
    #[serde(alias = "sort_order")]
    pub position: Option<i32>,
}

impl From<RemoteMatterStatus> for NewMatterStatus {
    fn from(status: RemoteMatterStatus) -> Self {
        NewMatterStatus {
            remote_id: status.id,
            name: status.name,
            matter_type_id: status.matter_type_id,
            position: status.position,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteCategory {
    pub id: i64,
    pub name: String,
}

impl From<RemoteCategory> for NewCategory {
    fn from(category: RemoteCategory) -> Self {
        NewCategory {
            remote_id: category.id,
            name: category.name,
        }
    }
}

/// A matter as listed or shown by the remote API.
///
/// List responses carry ids only for most references; the detail endpoint
/// additionally embeds `assignee`, `client` and friends as objects, which the
/// reference resolver uses when its maps do not know an id.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteMatter {
    pub id: i64,
    #[serde(alias = "name")]
    pub title: Option<String>,
    #[serde(alias = "matter_number")]
    pub number: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub client: Option<Embedded>,
    #[serde(alias = "user_id", alias = "attorney_id")]
    pub assignee_id: Option<i64>,
    #[serde(alias = "user", alias = "attorney")]
    pub assignee: Option<Embedded>,
    pub matter_type_id: Option<i64>,
    pub matter_type: Option<Embedded>,
    #[serde(alias = "matter_status_id")]
    pub status_id: Option<i64>,
    #[serde(alias = "matter_status")]
    pub status: Option<Embedded>,
    #[serde(alias = "created_at")]
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(alias = "due_date")]
    pub deadline: Option<NaiveDate>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RemoteMatter {
    /// Status label embedded in the payload itself.
    pub fn status_label(&self) -> Option<String> {
        self.status.as_ref().and_then(Embedded::display_name)
    }
}
