//! Reference resolution.
//!
//! Remote matters point at users, contacts, matter types and statuses by id.
//! Before matters are stored, those ids are resolved into display names from
//! lookup maps built out of the local store. The maps are rebuilt at the
//! start of every phase that needs them and dropped afterwards.

use std::collections::HashMap;

use serde_json::Value;

use crate::AppError;
use crate::models::{NamedRef, NewMatter};
use crate::remote::{Embedded, RemoteMatter, UNKNOWN_NAME};
use crate::traits::EntityStore;

/// `remote_id → display name` lookups for one phase.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReferenceMaps {
    pub users: HashMap<i64, String>,
    pub clients: HashMap<i64, String>,
    pub matter_types: HashMap<i64, String>,
    pub statuses: HashMap<i64, String>,
}

impl ReferenceMaps {
    /// Builds fresh maps from the store.
    pub async fn load<S: EntityStore>(store: &S) -> Result<Self, AppError> {
        let users = known_names(store.user_names().await?);
        let clients = known_names(store.contact_names().await?);

        let matter_types = store
            .matter_type_names()
            .await?
            .into_iter()
            .map(|t| (t.remote_id, t.name))
            .collect();

        let statuses = store
            .matter_status_names()
            .await?
            .into_iter()
            .map(|s| (s.remote_id, s.name))
            .collect();

        Ok(Self {
            users,
            clients,
            matter_types,
            statuses,
        })
    }

    /// Resolves the remote matter's references and builds the local record.
    ///
    /// For each reference the id lookup wins, then whatever the payload
    /// embeds, then nothing.
    pub fn matter_from_remote(&self, matter: RemoteMatter) -> NewMatter {
        let (client_id, client_name) = resolve(&self.clients, matter.client_id, matter.client.as_ref());
        let (assignee_id, assignee_name) =
            resolve(&self.users, matter.assignee_id, matter.assignee.as_ref());
        let (matter_type_id, matter_type_name) = resolve(
            &self.matter_types,
            matter.matter_type_id,
            matter.matter_type.as_ref(),
        );
        let (status_id, status_name) = resolve(&self.statuses, matter.status_id, matter.status.as_ref());

        let title = matter
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| matter.number.clone())
            .unwrap_or_else(|| format!("Matter {}", matter.id));

        NewMatter {
            remote_id: matter.id,
            title,
            number: matter.number,
            description: matter.description,
            client_id,
            client_name,
            assignee_id,
            assignee_name,
            matter_type_id,
            matter_type_name,
            status_id,
            status_name,
            opened_at: matter.opened_at,
            closed_at: matter.closed_at,
            deadline: matter.deadline,
            remote_updated_at: matter.updated_at,
            metadata: Value::Object(matter.extra),
        }
    }
}

/// Keeps the names people will recognize. A stored placeholder would
/// otherwise shadow the name embedded in the matter payload.
fn known_names(rows: Vec<NamedRef>) -> HashMap<i64, String> {
    rows.into_iter()
        .filter(|r| !r.name.trim().is_empty() && r.name != UNKNOWN_NAME)
        .map(|r| (r.remote_id, r.name))
        .collect()
}

/// Resolves one reference to `(id, display name)`.
fn resolve(
    map: &HashMap<i64, String>,
    id: Option<i64>,
    embedded: Option<&Embedded>,
) -> (Option<i64>, Option<String>) {
    let id = id.or_else(|| embedded.and_then(Embedded::id));
    let name = id
        .and_then(|id| map.get(&id).cloned())
        .or_else(|| embedded.and_then(Embedded::display_name));
    (id, name)
}
