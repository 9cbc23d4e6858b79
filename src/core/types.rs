use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Prefix carried by every client-generated id.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Key of a collection record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh client-side id for an entity the server has not seen yet.
    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visibility class of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Personal,
    Shared,
    Public,
}

impl CollectionType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A collection record as owned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CollectionType,
    pub tags: BTreeSet<String>,
    pub item_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: String,
}

impl Entity {
    /// Builds the optimistic placeholder shown while a create is in flight.
    pub fn provisional(id: EntityId, data: &NewEntity, owner_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name.clone(),
            description: data.description.clone(),
            kind: data.kind,
            tags: data.tags.clone(),
            item_count: 0,
            created_at: now,
            updated_at: now,
            owner_id: owner_id.to_string(),
        }
    }

    /// Clamps `updated_at` so it never precedes `created_at`.
    pub fn normalized(mut self) -> Self {
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Payload of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CollectionType,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl NewEntity {
    pub fn new(name: impl Into<String>, kind: CollectionType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            tags: BTreeSet::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Copies the user-editable fields of `entity` under a new name.
    pub fn copy_of(entity: &Entity, name: String) -> Self {
        Self {
            name,
            description: entity.description.clone(),
            kind: entity.kind,
            tags: entity.tags.clone(),
        }
    }
}

/// Field-level partial update.
///
/// `None` means "inherit from the base record"; `Some` overrides it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CollectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
}

impl EntityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(mut self, kind: CollectionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.kind.is_none() && self.tags.is_none()
    }

    /// Layers `newer` on top of `self`; fields set in `newer` win.
    pub fn merge(&mut self, newer: &EntityPatch) {
        if let Some(name) = &newer.name {
            self.name = Some(name.clone());
        }
        if let Some(description) = &newer.description {
            self.description = Some(description.clone());
        }
        if let Some(kind) = newer.kind {
            self.kind = Some(kind);
        }
        if let Some(tags) = &newer.tags {
            self.tags = Some(tags.clone());
        }
    }

    /// Returns `base` with every overridden field replaced.
    pub fn apply_to(&self, base: &Entity) -> Entity {
        let mut entity = base.clone();
        if let Some(name) = &self.name {
            entity.name = name.clone();
        }
        if let Some(description) = &self.description {
            entity.description = description.clone();
        }
        if let Some(kind) = self.kind {
            entity.kind = kind;
        }
        if let Some(tags) = &self.tags {
            entity.tags = tags.clone();
        }
        entity
    }
}
