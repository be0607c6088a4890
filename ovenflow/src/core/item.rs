//! The item travelling through the pipeline.

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of an item for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generates a fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ItemId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of product an order asks for.
///
/// Serializes as its lowercase name. Deserializes from either the name or
/// the numeric index (`0` pizza, `1` calzone, `2` focaccia).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    /// A pizza.
    #[default]
    Pizza,
    /// A folded pizza.
    Calzone,
    /// Flat oven bread.
    Focaccia,
}

impl ProductKind {
    /// Every kind, in index order.
    pub const ALL: [Self; 3] = [Self::Pizza, Self::Calzone, Self::Focaccia];

    /// Looks a kind up by its numeric index.
    #[must_use]
    pub fn from_index(index: u64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Returns the tag value used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pizza => "pizza",
            Self::Calzone => "calzone",
            Self::Focaccia => "focaccia",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pizza" => Ok(Self::Pizza),
            "calzone" => Ok(Self::Calzone),
            "focaccia" => Ok(Self::Focaccia),
            other => Err(format!("unknown product kind: {other}")),
        }
    }
}

struct ProductKindVisitor;

impl Visitor<'_> for ProductKindVisitor {
    type Value = ProductKind;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a product name or an index between 0 and 2")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        ProductKind::from_index(v)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .ok()
            .and_then(ProductKind::from_index)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(|_| E::unknown_variant(v, &["pizza", "calzone", "focaccia"]))
    }
}

impl<'de> Deserialize<'de> for ProductKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ProductKindVisitor)
    }
}

/// A single unit of production.
///
/// Items are immutable once created; the pipeline only moves them between
/// stages and in and out of the in-flight registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identity, stable across retries.
    pub id: ItemId,
    /// What is being produced.
    pub kind: ProductKind,
    /// The client that placed the order.
    pub client_id: String,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Creates a new item with a fresh identity.
    #[must_use]
    pub fn new(kind: ProductKind, client_id: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            kind,
            client_id: client_id.into(),
            created_at: Utc::now(),
        }
    }
}
