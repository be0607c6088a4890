//! Order request payloads.

use crate::core::{Item, ProductKind};
use serde::{Deserialize, Serialize};

/// The client placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client identifier.
    pub id: String,
}

/// The product requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRequest {
    /// Product type.
    #[serde(rename = "type", default)]
    pub kind: ProductKind,
}

/// An order as received at the trigger boundary.
///
/// Wire shape: `{"client": {"id": "..."}, "product": {"type": "pizza"}}`, where
/// `type` may also be the numeric product index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Who ordered.
    pub client: ClientInfo,
    /// What was ordered.
    pub product: ProductRequest,
}

impl OrderRequest {
    /// Creates a new order request.
    #[must_use]
    pub fn new(client_id: impl Into<String>, kind: ProductKind) -> Self {
        Self {
            client: ClientInfo { id: client_id.into() },
            product: ProductRequest { kind },
        }
    }

    /// Builds the item this order produces.
    #[must_use]
    pub fn to_item(&self) -> Item {
        Item::new(self.product.kind, self.client.id.clone())
    }
}
