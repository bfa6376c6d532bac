//! Shop Records
//!
//! The transactional entity held by the registry: one shop per block
//! position, owned, priced, selling or buying a single item signature.

use serde::Serialize;

use crate::actor::ActorId;
use crate::coord::{Location, TileCoord};
use crate::item::ItemKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShopMode {
    Selling,
    Buying,
}

impl ShopMode {
    /// Decode the store's shop_type column
    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            ShopMode::Buying
        } else {
            ShopMode::Selling
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            ShopMode::Selling => 0,
            ShopMode::Buying => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShopState {
    Active,
    Closed,
    /// Backing container went missing; kept in memory until removed
    Invalid,
    /// No longer in the registry
    Deleted,
}

/// A shop record. The location is its identity and never changes; a
/// moved shop is a delete plus a create.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shop {
    pub location: Location,
    pub owner: ActorId,
    pub price: f64,
    pub mode: ShopMode,
    pub item: ItemKey,
    pub unlimited: bool,
    pub state: ShopState,
    /// Paired shop sharing a double-wide container
    pub attached: Option<Location>,
}

impl Shop {
    pub fn new(
        location: Location,
        owner: ActorId,
        price: f64,
        mode: ShopMode,
        item: ItemKey,
    ) -> Self {
        Self {
            location,
            owner,
            price,
            mode,
            item,
            unlimited: false,
            state: ShopState::Active,
            attached: None,
        }
    }

    pub fn unlimited(mut self) -> Self {
        self.unlimited = true;
        self
    }

    pub fn is_selling(&self) -> bool {
        self.mode == ShopMode::Selling
    }

    pub fn is_buying(&self) -> bool {
        self.mode == ShopMode::Buying
    }

    pub fn tile(&self) -> TileCoord {
        self.location.tile()
    }
}
