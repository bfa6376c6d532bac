//! Collaborator Interfaces
//!
//! Seams to the hosting runtime: economy, world access, veto hooks and
//! notice delivery. The core calls these synchronously, so
//! implementations must return promptly.

use crate::actor::ActorId;
use crate::coord::Location;
use crate::error::ShopError;
use crate::item::ItemKey;
use crate::notice::ShopNotice;
use crate::shop::definition::Shop;

/// Decision from a veto hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn denied(&self) -> bool {
        *self == Verdict::Deny
    }
}

/// Account balances and transfers. Amounts are always positive.
pub trait Economy: Send + Sync {
    fn balance(&self, actor: &ActorId) -> f64;
    /// Take funds; false when the account refuses
    fn withdraw(&self, actor: &ActorId, amount: f64) -> bool;
    fn deposit(&self, actor: &ActorId, amount: f64) -> Result<(), ShopError>;
    /// Whether the economy has ever seen this account. Taxes are only
    /// routed to accounts that already exist.
    fn has_history(&self, actor: &ActorId) -> bool;
    fn format(&self, amount: f64) -> String;
}

/// Window onto the hosting world: actor positions, the containers
/// backing shops, and display side effects.
pub trait GameWorld: Send + Sync {
    /// Where the actor stands right now; None when offline
    fn actor_location(&self, actor: &ActorId) -> Option<Location>;
    /// Whether this block can back a shop
    fn is_shop_container(&self, location: &Location) -> bool;
    /// Other half of a double-wide container, if any
    fn attached_container(&self, location: &Location) -> Option<Location>;
    /// Units of the shop's item in its container
    fn container_stock(&self, shop: &Shop) -> Result<u32, ShopError>;
    /// Units of the shop's item the container can still accept
    fn container_space(&self, shop: &Shop) -> Result<u32, ShopError>;
    /// Units of the item the actor's inventory can still accept
    fn actor_free_space(&self, actor: &ActorId, item: &ItemKey) -> u32;
    /// Units of the exact item the actor holds
    fn actor_item_count(&self, actor: &ActorId, item: &ItemKey) -> u32;
    /// Move items from the container into the actor's inventory
    fn transfer_to_actor(
        &self,
        shop: &Shop,
        actor: &ActorId,
        quantity: u32,
    ) -> Result<(), ShopError>;
    /// Move items from the actor's inventory into the container
    fn transfer_to_container(
        &self,
        shop: &Shop,
        actor: &ActorId,
        quantity: u32,
    ) -> Result<(), ShopError>;
    /// Attach an informational sign to a newly created shop
    fn attach_sign(&self, shop: &Shop, sign_block: &Location) -> Result<(), ShopError>;
    /// Redraw the shop's sign and display item
    fn update_display(&self, shop: &Shop) -> Result<(), ShopError>;
    /// Shop is being dropped from memory (shutdown or bulk clear)
    fn on_shop_unload(&self, shop: &Shop);
}

/// Veto points for the host. Everything is allowed unless overridden.
pub trait ShopHooks: Send + Sync {
    /// Actor interacted with a prospective shop block
    fn can_interact(&self, _actor: &ActorId, _location: &Location) -> Verdict {
        Verdict::Allow
    }

    /// Actor wants to place a shop at this location
    fn can_place_shop(&self, _actor: &ActorId, _location: &Location) -> Verdict {
        Verdict::Allow
    }

    /// A fully built shop is about to be committed
    fn allow_creation(&self, _actor: &ActorId, _shop: &Shop) -> Verdict {
        Verdict::Allow
    }

    /// A validated trade is about to move money and items
    fn allow_trade(&self, _actor: &ActorId, _shop: &Shop, _quantity: u32) -> Verdict {
        Verdict::Allow
    }
}

/// Hooks implementation that never vetoes
pub struct DefaultHooks;

impl ShopHooks for DefaultHooks {}

/// Fire-and-forget delivery of notices to actors
pub trait Messenger: Send + Sync {
    fn send(&self, actor: &ActorId, notice: ShopNotice);
}
