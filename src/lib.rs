//! Container-backed player shops.
//!
//! A host game embeds [`ShopService`] and wires in its own economy,
//! world access, permission hooks, and messaging. The service keeps
//! every live shop in a world / tile / location registry, persists
//! them through a [`ShopStore`], and drives two reply pipelines: one
//! that turns a chat reply into a new shop, one that turns a reply
//! into a completed trade.

pub mod actor;
pub mod config;
pub mod coord;
pub mod error;
pub mod item;
pub mod notice;
pub mod pending;
pub mod service;
pub mod shop;
pub mod store;
pub mod traits;

pub use actor::ActorId;
pub use config::ShopConfig;
pub use coord::{Location, TileCoord, TILE_SIZE};
pub use error::ShopError;
pub use item::ItemKey;
pub use notice::ShopNotice;
pub use pending::{PendingAction, PendingActionTable, PendingKind};
pub use service::ShopService;
pub use shop::{Shop, ShopCursor, ShopMode, ShopRegistry, ShopState};
pub use store::{ShopStore, SqliteShopStore};
pub use traits::{DefaultHooks, Economy, GameWorld, Messenger, ShopHooks, Verdict};
