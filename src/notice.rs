use serde::Serialize;

use crate::actor::ActorId;
use crate::coord::Location;
use crate::item::ItemKey;

/// User-facing outcomes of shop operations. Rendering and localization
/// happen in the host; the core only picks which notice applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ShopNotice {
    // Creation
    CreationCancelled,
    ShopAlreadyExists,
    ContainerGone,
    PriceTooLow {
        min: f64,
    },
    CannotAffordShop {
        cost: f64,
    },
    CreationFailed,
    ShopsNotLocked,
    /// The paired shop buys for more than this one sells; the pair can
    /// be drained for profit
    BuyPriceAboveSellPrice,
    ShopLimitReached {
        owned: u32,
        max: u32,
    },

    // Trading
    TooFarAway,
    ShopClosed,
    ShopChanged,
    PurchaseCancelled,
    InvalidQuantity,
    StockTooLow {
        stock: u32,
    },
    ShopFull {
        space: u32,
    },
    InventoryFull {
        space: u32,
    },
    NotEnoughItems {
        count: u32,
    },
    CannotAfford {
        total: f64,
        balance: f64,
    },
    OwnerCannotAfford {
        total: f64,
    },
    TradeFailed,
    PurchaseSuccess {
        quantity: u32,
        item: ItemKey,
        total: f64,
    },
    SellSuccess {
        quantity: u32,
        item: ItemKey,
        total: f64,
    },
    OwnerSale {
        buyer: ActorId,
        quantity: u32,
        item: ItemKey,
        tax: f64,
        exhausted: bool,
        location: Location,
    },
    OwnerBuy {
        seller: ActorId,
        quantity: u32,
        item: ItemKey,
        tax: f64,
        exhausted: bool,
        location: Location,
    },
}
