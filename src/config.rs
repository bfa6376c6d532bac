//! Shop Configuration
//!
//! Runtime tunables for shop creation and trading, loadable from TOML.

use crate::error::ShopError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Reject fractional prices at creation time
    pub whole_number_prices: bool,
    /// Smallest accepted price per unit
    pub min_price: f64,
    /// One-time charge for creating a shop (0 disables)
    pub creation_cost: f64,
    /// Fraction of each trade routed to the tax account
    pub tax_rate: f64,
    /// Economy account receiving taxes and creation costs
    pub tax_account: Option<Uuid>,
    /// Credit owners of unlimited shops on trades
    pub pay_unlimited_owners: bool,
    /// Maximum shops per owner (None disables the quota)
    pub shop_limit: Option<u32>,
    /// How far an actor may stand from the shop when replying
    pub reply_radius: u32,
    /// Pending replies older than this are treated as stale (None keeps
    /// them forever)
    pub pending_ttl_secs: Option<u64>,
    /// Whether the host protects shop containers from other players
    pub lock_shops: bool,
    /// Attach an informational sign to newly created shops
    pub auto_sign: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            whole_number_prices: false,
            min_price: 0.01,
            creation_cost: 0.0,
            tax_rate: 0.0,
            tax_account: None,
            pay_unlimited_owners: false,
            shop_limit: None,
            reply_radius: 5,
            pending_ttl_secs: Some(300),
            lock_shops: true,
            auto_sign: true,
        }
    }
}

impl ShopConfig {
    /// Load configuration from a TOML file; missing keys keep defaults
    pub fn from_file(path: &Path) -> Result<Self, ShopError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
