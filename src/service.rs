//! Shop Service
//!
//! Owns the live registry and the pending-action table, and runs the
//! creation and trade pipelines against the injected collaborators.
//! All shop mutation flows through here.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::actor::ActorId;
use crate::config::ShopConfig;
use crate::coord::{Location, TileCoord};
use crate::error::ShopError;
use crate::item::ItemKey;
use crate::notice::ShopNotice;
use crate::pending::{PendingAction, PendingActionTable, PendingKind};
use crate::shop::definition::{Shop, ShopMode, ShopState};
use crate::shop::registry::ShopRegistry;
use crate::store::ShopStore;
use crate::traits::{Economy, GameWorld, Messenger, ShopHooks};

pub struct ShopService {
    config: ShopConfig,
    /// Live shops, indexed world / tile / location
    shops: RwLock<ShopRegistry>,
    /// One in-flight reply intent per actor
    pending: PendingActionTable,
    store: Arc<dyn ShopStore>,
    economy: Arc<dyn Economy>,
    world: Arc<dyn GameWorld>,
    hooks: Arc<dyn ShopHooks>,
    messenger: Arc<dyn Messenger>,
    /// Actors already told that shops are unprotected
    warned_unlocked: DashSet<ActorId>,
}

impl ShopService {
    pub fn new(
        config: ShopConfig,
        store: Arc<dyn ShopStore>,
        economy: Arc<dyn Economy>,
        world: Arc<dyn GameWorld>,
        hooks: Arc<dyn ShopHooks>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config,
            shops: RwLock::new(ShopRegistry::new()),
            pending: PendingActionTable::new(),
            store,
            economy,
            world,
            hooks,
            messenger,
            warned_unlocked: DashSet::new(),
        }
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    // ========================================================================
    // Registry operations
    // ========================================================================

    /// Persist a shop, then make it live. On a store failure nothing
    /// changes in memory.
    pub async fn create_shop(&self, mut shop: Shop) -> Result<(), ShopError> {
        self.store.insert_shop(&shop).await?;

        let mut shops = self.shops.write().await;
        if let Some(partner_loc) = self.world.attached_container(&shop.location) {
            if let Some(partner) = shops.get_mut(&partner_loc) {
                partner.attached = Some(shop.location.clone());
                shop.attached = Some(partner_loc);
            }
        }
        let location = shop.location.clone();
        let owner = shop.owner;
        let item = shop.item.id.clone();
        let price = shop.price;
        shops.insert(shop);
        drop(shops);

        info!(
            "{} opened a shop at {:?} trading {} at {} each",
            owner,
            location,
            item,
            self.economy.format(price)
        );
        Ok(())
    }

    /// Make a stored shop live without writing to the store. Used for
    /// startup replay.
    pub async fn load_shop(&self, mut shop: Shop) {
        let mut shops = self.shops.write().await;
        if let Some(partner_loc) = self.world.attached_container(&shop.location) {
            if let Some(partner) = shops.get_mut(&partner_loc) {
                partner.attached = Some(shop.location.clone());
                shop.attached = Some(partner_loc);
            }
        }
        let location = shop.location.clone();
        if shops.insert(shop).is_some() {
            warn!("Duplicate shop record at {:?} replaced during load", location);
        }
    }

    /// Replay every stored shop into the registry
    pub async fn load_all_from_store(&self) -> Result<usize, ShopError> {
        let records = self.store.load_all().await?;
        let count = records.len();
        for shop in records {
            self.load_shop(shop).await;
        }
        info!("Loaded {} shops from the store", count);
        Ok(count)
    }

    /// Drop a shop from the registry only; its stored row stays. The
    /// returned record is marked deleted and any paired shop loses its
    /// back-reference.
    pub async fn remove_shop(&self, location: &Location) -> Option<Shop> {
        let mut shops = self.shops.write().await;
        let mut removed = shops.remove(location)?;
        if let Some(partner_loc) = removed.attached.take() {
            if let Some(partner) = shops.get_mut(&partner_loc) {
                partner.attached = None;
            }
        }
        removed.state = ShopState::Deleted;
        Some(removed)
    }

    /// Delete a shop from the store and the registry
    pub async fn delete_shop(&self, location: &Location) -> Result<Shop, ShopError> {
        self.store.delete_shop(location).await?;
        self.remove_shop(location)
            .await
            .ok_or_else(|| ShopError::NotFound(location.clone()))
    }

    pub async fn shop_at(&self, location: &Location) -> Option<Shop> {
        self.shops.read().await.get(location).cloned()
    }

    pub async fn shops_in_tile(&self, tile: &TileCoord) -> Vec<Shop> {
        let shops = self.shops.read().await;
        shops
            .shops_in_tile(tile)
            .map(|found| found.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn all_shops(&self) -> Vec<Shop> {
        self.shops.read().await.all().cloned().collect()
    }

    pub async fn shop_count(&self) -> usize {
        self.shops.read().await.len()
    }

    pub async fn count_owned_by(&self, actor: &ActorId) -> usize {
        self.shops
            .read()
            .await
            .all()
            .filter(|shop| shop.owner == *actor)
            .count()
    }

    /// Walk every shop and delete the ones the predicate rejects, from
    /// the store and the registry both. Returns the removed shops.
    pub async fn retain_shops<F>(&self, mut keep: F) -> Result<Vec<Shop>, ShopError>
    where
        F: FnMut(&Shop) -> bool,
    {
        let mut shops = self.shops.write().await;
        let mut removed = Vec::new();
        let mut cursor = shops.cursor();
        while let Some(shop) = cursor.next() {
            if !keep(&shop) {
                removed.push(cursor.remove_current(self.store.as_ref()).await?);
            }
        }
        drop(cursor);

        for shop in &removed {
            if let Some(partner_loc) = &shop.attached {
                if let Some(partner) = shops.get_mut(partner_loc) {
                    partner.attached = None;
                }
            }
        }

        if !removed.is_empty() {
            info!("Removed {} shops in a registry sweep", removed.len());
        }
        Ok(removed)
    }

    /// Drop every live shop and pending action, firing the world's
    /// unload hook for each shop. Stored rows are untouched; this is
    /// shutdown, not deletion.
    pub async fn clear_all(&self) {
        let mut shops = self.shops.write().await;
        for shop in shops.all() {
            self.world.on_shop_unload(shop);
        }
        let count = shops.len();
        shops.clear();
        self.pending.clear();
        info!("Unloaded {} shops", count);
    }

    // ========================================================================
    // Pending replies
    // ========================================================================

    /// Prompt-time gate for new shops: ownership quota plus the two
    /// placement hooks
    pub async fn can_build_shop(&self, actor: &ActorId, location: &Location) -> bool {
        if let Some(max) = self.config.shop_limit {
            let owned = self.count_owned_by(actor).await as u32;
            if owned + 1 > max {
                self.messenger
                    .send(actor, ShopNotice::ShopLimitReached { owned, max });
                return false;
            }
        }
        if self.hooks.can_interact(actor, location).denied() {
            return false;
        }
        !self.hooks.can_place_shop(actor, location).denied()
    }

    /// The actor's next reply is a unit price for a shop on the target
    /// container
    pub fn expect_create(
        &self,
        actor: ActorId,
        target: Location,
        item: ItemKey,
        sign_block: Option<Location>,
    ) {
        self.pending
            .put(actor, PendingKind::Create { item, sign_block }, target);
    }

    /// The actor's next reply is a trade quantity for the target shop
    pub fn expect_trade(&self, actor: ActorId, target: Location, item: ItemKey) {
        self.pending.put(actor, PendingKind::Trade { item }, target);
    }

    /// Forget the actor's pending action (disconnects, cancellations)
    pub fn cancel_pending(&self, actor: &ActorId) -> bool {
        self.pending.cancel(actor)
    }

    pub fn has_pending(&self, actor: &ActorId) -> bool {
        self.pending.contains(actor)
    }

    /// Route a free-text reply to whichever pipeline the actor's
    /// pending action selects. Returns false when the actor had no
    /// pending action and the text should be treated as ordinary chat.
    /// The pending action is spent even when validation fails later.
    pub async fn handle_reply(&self, actor: &ActorId, text: &str) -> bool {
        let Some(action) = self.pending.take(actor) else {
            debug!("Ignoring reply from {}: no pending action", actor);
            return false;
        };

        if self.is_stale(actor, &action) {
            self.messenger.send(actor, ShopNotice::TooFarAway);
            return true;
        }

        match action.kind {
            PendingKind::Create { item, sign_block } => {
                self.run_creation(actor, &action.target, item, sign_block, text)
                    .await;
            }
            PendingKind::Trade { item } => {
                self.run_trade(actor, &action.target, item, text).await;
            }
        }
        true
    }

    /// A reply is stale when the action outlived its TTL or the actor
    /// wandered off
    fn is_stale(&self, actor: &ActorId, action: &PendingAction) -> bool {
        if let Some(ttl) = self.config.pending_ttl_secs {
            if action.age() > Duration::from_secs(ttl) {
                return true;
            }
        }
        let Some(at) = self.world.actor_location(actor) else {
            return true;
        };
        if at.world != action.target.world {
            return true;
        }
        let radius = self.config.reply_radius as i64;
        at.distance_squared(&action.target) > radius * radius
    }

    // ========================================================================
    // Creation pipeline
    // ========================================================================

    async fn run_creation(
        &self,
        actor: &ActorId,
        target: &Location,
        item: ItemKey,
        sign_block: Option<Location>,
        text: &str,
    ) {
        // The spot may have been taken or broken since the prompt
        {
            let shops = self.shops.read().await;
            if shops.get(target).is_some() {
                self.messenger.send(actor, ShopNotice::ShopAlreadyExists);
                return;
            }
        }
        if !self.world.is_shop_container(target) {
            self.messenger.send(actor, ShopNotice::ContainerGone);
            return;
        }

        let price = match self.parse_price(text) {
            Ok(price) => price,
            Err(notice) => {
                self.messenger.send(actor, notice);
                return;
            }
        };

        let cost = self.config.creation_cost;
        if cost > 0.0 && self.economy.balance(actor) < cost {
            self.messenger
                .send(actor, ShopNotice::CannotAffordShop { cost });
            return;
        }

        let shop = Shop::new(target.clone(), *actor, price, ShopMode::Selling, item);
        if self.hooks.allow_creation(actor, &shop).denied() {
            return;
        }

        // Charge only after the last veto point
        if cost > 0.0 {
            if !self.economy.withdraw(actor, cost) {
                self.messenger
                    .send(actor, ShopNotice::CannotAffordShop { cost });
                return;
            }
            self.deposit_tax(cost);
        }

        if let Err(err) = self.create_shop(shop.clone()).await {
            error!("Failed to persist new shop at {:?}: {}", target, err);
            self.messenger.send(actor, ShopNotice::CreationFailed);
            return;
        }
        let created = self.shop_at(target).await.unwrap_or(shop);

        if !self.config.lock_shops && self.warned_unlocked.insert(*actor) {
            self.messenger.send(actor, ShopNotice::ShopsNotLocked);
        }

        if self.config.auto_sign {
            if let Some(sign_block) = sign_block {
                if let Err(err) = self.world.attach_sign(&created, &sign_block) {
                    warn!("Failed to attach sign at {:?}: {}", sign_block, err);
                }
            }
        }

        self.warn_double_shop(actor, &created).await;
    }

    /// Parse a price reply under the configured numeric mode
    fn parse_price(&self, text: &str) -> Result<f64, ShopNotice> {
        let text = text.trim();
        let price = if self.config.whole_number_prices {
            match text.parse::<i64>() {
                Ok(value) => value as f64,
                Err(_) => return Err(ShopNotice::CreationCancelled),
            }
        } else {
            match text.parse::<f64>() {
                Ok(value) => value,
                Err(_) => return Err(ShopNotice::CreationCancelled),
            }
        };
        if !price.is_finite() || price < self.config.min_price {
            return Err(ShopNotice::PriceTooLow {
                min: self.config.min_price,
            });
        }
        Ok(price)
    }

    /// Warn the creator when a double-container pair can be drained by
    /// buying from one half cheaper than the other half pays
    async fn warn_double_shop(&self, actor: &ActorId, shop: &Shop) {
        let Some(partner_loc) = shop.attached.clone() else {
            return;
        };
        let Some(partner) = self.shop_at(&partner_loc).await else {
            return;
        };
        let exploitable = match (shop.mode, partner.mode) {
            (ShopMode::Selling, ShopMode::Buying) => partner.price > shop.price,
            (ShopMode::Buying, ShopMode::Selling) => shop.price > partner.price,
            _ => false,
        };
        if exploitable {
            self.messenger.send(actor, ShopNotice::BuyPriceAboveSellPrice);
        }
    }

    // ========================================================================
    // Trade pipeline
    // ========================================================================

    async fn run_trade(&self, actor: &ActorId, target: &Location, expected: ItemKey, text: &str) {
        // Resolve the shop and re-check its container. Validity is
        // derived from the world, so a restored container revives an
        // invalidated record.
        let shop = {
            let mut shops = self.shops.write().await;
            match shops.get_mut(target) {
                Some(record) => {
                    if self.world.is_shop_container(target) {
                        if record.state == ShopState::Invalid {
                            record.state = ShopState::Active;
                        }
                        Some(record.clone())
                    } else {
                        record.state = ShopState::Invalid;
                        None
                    }
                }
                None => None,
            }
        };
        let Some(shop) = shop else {
            self.messenger.send(actor, ShopNotice::ContainerGone);
            return;
        };

        if shop.state == ShopState::Closed {
            self.messenger.send(actor, ShopNotice::ShopClosed);
            return;
        }

        if shop.item != expected {
            self.messenger.send(actor, ShopNotice::ShopChanged);
            return;
        }

        let quantity: i32 = match text.trim().parse() {
            Ok(quantity) => quantity,
            Err(_) => {
                self.messenger.send(actor, ShopNotice::PurchaseCancelled);
                return;
            }
        };
        if quantity < 0 {
            self.messenger.send(actor, ShopNotice::InvalidQuantity);
            return;
        }
        if quantity == 0 {
            // A zero-unit trade succeeds with nothing to move
            let notice = match shop.mode {
                ShopMode::Selling => ShopNotice::PurchaseSuccess {
                    quantity: 0,
                    item: shop.item.clone(),
                    total: 0.0,
                },
                ShopMode::Buying => ShopNotice::SellSuccess {
                    quantity: 0,
                    item: shop.item.clone(),
                    total: 0.0,
                },
            };
            self.messenger.send(actor, notice);
            return;
        }
        let quantity = quantity as u32;

        match shop.mode {
            ShopMode::Selling => self.execute_buy(actor, &shop, quantity).await,
            ShopMode::Buying => self.execute_sell(actor, &shop, quantity).await,
        }
    }

    /// Actor buys from a selling shop: money to the owner side first,
    /// then the actor pays, then items move
    async fn execute_buy(&self, actor: &ActorId, shop: &Shop, quantity: u32) {
        let stock = if shop.unlimited {
            quantity
        } else {
            match self.world.container_stock(shop) {
                Ok(stock) => stock,
                Err(_) => {
                    self.mark_invalid(&shop.location).await;
                    self.messenger.send(actor, ShopNotice::ContainerGone);
                    return;
                }
            }
        };
        if stock < quantity {
            self.messenger.send(actor, ShopNotice::StockTooLow { stock });
            return;
        }

        let space = self.world.actor_free_space(actor, &shop.item);
        if space < quantity {
            self.messenger.send(actor, ShopNotice::InventoryFull { space });
            return;
        }

        if self.hooks.allow_trade(actor, shop, quantity).denied() {
            return;
        }

        let total = quantity as f64 * shop.price;
        let self_trade = *actor == shop.owner;
        let pay_owner = !self_trade && (!shop.unlimited || self.config.pay_unlimited_owners);
        let tax = if pay_owner {
            self.config.tax_rate * total
        } else {
            0.0
        };

        if !self_trade {
            let balance = self.economy.balance(actor);
            if balance < total {
                self.messenger
                    .send(actor, ShopNotice::CannotAfford { total, balance });
                return;
            }
            if pay_owner {
                if let Err(err) = self.economy.deposit(&shop.owner, total - tax) {
                    warn!(
                        "Aborting buy at {:?}: owner deposit failed: {}",
                        shop.location, err
                    );
                    self.messenger.send(actor, ShopNotice::TradeFailed);
                    return;
                }
                if !self.deposit_tax(tax) {
                    self.messenger.send(actor, ShopNotice::TradeFailed);
                    return;
                }
            }
            if !self.economy.withdraw(actor, total) {
                warn!(
                    "Aborting buy at {:?}: withdraw refused after balance check",
                    shop.location
                );
                self.messenger.send(actor, ShopNotice::TradeFailed);
                return;
            }
        }

        let exhausted = !shop.unlimited && stock == quantity;
        if let Err(err) = self.world.transfer_to_actor(shop, actor, quantity) {
            error!(
                "Item transfer failed after payment at {:?}: {}",
                shop.location, err
            );
            self.messenger.send(actor, ShopNotice::TradeFailed);
            return;
        }

        self.messenger.send(
            actor,
            ShopNotice::PurchaseSuccess {
                quantity,
                item: shop.item.clone(),
                total,
            },
        );
        if !self_trade {
            self.messenger.send(
                &shop.owner,
                ShopNotice::OwnerSale {
                    buyer: *actor,
                    quantity,
                    item: shop.item.clone(),
                    tax,
                    exhausted,
                    location: shop.location.clone(),
                },
            );
        }

        if let Err(err) = self.world.update_display(shop) {
            warn!("Failed to refresh shop display at {:?}: {}", shop.location, err);
        }
        info!(
            "{} bought {} x {} at {:?} for {}",
            actor,
            quantity,
            shop.item.id,
            shop.location,
            self.economy.format(total)
        );
    }

    /// Actor sells to a buying shop: the actor is paid first, then the
    /// owner is charged, then items move
    async fn execute_sell(&self, actor: &ActorId, shop: &Shop, quantity: u32) {
        let space = if shop.unlimited {
            quantity
        } else {
            match self.world.container_space(shop) {
                Ok(space) => space,
                Err(_) => {
                    self.mark_invalid(&shop.location).await;
                    self.messenger.send(actor, ShopNotice::ContainerGone);
                    return;
                }
            }
        };
        if space < quantity {
            self.messenger.send(actor, ShopNotice::ShopFull { space });
            return;
        }

        let held = self.world.actor_item_count(actor, &shop.item);
        if held < quantity {
            self.messenger
                .send(actor, ShopNotice::NotEnoughItems { count: held });
            return;
        }

        if self.hooks.allow_trade(actor, shop, quantity).denied() {
            return;
        }

        let total = quantity as f64 * shop.price;
        let self_trade = *actor == shop.owner;
        let charge_owner = !self_trade && (!shop.unlimited || self.config.pay_unlimited_owners);
        let tax = if charge_owner {
            self.config.tax_rate * total
        } else {
            0.0
        };

        if !self_trade {
            if charge_owner && self.economy.balance(&shop.owner) < total {
                self.messenger
                    .send(actor, ShopNotice::OwnerCannotAfford { total });
                return;
            }
            if let Err(err) = self.economy.deposit(actor, total - tax) {
                warn!(
                    "Aborting sell at {:?}: seller deposit failed: {}",
                    shop.location, err
                );
                self.messenger.send(actor, ShopNotice::TradeFailed);
                return;
            }
            if !self.deposit_tax(tax) {
                self.messenger.send(actor, ShopNotice::TradeFailed);
                return;
            }
            if charge_owner && !self.economy.withdraw(&shop.owner, total) {
                warn!(
                    "Aborting sell at {:?}: owner withdraw refused after balance check",
                    shop.location
                );
                self.messenger.send(actor, ShopNotice::TradeFailed);
                return;
            }
        }

        let exhausted = !shop.unlimited && space == quantity;
        if let Err(err) = self.world.transfer_to_container(shop, actor, quantity) {
            error!(
                "Item transfer failed after payment at {:?}: {}",
                shop.location, err
            );
            self.messenger.send(actor, ShopNotice::TradeFailed);
            return;
        }

        self.messenger.send(
            actor,
            ShopNotice::SellSuccess {
                quantity,
                item: shop.item.clone(),
                total,
            },
        );
        if !self_trade {
            self.messenger.send(
                &shop.owner,
                ShopNotice::OwnerBuy {
                    seller: *actor,
                    quantity,
                    item: shop.item.clone(),
                    tax,
                    exhausted,
                    location: shop.location.clone(),
                },
            );
        }

        if let Err(err) = self.world.update_display(shop) {
            warn!("Failed to refresh shop display at {:?}: {}", shop.location, err);
        }
        info!(
            "{} sold {} x {} at {:?} for {}",
            actor,
            quantity,
            shop.item.id,
            shop.location,
            self.economy.format(total)
        );
    }

    async fn mark_invalid(&self, location: &Location) {
        let mut shops = self.shops.write().await;
        if let Some(shop) = shops.get_mut(location) {
            shop.state = ShopState::Invalid;
        }
    }

    /// Deposit into the tax account, if one is configured and already
    /// known to the economy. False means an attempted deposit was
    /// refused; a skipped deposit is not a failure.
    fn deposit_tax(&self, amount: f64) -> bool {
        if amount <= 0.0 {
            return true;
        }
        let Some(account) = self.config.tax_account else {
            return true;
        };
        let account = ActorId::from(account);
        if !self.economy.has_history(&account) {
            return true;
        }
        match self.economy.deposit(&account, amount) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "Tax deposit of {} refused: {}",
                    self.economy.format(amount),
                    err
                );
                false
            }
        }
    }
}
