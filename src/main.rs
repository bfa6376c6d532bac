use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::info;

use tradepost::{
    ActorId, DefaultHooks, Economy, GameWorld, ItemKey, Location, Messenger, Shop, ShopConfig,
    ShopError, ShopMode, ShopNotice, ShopService, SqliteShopStore,
};

// ============================================================================
// Demo host
// ============================================================================
//
// A tiny stand-in for a real game: two actors, one market square, an
// in-memory economy. Runs the full shop lifecycle against a local
// sqlite file so a second run replays the shop from the store.

struct DemoEconomy {
    balances: Mutex<HashMap<ActorId, f64>>,
}

impl DemoEconomy {
    fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
        }
    }

    fn open_account(&self, actor: ActorId, balance: f64) {
        self.balances.lock().unwrap().insert(actor, balance);
    }
}

impl Economy for DemoEconomy {
    fn balance(&self, actor: &ActorId) -> f64 {
        self.balances.lock().unwrap().get(actor).copied().unwrap_or(0.0)
    }

    fn withdraw(&self, actor: &ActorId, amount: f64) -> bool {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(*actor).or_insert(0.0);
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    fn deposit(&self, actor: &ActorId, amount: f64) -> Result<(), ShopError> {
        *self.balances.lock().unwrap().entry(*actor).or_insert(0.0) += amount;
        Ok(())
    }

    fn has_history(&self, actor: &ActorId) -> bool {
        self.balances.lock().unwrap().contains_key(actor)
    }

    fn format(&self, amount: f64) -> String {
        format!("{:.2} gold", amount)
    }
}

struct DemoWorld {
    actors: Mutex<HashMap<ActorId, Location>>,
    containers: Mutex<HashSet<Location>>,
    stock: Mutex<HashMap<Location, u32>>,
    inventories: Mutex<HashMap<ActorId, u32>>,
}

impl DemoWorld {
    fn new() -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
            containers: Mutex::new(HashSet::new()),
            stock: Mutex::new(HashMap::new()),
            inventories: Mutex::new(HashMap::new()),
        }
    }

    fn place_actor(&self, actor: ActorId, location: Location) {
        self.actors.lock().unwrap().insert(actor, location);
    }

    fn place_container(&self, location: Location) {
        self.containers.lock().unwrap().insert(location);
    }

    fn fill_container(&self, location: Location, count: u32) {
        self.stock.lock().unwrap().insert(location, count);
    }
}

impl GameWorld for DemoWorld {
    fn actor_location(&self, actor: &ActorId) -> Option<Location> {
        self.actors.lock().unwrap().get(actor).cloned()
    }

    fn is_shop_container(&self, location: &Location) -> bool {
        self.containers.lock().unwrap().contains(location)
    }

    fn attached_container(&self, _location: &Location) -> Option<Location> {
        None
    }

    fn container_stock(&self, shop: &Shop) -> Result<u32, ShopError> {
        Ok(self.stock.lock().unwrap().get(&shop.location).copied().unwrap_or(0))
    }

    fn container_space(&self, shop: &Shop) -> Result<u32, ShopError> {
        let used = self.stock.lock().unwrap().get(&shop.location).copied().unwrap_or(0);
        Ok(1728 - used)
    }

    fn actor_free_space(&self, actor: &ActorId, _item: &ItemKey) -> u32 {
        let held = self.inventories.lock().unwrap().get(actor).copied().unwrap_or(0);
        576 - held
    }

    fn actor_item_count(&self, actor: &ActorId, _item: &ItemKey) -> u32 {
        self.inventories.lock().unwrap().get(actor).copied().unwrap_or(0)
    }

    fn transfer_to_actor(
        &self,
        shop: &Shop,
        actor: &ActorId,
        quantity: u32,
    ) -> Result<(), ShopError> {
        if !shop.unlimited {
            let mut stock = self.stock.lock().unwrap();
            let count = stock.entry(shop.location.clone()).or_insert(0);
            *count = count
                .checked_sub(quantity)
                .ok_or_else(|| ShopError::InvalidShop(shop.location.clone()))?;
        }
        *self.inventories.lock().unwrap().entry(*actor).or_insert(0) += quantity;
        Ok(())
    }

    fn transfer_to_container(
        &self,
        shop: &Shop,
        actor: &ActorId,
        quantity: u32,
    ) -> Result<(), ShopError> {
        {
            let mut inventories = self.inventories.lock().unwrap();
            let held = inventories.entry(*actor).or_insert(0);
            *held = held
                .checked_sub(quantity)
                .ok_or_else(|| ShopError::InvalidShop(shop.location.clone()))?;
        }
        if !shop.unlimited {
            *self.stock.lock().unwrap().entry(shop.location.clone()).or_insert(0) += quantity;
        }
        Ok(())
    }

    fn attach_sign(&self, shop: &Shop, sign_block: &Location) -> Result<(), ShopError> {
        info!("Sign placed at {:?} for the shop at {:?}", sign_block, shop.location);
        Ok(())
    }

    fn update_display(&self, shop: &Shop) -> Result<(), ShopError> {
        let stock = self.stock.lock().unwrap().get(&shop.location).copied().unwrap_or(0);
        info!("Display refresh at {:?}: {} in stock", shop.location, stock);
        Ok(())
    }

    fn on_shop_unload(&self, shop: &Shop) {
        info!("Unloading shop display at {:?}", shop.location);
    }
}

/// Prints every notice as the JSON a real host would push to a client
struct LogMessenger;

impl Messenger for LogMessenger {
    fn send(&self, actor: &ActorId, notice: ShopNotice) {
        let payload = serde_json::to_string(&notice).unwrap_or_default();
        info!("notice -> {}: {}", actor, payload);
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tradepost=info".parse().unwrap()),
        )
        .init();

    let store = SqliteShopStore::new("sqlite:shops.db?mode=rwc")
        .await
        .expect("Failed to initialize shop store");

    let economy = Arc::new(DemoEconomy::new());
    let world = Arc::new(DemoWorld::new());

    let alice = ActorId::random();
    let bob = ActorId::random();
    economy.open_account(alice, 100.0);
    economy.open_account(bob, 40.0);

    let kiosk = Location::new("market", 12, 64, 7);
    let sign = Location::new("market", 12, 65, 7);
    world.place_container(kiosk.clone());
    world.place_actor(alice, Location::new("market", 13, 64, 7));
    world.place_actor(bob, Location::new("market", 11, 64, 7));

    let config = ShopConfig {
        creation_cost: 5.0,
        ..ShopConfig::default()
    };
    let service = ShopService::new(
        config,
        Arc::new(store),
        economy.clone(),
        world.clone(),
        Arc::new(DefaultHooks),
        Arc::new(LogMessenger),
    );

    service
        .load_all_from_store()
        .await
        .expect("Failed to replay stored shops");

    // First run builds the shop through the reply pipeline; later runs
    // find it replayed from the store.
    if service.shop_at(&kiosk).await.is_none() {
        if service.can_build_shop(&alice, &kiosk).await {
            service.expect_create(alice, kiosk.clone(), ItemKey::new("coal"), Some(sign));
            service.handle_reply(&alice, "2.5").await;
        }
    } else {
        info!("Kiosk shop already on file, skipping creation");
    }

    let shop = service
        .shop_at(&kiosk)
        .await
        .expect("The kiosk shop should exist by now");
    info!(
        "Open for business: {:?} {} at {} each",
        shop.mode,
        shop.item.id,
        economy.format(shop.price)
    );

    // Stock the shelf and let Bob buy some
    world.fill_container(kiosk.clone(), 8);
    service.expect_trade(bob, kiosk.clone(), ItemKey::new("coal"));
    service.handle_reply(&bob, "3").await;

    // A quantity the shelf cannot cover is refused with the figures
    service.expect_trade(bob, kiosk.clone(), ItemKey::new("coal"));
    service.handle_reply(&bob, "50").await;

    // Alice also buys coal back at a stall next door; Bob sells her two
    let stall = Location::new("market", 14, 64, 7);
    world.place_container(stall.clone());
    if service.shop_at(&stall).await.is_none() {
        let buyback = Shop::new(stall.clone(), alice, 1.5, ShopMode::Buying, ItemKey::new("coal"));
        service
            .create_shop(buyback)
            .await
            .expect("Failed to open the buyback stall");
    }
    service.expect_trade(bob, stall.clone(), ItemKey::new("coal"));
    service.handle_reply(&bob, "2").await;

    for (name, actor) in [("alice", &alice), ("bob", &bob)] {
        info!(
            "{}: {} and {} coal in the bag",
            name,
            economy.format(economy.balance(actor)),
            world.actor_item_count(actor, &ItemKey::new("coal"))
        );
    }

    info!("{} shops registered", service.shop_count().await);
}
