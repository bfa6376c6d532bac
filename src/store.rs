use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::actor::ActorId;
use crate::coord::Location;
use crate::error::ShopError;
use crate::item::ItemKey;
use crate::shop::definition::{Shop, ShopMode};

/// Durable record of shop rows. The store never touches the registry;
/// the service decides what is live.
#[async_trait]
pub trait ShopStore: Send + Sync {
    async fn insert_shop(&self, shop: &Shop) -> Result<(), ShopError>;
    async fn delete_shop(&self, location: &Location) -> Result<(), ShopError>;
    async fn load_all(&self) -> Result<Vec<Shop>, ShopError>;
}

pub struct SqliteShopStore {
    pool: SqlitePool,
}

impl SqliteShopStore {
    pub async fn new(database_url: &str) -> Result<Self, ShopError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), ShopError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shops (
                owner_id TEXT NOT NULL,
                price REAL NOT NULL,
                item_config TEXT NOT NULL,
                x INTEGER NOT NULL,
                y INTEGER NOT NULL,
                z INTEGER NOT NULL,
                world TEXT NOT NULL,
                unlimited INTEGER NOT NULL DEFAULT 0,
                shop_type INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (world, x, y, z)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Shop store migrations complete");
        Ok(())
    }

    fn shop_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Shop, ShopError> {
        let owner = ActorId::parse(&row.get::<String, _>("owner_id"))?;
        let item = ItemKey::from_config(&row.get::<String, _>("item_config"))?;
        let location = Location::new(
            row.get::<String, _>("world"),
            row.get("x"),
            row.get("y"),
            row.get("z"),
        );

        let mut shop = Shop::new(
            location,
            owner,
            row.get("price"),
            ShopMode::from_i64(row.get("shop_type")),
            item,
        );
        shop.unlimited = row.get("unlimited");
        Ok(shop)
    }
}

#[async_trait]
impl ShopStore for SqliteShopStore {
    async fn insert_shop(&self, shop: &Shop) -> Result<(), ShopError> {
        sqlx::query(
            r#"
            INSERT INTO shops (owner_id, price, item_config, x, y, z, world, unlimited, shop_type)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(shop.owner.to_string())
        .bind(shop.price)
        .bind(shop.item.to_config()?)
        .bind(shop.location.x)
        .bind(shop.location.y)
        .bind(shop.location.z)
        .bind(&shop.location.world)
        .bind(shop.unlimited)
        .bind(shop.mode.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_shop(&self, location: &Location) -> Result<(), ShopError> {
        sqlx::query("DELETE FROM shops WHERE world = ? AND x = ? AND y = ? AND z = ?")
            .bind(&location.world)
            .bind(location.x)
            .bind(location.y)
            .bind(location.z)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Shop>, ShopError> {
        let rows = sqlx::query("SELECT owner_id, price, item_config, x, y, z, world, unlimited, shop_type FROM shops")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::shop_from_row).collect()
    }
}
