//! Shop Registry
//!
//! Spatial index over live shops: world name, then 16x16 tile, then
//! exact block position. Purely in-memory; persistence happens in the
//! service and in the cursor's removal path.

use std::collections::HashMap;

use crate::coord::{Location, TileCoord};
use crate::error::ShopError;
use crate::shop::definition::{Shop, ShopState};
use crate::store::ShopStore;

type TileShops = HashMap<Location, Shop>;
type WorldTiles = HashMap<TileCoord, TileShops>;

/// Registry for all live shops
pub struct ShopRegistry {
    worlds: HashMap<String, WorldTiles>,
    count: usize,
}

impl ShopRegistry {
    /// Create a new empty shop registry
    pub fn new() -> Self {
        Self {
            worlds: HashMap::new(),
            count: 0,
        }
    }

    /// Insert a shop under its own location, creating world and tile
    /// containers on demand. A shop already at that location is
    /// displaced and returned; callers decide whether that is legal.
    pub fn insert(&mut self, shop: Shop) -> Option<Shop> {
        let tile = shop.location.tile();
        let tiles = self.worlds.entry(shop.location.world.clone()).or_default();
        let shops = tiles.entry(tile).or_default();
        let displaced = shops.insert(shop.location.clone(), shop);
        if displaced.is_none() {
            self.count += 1;
        }
        displaced
    }

    /// Remove the shop at a location; None if any level is absent.
    /// Emptied tile and world containers are left in place.
    pub fn remove(&mut self, location: &Location) -> Option<Shop> {
        let tiles = self.worlds.get_mut(&location.world)?;
        let shops = tiles.get_mut(&location.tile())?;
        let removed = shops.remove(location);
        if removed.is_some() {
            self.count -= 1;
        }
        removed
    }

    /// Get the shop at an exact location
    pub fn get(&self, location: &Location) -> Option<&Shop> {
        self.worlds
            .get(&location.world)?
            .get(&location.tile())?
            .get(location)
    }

    /// Get a mutable shop at an exact location
    pub fn get_mut(&mut self, location: &Location) -> Option<&mut Shop> {
        self.worlds
            .get_mut(&location.world)?
            .get_mut(&location.tile())?
            .get_mut(location)
    }

    /// All shops in one tile; the map may be empty if shops were
    /// removed from it earlier
    pub fn shops_in_tile(&self, tile: &TileCoord) -> Option<&TileShops> {
        self.worlds.get(&tile.world)?.get(tile)
    }

    /// Tile map for one world
    pub fn tiles_in_world(&self, world: &str) -> Option<&WorldTiles> {
        self.worlds.get(world)
    }

    /// Read-only iteration over every live shop
    pub fn all(&self) -> impl Iterator<Item = &Shop> {
        self.worlds
            .values()
            .flat_map(|tiles| tiles.values())
            .flat_map(|shops| shops.values())
    }

    /// Cursor for delete-while-scanning passes
    pub fn cursor(&mut self) -> ShopCursor<'_> {
        ShopCursor::new(self)
    }

    /// Number of live shops
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop every shop and container
    pub fn clear(&mut self) {
        self.worlds.clear();
        self.count = 0;
    }
}

impl Default for ShopRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateful walk over the registry's three levels, flattened into one
/// sequence. Keys are pulled one level at a time, so worlds and tiles
/// not yet visited reflect removals made through this cursor. The
/// `&mut` borrow keeps everyone else out for the cursor's lifetime.
pub struct ShopCursor<'a> {
    registry: &'a mut ShopRegistry,
    worlds: Vec<String>,
    tiles: Vec<TileCoord>,
    locations: Vec<Location>,
    current: Option<Location>,
}

impl<'a> ShopCursor<'a> {
    fn new(registry: &'a mut ShopRegistry) -> Self {
        let worlds = registry.worlds.keys().cloned().collect();
        Self {
            registry,
            worlds,
            tiles: Vec::new(),
            locations: Vec::new(),
            current: None,
        }
    }

    /// True when at least one shop remains ahead of the cursor. Empty
    /// tile and world containers are skipped.
    pub fn has_next(&mut self) -> bool {
        loop {
            while let Some(location) = self.locations.last() {
                if self.registry.get(location).is_some() {
                    return true;
                }
                self.locations.pop();
            }
            if let Some(tile) = self.tiles.pop() {
                if let Some(shops) = self.registry.shops_in_tile(&tile) {
                    self.locations = shops.keys().cloned().collect();
                }
                continue;
            }
            match self.worlds.pop() {
                Some(world) => {
                    if let Some(tiles) = self.registry.tiles_in_world(&world) {
                        self.tiles = tiles.keys().cloned().collect();
                    }
                }
                None => return false,
            }
        }
    }

    /// Remove the shop most recently returned by `next`, deleting it
    /// from the store first. Fails with `NoCurrent` before the first
    /// `next` or when called twice for the same element.
    pub async fn remove_current(&mut self, store: &dyn ShopStore) -> Result<Shop, ShopError> {
        let location = self.current.clone().ok_or(ShopError::NoCurrent)?;
        store.delete_shop(&location).await?;
        let mut shop = self
            .registry
            .remove(&location)
            .ok_or(ShopError::NotFound(location))?;
        shop.state = ShopState::Deleted;
        self.current = None;
        Ok(shop)
    }
}

impl Iterator for ShopCursor<'_> {
    type Item = Shop;

    fn next(&mut self) -> Option<Shop> {
        loop {
            if let Some(location) = self.locations.pop() {
                if let Some(shop) = self.registry.get(&location) {
                    let snapshot = shop.clone();
                    self.current = Some(location);
                    return Some(snapshot);
                }
                continue;
            }
            if let Some(tile) = self.tiles.pop() {
                if let Some(shops) = self.registry.shops_in_tile(&tile) {
                    self.locations = shops.keys().cloned().collect();
                }
                continue;
            }
            let world = self.worlds.pop()?;
            if let Some(tiles) = self.registry.tiles_in_world(&world) {
                self.tiles = tiles.keys().cloned().collect();
            }
        }
    }
}
