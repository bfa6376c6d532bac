use serde::{Deserialize, Serialize};

pub const TILE_SIZE: i32 = 16;

/// Exact block position inside a named world
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Tile this location falls in
    pub fn tile(&self) -> TileCoord {
        TileCoord::from_location(self)
    }

    /// Squared distance to another location. Callers compare against a
    /// squared radius; worlds must be checked separately.
    pub fn distance_squared(&self, other: &Location) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }
}

/// Tile coordinates in a world's 16x16 grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub world: String,
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub fn new(world: impl Into<String>, x: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            z,
        }
    }

    /// Convert a block position to its tile coordinate
    pub fn from_location(loc: &Location) -> Self {
        Self {
            world: loc.world.clone(),
            x: loc.x.div_euclid(TILE_SIZE),
            z: loc.z.div_euclid(TILE_SIZE),
        }
    }
}
