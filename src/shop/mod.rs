pub mod definition;
pub mod registry;

pub use definition::{Shop, ShopMode, ShopState};
pub use registry::{ShopCursor, ShopRegistry};
