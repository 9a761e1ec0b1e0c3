//! Cart contents: seat lines, product lines, snapshots, saved carts.

mod item;
mod product;
mod saved;
mod snapshot;

pub use item::CartItem;
pub use product::CartProduct;
pub use saved::{CreateSavedCart, SavedCart};
pub use snapshot::CartSnapshot;
