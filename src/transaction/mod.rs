pub mod coin;
pub mod model;

pub use coin::{CoinRef, Location};
pub use model::Tx;
