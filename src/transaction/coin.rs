use std::fmt;

use serde::{Deserialize, Serialize};

/// A receiving event: `amount` paid to some address by transaction `tx`
/// of block `block`. Spendable once, up to its full amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinRef {
    pub block: u64,
    pub tx: u64,
    pub amount: u64,
}

impl CoinRef {
    /// Identity of the coin, regardless of the amount claimed.
    pub fn position(&self) -> (u64, u64) {
        (self.block, self.tx)
    }
}

/// Where the value of a transaction comes from.
///
/// On the wire this is always `{"amount", "block", "tx"}`; `Minted` is
/// encoded as `-1` in all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "LocationWire", try_from = "LocationWire")]
pub enum Location {
    /// Created by the authority; consumes no prior coin.
    Minted,
    Coin(CoinRef),
}

impl Location {
    pub fn coin(&self) -> Option<&CoinRef> {
        match self {
            Location::Coin(coin) => Some(coin),
            Location::Minted => None,
        }
    }

    /// Declared input amount; `None` for minted value.
    pub fn amount(&self) -> Option<u64> {
        self.coin().map(|c| c.amount)
    }
}

impl From<CoinRef> for Location {
    fn from(coin: CoinRef) -> Self {
        Location::Coin(coin)
    }
}

const MINTED_SENTINEL: i64 = -1;

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LocationWire {
    Coin { amount: u64, block: u64, tx: u64 },
    Sentinel { amount: i64, block: i64, tx: i64 },
}

impl From<Location> for LocationWire {
    fn from(location: Location) -> Self {
        match location {
            Location::Coin(CoinRef { block, tx, amount }) => LocationWire::Coin { amount, block, tx },
            Location::Minted => LocationWire::Sentinel {
                amount: MINTED_SENTINEL,
                block: MINTED_SENTINEL,
                tx: MINTED_SENTINEL,
            },
        }
    }
}

#[derive(Debug)]
pub struct InvalidLocation;

impl fmt::Display for InvalidLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "negative location fields must all be -1 (minted)")
    }
}

impl TryFrom<LocationWire> for Location {
    type Error = InvalidLocation;

    fn try_from(wire: LocationWire) -> Result<Self, Self::Error> {
        match wire {
            LocationWire::Coin { amount, block, tx } => Ok(Location::Coin(CoinRef { block, tx, amount })),
            LocationWire::Sentinel {
                amount: MINTED_SENTINEL,
                block: MINTED_SENTINEL,
                tx: MINTED_SENTINEL,
            } => Ok(Location::Minted),
            LocationWire::Sentinel { .. } => Err(InvalidLocation),
        }
    }
}
