//! Resource data structures for data-driven resource definitions.

use serde::{Deserialize, Serialize};

/// Data-driven definition of a tradable resource.
///
/// Holds the resource's identity and its starting market position.
///
/// # Example RON
///
/// ```ron
/// ResourceDef(
///     key: "madeira",
///     name: "Madeira",
///     symbol: "🌲",
///     quantity: 100,
///     price: 5.0,
///     volatility: 0.15,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Unique key, also used in save files.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Unit symbol shown next to quantities.
    #[serde(default)]
    pub symbol: String,

    /// Units held at the start of a game.
    #[serde(default)]
    pub quantity: u64,

    /// Market price at the start of a game.
    pub price: f64,

    /// Maximum per-turn price swing as a fraction of the current price.
    pub volatility: f64,
}

impl ResourceDef {
    /// Create a resource definition.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        quantity: u64,
        price: f64,
        volatility: f64,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            symbol: symbol.into(),
            quantity,
            price,
            volatility,
        }
    }
}
