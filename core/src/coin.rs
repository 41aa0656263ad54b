//! Coin amounts
//!
//! Single-currency amounts counted in atomic units with checked arithmetic.

use crate::constants::COIN;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative amount of the single RSCoin currency, in atomic units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Coin(u64);

impl Coin {
    pub const ZERO: Coin = Coin(0);

    pub fn from_units(units: u64) -> Self {
        Coin(units)
    }

    pub fn from_coins(coins: u64) -> Self {
        Coin(coins * COIN)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Coin) -> Option<Coin> {
        self.0.checked_add(other.0).map(Coin)
    }

    pub fn checked_sub(self, other: Coin) -> Option<Coin> {
        self.0.checked_sub(other.0).map(Coin)
    }

    /// Sum a sequence of amounts, `None` on overflow.
    pub fn sum<I: IntoIterator<Item = Coin>>(amounts: I) -> Option<Coin> {
        amounts
            .into_iter()
            .try_fold(Coin::ZERO, |acc, c| acc.checked_add(c))
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} RSC", self.0 / COIN, self.0 % COIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic() {
        let a = Coin::from_units(70);
        let b = Coin::from_units(30);

        assert_eq!(a.checked_add(b), Some(Coin::from_coins(1)));
        assert_eq!(a.checked_sub(b), Some(Coin::from_units(40)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Coin::from_units(u64::MAX).checked_add(b), None);
    }

    #[test]
    fn test_sum() {
        let amounts = [Coin::from_units(1), Coin::from_units(2), Coin::from_units(3)];
        assert_eq!(Coin::sum(amounts), Some(Coin::from_units(6)));
        assert_eq!(
            Coin::sum([Coin::from_units(u64::MAX), Coin::from_units(1)]),
            None
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Coin::from_units(1050).to_string(), "10.50 RSC");
    }
}
