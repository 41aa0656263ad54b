//! Protocol constants shared by the bank and the mintettes

/// Number of mintettes responsible for each transaction hash, capped by the
/// roster size. Identical on every node.
pub const OWNER_FANOUT: usize = 3;

/// Coins minted by the emission transaction of every period, in atomic units.
pub const PERIOD_EMISSION: u64 = 600 * COIN;

/// Initial supply granted to the bank address by the genesis block.
pub const GENESIS_VALUE: u64 = 10_000 * COIN;

/// Atomic units per coin.
pub const COIN: u64 = 100;

/// Consecutive missed or invalid period results before a mintette is evicted.
pub const EVICTION_THRESHOLD: u32 = 3;

/// Default wall-clock length of a period in seconds.
pub const DEFAULT_PERIOD_SECS: u64 = 90;

/// Default per-mintette timeout for the period-end poll, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 10;

/// Default number of periods between full state snapshots.
pub const DEFAULT_SNAPSHOT_EVERY: u64 = 5;

/// Default number of closed periods whose blocks and logs stay queryable.
pub const DEFAULT_LOG_RETENTION: u64 = 20;
