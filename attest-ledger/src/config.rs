//! Client configuration.

use attest0::LogicId;

/// Default fuel price offered for every write.
pub const DEFAULT_FUEL_PRICE: u64 = 1;

/// Default fuel limit for `LogRequest` and `LogResponse`.
pub const DEFAULT_FUEL_LIMIT: u64 = 2000;

/// Default fuel limit for `Enlist`.
pub const DEFAULT_ENLIST_FUEL_LIMIT: u64 = 1000;

/// Default number of self-logged ids remembered for stale-index fallback.
pub const DEFAULT_KNOWN_IDS: usize = 4096;

/// Which deployed logic to talk to and how much fuel to attach.
///
/// # Example
///
/// ```
/// use attest_ledger::LedgerConfig;
///
/// let config = LedgerConfig::new("logic_1").fuel_price(2).fuel_limit(5000);
/// assert_eq!(config.logic_id().as_str(), "logic_1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub(crate) logic_id: LogicId,
    pub(crate) fuel_price: u64,
    pub(crate) fuel_limit: u64,
    pub(crate) enlist_fuel_limit: u64,
    pub(crate) known_ids: usize,
}

impl LedgerConfig {
    /// Configuration for `logic_id` with default fuel.
    #[must_use]
    pub fn new(logic_id: impl Into<LogicId>) -> Self {
        Self {
            logic_id: logic_id.into(),
            fuel_price: DEFAULT_FUEL_PRICE,
            fuel_limit: DEFAULT_FUEL_LIMIT,
            enlist_fuel_limit: DEFAULT_ENLIST_FUEL_LIMIT,
            known_ids: DEFAULT_KNOWN_IDS,
        }
    }

    /// Override the fuel price for every write.
    #[must_use]
    pub fn fuel_price(mut self, price: u64) -> Self {
        self.fuel_price = price;
        self
    }

    /// Override the fuel limit for request and response logging.
    #[must_use]
    pub fn fuel_limit(mut self, limit: u64) -> Self {
        self.fuel_limit = limit;
        self
    }

    /// Override the fuel limit for enlisting.
    #[must_use]
    pub fn enlist_fuel_limit(mut self, limit: u64) -> Self {
        self.enlist_fuel_limit = limit;
        self
    }

    /// How many of its own most recent ids the client remembers. A stale
    /// index is bypassed only for remembered ids. At least one is kept.
    #[must_use]
    pub fn known_ids(mut self, capacity: usize) -> Self {
        self.known_ids = capacity.max(1);
        self
    }

    /// The logic this client talks to.
    pub fn logic_id(&self) -> &LogicId {
        &self.logic_id
    }
}
