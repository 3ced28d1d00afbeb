//! Ledger-persisted sequential identifiers.
//!
//! The counter key always holds the *next* value to hand out. Nothing is kept in
//! memory between calls, so two generators over the same keys agree.
use super::clock::Clock;
use super::error::LedgerError;
use super::ledger::{Ledger, LedgerResult};
use super::utils::zero_pad;

pub const SLA_CONTRACT_ID_COUNT_KEY: &str = "SLA_CONTRACT_ID_COUNT";
pub const SLA_CONTRACT_TEMP_ID_COUNT_KEY: &str = "SLA_CONTRACT_TEMP_ID_COUNT";
pub const CURRENT_YEAR_KEY: &str = "CURRENT_YEAR";
pub const CURRENT_TEMP_YEAR_KEY: &str = "CURRENT_TEMP_YEAR";
pub const FDS_NEXTEID_KEY: &str = "FDS_NEXTEID";

pub const CONTRACT_ID_PREFIX: &str = "SLA_CONT";
pub const CONTRACT_TEMP_ID_PREFIX: &str = "SLA_CONT_TEMP";

const PAD_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFormat {
    /// `prefix + n`, no padding.
    Plain,
    /// `prefix_<year>_<n padded to 5>`, counter restarts at 1 every new year.
    YearScoped { year_key: &'static str },
}

#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: &'static str,
    counter_key: &'static str,
    format: IdFormat,
}

impl SequentialIdGenerator {
    pub fn new(prefix: &'static str, counter_key: &'static str, format: IdFormat) -> Self {
        Self {
            prefix,
            counter_key,
            format,
        }
    }

    pub fn contract() -> Self {
        Self::new(
            CONTRACT_ID_PREFIX,
            SLA_CONTRACT_ID_COUNT_KEY,
            IdFormat::YearScoped {
                year_key: CURRENT_YEAR_KEY,
            },
        )
    }

    pub fn contract_temp() -> Self {
        Self::new(
            CONTRACT_TEMP_ID_PREFIX,
            SLA_CONTRACT_TEMP_ID_COUNT_KEY,
            IdFormat::YearScoped {
                year_key: CURRENT_TEMP_YEAR_KEY,
            },
        )
    }

    pub fn fraud_entry() -> Self {
        Self::new("FDS_EID_", FDS_NEXTEID_KEY, IdFormat::Plain)
    }

    /// Current counter without consuming it; 1 when never initialised.
    pub fn peek(&self, ledger: &dyn Ledger) -> LedgerResult<u64> {
        Ok(read_number(ledger, self.counter_key)?.unwrap_or(1))
    }

    /// Seeds the counter (and year marker) the way a fresh deployment does.
    pub fn init(&self, ledger: &dyn Ledger, clock: &dyn Clock) -> LedgerResult<()> {
        ledger.put(self.counter_key, b"1")?;
        if let IdFormat::YearScoped { year_key } = self.format {
            ledger.put(year_key, clock.now().year().to_string().as_bytes())?;
        }
        Ok(())
    }

    /// Hands out the next identifier and persists `counter + 1`.
    pub fn next(&self, ledger: &dyn Ledger, clock: &dyn Clock) -> LedgerResult<String> {
        let mut counter = self.peek(ledger)?;

        let id = match self.format {
            IdFormat::Plain => format!("{}{}", self.prefix, counter),
            IdFormat::YearScoped { year_key } => {
                let year = clock.now().year().to_string();
                let marker = ledger.get(year_key)?;

                if marker.as_deref() != Some(year.as_bytes()) {
                    tracing::info!(
                        counter_key = self.counter_key,
                        year = %year,
                        "year marker changed, restarting id counter"
                    );
                    ledger.put(year_key, year.as_bytes())?;
                    counter = 1;
                }

                format!("{}_{}_{}", self.prefix, year, zero_pad(counter, PAD_WIDTH))
            }
        };

        let next = counter
            .checked_add(1)
            .ok_or_else(|| LedgerError::CounterExhausted(self.counter_key.to_string()))?;
        ledger.put(self.counter_key, next.to_string().as_bytes())?;
        tracing::debug!(counter_key = self.counter_key, %id, "issued id");

        Ok(id)
    }
}

// unparsable counters are treated like absent ones
fn read_number(ledger: &dyn Ledger, key: &str) -> LedgerResult<Option<u64>> {
    let value = ledger.get(key)?;
    Ok(value.and_then(|bytes| String::from_utf8_lossy(&bytes).trim().parse().ok()))
}
