#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("entry for key '{0}' cannot be empty")]
    EmptyValue(String),
    #[error("id counter '{0}' is exhausted")]
    CounterExhausted(String),
    #[error("ledger backend failed on key '{key}': {source}")]
    Backend {
        key: String,
        #[source]
        source: sled::Error,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("fraud entry requires {expected} fields but given {given}")]
    FieldCount { expected: usize, given: usize },
    #[error("operation '{operation}' requires {expected} argument(s) but given {given}")]
    ArgumentCount {
        operation: String,
        expected: usize,
        given: usize,
    },
    #[error("malformed contract content: {0}")]
    MalformedContent(String),
    #[error("'{0}' is not a valid eid")]
    InvalidEid(String),
    #[error("ledger status must be 'BL' or 'WL', got '{0}'")]
    InvalidLedgerStatus(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot {operation} contract while its progression is '{stage}'")]
    StateConflict { operation: &'static str, stage: String },
    #[error("contract '{reg_id}' has {len} approval slot(s), slot {slot} is required")]
    MissingSlot {
        reg_id: String,
        slot: usize,
        len: usize,
    },
    #[error("no record stored under '{0}'")]
    NotFound(String),
}

/// What a caller of the dispatcher sees: the operation failed, with a message.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("{0}")]
    Failed(String),
}
