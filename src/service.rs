//! Service layer: named operations over string arguments.
//!
//! Every operation checks its argument count before touching the ledger and
//! answers with raw payload bytes. Write operations answer with an empty payload.
use super::clock::Clock;
use super::error::{DispatchError, ValidationError};
use super::fraud::{FraudKey, FraudRegistry, LedgerStatus};
use super::ledger::Ledger;
use super::workflow::ContractWorkflow;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type Handler = fn(&RecordService, &[String]) -> anyhow::Result<Vec<u8>>;

#[derive(Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub arity: usize,
    handler: Handler,
}

/// Registry of operation names and their handlers.
pub struct Dispatcher {
    operations: BTreeMap<&'static str, Operation>,
}

impl Dispatcher {
    pub fn empty() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, arity: usize, handler: Handler) {
        self.operations.insert(
            name,
            Operation {
                name,
                arity,
                handler,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Operation names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.keys().copied()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut d = Self::empty();

        // fraud entries
        d.register("register", 8, register_fraud_entry);
        d.register("createFraudEntry", 8, register_fraud_entry);
        d.register("deleteWithCid", 1, |s, a| s.delete_fraud(FraudKey::Cid, &a[0]));
        d.register("deleteWithMac", 1, |s, a| s.delete_fraud(FraudKey::Mac, &a[0]));
        d.register("deleteWithUuid", 1, |s, a| s.delete_fraud(FraudKey::Uuid, &a[0]));
        d.register("deleteWithEid", 1, |s, a| {
            s.fraud().delete_with_eid(parse_eid(&a[0])?)?;
            Ok(Vec::new())
        });
        d.register("updateLedgerStatusWithEid", 4, |s, a| {
            let status: LedgerStatus = a[1].parse()?;
            s.fraud()
                .update_ledger_status_with_eid(parse_eid(&a[0])?, status, &a[2], &a[3])?;
            Ok(Vec::new())
        });
        d.register("getAll", 0, |s, _| Ok(serde_json::to_vec(&s.fraud().get_all()?)?));
        d.register("getWithCid", 1, |s, a| s.lookup_fraud(FraudKey::Cid, &a[0]));
        d.register("getWithMac", 1, |s, a| s.lookup_fraud(FraudKey::Mac, &a[0]));
        d.register("getWithUuid", 1, |s, a| s.lookup_fraud(FraudKey::Uuid, &a[0]));
        d.register("getNextEid", 0, |s, _| {
            Ok(s.fraud().next_eid()?.to_string().into_bytes())
        });

        // contracts
        d.register("createTempContract", 1, |s, a| {
            s.contracts().create_temp(a[0].as_bytes())?;
            Ok(Vec::new())
        });
        d.register("submitContract", 1, |s, a| {
            s.contracts().submit(a[0].as_bytes())?;
            Ok(Vec::new())
        });
        d.register("updateContract", 1, |s, a| {
            s.contracts().update(a[0].as_bytes())?;
            Ok(Vec::new())
        });
        d.register("approveContract", 3, |s, a| {
            s.contracts().approve(&a[0], &a[1], &a[2])?;
            Ok(Vec::new())
        });
        d.register("rejectContract", 3, |s, a| {
            s.contracts().reject(&a[0], &a[1], &a[2])?;
            Ok(Vec::new())
        });
        d.register("closeContract", 3, |s, a| {
            s.contracts().close(&a[0], &a[1], &a[2])?;
            Ok(Vec::new())
        });
        d.register("abandonContract", 1, |s, a| {
            s.contracts().abandon(&a[0])?;
            Ok(Vec::new())
        });
        d.register("getContractId", 0, |s, _| {
            Ok(s.contracts().next_contract_id()?.into_bytes())
        });
        d.register("getContractTempId", 0, |s, _| {
            Ok(s.contracts().next_temp_id()?.into_bytes())
        });
        d.register("getContractWithId", 1, |s, a| {
            Ok(s.contracts().by_id(&a[0])?.unwrap_or_default())
        });
        d.register("getContractWithName", 1, |s, a| {
            documents(s.contracts().by_name(&a[0])?)
        });
        d.register("getContractWithClient", 1, |s, a| {
            documents(s.contracts().by_client(&a[0])?)
        });
        d.register("getContractAll", 0, |s, _| documents(s.contracts().all()?));

        d
    }
}

pub struct RecordService {
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    dispatcher: Dispatcher,
}

impl RecordService {
    pub fn new(ledger: Arc<dyn Ledger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            dispatcher: Dispatcher::default(),
        }
    }

    pub fn fraud(&self) -> FraudRegistry<'_> {
        FraudRegistry::new(self.ledger.as_ref(), self.clock.as_ref())
    }

    pub fn contracts(&self) -> ContractWorkflow<'_> {
        ContractWorkflow::new(self.ledger.as_ref(), self.clock.as_ref())
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.dispatcher.names().collect()
    }

    /// Runs `operation` and returns its payload.
    pub fn invoke(&self, operation: &str, args: &[String]) -> Result<Vec<u8>, DispatchError> {
        let op = self
            .dispatcher
            .get(operation)
            .ok_or_else(|| DispatchError::UnknownOperation(operation.to_string()))?;

        let span = tracing::debug_span!("invoke", operation = op.name, args = args.len());
        let _enter = span.enter();

        if args.len() != op.arity {
            let err = ValidationError::ArgumentCount {
                operation: op.name.to_string(),
                expected: op.arity,
                given: args.len(),
            };
            tracing::warn!(%err, "rejected invocation");
            return Err(DispatchError::Failed(err.to_string()));
        }

        (op.handler)(self, args).map_err(|err| {
            tracing::warn!(error = %format!("{err:#}"), "operation failed");
            DispatchError::Failed(format!("{err:#}"))
        })
    }

    fn delete_fraud(&self, key: FraudKey, value: &str) -> anyhow::Result<Vec<u8>> {
        self.fraud().delete_with(key, value)?;
        Ok(Vec::new())
    }

    fn lookup_fraud(&self, key: FraudKey, value: &str) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.fraud().lookup_with(key, value)?)?)
    }
}

fn register_fraud_entry(service: &RecordService, args: &[String]) -> anyhow::Result<Vec<u8>> {
    service.fraud().register(args)?;
    Ok(Vec::new())
}

fn parse_eid(raw: &str) -> Result<u64, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidEid(raw.to_string()))
}

/// Pretty JSON array holding each stored document as an object, fields as stored.
fn documents(docs: Vec<String>) -> anyhow::Result<Vec<u8>> {
    let values = docs
        .iter()
        .map(|doc| serde_json::from_str(doc))
        .collect::<Result<Vec<serde_json::Value>, _>>()?;
    Ok(serde_json::to_vec_pretty(&values)?)
}
