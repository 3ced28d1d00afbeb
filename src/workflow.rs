//! The contract approval workflow.
//!
//! A contract's `Progression` decides which approval slot a transition touches:
//!
//! | Progression         | slot | approve moves to    |
//! |---------------------|------|---------------------|
//! | SubmittedInternal   | 1    | ClientReview        |
//! | ClientReview        | 2    | ClientManagerReview |
//! | ClientManagerReview | 3    | Closed              |
//!
//! Slot 0 belongs to the originator and is set by `submit`. Reviews rewrite the
//! primary record only; indexes are written by `create_temp` and `submit`.
use super::clock::Clock;
use super::contract::{ApprovalState, Progression, SlaContract, SlotRole};
use super::error::WorkflowError;
use super::id::SequentialIdGenerator;
use super::index::{Index, IndexMode, IndexedRecordStore};
use super::ledger::Ledger;

/// Contract names and client names are used as index keys verbatim, so a name or
/// client equal to some `RegId` or to [`ALL_DATA_KEY`] overwrites that record with
/// an index entry.
pub const NAME_INDEX: Index = Index::new("name", "");
pub const CLIENT_INDEX: Index = Index::new("client", "");
pub const ALL_DATA_KEY: &str = "SLA_ALL_DATA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Approve,
    Reject,
}

pub struct ContractWorkflow<'a> {
    ledger: &'a dyn Ledger,
    clock: &'a dyn Clock,
    ids: SequentialIdGenerator,
    temp_ids: SequentialIdGenerator,
}

impl<'a> ContractWorkflow<'a> {
    pub fn new(ledger: &'a dyn Ledger, clock: &'a dyn Clock) -> Self {
        Self {
            ledger,
            clock,
            ids: SequentialIdGenerator::contract(),
            temp_ids: SequentialIdGenerator::contract_temp(),
        }
    }

    fn store(&self) -> IndexedRecordStore<'a> {
        IndexedRecordStore::new(self.ledger)
    }

    /// Seeds both id counters and their year markers.
    pub fn init(&self) -> anyhow::Result<()> {
        self.ids.init(self.ledger, self.clock)?;
        self.temp_ids.init(self.ledger, self.clock)?;
        Ok(())
    }

    /// Saves a draft. Only the catch-all index learns about it.
    ///
    /// A record that already left the draft stage is never turned back into one.
    pub fn create_temp(&self, content: &[u8]) -> anyhow::Result<SlaContract> {
        let mut contract = SlaContract::parse(content)?;
        if let Some(stored) = self.load(&contract.reg_id)? {
            if !stored.progression.accepts_draft() {
                return Err(conflict("create temp", &stored.progression).into());
            }
        }
        contract.progression = Progression::Temp;

        self.store().register(
            &contract.reg_id,
            &contract.to_document()?,
            &[ALL_DATA_KEY.to_string()],
            IndexMode::Idempotent,
        )?;

        tracing::info!(reg_id = %contract.reg_id, "saved temp contract");
        Ok(contract)
    }

    /// Sends a contract to internal review and indexes it by name and client.
    ///
    /// A contract already past internal review, or closed or abandoned, cannot be
    /// submitted again.
    pub fn submit(&self, content: &[u8]) -> anyhow::Result<SlaContract> {
        let mut contract = SlaContract::parse(content)?;

        if contract.progression.is_terminal() {
            return Err(conflict("submit", &contract.progression).into());
        }
        if let Some(stored) = self.load(&contract.reg_id)? {
            if !stored.progression.accepts_submission() {
                return Err(conflict("submit", &stored.progression).into());
            }
        }

        let reg_id = contract.reg_id.clone();
        let len = contract.approvals.len();
        let originator = contract
            .slot_mut(SlotRole::Originator)
            .ok_or(WorkflowError::MissingSlot { reg_id, slot: 0, len })?;
        originator.approval_state = ApprovalState::Submitted;
        contract.progression = Progression::SubmittedInternal;

        let index_keys = vec![
            NAME_INDEX.key_for(&contract.name),
            CLIENT_INDEX.key_for(&contract.client),
            ALL_DATA_KEY.to_string(),
        ];
        self.store().register(
            &contract.reg_id,
            &contract.to_document()?,
            &index_keys,
            IndexMode::Idempotent,
        )?;

        tracing::info!(
            reg_id = %contract.reg_id,
            name = %contract.name,
            client = %contract.client,
            "submitted contract"
        );
        Ok(contract)
    }

    /// Overwrites the stored record with `content` as given.
    ///
    /// Neither `Progression` nor the approval slots are checked, so this can put
    /// a contract in a state no workflow transition would produce. Prefer the
    /// review operations.
    pub fn update(&self, content: &[u8]) -> anyhow::Result<String> {
        let contract = SlaContract::parse(content)?;
        self.store().put_record(&contract.reg_id, content)?;

        tracing::warn!(reg_id = %contract.reg_id, "contract overwritten without workflow checks");
        Ok(contract.reg_id)
    }

    pub fn approve(&self, reg_id: &str, actor: &str, comment: &str) -> anyhow::Result<SlaContract> {
        self.review("approve", reg_id, actor, comment, Verdict::Approve)
    }

    /// Marks the current reviewer's slot REJECTED. `Progression` stays put.
    pub fn reject(&self, reg_id: &str, actor: &str, comment: &str) -> anyhow::Result<SlaContract> {
        self.review("reject", reg_id, actor, comment, Verdict::Reject)
    }

    /// The final approval: only legal while the client manager reviews.
    pub fn close(&self, reg_id: &str, actor: &str, comment: &str) -> anyhow::Result<SlaContract> {
        let contract = self.load_existing(reg_id)?;
        if contract.progression != Progression::ClientManagerReview {
            return Err(conflict("close", &contract.progression).into());
        }
        self.review("close", reg_id, actor, comment, Verdict::Approve)
    }

    /// Tags the contract ABANDONED, whatever its stage.
    pub fn abandon(&self, reg_id: &str) -> anyhow::Result<SlaContract> {
        let mut contract = self.load_existing(reg_id)?;
        let previous = std::mem::replace(&mut contract.progression, Progression::Abandoned);

        self.store().put_record(reg_id, &contract.to_document()?)?;
        tracing::info!(reg_id, from = %previous, "abandoned contract");
        Ok(contract)
    }

    fn review(
        &self,
        operation: &'static str,
        reg_id: &str,
        actor: &str,
        comment: &str,
        verdict: Verdict,
    ) -> anyhow::Result<SlaContract> {
        let mut contract = self.load_existing(reg_id)?;

        let (role, next) = match (contract.progression.reviewer(), contract.progression.advanced()) {
            (Some(role), Some(next)) => (role, next),
            _ => return Err(conflict(operation, &contract.progression).into()),
        };

        let len = contract.approvals.len();
        let date = self.clock.now().approval_date();
        let slot = contract
            .slot_mut(role)
            .ok_or_else(|| WorkflowError::MissingSlot {
                reg_id: reg_id.to_string(),
                slot: role.slot(),
                len,
            })?;

        slot.approval_user_id = actor.to_string();
        slot.approval_comment = comment.to_string();
        slot.approval_date = date;
        slot.approval_state = match verdict {
            Verdict::Approve => ApprovalState::Approved,
            Verdict::Reject => ApprovalState::Rejected,
        };

        let from = contract.progression.clone();
        if verdict == Verdict::Approve {
            contract.progression = next;
        }

        self.store().put_record(reg_id, &contract.to_document()?)?;
        tracing::info!(
            reg_id,
            actor,
            slot = role.slot(),
            from = %from,
            to = %contract.progression,
            "{operation} contract"
        );
        Ok(contract)
    }

    fn load(&self, reg_id: &str) -> anyhow::Result<Option<SlaContract>> {
        match self.store().get_record(reg_id)? {
            Some(bytes) => Ok(Some(SlaContract::parse(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_existing(&self, reg_id: &str) -> anyhow::Result<SlaContract> {
        self.load(reg_id)?
            .ok_or_else(|| WorkflowError::NotFound(reg_id.to_string()).into())
    }

    /// The stored document exactly as written, if any.
    pub fn by_id(&self, reg_id: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.store().get_record(reg_id)?)
    }

    pub fn by_name(&self, name: &str) -> anyhow::Result<Vec<String>> {
        self.documents(&NAME_INDEX.key_for(name))
    }

    pub fn by_client(&self, client: &str) -> anyhow::Result<Vec<String>> {
        self.documents(&CLIENT_INDEX.key_for(client))
    }

    pub fn all(&self) -> anyhow::Result<Vec<String>> {
        self.documents(ALL_DATA_KEY)
    }

    fn documents(&self, index_key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .store()
            .lookup(index_key)?
            .into_iter()
            .map(|record| String::from_utf8_lossy(&record.value).into_owned())
            .collect())
    }

    pub fn next_contract_id(&self) -> anyhow::Result<String> {
        Ok(self.ids.next(self.ledger, self.clock)?)
    }

    pub fn next_temp_id(&self) -> anyhow::Result<String> {
        Ok(self.temp_ids.next(self.ledger, self.clock)?)
    }
}

fn conflict(operation: &'static str, stage: &Progression) -> WorkflowError {
    WorkflowError::StateConflict {
        operation,
        stage: stage.to_string(),
    }
}
