//! SLA contract documents and their workflow vocabulary.
use super::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a contract is in its approval workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Progression {
    /// Freshly drafted content that never went through the workflow.
    #[default]
    Unset,
    Temp,
    SubmittedInternal,
    ClientReview,
    ClientManagerReview,
    Closed,
    Abandoned,
    /// Any spelling we do not recognise, preserved verbatim.
    Other(String),
}

impl Progression {
    pub fn as_str(&self) -> &str {
        match self {
            Progression::Unset => "",
            Progression::Temp => "TEMP",
            Progression::SubmittedInternal => "IN_PROGRESS_INTERNAL_REVIEW_REQUESTED",
            Progression::ClientReview => "IN_PROGRESS_CLIENT_REVIEW_REQUESTED",
            Progression::ClientManagerReview => "IN_PROGRESS_CLIENT_MANAGER_REVIEW_REQUESTED",
            Progression::Closed => "CLOSED",
            Progression::Abandoned => "ABANDONED",
            Progression::Other(raw) => raw,
        }
    }

    /// The reviewer who acts next, if a review is pending.
    pub fn reviewer(&self) -> Option<SlotRole> {
        match self {
            Progression::SubmittedInternal => Some(SlotRole::InternalReviewer),
            Progression::ClientReview => Some(SlotRole::ClientReviewer),
            Progression::ClientManagerReview => Some(SlotRole::ClientManager),
            _ => None,
        }
    }

    /// The stage an approval moves to.
    pub fn advanced(&self) -> Option<Progression> {
        match self {
            Progression::SubmittedInternal => Some(Progression::ClientReview),
            Progression::ClientReview => Some(Progression::ClientManagerReview),
            Progression::ClientManagerReview => Some(Progression::Closed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Progression::Closed | Progression::Abandoned)
    }

    /// A stored record at this stage may be overwritten by a draft save.
    pub fn accepts_draft(&self) -> bool {
        matches!(self, Progression::Unset | Progression::Temp)
    }

    /// A stored record at this stage may be (re)submitted to internal review.
    pub fn accepts_submission(&self) -> bool {
        matches!(
            self,
            Progression::Unset | Progression::Temp | Progression::SubmittedInternal
        )
    }
}

impl From<String> for Progression {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" => Progression::Unset,
            "TEMP" => Progression::Temp,
            "IN_PROGRESS_INTERNAL_REVIEW_REQUESTED" | "SUBMITTED_INTERNAL" => {
                Progression::SubmittedInternal
            }
            "IN_PROGRESS_CLIENT_REVIEW_REQUESTED" | "CLIENT_REVIEW" => Progression::ClientReview,
            "IN_PROGRESS_CLIENT_MANAGER_REVIEW_REQUESTED" | "CLIENT_MANAGER_REVIEW" => {
                Progression::ClientManagerReview
            }
            "CLOSED" => Progression::Closed,
            "ABANDONED" => Progression::Abandoned,
            _ => Progression::Other(raw),
        }
    }
}

impl From<Progression> for String {
    fn from(progression: Progression) -> String {
        progression.as_str().to_string()
    }
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progression::Unset => f.write_str("<unset>"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Positional reviewer roles inside `Approvals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Originator,
    InternalReviewer,
    ClientReviewer,
    ClientManager,
}

impl SlotRole {
    pub fn slot(&self) -> usize {
        match self {
            SlotRole::Originator => 0,
            SlotRole::InternalReviewer => 1,
            SlotRole::ClientReviewer => 2,
            SlotRole::ClientManager => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApprovalState {
    /// Missing or empty in the submitted content; written back as `""`.
    #[default]
    Unset,
    Temp,
    Submitted,
    Approved,
    Rejected,
    Other(String),
}

impl From<String> for ApprovalState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => ApprovalState::Unset,
            "TEMP" => ApprovalState::Temp,
            "SUBMITTED" => ApprovalState::Submitted,
            "APPROVED" => ApprovalState::Approved,
            "REJECTED" => ApprovalState::Rejected,
            _ => ApprovalState::Other(raw),
        }
    }
}

impl From<ApprovalState> for String {
    fn from(state: ApprovalState) -> String {
        match state {
            ApprovalState::Unset => String::new(),
            ApprovalState::Temp => "TEMP".into(),
            ApprovalState::Submitted => "SUBMITTED".into(),
            ApprovalState::Approved => "APPROVED".into(),
            ApprovalState::Rejected => "REJECTED".into(),
            ApprovalState::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SlaApproval {
    pub approval_user_id: String,
    pub approval_company: String,
    pub approval_department: String,
    pub approval_name: String,
    pub approval_state: ApprovalState,
    pub approval_date: String,
    pub approval_comment: String,
    pub approval_alarm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SlaServiceItem {
    pub service_item: String,
    pub score_item: String,
    pub measurement_item: String,
    pub explain_item: String,
    pub divide_score: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SlaContract {
    pub reg_id: String,
    pub name: String,
    pub kind: String,
    pub sta_date: String,
    pub end_date: String,
    pub client: String,
    pub client_person: String,
    pub client_person_tel: String,
    pub assess_date: String,
    pub progression: Progression,
    pub assess_yn: String,
    pub approvals: Vec<SlaApproval>,
    pub service_items: Vec<SlaServiceItem>,
}

impl SlaContract {
    pub fn parse(content: &[u8]) -> Result<Self, ValidationError> {
        let contract: SlaContract = serde_json::from_slice(content)
            .map_err(|e| ValidationError::MalformedContent(e.to_string()))?;

        if contract.reg_id.is_empty() {
            return Err(ValidationError::MalformedContent("RegId is empty".into()));
        }
        Ok(contract)
    }

    /// Two-space indented JSON, the stored form.
    pub fn to_document(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn slot_mut(&mut self, role: SlotRole) -> Option<&mut SlaApproval> {
        self.approvals.get_mut(role.slot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"{
  "RegId": "SLA_CONT_2017_00005",
  "Name": "contract_201701",
  "Client": "bank",
  "Progression": "",
  "Approvals": [
    { "ApprovalUserId": "drafter", "ApprovalState": "test" }
  ]
}"#;

    #[test]
    fn parses_partial_content_with_defaults() {
        let contract = SlaContract::parse(CONTENT.as_bytes()).unwrap();

        assert_eq!(contract.progression, Progression::Unset);
        assert_eq!(contract.kind, "");
        assert_eq!(contract.approvals.len(), 1);
        assert_eq!(
            contract.approvals[0].approval_state,
            ApprovalState::Other("test".into())
        );
        assert!(contract.service_items.is_empty());
    }

    #[test]
    fn document_keeps_field_order_and_spelling() {
        let mut contract = SlaContract::parse(CONTENT.as_bytes()).unwrap();
        contract.progression = Progression::SubmittedInternal;

        let doc = String::from_utf8(contract.to_document().unwrap()).unwrap();

        assert!(doc.starts_with("{\n  \"RegId\": \"SLA_CONT_2017_00005\",\n  \"Name\""));
        assert!(doc.contains("\"Progression\": \"IN_PROGRESS_INTERNAL_REVIEW_REQUESTED\""));
        assert!(doc.contains("\"ApprovalState\": \"test\""));
        assert!(doc.contains("\"ApprovalAlarm\": \"\""));
    }

    #[test]
    fn missing_approval_state_stays_empty() {
        let contract =
            SlaContract::parse(br#"{"RegId": "X", "Approvals": [{"ApprovalUserId": "u"}]}"#).unwrap();
        assert_eq!(contract.approvals[0].approval_state, ApprovalState::Unset);

        let doc = String::from_utf8(contract.to_document().unwrap()).unwrap();
        assert!(doc.contains("\"ApprovalState\": \"\""));
        assert!(!doc.contains("TEMP"));
    }

    #[test]
    fn progression_aliases_normalise() {
        assert_eq!(Progression::from("SUBMITTED_INTERNAL".to_string()), Progression::SubmittedInternal);
        assert_eq!(Progression::from("closed".to_string()), Progression::Closed);
        assert_eq!(
            Progression::from("in progress".to_string()),
            Progression::Other("in progress".into())
        );
    }

    #[test]
    fn stage_to_slot_mapping() {
        assert_eq!(Progression::SubmittedInternal.reviewer().map(|r| r.slot()), Some(1));
        assert_eq!(Progression::ClientReview.reviewer().map(|r| r.slot()), Some(2));
        assert_eq!(Progression::ClientManagerReview.reviewer().map(|r| r.slot()), Some(3));
        assert_eq!(Progression::Temp.reviewer(), None);
        assert_eq!(Progression::Closed.advanced(), None);
    }

    #[test]
    fn drafts_and_submissions_never_move_backwards() {
        assert!(Progression::Temp.accepts_draft());
        assert!(!Progression::SubmittedInternal.accepts_draft());
        assert!(!Progression::Closed.accepts_draft());
        assert!(Progression::SubmittedInternal.accepts_submission());
        assert!(!Progression::ClientReview.accepts_submission());
        assert!(!Progression::Abandoned.accepts_submission());
        assert!(!Progression::Other("ON_HOLD".into()).accepts_submission());
    }

    #[test]
    fn missing_reg_id_is_malformed() {
        assert!(matches!(
            SlaContract::parse(br#"{"Name": "x"}"#),
            Err(ValidationError::MalformedContent(_))
        ));
        assert!(SlaContract::parse(b"not json").is_err());
    }
}
