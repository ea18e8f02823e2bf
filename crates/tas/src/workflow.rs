//! Fixed step tables per transaction type.
//!
//! Every workflow is the linear sequence
//! `PROPOSE → REQUEST_ECDH → REQUEST_CREATE_TOKEN → <action> → CONFIRM`.
//! A step is admitted only when the last recorded step is its predecessor
//! in the table, so out-of-order and replayed calls fail.

use tas_core::{ServerTokenPurpose, SubTransactionType, TransactionType};

use SubTransactionType::*;

/// The protocol for one transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workflow {
    pub tx_type: TransactionType,
    pub steps: &'static [SubTransactionType],
    /// Server token purposes this workflow may mint and accept.
    pub token_purposes: &'static [ServerTokenPurpose],
}

static ENTITY_REGISTRATION: Workflow = Workflow {
    tx_type: TransactionType::EntityRegistration,
    steps: &[Propose, RequestEcdh, RequestCreateToken, RequestRegisterDid, Confirm],
    token_purposes: &[ServerTokenPurpose::CreateDid],
};

static USER_REGISTRATION: Workflow = Workflow {
    tx_type: TransactionType::UserRegistration,
    steps: &[Propose, RequestEcdh, RequestCreateToken, RequestRegisterDid, Confirm],
    token_purposes: &[
        ServerTokenPurpose::CreateDid,
        ServerTokenPurpose::CreateDidAndIssueVc,
    ],
};

static USER_UPDATE: Workflow = Workflow {
    tx_type: TransactionType::UserUpdate,
    steps: &[Propose, RequestEcdh, RequestCreateToken, RequestUpdateDid, Confirm],
    token_purposes: &[ServerTokenPurpose::UpdateDid],
};

static DIDDOC_RESTORE: Workflow = Workflow {
    tx_type: TransactionType::DidDocRestore,
    steps: &[Propose, RequestEcdh, RequestCreateToken, RequestRestoreDid, Confirm],
    token_purposes: &[ServerTokenPurpose::RestoreDid],
};

static ISSUE_VC: Workflow = Workflow {
    tx_type: TransactionType::IssueVc,
    steps: &[Propose, RequestEcdh, RequestCreateToken, RequestIssueVc, Confirm],
    token_purposes: &[
        ServerTokenPurpose::IssueVc,
        ServerTokenPurpose::CreateDidAndIssueVc,
    ],
};

static REVOKE_VC: Workflow = Workflow {
    tx_type: TransactionType::RevokeVc,
    steps: &[Propose, RequestEcdh, RequestCreateToken, RequestRevokeVc, Confirm],
    token_purposes: &[ServerTokenPurpose::RevokeVc],
};

impl Workflow {
    /// The table for a transaction type.
    pub fn of(tx_type: TransactionType) -> &'static Workflow {
        match tx_type {
            TransactionType::EntityRegistration => &ENTITY_REGISTRATION,
            TransactionType::UserRegistration => &USER_REGISTRATION,
            TransactionType::UserUpdate => &USER_UPDATE,
            TransactionType::DidDocRestore => &DIDDOC_RESTORE,
            TransactionType::IssueVc => &ISSUE_VC,
            TransactionType::RevokeVc => &REVOKE_VC,
        }
    }

    pub fn contains(&self, step: SubTransactionType) -> bool {
        self.steps.contains(&step)
    }

    /// The step that must be last recorded before `step`.
    ///
    /// `None` for the first step and for steps outside this workflow.
    pub fn predecessor(&self, step: SubTransactionType) -> Option<SubTransactionType> {
        let pos = self.steps.iter().position(|s| *s == step)?;
        pos.checked_sub(1).map(|prev| self.steps[prev])
    }

    pub fn first(&self) -> SubTransactionType {
        self.steps[0]
    }

    pub fn last(&self) -> SubTransactionType {
        self.steps[self.steps.len() - 1]
    }

    pub fn allows_purpose(&self, purpose: ServerTokenPurpose) -> bool {
        self.token_purposes.contains(&purpose)
    }
}
