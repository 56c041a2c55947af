use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;

use super::catalog::DocumentCatalog;

/// Identifier wrapper for loan files (e.g. `LOAN001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanId(pub String);

impl LoanId {
    /// Ids double as file stems, so only ASCII letters, digits, `_` and `-` are allowed.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snake-case document kind such as `tax_return` or `flood_cert`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKind(pub String);

impl DocumentKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Mortgage,
    Refinance,
    Heloc,
    Auto,
    Personal,
}

impl LoanType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mortgage => "Mortgage",
            Self::Refinance => "Refinance",
            Self::Heloc => "Home Equity Line of Credit",
            Self::Auto => "Auto",
            Self::Personal => "Personal",
        }
    }

    /// Standing conditions attached to every funding package of this type.
    pub fn closing_conditions(self) -> Vec<&'static str> {
        match self {
            Self::Mortgage | Self::Refinance => vec![
                "Record the deed of trust with the county before disbursement",
                "Confirm hazard insurance names the lender as mortgagee",
            ],
            Self::Heloc => vec![
                "Record the subordinate lien with the county",
                "Observe the three-day right of rescission before first draw",
            ],
            Self::Auto => vec!["Record the lender lien on the vehicle title"],
            Self::Personal => vec!["Confirm the borrower's disbursement account details"],
        }
    }
}

/// Position of a loan file in the operations lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Collecting,
    Verifying,
    ComplianceReview,
    Exception,
    Funding,
    Complete,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Collecting => "Collecting",
            Self::Verifying => "Verifying",
            Self::ComplianceReview => "Compliance Review",
            Self::Exception => "Exception",
            Self::Funding => "Funding",
            Self::Complete => "Complete",
        }
    }

    /// Rank along the forward path; `Exception` sits off the path.
    const fn position(self) -> Option<u8> {
        match self {
            Self::Collecting => Some(0),
            Self::Verifying => Some(1),
            Self::ComplianceReview => Some(2),
            Self::Funding => Some(3),
            Self::Complete => Some(4),
            Self::Exception => None,
        }
    }

    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        match (self, next) {
            (Self::Complete, _) => false,
            (Self::Exception, Self::Collecting | Self::Verifying) => true,
            (Self::Exception, _) => false,
            (_, Self::Exception) => true,
            (from, to) => match (from.position(), to.position()) {
                (Some(from), Some(to)) => to == from + 1,
                _ => false,
            },
        }
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("loan status cannot move from {} to {}", from.label(), to.label())]
pub struct TransitionError {
    pub from: LoanStatus,
    pub to: LoanStatus,
}

/// Ordered record of the statuses a loan passed through during one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTrail {
    steps: Vec<LoanStatus>,
}

impl StatusTrail {
    pub fn start() -> Self {
        Self {
            steps: vec![LoanStatus::Collecting],
        }
    }

    pub fn current(&self) -> LoanStatus {
        self.steps
            .last()
            .copied()
            .unwrap_or(LoanStatus::Collecting)
    }

    pub fn advance(&mut self, next: LoanStatus) -> Result<(), TransitionError> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(TransitionError {
                from: current,
                to: next,
            });
        }
        self.steps.push(next);
        Ok(())
    }

    pub fn steps(&self) -> &[LoanStatus] {
        &self.steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub ssn_last4: Option<String>,
}

/// A document on file together with the metadata captured at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedDocument {
    pub kind: DocumentKind,
    pub received_on: NaiveDate,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub signed: bool,
    /// Name printed on the document, when captured.
    #[serde(default)]
    pub borrower_name: Option<String>,
    /// Address printed on the document, when captured.
    #[serde(default)]
    pub address: Option<String>,
}

impl ReceivedDocument {
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expires_on.map(|expiry| expiry < as_of).unwrap_or(false)
    }
}

/// Attestations backing the regulatory rule table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceAttestations {
    pub aml_cleared: bool,
    pub kyc_verified: bool,
    pub tila_disclosure_delivered: bool,
    pub ecoa_notice_delivered: bool,
}

/// Canonical in-memory loan file threaded read-only through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: LoanId,
    pub loan_type: LoanType,
    pub borrower: Borrower,
    pub principal: f64,
    #[serde(default)]
    pub approval_date: Option<NaiveDate>,
    #[serde(default)]
    pub required_documents: Vec<DocumentKind>,
    #[serde(default)]
    pub received_documents: Vec<ReceivedDocument>,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(default)]
    pub compliance: ComplianceAttestations,
}

impl LoanRecord {
    /// Parse and validate a loan file against the standard document catalog.
    pub fn from_json_str(raw: &str) -> Result<Self, MalformedLoanRecord> {
        let record: LoanRecord = serde_json::from_str(raw)?;
        record.validate(&DocumentCatalog::standard())?;
        Ok(record)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MalformedLoanRecord> {
        let record: LoanRecord = serde_json::from_reader(reader)?;
        record.validate(&DocumentCatalog::standard())?;
        Ok(record)
    }

    pub fn validate(&self, catalog: &DocumentCatalog) -> Result<(), MalformedLoanRecord> {
        if self.loan_id.0.trim().is_empty() {
            return Err(MalformedLoanRecord::BlankLoanId);
        }
        if !self.loan_id.is_path_safe() {
            return Err(MalformedLoanRecord::UnsafeLoanId(self.loan_id.clone()));
        }
        if self.borrower.name.trim().is_empty() {
            return Err(MalformedLoanRecord::BlankBorrowerName);
        }
        if !self.principal.is_finite() || self.principal <= 0.0 {
            return Err(MalformedLoanRecord::InvalidPrincipal(self.principal));
        }

        let mut required = BTreeSet::new();
        for kind in &self.required_documents {
            if !catalog.tracks(kind) {
                return Err(MalformedLoanRecord::UntrackedDocument(kind.clone()));
            }
            if !required.insert(kind) {
                return Err(MalformedLoanRecord::DuplicateRequiredDocument(kind.clone()));
            }
        }

        let mut received = BTreeSet::new();
        for document in &self.received_documents {
            let kind = &document.kind;
            if !catalog.tracks(kind) {
                return Err(MalformedLoanRecord::UntrackedDocument(kind.clone()));
            }
            if !received.insert(kind) {
                return Err(MalformedLoanRecord::DuplicateReceivedDocument(kind.clone()));
            }
            if let Some(expires_on) = document.expires_on {
                if expires_on < document.received_on {
                    return Err(MalformedLoanRecord::ExpiryBeforeReceipt {
                        kind: kind.clone(),
                        received_on: document.received_on,
                        expires_on,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn received(&self, kind: &DocumentKind) -> Option<&ReceivedDocument> {
        self.received_documents
            .iter()
            .find(|document| &document.kind == kind)
    }
}

/// Fatal loan file problems; the pipeline aborts before the first stage.
#[derive(Debug, thiserror::Error)]
pub enum MalformedLoanRecord {
    #[error("loan file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("loan id is blank")]
    BlankLoanId,
    #[error("loan id {0:?} may only contain letters, digits, '_' and '-'")]
    UnsafeLoanId(LoanId),
    #[error("loan file for {expected} holds loan {found}")]
    LoanIdMismatch { expected: LoanId, found: LoanId },
    #[error("borrower name is blank")]
    BlankBorrowerName,
    #[error("principal must be a positive amount (found {0})")]
    InvalidPrincipal(f64),
    #[error("document kind {0} is not tracked")]
    UntrackedDocument(DocumentKind),
    #[error("document kind {0} is listed as required more than once")]
    DuplicateRequiredDocument(DocumentKind),
    #[error("document kind {0} was received more than once")]
    DuplicateReceivedDocument(DocumentKind),
    #[error("document {kind} expires on {expires_on} before it was received on {received_on}")]
    ExpiryBeforeReceipt {
        kind: DocumentKind,
        received_on: NaiveDate,
        expires_on: NaiveDate,
    },
}
