use super::domain::DocumentKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Income,
    Identity,
    Credit,
    Property,
    Insurance,
    Vehicle,
    Disclosure,
}

impl DocumentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Identity => "identity",
            Self::Credit => "credit",
            Self::Property => "property",
            Self::Insurance => "insurance",
            Self::Vehicle => "vehicle",
            Self::Disclosure => "disclosure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    pub kind: &'static str,
    pub label: &'static str,
    pub category: DocumentCategory,
    pub requires_signature: bool,
}

/// Document kinds the operations team tracks, with the metadata verification relies on.
#[derive(Debug)]
pub struct DocumentCatalog {
    documents: Vec<DocumentTemplate>,
}

impl DocumentCatalog {
    pub fn standard() -> Self {
        Self {
            documents: standard_document_templates(),
        }
    }

    pub fn get(&self, kind: &DocumentKind) -> Option<&DocumentTemplate> {
        self.documents
            .iter()
            .find(|template| template.kind == kind.as_str())
    }

    pub fn tracks(&self, kind: &DocumentKind) -> bool {
        self.get(kind).is_some()
    }

    /// Human readable label, falling back to the raw kind.
    pub fn label_for(&self, kind: &DocumentKind) -> String {
        self.get(kind)
            .map(|template| template.label.to_string())
            .unwrap_or_else(|| kind.to_string())
    }

    pub fn requires_signature(&self, kind: &DocumentKind) -> bool {
        self.get(kind)
            .map(|template| template.requires_signature)
            .unwrap_or(false)
    }

    pub fn templates(&self) -> &[DocumentTemplate] {
        &self.documents
    }
}

const fn entry(
    kind: &'static str,
    label: &'static str,
    category: DocumentCategory,
    requires_signature: bool,
) -> DocumentTemplate {
    DocumentTemplate {
        kind,
        label,
        category,
        requires_signature,
    }
}

fn standard_document_templates() -> Vec<DocumentTemplate> {
    use DocumentCategory::*;

    vec![
        entry("tax_return", "Federal Tax Return", Income, true),
        entry("w2", "W-2 Wage Statement", Income, false),
        entry("pay_stub", "Pay Stub", Income, false),
        entry("bank_statement", "Bank Statement", Income, false),
        entry(
            "employment_verification",
            "Verification of Employment",
            Income,
            true,
        ),
        entry("government_id", "Government-Issued ID", Identity, false),
        entry("credit_report", "Credit Report", Credit, false),
        entry("appraisal", "Property Appraisal", Property, false),
        entry("purchase_agreement", "Purchase Agreement", Property, true),
        entry("flood_cert", "Flood Zone Certification", Property, false),
        entry("title_insurance", "Title Insurance Commitment", Insurance, false),
        entry(
            "homeowners_insurance",
            "Homeowners Insurance Binder",
            Insurance,
            false,
        ),
        entry("proof_of_insurance", "Proof of Auto Insurance", Insurance, false),
        entry("vehicle_title", "Vehicle Title", Vehicle, true),
        entry("loan_estimate", "Loan Estimate", Disclosure, false),
        entry("closing_disclosure", "Closing Disclosure", Disclosure, true),
        entry("promissory_note", "Promissory Note", Disclosure, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_labels_known_kinds_and_falls_back_for_unknown() {
        let catalog = DocumentCatalog::standard();
        assert_eq!(
            catalog.label_for(&DocumentKind::new("flood_cert")),
            "Flood Zone Certification"
        );
        assert_eq!(catalog.label_for(&DocumentKind::new("napkin")), "napkin");
        assert!(!catalog.tracks(&DocumentKind::new("napkin")));
    }

    #[test]
    fn signature_bearing_documents_are_flagged() {
        let catalog = DocumentCatalog::standard();
        assert!(catalog.requires_signature(&DocumentKind::new("promissory_note")));
        assert!(!catalog.requires_signature(&DocumentKind::new("pay_stub")));
        assert!(catalog
            .templates()
            .iter()
            .any(|template| template.category == DocumentCategory::Income));
    }
}
