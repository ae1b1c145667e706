use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Document status as the ERP tracks it (`docstatus` 0, 1, 2).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl DocStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "submitted" => Self::Submitted,
            "cancelled" => Self::Cancelled,
            _ => Self::Draft,
        }
    }

    pub fn can_transition_to(self, next: DocStatus) -> bool {
        matches!(
            (self, next),
            (DocStatus::Draft, DocStatus::Draft)
                | (DocStatus::Draft, DocStatus::Submitted)
                | (DocStatus::Submitted, DocStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: DocStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            *self = next;
            return Ok(());
        }

        Err(DomainError::InvalidDocumentTransition { from: *self, to: next })
    }

    pub fn ensure_editable(self, doctype: &'static str, name: &str) -> Result<(), DomainError> {
        if self == DocStatus::Draft {
            return Ok(());
        }
        Err(DomainError::InvariantViolation(format!(
            "{doctype} {name} is {} and can no longer be edited",
            self.as_str()
        )))
    }
}

/// Host lifecycle events the customizations hook into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentEvent {
    BeforeInsert,
    Validate,
    OnSubmit,
}

impl DocumentEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeInsert => "before_insert",
            Self::Validate => "validate",
            Self::OnSubmit => "on_submit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DocStatus;

    #[test]
    fn drafts_submit_and_submitted_documents_cancel() {
        let mut status = DocStatus::Draft;
        status.transition_to(DocStatus::Submitted).expect("draft -> submitted");
        status.transition_to(DocStatus::Cancelled).expect("submitted -> cancelled");
        assert_eq!(status, DocStatus::Cancelled);
    }

    #[test]
    fn resubmitting_a_submitted_document_is_rejected() {
        let mut status = DocStatus::Submitted;
        let error = status.transition_to(DocStatus::Submitted).expect_err("double submit");
        assert!(matches!(error, crate::errors::DomainError::InvalidDocumentTransition { .. }));
    }

    #[test]
    fn only_drafts_are_editable() {
        assert!(DocStatus::Draft.ensure_editable("BOQ", "BOQ-1").is_ok());
        let error = DocStatus::Submitted.ensure_editable("BOQ", "BOQ-1").expect_err("locked");
        assert!(error.to_string().contains("BOQ BOQ-1 is submitted"));
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [DocStatus::Draft, DocStatus::Submitted, DocStatus::Cancelled] {
            assert_eq!(DocStatus::parse(status.as_str()), status);
        }
    }
}
