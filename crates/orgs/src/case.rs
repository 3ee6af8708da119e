use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gabinete_core::{CaseId, DomainError, DomainResult, OrgId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Done,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "open" => Ok(CaseStatus::Open),
            "in_progress" => Ok(CaseStatus::InProgress),
            "done" => Ok(CaseStatus::Done),
            other => Err(DomainError::validation(format!("unknown case status '{other}'"))),
        }
    }
}

/// Input for opening a case.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCase {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// A constituent demand tracked by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub org_id: OrgId,
    pub title: String,
    pub description: Option<String>,
    pub status: CaseStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Case {
    pub fn open(org_id: OrgId, input: NewCase, by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if input.due_at.is_some_and(|due| due < now) {
            return Err(DomainError::validation("due date is in the past"));
        }
        Ok(Self {
            id: CaseId::new(),
            org_id,
            title,
            description: input.description.filter(|d| !d.trim().is_empty()),
            status: CaseStatus::Open,
            due_at: input.due_at,
            created_by: by,
            created_at: now,
        })
    }

    /// Past due and not finished.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != CaseStatus::Done && self.due_at.is_some_and(|due| due < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn opens_with_trimmed_title() {
        let now = Utc::now();
        let case = Case::open(
            OrgId::new(),
            NewCase {
                title: "  Buraco na rua  ".into(),
                description: None,
                due_at: Some(now + Duration::days(7)),
            },
            UserId::new(),
            now,
        )
        .unwrap();
        assert_eq!(case.title, "Buraco na rua");
        assert_eq!(case.status, CaseStatus::Open);
        assert!(!case.is_overdue(now));
        assert!(case.is_overdue(now + Duration::days(8)));
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Case::open(
            OrgId::new(),
            NewCase {
                title: " ".into(),
                description: None,
                due_at: None,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.reason(), "validation");
    }
}
