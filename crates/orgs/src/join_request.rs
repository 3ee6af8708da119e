use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gabinete_core::{DomainError, DomainResult, JoinRequestId, OrgId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Denied,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Approved => "approved",
            JoinRequestStatus::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(JoinRequestStatus::Pending),
            "approved" => Ok(JoinRequestStatus::Approved),
            "denied" => Ok(JoinRequestStatus::Denied),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// Admin verdict on a pending request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[serde(alias = "approve")]
    Approved,
    #[serde(alias = "deny")]
    Denied,
}

impl Decision {
    pub fn status(&self) -> JoinRequestStatus {
        match self {
            Decision::Approved => JoinRequestStatus::Approved,
            Decision::Denied => JoinRequestStatus::Denied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: JoinRequestId,
    pub org_id: OrgId,
    pub requester: UserId,
    pub note: Option<String>,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<UserId>,
}

impl JoinRequest {
    pub fn submit(org_id: OrgId, requester: UserId, note: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: JoinRequestId::new(),
            org_id,
            requester,
            note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            status: JoinRequestStatus::Pending,
            created_at: now,
            decided_at: None,
            decided_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == JoinRequestStatus::Pending
    }

    /// Move a pending request to its terminal state.
    pub fn decide(&mut self, decision: Decision, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_pending() {
            return Err(DomainError::AlreadyDecided);
        }
        self.status = decision.status();
        self.decided_at = Some(now);
        self.decided_by = Some(by);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_are_terminal() {
        let mut req = JoinRequest::submit(OrgId::new(), UserId::new(), Some("  ".into()), Utc::now());
        assert_eq!(req.note, None);

        let admin = UserId::new();
        req.decide(Decision::Denied, admin, Utc::now()).unwrap();
        assert_eq!(req.status, JoinRequestStatus::Denied);
        assert_eq!(req.decided_by, Some(admin));

        assert_eq!(
            req.decide(Decision::Approved, admin, Utc::now()),
            Err(DomainError::AlreadyDecided)
        );
        assert_eq!(req.status, JoinRequestStatus::Denied);
    }

    #[test]
    fn decision_accepts_verb_aliases() {
        let d: Decision = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(d, Decision::Approved);
        let d: Decision = serde_json::from_str("\"denied\"").unwrap();
        assert_eq!(d, Decision::Denied);
    }
}
