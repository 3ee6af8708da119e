use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gabinete_auth::Role;
use gabinete_core::{DomainError, DomainResult, OrgId, UserId};

/// A user's role in one organization. At most one per (org, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub org_id: OrgId,
    pub user_id: UserId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(org_id: OrgId, user_id: UserId, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            org_id,
            user_id,
            role,
            created_at: now,
        }
    }
}

/// Last-admin rule.
///
/// `current` is the target's role before the change, `next` its role after
/// (`None` = removed) and `admin_count` the number of admins the organization
/// has before the change. Callers must hold the organization's membership
/// rows locked between counting and writing.
pub fn ensure_admin_remains(
    current: Option<Role>,
    next: Option<Role>,
    admin_count: usize,
) -> DomainResult<()> {
    let loses_admin = current == Some(Role::Admin) && next != Some(Role::Admin);
    if loses_admin && admin_count <= 1 {
        return Err(DomainError::LastAdminViolation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn sole_admin_cannot_be_removed_or_demoted() {
        assert_eq!(
            ensure_admin_remains(Some(Role::Admin), None, 1),
            Err(DomainError::LastAdminViolation)
        );
        assert_eq!(
            ensure_admin_remains(Some(Role::Admin), Some(Role::Viewer), 1),
            Err(DomainError::LastAdminViolation)
        );
        assert!(ensure_admin_remains(Some(Role::Admin), Some(Role::Admin), 1).is_ok());
        assert!(ensure_admin_remains(Some(Role::Admin), None, 2).is_ok());
        assert!(ensure_admin_remains(Some(Role::Viewer), None, 1).is_ok());
        assert!(ensure_admin_remains(None, None, 0).is_ok());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8, Role),
        Remove(u8),
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6, any_role()).prop_map(|(u, r)| Op::Set(u, r)),
            (0u8..6).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn guarded_ops_never_drop_the_last_admin(ops in prop::collection::vec(any_op(), 0..64)) {
            let mut members: BTreeMap<u8, Role> = BTreeMap::new();
            members.insert(0, Role::Admin);

            for op in ops {
                let admins = members.values().filter(|r| r.is_admin()).count();
                match op {
                    Op::Set(u, role) => {
                        let current = members.get(&u).copied();
                        if ensure_admin_remains(current, Some(role), admins).is_ok() {
                            members.insert(u, role);
                        }
                    }
                    Op::Remove(u) => {
                        let current = members.get(&u).copied();
                        if ensure_admin_remains(current, None, admins).is_ok() {
                            members.remove(&u);
                        }
                    }
                }
                prop_assert!(members.values().any(|r| r.is_admin()));
            }
        }
    }
}
