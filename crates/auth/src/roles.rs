use serde::{Deserialize, Serialize};

use gabinete_core::DomainError;

/// Role a user holds within one organization.
///
/// Roles are totally ordered: `Viewer < Assessor < Admin`. Gates that require
/// "at least" some role compare with this order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    #[serde(alias = "editor")]
    Assessor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Assessor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Assessor => "assessor",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// True when this role satisfies a gate requiring `min`.
    pub fn at_least(&self, min: Role) -> bool {
        *self >= min
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "assessor" | "editor" => Ok(Role::Assessor),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn editor_is_an_alias_for_assessor() {
        assert_eq!("editor".parse::<Role>().unwrap(), Role::Assessor);
        let role: Role = serde_json::from_str("\"editor\"").unwrap();
        assert_eq!(role, Role::Assessor);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"assessor\"");
    }

    #[test]
    fn unknown_roles_are_validation_errors() {
        let err = "owner".parse::<Role>().unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn order_is_total_and_transitive(a in any_role(), b in any_role(), c in any_role()) {
            prop_assert!(a.at_least(b) || b.at_least(a));
            if a.at_least(b) && b.at_least(c) {
                prop_assert!(a.at_least(c));
            }
        }

        #[test]
        fn admin_satisfies_every_gate(min in any_role()) {
            prop_assert!(Role::Admin.at_least(min));
        }

        #[test]
        fn parse_accepts_display_in_any_case(r in any_role(), upper in any::<bool>()) {
            let text = if upper { r.as_str().to_ascii_uppercase() } else { r.to_string() };
            prop_assert_eq!(text.parse::<Role>().unwrap(), r);
        }
    }
}
