use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gabinete_core::{DomainError, DomainResult, OrgId, UserId, VoterId};

/// Input for registering a voter contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewVoter {
    pub name: String,
    pub phone: String,
    pub city: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update. Absent fields are left alone; a blank optional field is
/// cleared; a blank required field is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoterPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A constituent contact kept by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterId,
    pub org_id: OrgId,
    pub name: String,
    pub phone: String,
    pub city: String,
    pub email: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub zipcode: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

fn required(field: &'static str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Voter {
    pub fn register(org_id: OrgId, input: NewVoter, by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: VoterId::new(),
            org_id,
            name: required("name", &input.name)?,
            phone: required("phone", &input.phone)?,
            city: required("city", &input.city)?,
            email: optional(input.email).map(|e| e.to_lowercase()),
            state: optional(input.state).map(|s| s.to_uppercase()),
            address: optional(input.address),
            zipcode: optional(input.zipcode),
            notes: optional(input.notes),
            created_by: by,
            created_at: now,
        })
    }

    /// Apply a patch all or nothing.
    pub fn apply(&mut self, patch: VoterPatch) -> DomainResult<()> {
        let name = patch.name.as_deref().map(|v| required("name", v)).transpose()?;
        let phone = patch.phone.as_deref().map(|v| required("phone", v)).transpose()?;
        let city = patch.city.as_deref().map(|v| required("city", v)).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(city) = city {
            self.city = city;
        }
        if patch.email.is_some() {
            self.email = optional(patch.email).map(|e| e.to_lowercase());
        }
        if patch.state.is_some() {
            self.state = optional(patch.state).map(|s| s.to_uppercase());
        }
        if patch.address.is_some() {
            self.address = optional(patch.address);
        }
        if patch.zipcode.is_some() {
            self.zipcode = optional(patch.zipcode);
        }
        if patch.notes.is_some() {
            self.notes = optional(patch.notes);
        }
        Ok(())
    }

    /// Case-insensitive substring match over name, phone, email and city.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [Some(&self.name), Some(&self.phone), self.email.as_ref(), Some(&self.city)]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maria() -> NewVoter {
        NewVoter {
            name: " Maria da Silva ".into(),
            phone: "53 99999-0000".into(),
            city: "Pelotas".into(),
            email: Some("Maria@Example.org".into()),
            state: Some("rs".into()),
            notes: Some("   ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn register_trims_and_normalizes() {
        let voter = Voter::register(OrgId::new(), maria(), UserId::new(), Utc::now()).unwrap();
        assert_eq!(voter.name, "Maria da Silva");
        assert_eq!(voter.email.as_deref(), Some("maria@example.org"));
        assert_eq!(voter.state.as_deref(), Some("RS"));
        assert_eq!(voter.notes, None);
    }

    #[test]
    fn name_phone_and_city_are_required() {
        for blank in ["name", "phone", "city"] {
            let mut input = maria();
            match blank {
                "name" => input.name = " ".into(),
                "phone" => input.phone = String::new(),
                _ => input.city = "\t".into(),
            }
            let err = Voter::register(OrgId::new(), input, UserId::new(), Utc::now()).unwrap_err();
            assert_eq!(err, DomainError::validation(format!("{blank} is required")));
        }
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut voter = Voter::register(OrgId::new(), maria(), UserId::new(), Utc::now()).unwrap();
        let before = voter.clone();

        let err = voter
            .apply(VoterPatch {
                notes: Some("ligar depois".into()),
                phone: Some(" ".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.reason(), "validation");
        assert_eq!(voter, before);

        voter
            .apply(VoterPatch {
                email: Some(String::new()),
                notes: Some("ligar depois".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(voter.email, None);
        assert_eq!(voter.notes.as_deref(), Some("ligar depois"));
        assert_eq!(voter.phone, before.phone);
    }

    #[test]
    fn search_covers_contact_fields() {
        let voter = Voter::register(OrgId::new(), maria(), UserId::new(), Utc::now()).unwrap();
        assert!(voter.matches("silva"));
        assert!(voter.matches("99999"));
        assert!(voter.matches("EXAMPLE.ORG"));
        assert!(voter.matches("pelo"));
        assert!(voter.matches(""));
        assert!(!voter.matches("Rio Grande"));
    }
}
