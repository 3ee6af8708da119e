use chrono::{DateTime, Utc};
use rand::{Rng, rngs::OsRng};
use serde::{Deserialize, Serialize};

use gabinete_core::{DomainError, DomainResult, OrgId};

/// Public office the organization serves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeKind {
    Vereador,
    Prefeito,
    VicePrefeito,
    DepEstadual,
    DepFederal,
    Senador,
}

/// Geographic scope implied by an office.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OfficeScope {
    /// Needs a state and a city.
    Municipal,
    /// Needs a state; a city must not be given.
    StateOrFederal,
}

impl OfficeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfficeKind::Vereador => "vereador",
            OfficeKind::Prefeito => "prefeito",
            OfficeKind::VicePrefeito => "vice_prefeito",
            OfficeKind::DepEstadual => "dep_estadual",
            OfficeKind::DepFederal => "dep_federal",
            OfficeKind::Senador => "senador",
        }
    }

    pub fn scope(&self) -> OfficeScope {
        match self {
            OfficeKind::Vereador | OfficeKind::Prefeito | OfficeKind::VicePrefeito => {
                OfficeScope::Municipal
            }
            OfficeKind::DepEstadual | OfficeKind::DepFederal | OfficeKind::Senador => {
                OfficeScope::StateOrFederal
            }
        }
    }
}

impl core::str::FromStr for OfficeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "vereador" => Ok(OfficeKind::Vereador),
            "prefeito" => Ok(OfficeKind::Prefeito),
            "vice_prefeito" => Ok(OfficeKind::VicePrefeito),
            "dep_estadual" => Ok(OfficeKind::DepEstadual),
            "dep_federal" => Ok(OfficeKind::DepFederal),
            "senador" => Ok(OfficeKind::Senador),
            other => Err(DomainError::validation(format!("unknown office '{other}'"))),
        }
    }
}

impl core::fmt::Display for OfficeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short code users type to ask to join an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    pub const LEN: usize = 8;
    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Fresh random code from the OS RNG.
    pub fn generate() -> Self {
        let code = (0..Self::LEN)
            .map(|_| Self::ALPHABET[OsRng.gen_range(0..Self::ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalize user input (trim, upper-case). Unknown codes are a lookup
    /// concern, so anything non-empty is accepted here.
    pub fn normalize(input: &str) -> DomainResult<Self> {
        let code = input.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(DomainError::InvalidCode);
        }
        Ok(Self(code))
    }

    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for JoinCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw input for creating an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub office: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub office: OfficeKind,
    pub state: String,
    pub city: Option<String>,
    pub join_code: JoinCode,
    pub created_at: DateTime<Utc>,
}

fn is_uf(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

impl Organization {
    /// Validate input and build a new organization with a fresh join code.
    ///
    /// All field problems are reported together in one validation error.
    pub fn create(input: NewOrganization, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        let state = input
            .state
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        let city = input.city.as_deref().unwrap_or_default().trim().to_string();

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push("name is required.".to_string());
        }

        let office = match input.office.parse::<OfficeKind>() {
            Ok(office) => Some(office),
            Err(_) if input.office.trim().is_empty() => {
                errors.push("office is required.".to_string());
                None
            }
            Err(_) => {
                errors.push("office is invalid.".to_string());
                None
            }
        };

        if let Some(office) = office {
            if !is_uf(&state) {
                errors.push("state must be a two-letter code (e.g. RS, SP).".to_string());
            }
            match office.scope() {
                OfficeScope::Municipal if city.is_empty() => {
                    errors.push("city is required for municipal offices.".to_string());
                }
                OfficeScope::StateOrFederal if !city.is_empty() => {
                    errors.push("city must not be given for state/federal offices.".to_string());
                }
                _ => {}
            }
        }

        match office {
            Some(office) if errors.is_empty() => Ok(Self {
                id: OrgId::new(),
                name,
                office,
                state,
                city: (!city.is_empty()).then_some(city),
                join_code: JoinCode::generate(),
                created_at: now,
            }),
            _ => Err(DomainError::validation(errors.join(" "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(office: &str, state: &str, city: Option<&str>) -> NewOrganization {
        NewOrganization {
            name: "  Gabinete Ana  ".to_string(),
            office: office.to_string(),
            state: Some(state.to_string()),
            city: city.map(str::to_string),
        }
    }

    #[test]
    fn municipal_office_needs_state_and_city() {
        let org = Organization::create(input("vereador", "rs", Some(" Porto Alegre ")), Utc::now())
            .unwrap();
        assert_eq!(org.name, "Gabinete Ana");
        assert_eq!(org.state, "RS");
        assert_eq!(org.city.as_deref(), Some("Porto Alegre"));

        let err = Organization::create(input("prefeito", "SP", None), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("city is required"));
    }

    #[test]
    fn federal_office_forbids_city() {
        let org = Organization::create(input("senador", "SP", None), Utc::now()).unwrap();
        assert_eq!(org.city, None);

        let err =
            Organization::create(input("dep_federal", "SP", Some("Campinas")), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("must not be given"));
    }

    #[test]
    fn reports_every_problem_at_once() {
        let bad = NewOrganization {
            name: " ".to_string(),
            office: "vereador".to_string(),
            state: Some("R".to_string()),
            city: None,
        };
        let err = Organization::create(bad, Utc::now()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("name is required"));
        assert!(msg.contains("two-letter"));
        assert!(msg.contains("city is required"));
    }

    #[test]
    fn unknown_office_is_rejected() {
        let err = Organization::create(input("governador", "SP", None), Utc::now()).unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    #[test]
    fn generated_join_codes_are_upper_alphanumeric() {
        for _ in 0..32 {
            let code = JoinCode::generate();
            assert_eq!(code.as_str().len(), JoinCode::LEN);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn join_code_input_is_normalized() {
        assert_eq!(JoinCode::normalize(" ab12cd34 ").unwrap().as_str(), "AB12CD34");
        assert_eq!(JoinCode::normalize("   "), Err(DomainError::InvalidCode));
    }
}
