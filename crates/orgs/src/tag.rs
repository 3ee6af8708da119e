use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gabinete_core::{DomainError, DomainResult, OrgId, TagId};

pub const DEFAULT_TAG_COLOR: &str = "#64748b";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TagPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Label an organization attaches to voters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub org_id: OrgId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

fn tag_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    Ok(name.to_string())
}

/// `#rgb` or `#rrggbb`, stored lowercase.
fn tag_color(raw: &str) -> DomainResult<String> {
    let color = raw.trim().to_ascii_lowercase();
    let hex = color.strip_prefix('#').unwrap_or_default();
    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DomainError::validation(format!("invalid color '{}'", raw.trim())));
    }
    Ok(color)
}

impl Tag {
    pub fn create(org_id: OrgId, input: NewTag, now: DateTime<Utc>) -> DomainResult<Self> {
        let color = match input.color.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_TAG_COLOR.to_string(),
            Some(raw) => tag_color(raw)?,
        };
        Ok(Self {
            id: TagId::new(),
            org_id,
            name: tag_name(&input.name)?,
            color,
            created_at: now,
        })
    }

    pub fn apply(&mut self, patch: TagPatch) -> DomainResult<()> {
        let name = patch.name.as_deref().map(tag_name).transpose()?;
        let color = patch.color.as_deref().map(tag_color).transpose()?;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(color) = color {
            self.color = color;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_defaults_and_validates() {
        let tag = Tag::create(
            OrgId::new(),
            NewTag {
                name: " Saúde ".into(),
                color: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tag.name, "Saúde");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);

        let tag = Tag::create(
            OrgId::new(),
            NewTag {
                name: "Educação".into(),
                color: Some("#0EA5E9".into()),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tag.color, "#0ea5e9");

        for bad in ["red", "#12345", "#ggg", "0ea5e9"] {
            let err = Tag::create(
                OrgId::new(),
                NewTag {
                    name: "x".into(),
                    color: Some(bad.into()),
                },
                Utc::now(),
            )
            .unwrap_err();
            assert_eq!(err.reason(), "validation", "{bad}");
        }
    }

    #[test]
    fn patch_rejects_blank_name_without_touching_color() {
        let mut tag = Tag::create(
            OrgId::new(),
            NewTag {
                name: "Saúde".into(),
                color: None,
            },
            Utc::now(),
        )
        .unwrap();
        let err = tag
            .apply(TagPatch {
                name: Some("  ".into()),
                color: Some("#fff".into()),
            })
            .unwrap_err();
        assert_eq!(err.reason(), "validation");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);

        tag.apply(TagPatch {
            name: None,
            color: Some("#FFF".into()),
        })
        .unwrap();
        assert_eq!((tag.name.as_str(), tag.color.as_str()), ("Saúde", "#fff"));
    }
}
