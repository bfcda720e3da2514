use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Company settings editable from the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantSettings {
    pub currency: String,
    /// Offset of the tenant's wall clock from UTC; schedules are read in this time.
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            utc_offset_minutes: 0,
            contact_email: None,
            contact_phone: None,
        }
    }
}

impl TenantSettings {
    pub fn validate(&self) -> CoreResult<()> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CoreError::ValidationError(format!(
                "currency must be a 3-letter ISO code, got {}",
                self.currency
            )));
        }
        if !(-12 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(CoreError::ValidationError(format!(
                "utc_offset_minutes {} out of range",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> CoreResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            CoreError::ValidationError(format!("invalid utc offset {}", self.utc_offset_minutes))
        })
    }
}

/// Organizational boundary owning fields, users and roles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub settings: TenantSettings,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, slug: String, settings: TenantSettings) -> CoreResult<Self> {
        if name.trim().is_empty() {
            return Err(CoreError::ValidationError("tenant name is required".to_string()));
        }
        validate_slug(&slug)?;
        settings.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            slug,
            settings,
            created_at: Utc::now(),
        })
    }
}

/// Slugs appear in public URLs: lowercase ASCII, digits and inner dashes.
pub fn validate_slug(slug: &str) -> CoreResult<()> {
    let well_formed = (3..=63).contains(&slug.len())
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if !well_formed {
        return Err(CoreError::ValidationError(format!("invalid slug {}", slug)));
    }
    Ok(())
}
