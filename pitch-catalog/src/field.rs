use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CatalogError;

/// Sport a field is laid out for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SportType {
    Football,
    Futsal,
    Basketball,
    Tennis,
    Padel,
    Volleyball,
    Other,
}

impl SportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Football => "FOOTBALL",
            SportType::Futsal => "FUTSAL",
            SportType::Basketball => "BASKETBALL",
            SportType::Tennis => "TENNIS",
            SportType::Padel => "PADEL",
            SportType::Volleyball => "VOLLEYBALL",
            SportType::Other => "OTHER",
        }
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FOOTBALL" => Ok(SportType::Football),
            "FUTSAL" => Ok(SportType::Futsal),
            "BASKETBALL" => Ok(SportType::Basketball),
            "TENNIS" => Ok(SportType::Tennis),
            "PADEL" => Ok(SportType::Padel),
            "VOLLEYBALL" => Ok(SportType::Volleyball),
            "OTHER" => Ok(SportType::Other),
            _ => Err(CatalogError::InvalidField(format!("unknown sport type {}", s))),
        }
    }
}

/// A bookable venue unit owned by a tenant.
///
/// Prices are integer minor currency units per hour. `night_price_per_hour`
/// is shown to customers as a hint only and never enters a reservation total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub sport_type: SportType,
    pub price_per_hour: i64,
    pub night_price_per_hour: Option<i64>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub is_available: bool,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for a field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInput {
    pub name: String,
    pub sport_type: SportType,
    pub price_per_hour: i64,
    #[serde(default)]
    pub night_price_per_hour: Option<i64>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
}

fn default_available() -> bool {
    true
}

impl FieldInput {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidField("name is required".to_string()));
        }
        if self.price_per_hour < 0 {
            return Err(CatalogError::InvalidField("price_per_hour must not be negative".to_string()));
        }
        if matches!(self.night_price_per_hour, Some(p) if p < 0) {
            return Err(CatalogError::InvalidField("night_price_per_hour must not be negative".to_string()));
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CatalogError::InvalidField(format!("latitude {} out of range", lat)));
            }
        }
        if let Some(lng) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(CatalogError::InvalidField(format!("longitude {} out of range", lng)));
            }
        }
        Ok(())
    }
}

impl Field {
    pub fn new(tenant_id: Uuid, input: FieldInput) -> Result<Self, CatalogError> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            owner_id: input.owner_id,
            name: input.name.trim().to_string(),
            sport_type: input.sport_type,
            price_per_hour: input.price_per_hour,
            night_price_per_hour: input.night_price_per_hour,
            address: input.address,
            latitude: input.latitude,
            longitude: input.longitude,
            images: input.images,
            is_available: input.is_available,
            features: normalize_features(input.features),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an edit form; identity, tenant and creation time are kept.
    pub fn apply(&mut self, input: FieldInput) -> Result<(), CatalogError> {
        input.validate()?;
        self.owner_id = input.owner_id;
        self.name = input.name.trim().to_string();
        self.sport_type = input.sport_type;
        self.price_per_hour = input.price_per_hour;
        self.night_price_per_hour = input.night_price_per_hour;
        self.address = input.address;
        self.latitude = input.latitude;
        self.longitude = input.longitude;
        self.images = input.images;
        self.is_available = input.is_available;
        self.features = normalize_features(input.features);
        self.updated_at = Utc::now();
        Ok(())
    }
}

// Tags are compared case-insensitively by the listing filters, so store them lowercased once.
fn normalize_features(features: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = features
        .into_iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> FieldInput {
        FieldInput {
            name: "  Court 1 ".to_string(),
            sport_type: SportType::Padel,
            price_per_hour: 4000,
            night_price_per_hour: Some(5000),
            address: "1 Main St".to_string(),
            latitude: Some(40.4),
            longitude: Some(-3.7),
            images: vec![],
            is_available: true,
            features: vec!["Lights".to_string(), "lights".to_string(), " ".to_string(), "Roof".to_string()],
            owner_id: None,
        }
    }

    #[test]
    fn test_new_field_normalizes_input() {
        let field = Field::new(Uuid::new_v4(), input()).unwrap();
        assert_eq!(field.name, "Court 1");
        assert_eq!(field.features, vec!["lights".to_string(), "roof".to_string()]);
        assert_eq!(field.created_at, field.updated_at);
    }

    #[test]
    fn test_validation() {
        let mut bad = input();
        bad.name = " ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.price_per_hour = -1;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.latitude = Some(91.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut field = Field::new(Uuid::new_v4(), input()).unwrap();
        let id = field.id;
        let mut edit = input();
        edit.price_per_hour = 6000;
        edit.is_available = false;
        field.apply(edit).unwrap();
        assert_eq!(field.id, id);
        assert_eq!(field.price_per_hour, 6000);
        assert!(!field.is_available);
    }

    #[test]
    fn test_sport_type_parsing() {
        assert_eq!("padel".parse::<SportType>().unwrap(), SportType::Padel);
        assert_eq!(SportType::Futsal.to_string(), "FUTSAL");
        assert!("curling".parse::<SportType>().is_err());
    }
}
