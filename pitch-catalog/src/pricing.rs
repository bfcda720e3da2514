use serde::{Deserialize, Serialize};

use crate::Field;

/// Price of a selection of hourly slots on a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub hours: u32,
    pub price_per_hour: i64,
    pub total: i64,
    /// Displayed next to the total; not applied to it.
    pub night_price_per_hour: Option<i64>,
}

/// Flat hourly pricing: `price_per_hour * hours`, no proration.
pub fn total_price(price_per_hour: i64, hours: u32) -> i64 {
    price_per_hour * i64::from(hours)
}

pub fn quote(field: &Field, hours: u32) -> PriceQuote {
    PriceQuote {
        hours,
        price_per_hour: field.price_per_hour,
        total: total_price(field.price_per_hour, hours),
        night_price_per_hour: field.night_price_per_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldInput, SportType};
    use uuid::Uuid;

    #[test]
    fn test_total_is_flat() {
        assert_eq!(total_price(2500, 0), 0);
        assert_eq!(total_price(2500, 1), 2500);
        assert_eq!(total_price(2500, 2), 5000);
    }

    #[test]
    fn test_night_price_is_only_a_hint() {
        let field = Field::new(
            Uuid::new_v4(),
            FieldInput {
                name: "Pitch A".to_string(),
                sport_type: SportType::Football,
                price_per_hour: 10000,
                night_price_per_hour: Some(15000),
                address: String::new(),
                latitude: None,
                longitude: None,
                images: vec![],
                is_available: true,
                features: vec![],
                owner_id: None,
            },
        )
        .unwrap();

        let q = quote(&field, 2);
        assert_eq!(q.total, 20000);
        assert_eq!(q.night_price_per_hour, Some(15000));
    }
}
