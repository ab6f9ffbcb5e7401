use std::str::FromStr;

/// Business vertical whose rows may be linked to a partner through `partner_id`.
///
/// [`ActivityType::ALL`] is the single registry driving table names, image
/// buckets and the per-principal visibility index. Adding a vertical means
/// adding a variant here and nothing else in the access model.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Restaurant,
    Accommodation,
    Concert,
    Nightlife,
    Loisir,
    CarRental,
    TravelOffer,
    Promotion,
    BonPlan,
    VoyanceMedium,
}

impl ActivityType {
    pub const ALL: [Self; 10] = [
        Self::Restaurant,
        Self::Accommodation,
        Self::Concert,
        Self::Nightlife,
        Self::Loisir,
        Self::CarRental,
        Self::TravelOffer,
        Self::Promotion,
        Self::BonPlan,
        Self::VoyanceMedium,
    ];

    /// Column linking an activity row to its owning partner.
    pub const PARTNER_COLUMN: &'static str = "partner_id";

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Accommodation => "accommodation",
            Self::Concert => "concert",
            Self::Nightlife => "nightlife",
            Self::Loisir => "loisir",
            Self::CarRental => "car_rental",
            Self::TravelOffer => "travel_offer",
            Self::Promotion => "promotion",
            Self::BonPlan => "bon_plan",
            Self::VoyanceMedium => "voyance_medium",
        }
    }

    /// Backend table holding rows of this type.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurants",
            Self::Accommodation => "accommodations",
            Self::Concert => "concerts",
            Self::Nightlife => "nightlife_events",
            Self::Loisir => "loisirs",
            Self::CarRental => "car_models",
            Self::TravelOffer => "travel_offers",
            Self::Promotion => "promotions",
            Self::BonPlan => "bons_plans",
            Self::VoyanceMedium => "voyance_mediums",
        }
    }

    /// Object-storage bucket for images attached to rows of this type.
    #[must_use]
    pub const fn image_bucket(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant-images",
            Self::Accommodation => "accommodation-images",
            Self::Concert => "concert-images",
            Self::Nightlife => "nightlife-images",
            Self::Loisir => "loisir-images",
            Self::CarRental => "car-rental-images",
            Self::TravelOffer => "travel-offer-images",
            Self::Promotion => "promotion-images",
            Self::BonPlan => "bon-plan-images",
            Self::VoyanceMedium => "voyance-images",
        }
    }

    /// Human readable label, singular.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Accommodation => "accommodation",
            Self::Concert => "concert",
            Self::Nightlife => "nightlife event",
            Self::Loisir => "leisure activity",
            Self::CarRental => "car model",
            Self::TravelOffer => "travel offer",
            Self::Promotion => "promotion",
            Self::BonPlan => "bon plan",
            Self::VoyanceMedium => "voyance medium",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown activity type: {0}")]
pub struct UnknownActivityType(pub String);

impl FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.table() == s)
            .ok_or_else(|| UnknownActivityType(s.to_owned()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_tables_and_buckets_are_unique() {
        let tables: HashSet<_> = ActivityType::ALL.iter().map(|t| t.table()).collect();
        let buckets: HashSet<_> = ActivityType::ALL.iter().map(|t| t.image_bucket()).collect();
        assert_eq!(tables.len(), ActivityType::ALL.len());
        assert_eq!(buckets.len(), ActivityType::ALL.len());
    }

    #[test]
    fn parses_from_name_or_table() {
        assert_eq!(
            "restaurant".parse::<ActivityType>().unwrap(),
            ActivityType::Restaurant
        );
        assert_eq!(
            "nightlife_events".parse::<ActivityType>().unwrap(),
            ActivityType::Nightlife
        );
        assert!("spa".parse::<ActivityType>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        for t in ActivityType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().to_owned()));
        }
    }
}
