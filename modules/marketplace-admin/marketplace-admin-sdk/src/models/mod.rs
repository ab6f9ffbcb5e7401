//! Row models.
//!
//! Field names match backend column names. `id`, `created_at` and
//! `updated_at` are assigned by the backend and omitted from inserts when
//! unset.

mod billing;
mod partner;
mod users;
mod verticals;
mod voyance;

pub use billing::{Subscription, UserConsumption};
pub use partner::Partner;
pub use users::UserUpdate;
pub use verticals::{
    Accommodation, BonPlan, CarModel, Concert, Loisir, NightlifeEvent, Promotion, Restaurant,
    TravelOffer, VoyanceMedium,
};
pub use voyance::{VoyanceConsultation, VoyanceReview};
