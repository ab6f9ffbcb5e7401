//! Sidebar of the console.

use console_security::{ActivityType, SessionContext};
use marketplace_admin_sdk::AccessApi;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub key: String,
    pub label: String,
    pub path: String,
}

impl NavItem {
    fn new(key: impl Into<String>, label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Items the caller may open, in display order.
///
/// Activity entries follow the visibility index: a partner admin only sees
/// the verticals in which one of their partners has rows. Users and billing
/// are listed for super admins only.
pub async fn sidebar(access: &dyn AccessApi, ctx: &SessionContext) -> Vec<NavItem> {
    let mut items = vec![
        NavItem::new("dashboard", "Dashboard", "/"),
        NavItem::new("partners", "Partners", "/partners"),
    ];

    for activity_type in ActivityType::ALL {
        if access.has_access_to_activity_type(ctx, activity_type).await {
            items.push(NavItem::new(
                activity_type.as_str(),
                activity_type_title(activity_type),
                format!("/activities/{activity_type}"),
            ));
        }
    }

    if access
        .has_access_to_activity_type(ctx, ActivityType::VoyanceMedium)
        .await
    {
        items.push(NavItem::new(
            "voyance_consultations",
            "Consultations",
            "/voyance/consultations",
        ));
        items.push(NavItem::new("voyance_reviews", "Reviews", "/voyance/reviews"));
    }

    if ctx.is_super_admin() {
        items.push(NavItem::new("users", "Users", "/users"));
        items.push(NavItem::new("subscriptions", "Subscriptions", "/subscriptions"));
        items.push(NavItem::new("consumption", "Consumption", "/consumption"));
    }
    items
}

fn activity_type_title(activity_type: ActivityType) -> &'static str {
    match activity_type {
        ActivityType::Restaurant => "Restaurants",
        ActivityType::Accommodation => "Accommodations",
        ActivityType::Concert => "Concerts",
        ActivityType::Nightlife => "Nightlife",
        ActivityType::Loisir => "Leisure",
        ActivityType::CarRental => "Car rental",
        ActivityType::TravelOffer => "Travel offers",
        ActivityType::Promotion => "Promotions",
        ActivityType::BonPlan => "Bons plans",
        ActivityType::VoyanceMedium => "Mediums",
    }
}
