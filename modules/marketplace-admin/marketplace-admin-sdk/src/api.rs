use async_trait::async_trait;
use console_security::{ActivityId, ActivityType, PartnerId, SessionContext};

/// Partner-scoped access-control resolver.
///
/// Answers are derived from the caller's profile and the `partners` table.
/// They are UX affordances layered over the backend's row-level policies and
/// never replace them. Backend failures degrade to "no access" and are logged
/// by the implementation, so none of these calls fail.
#[async_trait]
pub trait AccessApi: Send + Sync {
    /// Partners the caller owns, or every partner for super admins.
    async fn partner_ids(&self, ctx: &SessionContext) -> Vec<PartnerId>;

    async fn can_access_partner(&self, ctx: &SessionContext, partner_id: PartnerId) -> bool;

    /// True if at least one row of `activity_type` belongs to a visible partner.
    async fn has_access_to_activity_type(
        &self,
        ctx: &SessionContext,
        activity_type: ActivityType,
    ) -> bool;

    /// True if the row `id` of `activity_type` belongs to a visible partner.
    /// A missing row or a row without partner is not accessible.
    async fn can_access_activity(
        &self,
        ctx: &SessionContext,
        activity_type: ActivityType,
        id: ActivityId,
    ) -> bool;
}
