use crate::PartnerId;

/// Partner scope defining which partners' rows a principal can reach.
///
/// An unrestricted scope (super admin) matches every partner. A restricted
/// scope with no partner ids is a "deny all" scope: queries built from it must
/// resolve to empty without touching the backend.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct PartnerScope {
    pub(crate) unrestricted: bool,
    pub(crate) partner_ids: Vec<PartnerId>,
}

impl PartnerScope {
    /// Scope for a principal allowed to act on all partners.
    ///
    /// `known_ids` is the set of partner ids that existed when the scope was
    /// resolved; membership checks still succeed for ids outside it.
    #[must_use]
    pub fn unrestricted(known_ids: Vec<PartnerId>) -> Self {
        Self {
            unrestricted: true,
            partner_ids: dedup(known_ids),
        }
    }

    #[must_use]
    pub fn partners(partner_ids: Vec<PartnerId>) -> Self {
        Self {
            unrestricted: false,
            partner_ids: dedup(partner_ids),
        }
    }

    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    #[inline]
    #[must_use]
    pub fn partner_ids(&self) -> &[PartnerId] {
        &self.partner_ids
    }

    /// True if nothing is reachable through this scope.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.unrestricted && self.partner_ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, partner_id: PartnerId) -> bool {
        self.unrestricted || self.partner_ids.binary_search(&partner_id).is_ok()
    }

    /// Like [`contains`](Self::contains) for a nullable `partner_id` column.
    /// Rows without a partner are reachable only through an unrestricted scope.
    #[must_use]
    pub fn contains_opt(&self, partner_id: Option<PartnerId>) -> bool {
        match partner_id {
            Some(id) => self.contains(id),
            None => self.unrestricted,
        }
    }
}

fn dedup(mut ids: Vec<PartnerId>) -> Vec<PartnerId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
