//! Field metadata shared by every editable row model.

use std::fmt::Debug;

use console_security::{ActivityType, PartnerId};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A row of an editable table.
///
/// The field lists name JSON keys and drive form handling: `NUMERIC` values
/// are parsed from strings, `BOOLEAN` from checkbox-like strings, `LISTS`
/// from comma separated strings, and `REQUIRED` fields must be present and
/// non-blank before anything is sent to the backend.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    const TABLE: &'static str;

    /// Singular label used in messages, e.g. "failed to save restaurant".
    const LABEL: &'static str;

    const REQUIRED: &'static [&'static str];

    const NUMERIC: &'static [&'static str] = &[];

    const BOOLEAN: &'static [&'static str] = &[];

    const LISTS: &'static [&'static str] = &[];

    fn id(&self) -> Option<i64>;
}

/// A row of one of the activity tables, linked to a partner through `partner_id`.
pub trait ActivityRecord: Record {
    const TYPE: ActivityType;

    fn partner_id(&self) -> Option<PartnerId>;
}

/// Implements [`Record`] and [`ActivityRecord`] for a model with `id` and
/// `partner_id` fields.
#[macro_export]
macro_rules! activity_record {
    (
        $ty:ty, $kind:expr,
        required: [$($req:literal),* $(,)?],
        numeric: [$($num:literal),* $(,)?],
        boolean: [$($bool:literal),* $(,)?],
        lists: [$($list:literal),* $(,)?] $(,)?
    ) => {
        impl $crate::record::Record for $ty {
            const TABLE: &'static str = $kind.table();
            const LABEL: &'static str = $kind.label();
            const REQUIRED: &'static [&'static str] = &[$($req),*];
            const NUMERIC: &'static [&'static str] = &[$($num),*];
            const BOOLEAN: &'static [&'static str] = &[$($bool),*];
            const LISTS: &'static [&'static str] = &[$($list),*];

            fn id(&self) -> Option<i64> {
                self.id
            }
        }

        impl $crate::record::ActivityRecord for $ty {
            const TYPE: ::console_security::ActivityType = $kind;

            fn partner_id(&self) -> Option<::console_security::PartnerId> {
                self.partner_id
            }
        }
    };
}
