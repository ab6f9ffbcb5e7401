pub mod access;
pub mod billing;
pub mod error;
pub mod forms;
pub mod listing;
pub mod navigation;
pub mod partners;
pub mod rows;
pub mod session;
pub mod session_store;
pub mod uploads;
pub mod users;
pub mod verticals;
pub mod voyance;

#[cfg(test)]
mod test_support;
