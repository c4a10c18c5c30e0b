//! Arbitration logic: viewer roles, timeout eligibility, outcome records,
//! the reconciliation engine, and the per-viewer session driver.

pub mod outcome;
pub mod reconcile;
pub mod role;
pub mod session;
pub mod timeout;
