//! The two operator workflows.
//!
//! Both run every remote request strictly in sequence and stop at the first
//! failure without undoing earlier steps.

mod send;
mod vacate;

pub use send::{SendReport, SendRequest, send_message};
pub use vacate::{VacateReport, VacateRequest, bridged_members, vacate_room};
