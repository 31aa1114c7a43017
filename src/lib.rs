//! appservice-admin - operator tools for Matrix application-service bridges.
//!
//! Two workflows drive a homeserver through the client/server API using a
//! bridge's registration:
//! - [`workflow::vacate_room`] forces every ghost user out of a room
//! - [`workflow::send_message`] messages a user as a ghost through a new
//!   private room, once the user has joined it

pub mod cli;
pub mod client;
pub mod error;
pub mod poll;
pub mod prefix;
pub mod registration;
pub mod telemetry;
pub mod workflow;

pub use error::{ClientError, PollError, PrefixError, WorkflowError};
pub use registration::Registration;
