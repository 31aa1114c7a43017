//! Integration test common infrastructure.
//!
//! Provides a fake homeserver speaking the client/server API and helpers for
//! writing registration files.

pub mod server;

#[allow(unused_imports)]
pub use server::{RecordedRequest, TestHomeserver};

use std::io::Write;
use tempfile::NamedTempFile;

/// Registration with a `@_bridge_.*` users namespace.
#[allow(dead_code)]
pub const BRIDGE_REGISTRATION: &str = r#"
id: test-bridge
hs_token: hs-token
as_token: as-token
url: http://localhost:9000
sender_localpart: _bridge_bot
namespaces:
  users:
    - exclusive: true
      regex: "@_bridge_.*"
  aliases: []
  rooms: []
"#;

/// Registration declaring no user namespaces.
#[allow(dead_code)]
pub const BARE_REGISTRATION: &str = r#"
as_token: as-token
sender_localpart: _bridge_bot
"#;

/// Write `content` to a temporary registration file.
#[allow(dead_code)]
pub fn registration_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create registration file");
    file.write_all(content.as_bytes())
        .expect("Failed to write registration file");
    file
}
