//! Command-line arguments shared by the binaries.
//!
//! Required flags are declared optional so a missing one prints the short
//! usage hint and exits with [`EXIT_CONFIG`] instead of clap's own error.
//! Any other usage error exits with [`EXIT_CONFIG`] as well.

use crate::client::http::DEFAULT_CSAPI;
use crate::client::{FactoryConfig, HttpClientFactory};
use crate::error::{ClientError, WorkflowError};
use crate::poll::{DEFAULT_POLL_INTERVAL, PollConfig};
use crate::registration::Registration;
use crate::workflow::{SendRequest, VacateRequest};
use clap::error::ErrorKind;
use clap::{Args, Parser};
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exit code for configuration problems found before any request.
pub const EXIT_CONFIG: u8 = 1;
/// Exit code for failures once requests have started.
pub const EXIT_FAILURE: u8 = 2;

/// Flags identifying the bridge and the homeserver.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// The appservice registration file to read
    #[arg(short, long, value_name = "appservice-whatever.yaml")]
    pub registration: Option<PathBuf>,

    /// The domain that suffixes all IDs.
    #[arg(short, long, value_name = "domain.com")]
    pub domain: Option<String>,

    /// The base URL to use for client/server API interaction.
    #[arg(short = 'a', long, value_name = "http://localhost:8008", default_value = DEFAULT_CSAPI)]
    pub csapi: String,

    /// Log requests and poll attempts
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated connection settings.
#[derive(Debug, Clone)]
pub struct Connection {
    pub registration: PathBuf,
    pub domain: String,
    pub csapi: String,
}

impl Connection {
    /// Build the client factory for a loaded registration.
    pub fn factory(&self, registration: &Registration) -> Result<HttpClientFactory, ClientError> {
        HttpClientFactory::new(FactoryConfig {
            app_service_user_id: registration.sender_user_id(&self.domain),
            token: registration.as_token.clone(),
            base_url: self.csapi.clone(),
        })
    }
}

impl ConnectionArgs {
    fn validate(&self) -> Option<Connection> {
        Some(Connection {
            registration: self.registration.clone()?,
            domain: self.domain.clone()?,
            csapi: self.csapi.clone(),
        })
    }
}

/// Vacate Room: forces the bridge to leave the room, including all of its ghosts
#[derive(Debug, Parser)]
#[command(name = "vacate-room", version)]
pub struct VacateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// The user prefix to group on. Required if the prefix cannot be determined from the registration.
    #[arg(short = 'u', long = "userprefix", value_name = "@_bridged")]
    pub user_prefix: Option<String>,

    /// The room ID to vacate
    #[arg(short = 'i', long = "roomId", value_name = "!someroom:domain.com")]
    pub room_id: Option<String>,

    /// Also make the bridge bot leave once its ghosts have
    #[arg(long)]
    pub include_bot: bool,
}

impl VacateArgs {
    pub const MISSING_HINT: &'static str = "Missing registration, domain, or roomId. Please see -h";

    /// Required flags, or `None` when one is missing.
    pub fn validate(&self) -> Option<(Connection, VacateRequest)> {
        let connection = self.connection.validate()?;
        let request = VacateRequest {
            room_id: self.room_id.clone()?,
            user_prefix: self.user_prefix.clone(),
            include_bot: self.include_bot,
        };
        Some((connection, request))
    }
}

/// Send Message: messages a user as a bridged user through a new private room
#[derive(Debug, Parser)]
#[command(name = "send-message", version)]
pub struct SendArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// The user to impersonate
    #[arg(short, long, value_name = "@_bridged_user:domain.com")]
    pub user: Option<String>,

    /// The user to target
    #[arg(short, long, value_name = "@someone:domain.com")]
    pub target: Option<String>,

    /// The message to send
    #[arg(short, long, value_name = "words go here")]
    pub message: Option<String>,

    /// Milliseconds between checks for the target joining
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Give up after this many membership checks
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Give up after waiting this many seconds for the target to join
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

impl SendArgs {
    pub const MISSING_HINT: &'static str =
        "Missing registration, domain, user, target, or message. Please see -h";

    /// Required flags, or `None` when one is missing.
    pub fn validate(&self) -> Option<(Connection, SendRequest)> {
        let connection = self.connection.validate()?;
        let request = SendRequest {
            sender: self.user.clone()?,
            target: self.target.clone()?,
            body: self.message.clone()?,
            poll: PollConfig {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.max_attempts,
                timeout: self.timeout_secs.map(Duration::from_secs),
            },
        };
        Some((connection, request))
    }
}

/// Exit code for a clap error: 0 for help and version output, otherwise
/// [`EXIT_CONFIG`].
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => EXIT_CONFIG,
    }
}

/// Parse `args`, printing clap's output and returning the exit code on error.
pub fn parse_args<P, I, T>(args: I) -> Result<P, ExitCode>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    P::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        ExitCode::from(usage_exit_code(&e))
    })
}

/// Run `work` until it finishes or `cancel` fires.
///
/// A finished `work` wins over a simultaneous cancellation so its own error
/// is the one reported.
pub async fn until_interrupted<T, F>(work: F, cancel: &CancellationToken) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        result = work => result,
        _ = cancel.cancelled() => Err(anyhow::anyhow!("Interrupted")),
    }
}

/// Exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<WorkflowError>() {
        Some(e) if e.is_configuration() => ExitCode::from(EXIT_CONFIG),
        _ => ExitCode::from(EXIT_FAILURE),
    }
}

/// Log label for a failed run.
pub fn error_label(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<WorkflowError>()
        .map_or("other", WorkflowError::error_code)
}
