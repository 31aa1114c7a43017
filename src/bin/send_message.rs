//! send-message - message a user as a bridged user through a new private room.

use anyhow::Context;
use appservice_admin::cli::{
    EXIT_CONFIG, SendArgs, error_label, exit_code, parse_args, until_interrupted,
};
use appservice_admin::registration::Registration;
use appservice_admin::workflow::send_message;
use appservice_admin::{WorkflowError, telemetry};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args::<SendArgs, _, _>(std::env::args_os()) {
        Ok(args) => args,
        Err(code) => return code,
    };
    telemetry::init(args.connection.verbose);

    let Some((connection, request)) = args.validate() else {
        println!("{}", SendArgs::MISSING_HINT);
        return ExitCode::from(EXIT_CONFIG);
    };

    // The first Ctrl-C abandons the run, whichever request is in flight.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, giving up");
            on_interrupt.cancel();
        }
    });

    let run = async {
        let registration = Registration::load(&connection.registration)
            .map_err(WorkflowError::from)
            .with_context(|| {
                format!(
                    "Failed to load registration: {}",
                    connection.registration.display()
                )
            })?;
        let factory = connection
            .factory(&registration)
            .map_err(WorkflowError::from)?;

        let report = send_message(&factory, &request, &cancel).await?;
        anyhow::Ok(report)
    };

    let run = run.instrument(telemetry::spans::send(&request.sender, &request.target));
    match until_interrupted(run, &cancel).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), code = error_label(&e), "Send failed");
            exit_code(&e)
        }
    }
}
