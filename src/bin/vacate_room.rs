//! vacate-room - force a bridge's ghost users out of a room.

use anyhow::Context;
use appservice_admin::cli::{EXIT_CONFIG, VacateArgs, error_label, exit_code, parse_args};
use appservice_admin::registration::Registration;
use appservice_admin::workflow::vacate_room;
use appservice_admin::{WorkflowError, telemetry};
use std::process::ExitCode;
use tracing::{Instrument, error};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args::<VacateArgs, _, _>(std::env::args_os()) {
        Ok(args) => args,
        Err(code) => return code,
    };
    telemetry::init(args.connection.verbose);

    let Some((connection, request)) = args.validate() else {
        println!("{}", VacateArgs::MISSING_HINT);
        return ExitCode::from(EXIT_CONFIG);
    };

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

        let report = vacate_room(&factory, &registration, &request).await?;
        anyhow::Ok(report)
    };

    match run.instrument(telemetry::spans::vacate(&request.room_id)).await {
        Ok(report) => {
            println!(
                "Vacated {}: {} users left",
                report.room_id,
                report.departed.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), code = error_label(&e), "Vacate failed");
            exit_code(&e)
        }
    }
}
