//! Main petal executable entry point.
//!
//! # Architecture
//!
//! One planning cycle is run:
//!
//!     - Initialise the session and logging
//!     - Initialise the petal from its parameter files
//!     - Read a batch of move requests, either from a JSON file, a single request given on the
//!       command line, or the demo batch in the params directory
//!     - Plan the batch and archive the schedule in the session
//!     - Apply the schedule to the arm states if it was resolved

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use petal_lib::petal::{Petal, PetalFiles};
use pos_if::{AnticolMode, RequestBatch, RequestCmd};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Plan one batch of positioner moves.
#[derive(Debug, StructOpt)]
#[structopt(name = "petal_exec")]
struct Args {
    /// JSON file containing a request batch
    #[structopt(short, long, parse(from_os_str))]
    requests: Option<PathBuf>,

    /// Anticollision mode (off, freeze or adjust), overriding the batch's own
    #[structopt(short, long)]
    mode: Option<AnticolMode>,

    /// Log at trace level
    #[structopt(short, long)]
    verbose: bool,

    /// A single request to plan instead of a batch
    #[structopt(subcommand)]
    cmd: Option<RequestCmd>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("petal_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Petal Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE PETAL ----

    let mut petal = Petal::default();
    petal
        .init(PetalFiles::default(), Some(&session))
        .wrap_err("Failed to initialise the petal")?;
    info!("Petal initialised with {} arms", petal.arena().len());

    // ---- LOAD REQUESTS ----

    let mut batch = match (&args.cmd, &args.requests) {
        (Some(cmd), _) => RequestBatch {
            requests: vec![cmd.clone().into()],
            ..RequestBatch::default()
        },
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Could not read request file {:?}", path))?;
            RequestBatch::from_json(&json).wrap_err("Could not parse the request batch")?
        }
        (None, None) => util::params::load("requests_demo.toml")
            .wrap_err("Could not load the demo request batch")?,
    };
    if let Some(mode) = args.mode {
        batch.mode = mode;
    }

    info!(
        "Planning {} requests in {} mode",
        batch.requests.len(),
        batch.mode
    );

    // ---- PLAN ----

    let (schedule, report) = petal
        .proc(&batch)
        .wrap_err("Failed to schedule the batch")?;

    info!("Status: {:#?}", report);
    for (id, arm_report) in schedule.report.iter() {
        if arm_report.frozen || arm_report.adjusted_count > 0 {
            info!(
                "{}: frozen = {}, adjusted {} times, reason {:?}",
                id, arm_report.frozen, arm_report.adjusted_count, arm_report.reason
            );
        }
    }

    session.save("schedule.json", schedule.clone());

    // ---- COMMIT ----

    if schedule.is_resolved() {
        let n = petal
            .commit(&schedule)
            .wrap_err("Failed to apply the schedule")?;
        info!("{} arms updated", n);
    } else {
        warn!(
            "Batch could not be scheduled, {} conflicts unresolved",
            schedule.unresolved.len()
        );
    }

    session.exit();

    Ok(())
}
