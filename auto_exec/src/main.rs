//! Main autonomous executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Parse the match configuration from the command line
//!     - Main loop at the cycle rate:
//!         - Advance the simulated robot models
//!         - Run one cycle of the autonomous controller
//!         - Stop on completion or when the period clock runs out
//!     - Save the run report into the session directory
//!
//! The executable drives the controller against the simulated robot, which is
//! how routes are checked off the field. The port traits are the seam where a
//! hardware-backed robot would be plugged in instead.
//!
//! # Usage
//!
//! ```text
//! auto_exec <blue|red> <near|far> [yellow] [park] [spike=<near|middle|far>]
//! ```
//!
//! The `spike=` argument scripts the spike sensor readings for the run,
//! defaulting to the middle mark.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use auto_lib::{
    auto_mgr::{AutoCtrl, AutoCtrlParams},
    match_config::{Alliance, MatchConfig, SpikeMark, StageSide},
    ports::ClockPort,
    sim::SimRig,
    CYCLE_PERIOD_S, MATCH_AUTO_PERIOD_S,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("auto_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Autonomous Period Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let auto_params: AutoCtrlParams =
        util::params::load("auto_ctrl.toml").wrap_err("Could not load autonomous parameters")?;

    info!("Exec parameters loaded");

    // ---- PARSE MATCH CONFIGURATION ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let (config, spike) = parse_args(&args)?;

    info!(
        "Match configuration: {:?} alliance, {:?} stage side, place_yellow: {}, park_from_far: {}",
        config.alliance, config.stage_side, config.place_yellow, config.park_from_far
    );
    info!("Scripted spike sensors will report the {:?} mark\n", spike);

    // ---- INITIALISE MODELS AND CONTROLLER ----

    let mut rig = SimRig::with_spike(spike == SpikeMark::Near, spike == SpikeMark::Far);

    let mut auto = AutoCtrl::new(auto_params, config);

    {
        let mut ports = rig.ports();
        auto.start(&mut ports);
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut num_cycles: u64 = 0;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- MODEL PROPAGATION ----

        rig.step();

        // ---- AUTONOMY PROCESSING ----

        {
            let mut ports = rig.ports();
            auto.run(&mut ports);
        }

        if auto.is_complete() {
            info!(
                "Run complete after {:.02} s ({} cycles)",
                rig.clock.elapsed_seconds(),
                num_cycles
            );
            break;
        }

        // Force everything to a stop when the period clock runs out
        if rig.clock.elapsed_seconds() >= MATCH_AUTO_PERIOD_S {
            warn!(
                "Autonomous period over ({:.0} s), aborting in phase {}",
                MATCH_AUTO_PERIOD_S,
                auto.current_phase()
            );

            let mut ports = rig.ports();
            auto.abort(&mut ports);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    let report = auto.report();
    info!(
        "Final state: phase {}, {} commands scheduled, spike mark {:?}",
        report.final_phase,
        report.commands_scheduled,
        auto.resolved_spike_mark()
    );

    session.save("auto_report.json", &report);

    info!("End of execution");

    Ok(())
}

/// Parse the command line into a match configuration and the scripted spike
/// mark.
fn parse_args(args: &[String]) -> Result<(MatchConfig, SpikeMark), Report> {
    if args.len() < 3 {
        return Err(eyre!(
            "Expected at least two arguments: <blue|red> <near|far>"
        ));
    }

    let alliance = match args[1].to_lowercase().as_str() {
        "blue" => Alliance::Blue,
        "red" => Alliance::Red,
        other => return Err(eyre!("Unknown alliance \"{}\"", other)),
    };

    let stage_side = match args[2].to_lowercase().as_str() {
        "near" => StageSide::Near,
        "far" => StageSide::Far,
        other => return Err(eyre!("Unknown stage side \"{}\"", other)),
    };

    let mut place_yellow = false;
    let mut park_from_far = false;
    let mut spike = SpikeMark::Middle;

    for arg in &args[3..] {
        match arg.to_lowercase().as_str() {
            "yellow" => place_yellow = true,
            "park" => park_from_far = true,
            "spike=near" => spike = SpikeMark::Near,
            "spike=middle" => spike = SpikeMark::Middle,
            "spike=far" => spike = SpikeMark::Far,
            other => return Err(eyre!("Unknown argument \"{}\"", other)),
        }
    }

    Ok((
        MatchConfig::new(alliance, place_yellow, stage_side, park_from_far),
        spike,
    ))
}
