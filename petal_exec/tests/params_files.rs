//! The parameter files shipped in the params directory load and plan

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use petal_lib::{
    collider::ColliderParams,
    petal::{Petal, PetalParams},
    schedule::{Reason, ScheduleParams},
    transforms::FocalSurface,
};
use pos_if::{ArmId, RequestBatch};
use std::path::PathBuf;
use util::{module::State, params};

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

fn params_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("params")
        .join(name)
}

fn load_petal() -> Petal {
    let petal: PetalParams = params::load_path(params_path("petal.toml")).unwrap();
    let collider: ColliderParams = params::load_path(params_path("collider.toml")).unwrap();
    let schedule: ScheduleParams = params::load_path(params_path("schedule.toml")).unwrap();
    let focal: FocalSurface = params::load_path(params_path("focal_surface.toml")).unwrap();

    Petal::from_params(&petal, collider, schedule, focal).unwrap()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[test]
fn test_defaults_match_files() {
    let collider: ColliderParams = params::load_path(params_path("collider.toml")).unwrap();
    assert_eq!(collider.keepout_phi, ColliderParams::default().keepout_phi);
    assert_eq!(collider.keepout_theta, ColliderParams::default().keepout_theta);

    let schedule: ScheduleParams = params::load_path(params_path("schedule.toml")).unwrap();
    assert_eq!(schedule, ScheduleParams::default());

    let focal: FocalSurface = params::load_path(params_path("focal_surface.toml")).unwrap();
    assert_eq!(focal, FocalSurface::default());
}

#[test]
fn test_demo_batch() {
    let mut petal = load_petal();
    assert_eq!(petal.arena().len(), 7);
    assert_eq!(petal.collider().unwrap().fixed_near(ArmId(1001)), &[0]);

    let batch: RequestBatch = params::load_path(params_path("requests_demo.toml")).unwrap();
    let (schedule, report) = petal.proc(&batch).unwrap();

    assert!(report.resolved);
    assert_eq!(report.n_requests, 6);
    assert_eq!(schedule.report[&ArmId(1005)].reason, Some(Reason::Unreachable));
    assert_eq!(schedule.report[&ArmId(1006)].reason, Some(Reason::Disabled));

    // The centre arm and 1001 reach into each other, so at least one of them must give way
    let centre = &schedule.report[&ArmId(1000)];
    let outer = &schedule.report[&ArmId(1001)];
    assert!(centre.frozen || centre.adjusted_count > 0 || outer.frozen || outer.adjusted_count > 0);

    assert_eq!(
        schedule.tables.keys().copied().collect::<Vec<_>>(),
        vec![ArmId(1000), ArmId(1001), ArmId(1002), ArmId(1004)]
    );

    let n = petal.commit(&schedule).unwrap();
    assert_eq!(n, 4);
}
