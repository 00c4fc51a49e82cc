use idlework_data::load_catalog;
use idlework_demo::bundled_data_dir;
use idlework_demo::session::run_session;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn bundled_catalog_loads_cleanly() {
    let catalog = load_catalog(&bundled_data_dir()).unwrap();
    assert_eq!(catalog.resources.len(), 4);
    assert_eq!(catalog.structures.len(), 3);
    assert_eq!(catalog.config.workforce.base_allowance, 6);

    let game = catalog.into_builder().build().unwrap();
    assert!(game.economy().catalog_report().skipped.is_empty());
}

#[test]
fn scripted_session_runs_end_to_end() {
    let catalog = load_catalog(&bundled_data_dir()).unwrap();
    let summary = run_session(&catalog).unwrap();

    assert_eq!(summary.frames, 1_010);
    assert_eq!(summary.fixed_updates, 1_010);
    // The locked quarry purchase is refused.
    assert!(summary.rejected_commands >= 1);

    let pause = summary.pause_credit.as_ref().unwrap();
    assert!(approx(pause.credited_seconds, 420.0));
    let offline = summary.resume_credit.as_ref().unwrap();
    assert!(approx(offline.credited_seconds, 2_520.0));
    assert!(summary.snapshot_bytes > 0);

    for view in &summary.resources {
        assert!(view.amount >= 0.0);
        if let Some(max) = view.max_amount {
            assert!(view.amount <= max);
        }
    }
    let threat = summary.resources.iter().find(|v| v.key == "threat").unwrap();
    assert!(approx(threat.per_second, 0.25));
}

#[test]
fn sessions_are_deterministic() {
    let catalog = load_catalog(&bundled_data_dir()).unwrap();
    let a = run_session(&catalog).unwrap();
    let b = run_session(&catalog).unwrap();
    let amounts = |s: &idlework_demo::session::SessionSummary| {
        s.resources.iter().map(|v| v.amount).collect::<Vec<_>>()
    };
    assert_eq!(amounts(&a), amounts(&b));
}
