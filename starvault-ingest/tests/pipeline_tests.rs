//! End-to-end: scan a night of exposures, build sessions, link them

mod helpers;

use helpers::{create_test_db, repository_config, write_exposure, ExposureSpec};
use starvault_ingest::db::files::files_in_session;
use starvault_ingest::db::sessions::list_sessions;
use starvault_ingest::fits::Value;
use starvault_ingest::{
    build_calibration_sessions, build_light_sessions, link_sessions, register_tree, FrameType,
    RunContext,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_full_pipeline() {
    let (_db_dir, pool) = create_test_db().await;
    let scan = TempDir::new().unwrap();
    let root = scan.path();

    for (i, time) in ["22:00:00", "22:05:00", "22:10:00"].iter().enumerate() {
        write_exposure(
            &root.join("lights"),
            &format!("light_{}.fits", i),
            &ExposureSpec::light("NGC 7000", &format!("2024-05-02T{}", time))
                .with("FILTER", Value::String("Ha".to_string())),
        );
    }
    for (i, stamp) in ["2024-05-01T23:00:00", "2024-05-02T04:00:00"].iter().enumerate() {
        write_exposure(
            &root.join("darks"),
            &format!("dark_{}.fits", i),
            &ExposureSpec::new("Dark Frame", stamp),
        );
    }
    write_exposure(
        &root.join("bias"),
        "bias_0.fits",
        &ExposureSpec::new("Bias Frame", "2024-05-01T20:00:00").with("EXPTIME", Value::Float(0.0)),
    );
    write_exposure(
        &root.join("flats"),
        "flat_0.fits",
        &ExposureSpec::new("Flat Field", "2024-05-02T21:00:00")
            .with("FILTER", Value::String("Ha".to_string()))
            .with("EXPTIME", Value::Float(2.0)),
    );

    let config = repository_config(root, root, true);
    let mut ctx = RunContext::detached();

    let scan_summary = register_tree(&pool, &config, root, &mut ctx).await.unwrap();
    assert_eq!(scan_summary.succeeded, 7);

    let lights = build_light_sessions(&pool, &mut ctx).await.unwrap();
    assert_eq!(lights.ids.len(), 1);
    let calibrations = build_calibration_sessions(&pool, &mut ctx).await.unwrap();
    assert_eq!(calibrations.ids.len(), 3);

    let linked = link_sessions(&pool, &mut ctx).await.unwrap();
    assert_eq!(linked.ids, lights.ids);

    let sessions = list_sessions(&pool).await.unwrap();
    let light = sessions
        .iter()
        .find(|s| s.frame_type == FrameType::Light)
        .unwrap();
    assert_eq!(light.group_key, "NGC7000");
    assert!(light.missing_links().is_empty());
    assert_eq!(files_in_session(&pool, light.guid).await.unwrap().len(), 3);

    let dark = sessions
        .iter()
        .find(|s| s.frame_type == FrameType::Dark)
        .unwrap();
    assert_eq!(light.dark_session_id, Some(dark.guid));
    assert_eq!(files_in_session(&pool, dark.guid).await.unwrap().len(), 2);

    assert!(root
        .join("Light/NGC7000/ScopeA/CamA/20240502/NGC7000-ScopeA-CamA-Ha-20240502220000-300s-1x1-t-10.fits")
        .exists());
    assert!(root.join("Calibrate/Flat/ScopeA/CamA/Ha/20240502").is_dir());
    assert!(root.join("Calibrate/Bias/ScopeA/CamA/0s/20240501").is_dir());
}
