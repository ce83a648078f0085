//! 平面标定与屏幕映射集成测试

mod common;

use approx::assert_relative_eq;
use cobot_client::{PlaneFrame, RobotError, RobotContext};
use cobot_driver::MockKinematics;
use cobot_tools::{AppConfig, CalibrationStore, ReferencePoint, StorageConfig};
use common::{fixture, fixture_with};
use nalgebra::Vector3;
use tempfile::TempDir;

const START: [f64; 6] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];

fn calibrated(angles: [f64; 6]) -> (cobot_driver::MockArm, RobotContext) {
    let (arm, ctx) = fixture(0);
    ctx.state.update_ideal_angles(&angles);
    ctx.calibration
        .calibrate_from_orientation("wall", None)
        .unwrap();
    (arm, ctx)
}

#[test]
fn test_calibrate_from_orientation() {
    let (_arm, ctx) = calibrated(START);
    let cal = ctx.calibration.calibration("wall").unwrap();

    let pose = MockKinematics::forward(&START);
    assert_eq!(cal.point, [pose[0], pose[1], pose[2]]);
    assert_eq!(cal.orientation, [40.0, 50.0, 60.0]);
    assert_eq!(cal.reference_points.len(), 1);
    assert_eq!(cal.reference_points[0].angles, Some(START));

    let frame = PlaneFrame::from_calibration(&cal).unwrap();
    assert!(frame.local_x.dot(&frame.local_y).abs() < 1e-9);
    assert!(frame.local_x.dot(&frame.normal).abs() < 1e-9);
    assert!((frame.normal.cross(&frame.local_x) - frame.local_y).norm() < 1e-9);
}

#[test]
fn test_calibrate_initializes_from_hardware() {
    let (arm, ctx) = fixture(0);
    arm.set_angles(START);
    let cal = ctx.calibration.calibrate_from_orientation("wall", None).unwrap();
    assert!(ctx.state.is_initialized());
    assert_eq!(ctx.state.get_ideal_angles(), START);
    assert_eq!(cal.orientation, [40.0, 50.0, 60.0]);
}

#[test]
fn test_calibrate_falls_back_to_seed() {
    let (arm, ctx) = fixture(0);
    arm.set_fail_reads(true);
    assert!(
        ctx.calibration
            .calibrate_from_orientation("wall", None)
            .is_err()
    );
    ctx.calibration
        .calibrate_from_orientation("wall", Some(&START))
        .unwrap();
    assert_eq!(ctx.state.get_ideal_angles(), START);
}

#[test]
fn test_calibrate_rejects_bad_name() {
    let (_arm, ctx) = fixture(0);
    ctx.state.update_ideal_angles(&START);
    assert!(matches!(
        ctx.calibration.calibrate_from_orientation("a:b", None),
        Err(RobotError::Validation(_))
    ));
    assert!(ctx.calibration.calibrations().is_empty());
}

#[test]
fn test_move_in_plane_zero_is_identity() {
    let (arm, ctx) = calibrated(START);
    let sent = ctx.calibration.move_in_plane("wall", 0.0, 0.0).unwrap();
    for (a, b) in sent.iter().zip(START.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9);
    }
    assert_eq!(arm.last_sent().unwrap().speed, 50);
    let snap = ctx.state.snapshot();
    assert!(snap.plane_mode_active);
    assert!(snap.manual_control_active);
}

#[test]
fn test_move_in_plane_stays_in_plane() {
    let (_arm, ctx) = calibrated(START);
    let cal = ctx.calibration.calibration("wall").unwrap();
    let frame = PlaneFrame::from_calibration(&cal).unwrap();

    let sent = ctx.calibration.move_in_plane("wall", 10.0, -5.0).unwrap();
    let before = Vector3::from(cal.point);
    let after = {
        let c = MockKinematics::forward(&sent);
        Vector3::new(c[0], c[1], c[2])
    };
    let delta = after - before;
    assert_relative_eq!(delta.dot(&frame.normal), 0.0, epsilon = 1e-9);
    assert_relative_eq!(delta.dot(&frame.local_x), 10.0, epsilon = 1e-9);
    assert_relative_eq!(delta.dot(&frame.local_y), -5.0, epsilon = 1e-9);
    // 姿态不变
    assert_eq!(&sent[3..], &START[3..]);
    assert_eq!(ctx.state.get_ideal_angles(), sent);
}

#[test]
fn test_move_in_plane_unsolvable_keeps_state() {
    let (arm, ctx) = calibrated(START);
    arm.clear_sent();
    arm.set_ik_unsolvable(true);
    let err = ctx.calibration.move_in_plane("wall", 1.0, 1.0).unwrap_err();
    assert!(matches!(err, RobotError::KinematicsUnsolvable(_)));
    assert!(arm.sent_commands().is_empty());
    assert_eq!(ctx.state.get_ideal_angles(), START);
    assert!(matches!(
        ctx.calibration.move_in_plane("missing", 0.0, 0.0),
        Err(RobotError::Validation(_))
    ));
}

#[test]
fn test_ik_output_converted_before_send() {
    let (arm, ctx) = calibrated(START);
    // 驱动返回的是百分之一度
    arm.set_ik_override(Some(vec![1000.0, 2000.0, 3000.0, 4000.0, 5000.0, 6000.0]));
    let sent = ctx.calibration.move_in_plane("wall", 3.0, 3.0).unwrap();
    assert_eq!(sent, [10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    assert_eq!(arm.last_sent().unwrap().angles, sent);

    // 超出限位的逆解先限位再下发
    arm.set_ik_override(Some(vec![90000.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
    let sent = ctx.calibration.move_in_plane("wall", 0.0, 0.0).unwrap();
    assert_eq!(sent[0], 168.0);
}

#[test]
fn test_save_calibration_fits_plane() {
    let (_arm, ctx) = fixture(0);
    let points = vec![
        ReferencePoint::mapped([0.0, 0.0], [-100.0, 250.0, 300.0]),
        ReferencePoint::mapped([1920.0, 0.0], [100.0, 250.0, 300.0]),
        ReferencePoint::mapped([0.0, 1080.0], [-100.0, 250.0, 100.0]),
        ReferencePoint::mapped([1920.0, 1080.0], [100.0, 250.0, 100.0]),
    ];
    let (cal, fit) = ctx
        .calibration
        .save_calibration("wall", points, Some([90.0, 0.0, 0.0]))
        .unwrap();
    assert!(fit.fit_error < 1e-9);
    assert_relative_eq!(fit.normal[1].abs(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(cal.point[1], 250.0, epsilon = 1e-9);
    assert_eq!(cal.orientation, [90.0, 0.0, 0.0]);

    let too_few = vec![ReferencePoint::mapped([0.0, 0.0], [0.0; 3]); 2];
    assert!(matches!(
        ctx.calibration.save_calibration("bad", too_few, None),
        Err(RobotError::Validation(_))
    ));
}

#[test]
fn test_map_screen_to_world() {
    let (arm, ctx) = fixture(0);
    ctx.state.update_ideal_angles(&START);
    let points = vec![
        ReferencePoint::mapped([0.0, 0.0], [-100.0, 250.0, 300.0]),
        ReferencePoint::mapped([1920.0, 0.0], [100.0, 250.0, 300.0]),
        ReferencePoint::mapped([0.0, 1080.0], [-100.0, 250.0, 100.0]),
        ReferencePoint::mapped([1920.0, 1080.0], [100.0, 250.0, 100.0]),
    ];
    ctx.calibration
        .save_calibration("wall", points, Some([0.0, 0.0, 0.0]))
        .unwrap();

    let (world, angles) = ctx
        .calibration
        .map_screen_to_world("wall", [960.0, 540.0])
        .unwrap();
    assert_relative_eq!(world[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(world[1], 250.0, epsilon = 1e-9);
    assert_relative_eq!(world[2], 200.0, epsilon = 1e-9);
    // 线性模型 y = 2·j2，j2 = 125 在限位内
    assert_relative_eq!(angles[1], 125.0, epsilon = 1e-9);
    // 只求解，不下发
    assert!(arm.sent_commands().is_empty());
    assert_eq!(ctx.state.get_ideal_angles(), START);
}

#[test]
fn test_map_requires_screen_points() {
    let (_arm, ctx) = calibrated(START);
    assert!(matches!(
        ctx.calibration.map_screen_to_world("wall", [0.0, 0.0]),
        Err(RobotError::Validation(_))
    ));
}

#[test]
fn test_calibrations_persist() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        storage: StorageConfig::in_dir(dir.path()),
        ..Default::default()
    };
    let (_arm, ctx) = fixture_with(0, config.clone());
    ctx.state.update_ideal_angles(&START);
    let first = ctx
        .calibration
        .calibrate_from_orientation("wall", None)
        .unwrap();
    let second = ctx
        .calibration
        .calibrate_from_orientation("wall", None)
        .unwrap();
    assert_eq!(second.created, first.created);
    assert!(second.updated.is_some());

    let reopened = CalibrationStore::open(dir.path().join("calibrations.json"));
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get("wall").unwrap().normal, first.normal);

    ctx.calibration.delete_calibration("wall").unwrap();
    assert!(ctx.calibration.delete_calibration("wall").is_err());
    let (_arm, fresh) = fixture_with(0, config);
    assert!(fresh.calibration.calibrations().is_empty());
}
