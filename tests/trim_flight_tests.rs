mod common;

use cc_attitude::{
    ACCEL_SCALE, AttitudeSettings, CalibrationManager, ControlLoop, GRAVITY, TrimFlight,
    TrimState,
};
use common::{BenchSensor, Board, run, step};
use nalgebra::Vector3;

fn trim_command(trim_flight: TrimFlight) -> AttitudeSettings {
    AttitudeSettings {
        trim_flight,
        ..Default::default()
    }
}

#[test]
fn test_trim_flight_writes_accel_bias() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let sensor = BenchSensor::with(Vector3::zeros(), Vector3::new(0.2, -0.1, -9.51));
    let mut control = ControlLoop::new(sensor, Board::at(8000), &channel);

    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    run(&mut control, 50);
    assert_eq!(control.trim().state(), TrimState::Collecting);
    assert_eq!(control.trim().samples(), 50);

    manager.on_settings_updated(&trim_command(TrimFlight::Load));
    step(&mut control).unwrap();
    assert_eq!(control.trim().state(), TrimState::Idle);

    // 0.2 / ACCEL_SCALE = 5.1, -0.1 / ACCEL_SCALE = -2.5, 250 - 242.4 = 7.6
    let stored = control.platform().stored.last().copied().unwrap();
    assert_eq!(stored.accel_bias, [5, -3, 8]);
    assert_eq!(stored.trim_flight, TrimFlight::Normal);

    // the store reports the change back like any other settings update
    manager.on_settings_updated(&stored);
    step(&mut control).unwrap();
    assert_eq!(control.trim().state(), TrimState::Idle);

    let sample = control.platform().sensors.last().copied().unwrap();
    assert!(sample.accel.x.abs() <= ACCEL_SCALE / 2.0, "x {}", sample.accel.x);
    assert!(sample.accel.y.abs() <= ACCEL_SCALE / 2.0, "y {}", sample.accel.y);
    assert!((sample.accel.z + GRAVITY).abs() <= ACCEL_SCALE / 2.0, "z {}", sample.accel.z);
}

#[test]
fn test_trim_keeps_other_settings() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let mut control = ControlLoop::new(BenchSensor::level(), Board::at(8000), &channel);

    let settings = AttitudeSettings {
        accel_kp: 0.2,
        board_rotation: [0.0, 0.0, 45.0],
        ..Default::default()
    };
    manager.on_settings_updated(&AttitudeSettings {
        trim_flight: TrimFlight::Start,
        ..settings
    });
    run(&mut control, 5);
    manager.on_settings_updated(&AttitudeSettings {
        trim_flight: TrimFlight::Load,
        ..settings
    });
    step(&mut control).unwrap();

    let stored = control.platform().stored.last().copied().unwrap();
    assert_eq!(stored.accel_kp, 0.2);
    assert_eq!(stored.board_rotation, [0.0, 0.0, 45.0]);
}

#[test]
fn test_load_without_start_is_ignored() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let mut control = ControlLoop::new(BenchSensor::level(), Board::at(8000), &channel);

    manager.on_settings_updated(&trim_command(TrimFlight::Load));
    step(&mut control).unwrap();

    assert!(control.platform().stored.is_empty());
    assert_eq!(control.trim().state(), TrimState::Idle);
}

#[test]
fn test_load_without_samples_is_ignored() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let mut control = ControlLoop::new(BenchSensor::level(), Board::at(8000), &channel);

    control.source_mut().available = false;
    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    assert!(step(&mut control).is_err());
    assert_eq!(control.trim().state(), TrimState::Collecting);

    control.source_mut().available = true;
    manager.on_settings_updated(&trim_command(TrimFlight::Load));
    step(&mut control).unwrap();

    assert!(control.platform().stored.is_empty());
    assert_eq!(control.trim().state(), TrimState::Idle);
}

#[test]
fn test_normal_aborts_collection() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let mut control = ControlLoop::new(BenchSensor::level(), Board::at(8000), &channel);

    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    run(&mut control, 3);
    manager.on_settings_updated(&trim_command(TrimFlight::Normal));
    run(&mut control, 3);

    assert_eq!(control.trim().state(), TrimState::Idle);
    assert_eq!(control.trim().samples(), 3);
}

#[test]
fn test_restart_discards_previous_samples() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let mut control = ControlLoop::new(BenchSensor::level(), Board::at(8000), &channel);

    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    run(&mut control, 10);
    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    run(&mut control, 4);

    assert_eq!(control.trim().samples(), 4);
}

#[test]
fn test_persisting_gyro_bias_keeps_trim_collection() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let sensor = BenchSensor::with(Vector3::zeros(), Vector3::new(0.2, -0.1, -9.51));
    let mut control = ControlLoop::new(sensor, Board::at(8000), &channel);

    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    run(&mut control, 20);

    control.persist_gyro_bias();
    let stored = control.platform().stored.last().copied().unwrap();
    assert_eq!(stored.trim_flight, TrimFlight::Normal);

    // the write coming back must neither restart nor abort the collection
    manager.on_settings_updated(&stored);
    step(&mut control).unwrap();
    assert_eq!(control.trim().state(), TrimState::Collecting);
    assert_eq!(control.trim().samples(), 21);

    manager.on_settings_updated(&trim_command(TrimFlight::Load));
    step(&mut control).unwrap();
    assert_eq!(control.trim().state(), TrimState::Idle);

    let stored = control.platform().stored.last().copied().unwrap();
    assert_eq!(stored.accel_bias, [5, -3, 8]);
}

#[test]
fn test_persist_after_load_keeps_new_accel_bias() {
    let channel = common::channel();
    let manager = CalibrationManager::new(&channel);
    let sensor = BenchSensor::with(Vector3::zeros(), Vector3::new(0.2, -0.1, -9.51));
    let mut control = ControlLoop::new(sensor, Board::at(8000), &channel);

    manager.on_settings_updated(&trim_command(TrimFlight::Start));
    run(&mut control, 10);
    manager.on_settings_updated(&trim_command(TrimFlight::Load));
    step(&mut control).unwrap();

    // persist before the trim result has come back from the store
    control.persist_gyro_bias();
    let stored = control.platform().stored.last().copied().unwrap();
    assert_eq!(control.platform().stored.len(), 2);
    assert_eq!(stored.accel_bias, [5, -3, 8]);
    assert_eq!(stored.trim_flight, TrimFlight::Normal);

    manager.on_settings_updated(&stored);
    step(&mut control).unwrap();
    assert_eq!(control.trim().state(), TrimState::Idle);
    assert_eq!(control.calibration().settings.accel_bias, [5, -3, 8]);
    assert_eq!(control.platform().stored.len(), 2);
}
