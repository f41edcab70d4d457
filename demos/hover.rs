use cc_attitude::{
    ArmedState, AttitudeEstimate, AttitudeOutput, AttitudeSettings, CalibrationChannel,
    CalibrationManager, Clock, ControlLoop, FaultSignal, FlightStatusSource, GRAVITY,
    QuaternionExt, RawSample, SensorSource, SettingsStore, Watchdog,
};
use nalgebra::{UnitQuaternion, Vector3};

const TICK_MS: u32 = 4; // 250 Hz

/// Hovering board with a slightly biased gyro
struct Hover;

impl SensorSource for Hover {
    fn next_sample(&mut self, _timeout_ms: u32) -> Option<RawSample> {
        // replace this with actual gyro data in deg/s and accel data in m/s²
        Some(RawSample {
            gyro: Vector3::new(0.8, -0.4, 0.1),
            accel: Vector3::new(0.0, 0.0, -GRAVITY),
            temperature: 30.0,
        })
    }
}

#[derive(Default)]
struct Board {
    now_ms: u32,
    estimate: AttitudeEstimate,
}

impl Clock for Board {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }
}

impl FlightStatusSource for Board {
    fn armed(&self) -> ArmedState {
        ArmedState::Disarmed
    }
}

impl Watchdog for Board {
    fn feed(&mut self) {}
}

impl FaultSignal for Board {
    fn raise(&mut self) {
        println!("sensor timeout");
    }

    fn clear(&mut self) {}
}

impl AttitudeOutput for Board {
    fn publish_attitude(&mut self, estimate: &AttitudeEstimate) {
        self.estimate = *estimate;
    }
}

impl SettingsStore for Board {
    fn store(&mut self, settings: &AttitudeSettings) {
        println!("store {:?}", settings);
    }
}

static CHANNEL: CalibrationChannel = CalibrationChannel::new();

fn main() {
    let manager = CalibrationManager::new(&CHANNEL);
    manager.on_settings_updated(&AttitudeSettings::default());

    let mut control = ControlLoop::new(Hover, Board::default(), &CHANNEL);

    // start from a wrong guess and watch it level out
    let tilted = UnitQuaternion::from_rpy_degrees(15.0, -10.0, 0.0);
    control.state_mut().propagator.set_quaternion(tilted.into_inner());

    for _ in 0..10 * 1000 / TICK_MS {
        // this loop should repeat each time new sensor data is available
        control.platform_mut().now_ms += TICK_MS;
        let _ = control.tick();

        let now_ms = control.platform().now_ms;
        if now_ms % 1000 == 0 {
            let estimate = control.platform().estimate;
            let bias = control.state().bias.estimate();
            println!(
                "{:>5} ms {:?}: Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2}, Bias: [{:.3}, {:.3}, {:.3}]",
                now_ms,
                control.regime(),
                estimate.roll,
                estimate.pitch,
                estimate.yaw,
                bias.x,
                bias.y,
                bias.z
            );
        }
    }

    control.persist_gyro_bias();
}
