#![allow(dead_code)]

use cc_attitude::{
    ArmedState, AttitudeEstimate, AttitudeOutput, AttitudeSettings, CalibrationChannel, Clock,
    ControlLoop, FaultSignal, FilteredVectors, FlightStatusSource, GRAVITY, RawSample,
    SensorSample, SensorSource, SettingsStore, Watchdog,
};
use nalgebra::Vector3;

/// Control tick period in milliseconds
pub const TICK_MS: u32 = 4;

/// Sensor that repeats one sample, with a switch to simulate timeouts
pub struct BenchSensor {
    pub sample: RawSample,
    pub available: bool,
}

impl BenchSensor {
    pub fn level() -> Self {
        Self::with(Vector3::zeros(), Vector3::new(0.0, 0.0, -GRAVITY))
    }

    pub fn with(gyro: Vector3<f32>, accel: Vector3<f32>) -> Self {
        Self {
            sample: RawSample {
                gyro,
                accel,
                temperature: 25.0,
            },
            available: true,
        }
    }
}

impl SensorSource for BenchSensor {
    fn next_sample(&mut self, _timeout_ms: u32) -> Option<RawSample> {
        self.available.then_some(self.sample)
    }
}

/// Records everything the control loop does to the outside world
#[derive(Default)]
pub struct Board {
    pub now_ms: u32,
    pub armed: ArmedState,
    pub read_only: bool,
    pub feeds: u32,
    pub fault: bool,
    pub raises: u32,
    pub attitudes: Vec<AttitudeEstimate>,
    pub sensors: Vec<SensorSample>,
    pub filtered: Vec<FilteredVectors>,
    pub stored: Vec<AttitudeSettings>,
}

impl Board {
    pub fn at(now_ms: u32) -> Self {
        Self {
            now_ms,
            ..Default::default()
        }
    }
}

impl Clock for Board {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }
}

impl FlightStatusSource for Board {
    fn armed(&self) -> ArmedState {
        self.armed
    }
}

impl Watchdog for Board {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

impl FaultSignal for Board {
    fn raise(&mut self) {
        self.fault = true;
        self.raises += 1;
    }

    fn clear(&mut self) {
        self.fault = false;
    }
}

impl AttitudeOutput for Board {
    fn publish_attitude(&mut self, estimate: &AttitudeEstimate) {
        self.attitudes.push(*estimate);
    }

    fn publish_sensors(&mut self, sample: &SensorSample) {
        self.sensors.push(*sample);
    }

    fn publish_filtered(&mut self, filtered: &FilteredVectors) {
        self.filtered.push(*filtered);
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl SettingsStore for Board {
    fn store(&mut self, settings: &AttitudeSettings) {
        self.stored.push(*settings);
    }
}

pub type BenchLoop<'a> = ControlLoop<'a, BenchSensor, Board>;

/// Advance the board clock one period and run a tick
pub fn step(control: &mut BenchLoop<'_>) -> cc_attitude::Result<Option<AttitudeEstimate>> {
    control.platform_mut().now_ms += TICK_MS;
    control.tick()
}

/// Run `ticks` periods, panicking on any error
pub fn run(control: &mut BenchLoop<'_>, ticks: usize) {
    for _ in 0..ticks {
        step(control).unwrap();
    }
}

pub fn channel() -> CalibrationChannel {
    CalibrationChannel::new()
}
