//! Periodic attitude control loop
//!
//! One tick:
//! 1. consume the latest calibration snapshot, if any, and drive trim flight
//! 2. select the gain regime from time since start-up and the armed state
//! 3. feed the watchdog
//! 4. acquire and condition one sensor sample, raising the fault on timeout
//! 5. propagate the orientation and publish it
//!
//! The loop is the only writer of the estimator state. Settings changes reach
//! it exclusively through the [`CalibrationChannel`].

use crate::attitude::EstimatorState;
use crate::calibration::{Calibration, CalibrationChannel, TrimSession, TrimState};
use crate::error::{EstimatorError, Result};
use crate::schedule::{GainRegime, GainScheduler, Gains};
use crate::sensor::{SensorConditioner, SensorSource};
use crate::types::{
    ArmedState, AttitudeEstimate, AttitudeSettings, FilteredVectors, SensorSample, TrimFlight,
};

/// Time step used when two ticks share a clock reading, in seconds
pub const NOMINAL_DT: f32 = 0.001;

/// Millisecond clock since start-up
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Source of the vehicle armed state
pub trait FlightStatusSource {
    fn armed(&self) -> ArmedState;
}

/// Liveness heartbeat, fed once per tick whatever the outcome
pub trait Watchdog {
    fn feed(&mut self);
}

/// Binary sensor alarm
pub trait FaultSignal {
    fn raise(&mut self);
    fn clear(&mut self);
}

/// Consumers of the estimator outputs
pub trait AttitudeOutput {
    fn publish_attitude(&mut self, estimate: &AttitudeEstimate);

    /// Conditioned sensor sample, published every successful tick
    fn publish_sensors(&mut self, _sample: &SensorSample) {}

    /// Filtered accel and expected gravity, for tuning telemetry
    fn publish_filtered(&mut self, _filtered: &FilteredVectors) {}

    /// When true the attitude is written by someone else, such as a
    /// simulator, and propagation is skipped.
    fn is_read_only(&self) -> bool {
        false
    }
}

/// Persistent settings writer
///
/// A stored record is expected to come back through
/// [`CalibrationManager::on_settings_updated`](crate::CalibrationManager::on_settings_updated).
pub trait SettingsStore {
    fn store(&mut self, settings: &AttitudeSettings);
}

/// Everything the control loop needs from the flight controller
pub trait Platform:
    Clock + FlightStatusSource + Watchdog + FaultSignal + AttitudeOutput + SettingsStore
{
}

impl<T> Platform for T where
    T: Clock + FlightStatusSource + Watchdog + FaultSignal + AttitudeOutput + SettingsStore
{
}

/// Seconds between two clock readings
///
/// A zero delta becomes [`NOMINAL_DT`]. Clock wrap-around is handled.
pub fn delta_time(now_ms: u32, last_ms: u32) -> f32 {
    match now_ms.wrapping_sub(last_ms) {
        0 => NOMINAL_DT,
        delta => delta as f32 / 1000.0,
    }
}

/// Attitude estimation loop
///
/// # Example
/// ```
/// use cc_attitude::{
///     ArmedState, AttitudeEstimate, AttitudeOutput, AttitudeSettings, CalibrationChannel,
///     CalibrationManager, Clock, ControlLoop, FaultSignal, FlightStatusSource, RawSample,
///     SensorSource, SettingsStore, Watchdog,
/// };
/// use nalgebra::Vector3;
///
/// struct Level;
///
/// impl SensorSource for Level {
///     fn next_sample(&mut self, _timeout_ms: u32) -> Option<RawSample> {
///         Some(RawSample {
///             gyro: Vector3::zeros(),
///             accel: Vector3::new(0.0, 0.0, -9.81),
///             temperature: 25.0,
///         })
///     }
/// }
///
/// #[derive(Default)]
/// struct Board {
///     now_ms: u32,
///     last: Option<AttitudeEstimate>,
/// }
///
/// impl Clock for Board {
///     fn now_ms(&self) -> u32 { self.now_ms }
/// }
/// impl FlightStatusSource for Board {
///     fn armed(&self) -> ArmedState { ArmedState::Disarmed }
/// }
/// impl Watchdog for Board {
///     fn feed(&mut self) {}
/// }
/// impl FaultSignal for Board {
///     fn raise(&mut self) {}
///     fn clear(&mut self) {}
/// }
/// impl AttitudeOutput for Board {
///     fn publish_attitude(&mut self, estimate: &AttitudeEstimate) { self.last = Some(*estimate); }
/// }
/// impl SettingsStore for Board {
///     fn store(&mut self, _settings: &AttitudeSettings) {}
/// }
///
/// static CHANNEL: CalibrationChannel = CalibrationChannel::new();
///
/// CalibrationManager::new(&CHANNEL).on_settings_updated(&AttitudeSettings::default());
/// let mut control = ControlLoop::new(Level, Board::default(), &CHANNEL);
///
/// for _ in 0..10 {
///     control.platform_mut().now_ms += 4;
///     control.tick().unwrap();
/// }
/// assert_eq!(control.platform().last.unwrap().roll, 0.0);
/// ```
pub struct ControlLoop<'a, S, P> {
    conditioner: SensorConditioner<S>,
    platform: P,
    channel: &'a CalibrationChannel,
    calibration: Calibration,
    scheduler: GainScheduler,
    state: EstimatorState,
    trim: TrimSession,
    /// Newest settings record, including our own writes not yet echoed
    settings: AttitudeSettings,
    /// Last record handed to the store, until it comes back as a snapshot
    echo: Option<AttitudeSettings>,
    last_ms: Option<u32>,
    faulted: bool,
}

impl<'a, S: SensorSource, P: Platform> ControlLoop<'a, S, P> {
    /// Create a loop running on default settings until the first snapshot
    pub fn new(source: S, platform: P, channel: &'a CalibrationChannel) -> Self {
        let calibration = Calibration::default();
        Self {
            conditioner: SensorConditioner::new(source),
            platform,
            channel,
            scheduler: GainScheduler::new(&calibration.schedule),
            state: EstimatorState {
                bias: calibration.gyro_bias,
                ..Default::default()
            },
            settings: calibration.settings,
            calibration,
            trim: TrimSession::new(),
            echo: None,
            last_ms: None,
            faulted: false,
        }
    }

    /// Run one control tick
    ///
    /// Returns the new orientation, or `None` when nothing was propagated
    /// this tick: the attitude output is read-only or the gravity geometry
    /// was degenerate. A sensor timeout is returned as
    /// [`EstimatorError::SensorUnavailable`] after raising the fault signal;
    /// the estimator state is untouched.
    pub fn tick(&mut self) -> Result<Option<AttitudeEstimate>> {
        if let Some(calibration) = self.channel.try_take() {
            self.apply_calibration(calibration);
        }

        let now_ms = self.platform.now_ms();
        let armed = self.platform.armed();
        let gains = self.scheduler.update(now_ms, armed, &self.calibration.schedule);

        self.platform.feed();

        let (raw, sample) = match self.conditioner.acquire(
            &self.calibration,
            gains.yaw_bias_rate,
            &mut self.state.bias,
        ) {
            Ok(samples) => samples,
            Err(error) => {
                if !self.faulted {
                    log::warn!("attitude: {}", error);
                    self.faulted = true;
                }
                self.platform.raise();
                return Err(error);
            }
        };

        self.trim.accumulate(raw.accel);
        self.platform.publish_sensors(&sample);

        let mut published = None;
        if !self.platform.is_read_only() {
            let dt = match self.last_ms {
                Some(last_ms) => delta_time(now_ms, last_ms),
                None => NOMINAL_DT,
            };
            self.last_ms = Some(now_ms);

            let state = &mut self.state;
            match state.propagator.update(&sample, &gains, &mut state.bias, dt) {
                Ok(estimate) => {
                    self.platform.publish_attitude(&estimate);
                    published = Some(estimate);
                }
                Err(EstimatorError::DegenerateGeometry) => {
                    log::trace!("attitude: degenerate gravity geometry, holding orientation");
                }
                Err(error) => return Err(error),
            }
            self.platform.publish_filtered(&self.state.propagator.filtered());
        }

        if self.faulted {
            log::info!("attitude: sensor recovered");
            self.faulted = false;
        }
        self.platform.clear();

        Ok(published)
    }

    /// Run ticks for the lifetime of the process
    ///
    /// Pacing comes from the sensor source blocking for its next sample.
    pub fn run(&mut self) -> ! {
        loop {
            // every failure is recoverable on the next tick
            let _ = self.tick();
        }
    }

    /// Write the learned gyro bias back into the settings
    ///
    /// The record is based on the newest settings, so an accelerometer bias
    /// just written by a trim load is kept, and carries no trim command.
    pub fn persist_gyro_bias(&mut self) {
        let settings = AttitudeSettings {
            gyro_bias: self.state.bias.to_settings(),
            trim_flight: TrimFlight::Normal,
            ..self.settings
        };
        log::info!("attitude: storing gyro bias {:?}", settings.gyro_bias);
        self.store(settings);
    }

    fn store(&mut self, settings: AttitudeSettings) {
        self.platform.store(&settings);
        self.settings = settings;
        self.echo = Some(settings);
    }

    fn apply_calibration(&mut self, calibration: Calibration) {
        log::debug!("attitude: applying settings snapshot");
        let rotate = calibration.schedule.rotate_enabled;
        if rotate != self.calibration.schedule.rotate_enabled {
            log::info!("attitude: board rotation {}", if rotate { "enabled" } else { "disabled" });
        }

        self.calibration = calibration;
        self.settings = calibration.settings;
        self.state.bias = calibration.gyro_bias;
        self.scheduler.on_schedule_changed(&calibration.schedule);

        // our own write coming back is not a trim command
        if self.echo.take_if(|echo| *echo == calibration.settings).is_some() {
            return;
        }

        match (calibration.trim, self.trim.state()) {
            (TrimFlight::Load, _) => match self.trim.load() {
                Ok(accel_bias) => {
                    log::info!(
                        "trim flight: {} samples, accel bias {:?}",
                        self.trim.samples(),
                        accel_bias
                    );
                    self.store(AttitudeSettings {
                        accel_bias,
                        trim_flight: TrimFlight::Normal,
                        ..calibration.settings
                    });
                }
                Err(error) => log::warn!("trim flight: {}", error),
            },
            (TrimFlight::Start, _) => {
                log::info!("trim flight: collecting");
                self.trim.start();
            }
            (TrimFlight::Normal, TrimState::Collecting) => {
                log::info!("trim flight: aborted after {} samples", self.trim.samples());
                self.trim.abort();
            }
            (TrimFlight::Normal, TrimState::Idle) => {}
        }
    }

    /// Newest settings record known to the loop
    pub fn settings(&self) -> &AttitudeSettings {
        &self.settings
    }

    pub fn state(&self) -> &EstimatorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EstimatorState {
        &mut self.state
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn regime(&self) -> GainRegime {
        self.scheduler.regime()
    }

    /// Gains applied on the last tick
    pub fn gains(&self) -> Gains {
        self.scheduler.gains()
    }

    pub fn trim(&self) -> &TrimSession {
        &self.trim
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn source(&self) -> &S {
        self.conditioner.source()
    }

    pub fn source_mut(&mut self) -> &mut S {
        self.conditioner.source_mut()
    }
}
