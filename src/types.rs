//! Core types shared by the attitude estimator: the settings record, sensor
//! samples and the published attitude.

use nalgebra::{UnitQuaternion, Vector3};

/// Standard gravity in m/s²
pub const GRAVITY: f32 = 9.81;

/// Accelerometer bias LSB in m/s² (0.004 g per count)
pub const ACCEL_SCALE: f32 = GRAVITY * 0.004;

/// Divisor between the stored `gyro_bias` counts and deg/s
pub const GYRO_BIAS_DIVISOR: f32 = 100.0;

/// Trim-flight command embedded in the settings record
///
/// Writing [`TrimFlight::Start`] begins collecting accelerometer samples,
/// writing [`TrimFlight::Load`] turns the collected mean into a new
/// accelerometer bias. Anything else aborts a collection in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrimFlight {
    #[default]
    Normal,
    Start,
    Load,
}

/// Arming state reported by the flight status object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmedState {
    #[default]
    Disarmed,
    /// The pilot is holding the arming gesture
    Arming,
    Armed,
}

/// Attitude settings record
///
/// Mirrors the persisted settings object the estimator is configured from.
/// Every change to it is delivered to the
/// [`CalibrationManager`](crate::CalibrationManager), which turns it into an
/// immutable [`Calibration`](crate::Calibration) snapshot for the control loop.
///
/// # Example
/// ```
/// use cc_attitude::{AttitudeSettings, TrimFlight};
///
/// let settings = AttitudeSettings {
///     accel_kp: 0.1,
///     board_rotation: [0.0, 0.0, 90.0], // board mounted rotated 90° in yaw
///     trim_flight: TrimFlight::Start,
///     ..Default::default()
/// };
/// assert_eq!(settings.accel_ki, 0.0001);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttitudeSettings {
    /// Proportional gain of the accelerometer correction
    pub accel_kp: f32,
    /// Integral gain of the accelerometer correction (units of seconds)
    pub accel_ki: f32,
    /// Rate at which the yaw gyro bias is driven towards a zero mean
    pub yaw_bias_rate: f32,
    /// Gyro gain used by the stabilization loop. Carried, not used here.
    pub gyro_gain: f32,
    /// Re-learn the gyro bias while the vehicle is arming
    pub zero_during_arming: bool,
    /// Feed the learned gyro bias forward into the published gyro rates
    pub bias_correct_gyro: bool,
    /// Accelerometer bias in [`ACCEL_SCALE`] counts
    pub accel_bias: [i16; 3],
    /// Gyro bias in hundredths of a deg/s
    pub gyro_bias: [i16; 3],
    /// Board mounting offset as roll, pitch, yaw in degrees
    pub board_rotation: [f32; 3],
    /// Trim-flight command
    pub trim_flight: TrimFlight,
}

impl Default for AttitudeSettings {
    fn default() -> Self {
        Self {
            accel_kp: 0.05,
            accel_ki: 0.0001,
            yaw_bias_rate: 0.000001,
            gyro_gain: 0.42,
            zero_during_arming: true,
            bias_correct_gyro: true,
            accel_bias: [0; 3],
            gyro_bias: [0; 3],
            board_rotation: [0.0; 3],
            trim_flight: TrimFlight::Normal,
        }
    }
}

/// Raw sensor reading as delivered by the [`SensorSource`](crate::SensorSource)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Angular rate in deg/s, sensor frame
    pub gyro: Vector3<f32>,
    /// Specific force in m/s², sensor frame. Reads -g on Z when level.
    pub accel: Vector3<f32>,
    /// Die temperature in °C
    pub temperature: f32,
}

/// Conditioned sample: mount-rotated, bias-corrected, ready for propagation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Body angular rate in deg/s, learned bias fed forward
    pub gyro: Vector3<f32>,
    /// Body specific force in m/s², accelerometer bias removed
    pub accel: Vector3<f32>,
    /// Die temperature in °C
    pub temperature: f32,
}

/// Low-passed vectors used for the gravity correction, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredVectors {
    /// Measured acceleration after filtering
    pub accel: Vector3<f32>,
    /// Expected gravity direction after filtering
    pub gravity: Vector3<f32>,
}

/// Published attitude estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeEstimate {
    /// Body orientation, scalar part non-negative
    pub quaternion: UnitQuaternion<f32>,
    /// Roll in degrees
    pub roll: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Yaw in degrees
    pub yaw: f32,
}

impl Default for AttitudeEstimate {
    fn default() -> Self {
        Self {
            quaternion: UnitQuaternion::identity(),
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}
