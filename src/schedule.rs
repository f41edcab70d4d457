//! Gain scheduling between fast convergence and steady flight
//!
//! For a fixed window after start-up, and while arming when enabled, the
//! estimator runs with high fixed gains and no filtering so the gyro bias
//! converges quickly. Stored gains are loaded once on return to steady state.

use crate::calibration::GainSchedule;
use crate::types::ArmedState;

/// Start of the bootstrap window, milliseconds since start-up (exclusive)
pub const BOOTSTRAP_START_MS: u32 = 1000;

/// End of the bootstrap window, milliseconds since start-up (exclusive)
pub const BOOTSTRAP_END_MS: u32 = 7000;

/// Operating regime of the estimator gains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainRegime {
    /// Start-up bias learning window
    Bootstrap,
    /// Bias re-learning while the pilot arms
    Arming,
    SteadyState,
}

/// Gains actually applied by the propagator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub yaw_bias_rate: f32,
    pub filter_enabled: bool,
}

impl Gains {
    /// Gains forced during bootstrap and arming
    pub const FAST_CONVERGENCE: Gains = Gains {
        kp: 1.0,
        ki: 0.9,
        yaw_bias_rate: 0.23,
        filter_enabled: false,
    };

    pub fn from_schedule(schedule: &GainSchedule) -> Self {
        Self {
            kp: schedule.kp,
            ki: schedule.ki,
            yaw_bias_rate: schedule.yaw_bias_rate,
            filter_enabled: schedule.filter_enabled,
        }
    }
}

/// Regime state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainScheduler {
    regime: GainRegime,
    active: Gains,
}

impl GainScheduler {
    /// Start in steady state with the stored gains loaded
    pub fn new(schedule: &GainSchedule) -> Self {
        Self {
            regime: GainRegime::SteadyState,
            active: Gains::from_schedule(schedule),
        }
    }

    pub fn regime(&self) -> GainRegime {
        self.regime
    }

    pub fn gains(&self) -> Gains {
        self.active
    }

    /// Select the regime for this tick and return the gains to apply
    ///
    /// # Example
    /// ```
    /// use cc_attitude::{ArmedState, GainRegime, GainSchedule, GainScheduler, Gains};
    ///
    /// let schedule = GainSchedule::default();
    /// let mut scheduler = GainScheduler::new(&schedule);
    ///
    /// let gains = scheduler.update(2000, ArmedState::Disarmed, &schedule);
    /// assert_eq!(scheduler.regime(), GainRegime::Bootstrap);
    /// assert_eq!(gains, Gains::FAST_CONVERGENCE);
    /// ```
    pub fn update(&mut self, now_ms: u32, armed: ArmedState, schedule: &GainSchedule) -> Gains {
        let next = if now_ms > BOOTSTRAP_START_MS && now_ms < BOOTSTRAP_END_MS {
            GainRegime::Bootstrap
        } else if schedule.zero_during_arming && armed == ArmedState::Arming {
            GainRegime::Arming
        } else {
            GainRegime::SteadyState
        };

        match next {
            GainRegime::Bootstrap | GainRegime::Arming => self.active = Gains::FAST_CONVERGENCE,
            GainRegime::SteadyState if self.regime != GainRegime::SteadyState => {
                self.active = Gains::from_schedule(schedule);
            }
            GainRegime::SteadyState => {}
        }

        if next != self.regime {
            log::info!("attitude gains: {:?} -> {:?}", self.regime, next);
            self.regime = next;
        }

        self.active
    }

    /// Pick up changed stored gains immediately when in steady state
    pub fn on_schedule_changed(&mut self, schedule: &GainSchedule) {
        if self.regime == GainRegime::SteadyState {
            self.active = Gains::from_schedule(schedule);
        }
    }
}
