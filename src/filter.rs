//! Fourth-order low-pass filter used to smooth the gravity correction
//!
//! Digital 4th order Chebyshev type II low pass, `cheby2(4, 60, 10/200)`:
//! 60 dB stop-band attenuation with a 10 Hz cutoff at a 400 Hz sample rate.

use nalgebra::Vector3;

const B: [f32; 5] = [
    0.00098778675104,
    -0.00376234890193,
    0.00555374469529,
    -0.00376234890193,
    0.00098778675104,
];

const A: [f32; 4] = [
    -3.87812973499889,
    5.64176257281588,
    -3.64887595541910,
    0.88524773799562,
];

/// Single-channel filter history
///
/// Holds the last four inputs and outputs, most recent first. The history is
/// only ever cleared by constructing a new filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FourthOrderFilter {
    inputs: [f32; 4],
    outputs: [f32; 4],
}

impl FourthOrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample and shift it into the history
    ///
    /// A NaN input propagates into the history.
    ///
    /// # Example
    /// ```
    /// use cc_attitude::FourthOrderFilter;
    ///
    /// let mut filter = FourthOrderFilter::new();
    /// let first = filter.apply(1.0);
    /// assert!((first - 0.00098778675104).abs() < 1e-9);
    /// ```
    pub fn apply(&mut self, input: f32) -> f32 {
        let x = &self.inputs;
        let y = &self.outputs;

        let output = B[0] * input + B[1] * x[0] + B[2] * x[1] + B[3] * x[2] + B[4] * x[3]
            - A[0] * y[0]
            - A[1] * y[1]
            - A[2] * y[2]
            - A[3] * y[3];

        self.inputs = [input, x[0], x[1], x[2]];
        self.outputs = [output, y[0], y[1], y[2]];

        output
    }

    /// Most recent inputs, newest first
    pub fn inputs(&self) -> [f32; 4] {
        self.inputs
    }

    /// Most recent outputs, newest first
    pub fn outputs(&self) -> [f32; 4] {
        self.outputs
    }
}

/// One independent filter per vector axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VectorFilter {
    axes: [FourthOrderFilter; 3],
}

impl VectorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, input: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            self.axes[0].apply(input.x),
            self.axes[1].apply(input.y),
            self.axes[2].apply(input.z),
        )
    }

    /// Filter when `enabled`, otherwise pass the input through and leave the
    /// history untouched
    pub fn apply_if(&mut self, enabled: bool, input: Vector3<f32>) -> Vector3<f32> {
        if enabled { self.apply(input) } else { input }
    }
}
