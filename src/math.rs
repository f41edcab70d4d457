//! Rotation helpers on top of nalgebra, in the roll-pitch-yaw convention used
//! by the estimator (aerospace Z-Y-X, angles in degrees).

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Extension trait for UnitQuaternion conversions
pub trait QuaternionExt {
    /// Euler angles (roll, pitch, yaw) in degrees
    fn to_rpy_degrees(&self) -> Vector3<f32>;

    /// Quaternion from roll, pitch, yaw in degrees, scalar part non-negative
    fn from_rpy_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;

    /// Matrix that maps earth-frame vectors into the body frame
    fn earth_to_body(&self) -> Matrix3<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn to_rpy_degrees(&self) -> Vector3<f32> {
        let (roll, pitch, yaw) = self.euler_angles();
        Vector3::new(roll, pitch, yaw) * RAD_TO_DEG
    }

    fn from_rpy_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        let q = UnitQuaternion::from_euler_angles(
            roll * DEG_TO_RAD,
            pitch * DEG_TO_RAD,
            yaw * DEG_TO_RAD,
        );
        if q.w < 0.0 {
            UnitQuaternion::new_unchecked(-q.into_inner())
        } else {
            q
        }
    }

    fn earth_to_body(&self) -> Matrix3<f32> {
        self.to_rotation_matrix().into_inner().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rpy_round_trip() {
        let rpy = Vector3::new(30.0, 45.0, 60.0);
        let q = UnitQuaternion::from_rpy_degrees(rpy.x, rpy.y, rpy.z);
        let recovered = q.to_rpy_degrees();

        assert!((rpy - recovered).norm() < 1e-3);
    }

    #[test]
    fn test_from_rpy_is_canonical() {
        // yaw of 270° lands on a negative scalar before canonicalisation
        let q = UnitQuaternion::from_rpy_degrees(0.0, 0.0, 270.0);
        assert!(q.w >= 0.0);
        assert_relative_eq!(q.to_rpy_degrees().z, -90.0, epsilon = 1e-3);
    }

    #[test]
    fn test_earth_to_body_yaw() {
        // Nose pointing east: earth north appears on the body's -Y axis
        let q = UnitQuaternion::from_rpy_degrees(0.0, 0.0, 90.0);
        let north = q.earth_to_body() * Vector3::x();

        assert_relative_eq!(north, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_earth_to_body_is_orthonormal() {
        let q = UnitQuaternion::from_rpy_degrees(12.0, -7.0, 130.0);
        let r = q.earth_to_body();

        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-5);
    }
}
