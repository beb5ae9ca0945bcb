//! Conversions between point poses and homogeneous transforms.
//!
//! W, P and R are rotations about the fixed X, Y and Z axes applied in that
//! order, so the rotation matrix is `Rz(R) * Ry(P) * Rx(W)`.

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

use crate::program::Pose;
use crate::{Error, Result};

pub type Transform = Matrix4<f64>;

pub fn pose_to_transform(pose: &Pose) -> Transform {
    let rotation = Rotation3::from_euler_angles(
        pose.w.to_radians(),
        pose.p.to_radians(),
        pose.r.to_radians(),
    );
    let mut m = rotation.to_homogeneous();
    m.fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&Vector3::new(pose.x, pose.y, pose.z));
    m
}

/// Decompose a transform back into a pose. The rotation part does not have
/// to be orthonormal (an averaged transform is not).
pub fn transform_to_pose(m: &Transform) -> Pose {
    let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let (w, p, r) = Rotation3::from_matrix_unchecked(r).euler_angles();
    Pose {
        x: m[(0, 3)],
        y: m[(1, 3)],
        z: m[(2, 3)],
        w: w.to_degrees(),
        p: p.to_degrees(),
        r: r.to_degrees(),
    }
}

pub fn midpoint(a: &Transform, b: &Transform) -> Transform {
    (a + b) * 0.5
}

/// Express `point`, given in `old_frame`, in `new_frame` keeping it fixed in space.
pub fn convert_frame(point: &Transform, old_frame: &Transform, new_frame: &Transform) -> Result<Transform> {
    let inverse = new_frame.try_inverse().ok_or(Error::SingularTransform)?;
    Ok(inverse * old_frame * point)
}

/// All entries of `a` and `b` differ by at most `margin`.
pub fn approx_eq(a: &Transform, b: &Transform, margin: f64) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= margin)
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: &Pose, b: &Pose) -> bool {
        a.as_array()
            .iter()
            .zip(b.as_array())
            .all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn pose_round_trip() {
        let pose = Pose::new(1200.5, -350.25, 800.0, -90.0, 30.0, 170.0);
        let back = transform_to_pose(&pose_to_transform(&pose));
        assert!(close(&pose, &back), "{:?}", back);
    }

    #[test]
    fn rotation_order() {
        // R = 90 turns X onto Y
        let m = pose_to_transform(&Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 90.0));
        let v = m * nalgebra::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((v.x).abs() < 1e-9 && (v.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn average() {
        let a = pose_to_transform(&Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 10.0));
        let b = pose_to_transform(&Pose::new(100.0, 50.0, -20.0, 0.0, 0.0, 10.0));
        let mid = transform_to_pose(&midpoint(&a, &b));
        assert!(close(&mid, &Pose::new(50.0, 25.0, -10.0, 0.0, 0.0, 10.0)), "{:?}", mid);
    }

    #[test]
    fn frame_conversion() {
        let point = pose_to_transform(&Pose::new(10.0, 20.0, 30.0, 0.0, 0.0, 0.0));
        let old = pose_to_transform(&Pose::new(100.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        let new = pose_to_transform(&Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 90.0));
        let converted = transform_to_pose(&convert_frame(&point, &old, &new).unwrap());
        // world position is (110, 20, 30); in a frame rotated 90 degrees about Z
        assert!(close(&converted, &Pose::new(20.0, -110.0, 30.0, 0.0, 0.0, -90.0)), "{:?}", converted);
        assert!(convert_frame(&point, &old, &Transform::zeros()).is_err());
    }
}
