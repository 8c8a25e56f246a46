use nalgebra::{Matrix3, Point3, Vector3};

pub fn centroid(coords: &[Point3<f64>]) -> Point3<f64> {
    let sum = coords
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / coords.len().max(1) as f64)
}

/// RMSD after optimal rigid superposition (Kabsch). Reflections are not allowed.
pub fn kabsch_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let c1 = centroid(coords1);
    let c2 = centroid(coords2);
    let p: Vec<Vector3<f64>> = coords1.iter().map(|p| p - c1).collect();
    let q: Vec<Vector3<f64>> = coords2.iter().map(|q| q - c2).collect();

    let covariance: Matrix3<f64> = p
        .iter()
        .zip(q.iter())
        .fold(Matrix3::zeros(), |acc, (a, b)| acc + a * b.transpose());

    let svd = covariance.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let sign = if (v_t.transpose() * u.transpose()).determinant() < 0.0 {
        -1.0
    } else {
        1.0
    };
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, sign));
    let rotation = v_t.transpose() * correction * u.transpose();

    let squared_dist_sum: f64 = p
        .iter()
        .zip(q.iter())
        .map(|(a, b)| (rotation * a - b).norm_squared())
        .sum();
    Some((squared_dist_sum / p.len() as f64).sqrt())
}

/// Dihedral angle a-b-c-d in degrees, in (-180, 180].
pub fn dihedral_degrees(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalize());
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    y.atan2(x).to_degrees()
}

/// Angle a-b-c in degrees.
pub fn angle_degrees(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ba = a - b;
    let bc = c - b;
    let cos = ba.dot(&bc) / (ba.norm() * bc.norm());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed volume of the tetrahedron spanned by three unit bond vectors from `center`.
///
/// A perfect tetrahedral arrangement gives a magnitude of about 0.77; a planar one gives 0.
pub fn normalized_signed_volume(
    center: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> f64 {
    let va = (a - center).normalize();
    let vb = (b - center).normalize();
    let vc = (c - center).normalize();
    va.dot(&vb.cross(&vc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Unit};

    fn cloud() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(1.9, 1.4, 0.0),
            Point3::new(3.3, 1.6, 0.7),
        ]
    }

    #[test]
    fn kabsch_rmsd_is_zero_for_rigid_motion() {
        let original = cloud();
        let rotation =
            Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::new(1.0, 2.0, 3.0)), 1.1);
        let moved: Vec<_> = original
            .iter()
            .map(|p| rotation * p + Vector3::new(4.0, -2.0, 7.0))
            .collect();
        assert!(kabsch_rmsd(&original, &moved).unwrap() < 1e-8);
    }

    #[test]
    fn kabsch_rmsd_measures_internal_distortion() {
        let original = cloud();
        let mut stretched = original.clone();
        stretched[3] = Point3::new(5.3, 1.6, 0.7);
        assert!(kabsch_rmsd(&original, &stretched).unwrap() > 0.2);
    }

    #[test]
    fn kabsch_rmsd_of_identical_sets_is_zero() {
        assert!(kabsch_rmsd(&cloud(), &cloud()).unwrap() < 1e-12);
    }

    #[test]
    fn kabsch_rmsd_rejects_mismatched_sizes() {
        assert!(kabsch_rmsd(&cloud(), &cloud()[..2]).is_none());
        assert!(kabsch_rmsd(&[], &[]).is_none());
    }

    #[test]
    fn dihedral_of_trans_and_cis_arrangements() {
        let a = Point3::new(1.0, 1.0, 0.0);
        let b = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(0.0, 0.0, 1.5);
        let trans = Point3::new(-1.0, -1.0, 1.5);
        let cis = Point3::new(1.0, 1.0, 1.5);
        assert!((dihedral_degrees(&a, &b, &c, &trans).abs() - 180.0).abs() < 1e-9);
        assert!(dihedral_degrees(&a, &b, &c, &cis).abs() < 1e-9);
    }

    #[test]
    fn angle_of_right_angle() {
        let angle = angle_degrees(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(0.0, 2.0, 0.0),
        );
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn signed_volume_flips_with_handedness_and_vanishes_when_planar() {
        let center = Point3::origin();
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(0.0, 1.0, 0.0);
        let c = Point3::new(0.0, 0.0, 1.0);
        let v = normalized_signed_volume(&center, &a, &b, &c);
        assert!(v > 0.9);
        assert!((normalized_signed_volume(&center, &b, &a, &c) + v).abs() < 1e-12);
        let planar = Point3::new(-1.0, -1.0, 0.0);
        assert!(normalized_signed_volume(&center, &a, &b, &planar).abs() < 1e-12);
    }
}
