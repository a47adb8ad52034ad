//! Reflection, refraction and the dielectric Fresnel term.

use crate::Vec3;

/// Mirror `incident` about `normal`.
///
/// `incident` points towards the surface; the result points away from it.
#[inline]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * incident.dot(normal) * normal
}

/// Refract `incident` through a surface with relative index `eta = ir1 / ir2`.
///
/// `normal` must face against `incident`. Returns `None` on total internal
/// reflection.
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -incident.dot(normal);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    let refracted = eta * incident + (eta * cos_i - k.sqrt()) * normal;
    Some(refracted.normalize_or_zero())
}

/// Fraction of light reflected at an interface going from index `ir1` into
/// index `ir2`.
///
/// Uses the unpolarised average of the exact s/p Fresnel equations. Total
/// internal reflection returns exactly `1.0`.
pub fn fresnel(incident: Vec3, normal: Vec3, ir1: f32, ir2: f32) -> f32 {
    let cos_i = incident.dot(normal).abs().min(1.0);
    let eta = ir1 / ir2;
    let sin_t2 = eta * eta * (1.0 - cos_i * cos_i);

    if sin_t2 >= 1.0 {
        return 1.0;
    }

    let cos_t = (1.0 - sin_t2).sqrt();
    let denom_s = ir1 * cos_i + ir2 * cos_t;
    let denom_p = ir2 * cos_i + ir1 * cos_t;
    if denom_s.abs() < f32::EPSILON || denom_p.abs() < f32::EPSILON {
        return 1.0;
    }

    let rs = (ir1 * cos_i - ir2 * cos_t) / denom_s;
    let rp = (ir2 * cos_i - ir1 * cos_t) / denom_p;
    ((rs * rs + rp * rp) / 2.0).clamp(0.0, 1.0)
}
