//! Stored photon record.

use lux_math::{Color, Rgbe, Vec3};

/// A photon deposited on a diffuse surface.
///
/// `direction` is the direction of travel when the photon arrived, so the
/// light came from `-direction`. Power is kept RGBE-compressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    pub position: Vec3,
    pub direction: Vec3,
    pub power: Rgbe,
    /// Refractive index of the medium the photon travelled through.
    pub ref_index: f32,
}

impl Photon {
    pub fn new(position: Vec3, direction: Vec3, power: Color, ref_index: f32) -> Self {
        Self {
            position,
            direction,
            power: Rgbe::pack(power),
            ref_index,
        }
    }

    /// Decompressed power.
    #[inline]
    pub fn power(&self) -> Color {
        self.power.unpack()
    }

    /// Whether the photon arrived on the side of the surface `normal` faces.
    #[inline]
    pub fn arrives_from(&self, normal: Vec3) -> bool {
        normal.dot(-self.direction) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photon_power_roundtrip() {
        let photon = Photon::new(Vec3::ZERO, Vec3::NEG_Y, Color::new(0.5, 0.25, 0.125), 1.0);
        assert_eq!(photon.power(), Color::new(0.5, 0.25, 0.125));
    }

    #[test]
    fn test_arrives_from() {
        let photon = Photon::new(Vec3::ZERO, Vec3::NEG_Y, Color::ONE, 1.0);
        assert!(photon.arrives_from(Vec3::Y));
        assert!(!photon.arrives_from(Vec3::NEG_Y));
    }
}
