//! Shared-exponent RGB compression (Ward's RGBE).
//!
//! Photon power is kept in 4 bytes: three 8-bit mantissas and one exponent
//! shared by all channels. Packing truncates, so each channel loses at most
//! `max_channel / 128` and never gains energy.

use crate::Vec3;

/// Channels whose largest component is below this value pack to zero.
pub const RGBE_MIN_VALUE: f32 = 1e-32;

/// Exponent bias applied to the stored exponent byte.
const EXPONENT_BIAS: i32 = 128;

/// Mantissa bits per channel.
const MANTISSA_BITS: i32 = 8;

/// Four-byte compressed RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgbe(pub [u8; 4]);

impl Rgbe {
    /// The all-zero encoding.
    pub const ZERO: Rgbe = Rgbe([0; 4]);

    /// Compress a linear RGB triple.
    ///
    /// Negative and NaN channels are treated as zero; values too large for
    /// the exponent byte saturate.
    pub fn pack(color: Vec3) -> Rgbe {
        let clean = |c: f32| if c.is_nan() { 0.0 } else { c.max(0.0) };
        let (r, g, b) = (clean(color.x), clean(color.y), clean(color.z));
        let v = r.max(g).max(b);

        if v < RGBE_MIN_VALUE {
            return Rgbe::ZERO;
        }
        if !v.is_finite() {
            return Rgbe([255, 255, 255, 255]);
        }

        let exponent = frexp_exponent(v);
        if exponent + EXPONENT_BIAS > 255 {
            return Rgbe([255, 255, 255, 255]);
        }

        let scale = 2f32.powi(MANTISSA_BITS - exponent);
        Rgbe([
            (r * scale) as u8,
            (g * scale) as u8,
            (b * scale) as u8,
            (exponent + EXPONENT_BIAS) as u8,
        ])
    }

    /// Expand back to linear RGB.
    pub fn unpack(&self) -> Vec3 {
        let [r, g, b, e] = self.0;
        if e == 0 {
            return Vec3::ZERO;
        }

        let f = 2f32.powi(e as i32 - (EXPONENT_BIAS + MANTISSA_BITS));
        Vec3::new(r as f32 * f, g as f32 * f, b as f32 * f)
    }

    /// Whether this encodes black.
    pub fn is_zero(&self) -> bool {
        self.0[3] == 0
    }
}

impl From<Vec3> for Rgbe {
    fn from(color: Vec3) -> Self {
        Rgbe::pack(color)
    }
}

/// Exponent `e` such that `v = m * 2^e` with `m` in `[0.5, 1)`.
///
/// Only valid for positive normal floats, which is all `pack` ever passes.
fn frexp_exponent(v: f32) -> i32 {
    let biased = ((v.to_bits() >> 23) & 0xff) as i32;
    biased - 126
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(packed: Vec3, original: Vec3) {
        let max = original.max_element();
        let diff = (packed - original).abs();
        assert!(
            diff.max_element() <= max / 128.0,
            "{:?} too far from {:?}",
            packed,
            original
        );
        // Truncation never adds energy
        assert!(packed.x <= original.x && packed.y <= original.y && packed.z <= original.z);
    }

    #[test]
    fn test_frexp_exponent() {
        assert_eq!(frexp_exponent(1.0), 1); // 1.0 = 0.5 * 2^1
        assert_eq!(frexp_exponent(0.5), 0);
        assert_eq!(frexp_exponent(0.75), 0);
        assert_eq!(frexp_exponent(8.0), 4);
    }

    #[test]
    fn test_pack_zero() {
        assert_eq!(Rgbe::pack(Vec3::ZERO), Rgbe::ZERO);
        assert_eq!(Rgbe::pack(Vec3::splat(1e-40)), Rgbe::ZERO);
        assert_eq!(Rgbe::ZERO.unpack(), Vec3::ZERO);
        assert!(Rgbe::ZERO.is_zero());
    }

    #[test]
    fn test_pack_precision_bounded() {
        let colors = [
            Vec3::new(1.0, 0.5, 0.25),
            Vec3::new(0.001, 0.002, 0.0005),
            Vec3::new(1234.5, 10.0, 0.1),
            Vec3::new(3.0e-5, 3.0e-5, 3.0e-5),
        ];
        for c in colors {
            assert_close(Rgbe::pack(c).unpack(), c);
        }
    }

    #[test]
    fn test_powers_of_two_are_exact() {
        let c = Vec3::new(0.5, 0.25, 0.125);
        assert_eq!(Rgbe::pack(c).unpack(), c);
    }

    #[test]
    fn test_negative_channels_clamp() {
        let packed = Rgbe::pack(Vec3::new(-1.0, 0.5, f32::NAN)).unpack();
        assert_eq!(packed.x, 0.0);
        assert_eq!(packed.y, 0.5);
        assert_eq!(packed.z, 0.0);
    }
}
