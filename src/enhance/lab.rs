//! 8-bit sRGB <-> CIE L*a*b* (D65) conversion.
//!
//! The colour math goes through `palette`; this module only packs the result
//! into 8 bits as `L * 255 / 100`, `a + 128` and `b + 128`, rounded and
//! saturated to `0..=255`.

use palette::white_point::D65;
use palette::{IntoColor, Lab, LinSrgb, Srgb};
use rgb::RGB8;

type LabD65 = Lab<D65, f32>;

/// One pixel in 8-bit Lab encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lab8 {
    pub l: u8,
    pub a: u8,
    pub b: u8,
}

/// Round half to even and clamp into `u8`.
#[inline]
pub(crate) fn saturate_u8(v: f32) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Convert an sRGB pixel to 8-bit Lab.
#[must_use]
pub fn rgb_to_lab(p: RGB8) -> Lab8 {
    let srgb = Srgb::new(
        f32::from(p.r) / 255.0,
        f32::from(p.g) / 255.0,
        f32::from(p.b) / 255.0,
    );
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: LabD65 = lin.into_color();

    Lab8 {
        l: saturate_u8(lab.l * 255.0 / 100.0),
        a: saturate_u8(lab.a + 128.0),
        b: saturate_u8(lab.b + 128.0),
    }
}

/// Convert an 8-bit Lab pixel back to sRGB.
#[must_use]
pub fn lab_to_rgb(lab: Lab8) -> RGB8 {
    let lab = LabD65::new(
        f32::from(lab.l) * 100.0 / 255.0,
        f32::from(lab.a) - 128.0,
        f32::from(lab.b) - 128.0,
    );
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);

    let encode = |v: f32| saturate_u8(v.clamp(0.0, 1.0) * 255.0);
    RGB8::new(encode(srgb.red), encode(srgb.green), encode(srgb.blue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white() {
        assert_eq!(rgb_to_lab(RGB8::new(0, 0, 0)), Lab8 { l: 0, a: 128, b: 128 });
        let white = rgb_to_lab(RGB8::new(255, 255, 255));
        assert_eq!(white.l, 255);
        assert!(white.a.abs_diff(128) <= 1);
        assert!(white.b.abs_diff(128) <= 1);
    }

    #[test]
    fn test_gray_is_neutral() {
        let lab = rgb_to_lab(RGB8::new(128, 128, 128));
        assert!(lab.a.abs_diff(128) <= 1);
        assert!(lab.b.abs_diff(128) <= 1);
        // L* of sRGB 128 is about 53.6
        assert!(lab.l.abs_diff(137) <= 1);
    }

    #[test]
    fn test_saturated_red() {
        // L* 53.2, a* 80.1, b* 67.2
        let lab = rgb_to_lab(RGB8::new(255, 0, 0));
        assert!(lab.l.abs_diff(136) <= 1);
        assert!(lab.a.abs_diff(208) <= 1);
        assert!(lab.b.abs_diff(195) <= 1);
    }

    #[test]
    fn test_round_trip_is_close() {
        for p in [
            RGB8::new(10, 20, 30),
            RGB8::new(200, 40, 90),
            RGB8::new(128, 128, 128),
            RGB8::new(250, 250, 5),
        ] {
            let back = lab_to_rgb(rgb_to_lab(p));
            assert!(back.r.abs_diff(p.r) <= 6, "{p:?} -> {back:?}");
            assert!(back.g.abs_diff(p.g) <= 6, "{p:?} -> {back:?}");
            assert!(back.b.abs_diff(p.b) <= 6, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn test_saturate_u8() {
        assert_eq!(saturate_u8(-3.0), 0);
        assert_eq!(saturate_u8(300.0), 255);
        assert_eq!(saturate_u8(2.5), 2);
        assert_eq!(saturate_u8(3.5), 4);
    }
}
