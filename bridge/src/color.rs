//! HSB/RGB color conversion
//!
//! The assistant speaks hue/saturation/brightness, device shadows store
//! RGB channels. This module is the single translation point between the
//! two representations; nothing else in the bridge converts colors.

use serde::{Deserialize, Serialize};

/// Color as the assistant reports it: hue in degrees [0, 360),
/// saturation and brightness in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

/// Color as device shadows store it: one channel per primary in [0, 255].
///
/// Channels are kept continuous so the HSB round trip stays within the
/// reporting tolerance even for dim colors; firmware quantizes on its side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Convert an HSB color to RGB channels.
///
/// Out-of-range inputs are clamped (hue wraps into [0, 360)).
pub fn hsb_to_rgb(hsb: &Hsb) -> Rgb {
    let hue = hsb.hue.rem_euclid(360.0);
    let saturation = hsb.saturation.clamp(0.0, 1.0);
    let brightness = hsb.brightness.clamp(0.0, 1.0);

    let chroma = brightness * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let m = brightness - chroma;

    let (r1, g1, b1) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    Rgb {
        r: (r1 + m) * 255.0,
        g: (g1 + m) * 255.0,
        b: (b1 + m) * 255.0,
    }
}

/// Convert RGB channels back to HSB.
///
/// Degenerate colors canonicalize: saturation 0 yields hue 0, and black
/// yields hue and saturation 0.
pub fn rgb_to_hsb(rgb: &Rgb) -> Hsb {
    let r = (rgb.r / 255.0).clamp(0.0, 1.0);
    let g = (rgb.g / 255.0).clamp(0.0, 1.0);
    let b = (rgb.b / 255.0).clamp(0.0, 1.0);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let brightness = max;
    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    let hue = if delta <= f64::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    Hsb {
        hue: hue.rem_euclid(360.0),
        saturation,
        brightness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(requested: &Hsb, decoded: &Hsb) {
        let hue_diff = (requested.hue - decoded.hue).abs();
        let hue_diff = hue_diff.min(360.0 - hue_diff);
        assert!(
            hue_diff <= 1.0,
            "hue drifted: {} -> {}",
            requested.hue,
            decoded.hue
        );
        assert!(
            (requested.saturation - decoded.saturation).abs() <= 0.01,
            "saturation drifted: {} -> {}",
            requested.saturation,
            decoded.saturation
        );
        assert!(
            (requested.brightness - decoded.brightness).abs() <= 0.01,
            "brightness drifted: {} -> {}",
            requested.brightness,
            decoded.brightness
        );
    }

    #[test]
    fn test_primary_colors() {
        let red = hsb_to_rgb(&Hsb { hue: 0.0, saturation: 1.0, brightness: 1.0 });
        assert!((red.r - 255.0).abs() < 1e-9 && red.g.abs() < 1e-9 && red.b.abs() < 1e-9);

        let green = hsb_to_rgb(&Hsb { hue: 120.0, saturation: 1.0, brightness: 1.0 });
        assert!(green.r.abs() < 1e-9 && (green.g - 255.0).abs() < 1e-9 && green.b.abs() < 1e-9);

        let blue = hsb_to_rgb(&Hsb { hue: 240.0, saturation: 1.0, brightness: 1.0 });
        assert!(blue.r.abs() < 1e-9 && blue.g.abs() < 1e-9 && (blue.b - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_grid() {
        for hue_step in 0..24 {
            for sat_step in 1..=10 {
                for bri_step in 1..=10 {
                    let requested = Hsb {
                        hue: f64::from(hue_step) * 15.0,
                        saturation: f64::from(sat_step) / 10.0,
                        brightness: f64::from(bri_step) / 10.0,
                    };
                    let decoded = rgb_to_hsb(&hsb_to_rgb(&requested));
                    assert_close(&requested, &decoded);
                }
            }
        }
    }

    #[test]
    fn test_grey_canonicalizes_hue() {
        let decoded = rgb_to_hsb(&Rgb { r: 128.0, g: 128.0, b: 128.0 });
        assert_eq!(decoded.hue, 0.0);
        assert_eq!(decoded.saturation, 0.0);
    }

    #[test]
    fn test_black_canonicalizes_everything() {
        let decoded = rgb_to_hsb(&Rgb { r: 0.0, g: 0.0, b: 0.0 });
        assert_eq!(decoded.hue, 0.0);
        assert_eq!(decoded.saturation, 0.0);
        assert_eq!(decoded.brightness, 0.0);
    }

    #[test]
    fn test_hue_wraps() {
        let wrapped = hsb_to_rgb(&Hsb { hue: 480.0, saturation: 1.0, brightness: 1.0 });
        let direct = hsb_to_rgb(&Hsb { hue: 120.0, saturation: 1.0, brightness: 1.0 });
        assert!((wrapped.r - direct.r).abs() < 1e-9);
        assert!((wrapped.g - direct.g).abs() < 1e-9);
        assert!((wrapped.b - direct.b).abs() < 1e-9);
    }
}
