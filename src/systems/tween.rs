//! Tween math shared by the animation manager.
//!
//! - [`ease`] maps a normalized progress through one of the [`Easing`] curves
//! - [`lerp_f32`] / [`lerp_vec3`] blend scalars and vectors
//! - [`slerp_euler`] blends Euler angles through quaternions so that the
//!   interpolation follows the shortest rotation instead of per-axis angles
//!
//! Easing names accepted from scripts are the camel-case forms used by script
//! authors (`easeInQuad`, `easeOutCubic`, ...). Snake-case aliases
//! (`quad_in`, `cubic_out`, ...) are accepted too. Unknown names fall back to
//! [`Easing::Linear`].

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Easing curves applied to a normalized progress value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed (no easing).
    #[default]
    Linear,
    /// Starts slow, accelerates (quadratic).
    QuadIn,
    /// Starts fast, decelerates (quadratic).
    QuadOut,
    /// Slow start and end (quadratic).
    QuadInOut,
    /// Starts slow, accelerates (cubic).
    CubicIn,
    /// Starts fast, decelerates (cubic).
    CubicOut,
    /// Slow start and end (cubic).
    CubicInOut,
}

/// Parse an easing name coming from a script.
pub fn parse_easing(name: &str) -> Easing {
    match name {
        "linear" => Easing::Linear,
        "easeInQuad" | "quad_in" => Easing::QuadIn,
        "easeOutQuad" | "quad_out" => Easing::QuadOut,
        "easeInOutQuad" | "quad_in_out" => Easing::QuadInOut,
        "easeInCubic" | "cubic_in" => Easing::CubicIn,
        "easeOutCubic" | "cubic_out" => Easing::CubicOut,
        "easeInOutCubic" | "cubic_in_out" => Easing::CubicInOut,
        _ => Easing::Linear,
    }
}

/// Apply an easing function to a normalized time value.
///
/// The input `t` is clamped to [0.0, 1.0] before the curve is evaluated, so
/// every curve maps 0 to 0 and 1 to 1.
pub fn ease(e: Easing, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match e {
        Easing::Linear => t,
        Easing::QuadIn => t * t,
        Easing::QuadOut => t * (2.0 - t),
        Easing::QuadInOut => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                -1.0 + (4.0 - 2.0 * t) * t
            }
        }
        Easing::CubicIn => t * t * t,
        Easing::CubicOut => {
            let p = t - 1.0;
            p * p * p + 1.0
        }
        Easing::CubicInOut => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
            }
        }
    }
}

/// Linearly interpolate between two floats.
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Component-wise linear interpolation between two vectors.
pub fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Interpolate two XYZ Euler rotations (radians) through a quaternion slerp.
///
/// The result is converted back to XYZ Euler angles, so it may differ from
/// the per-axis blend even at the endpoints when several Euler triples
/// describe the same orientation.
pub fn slerp_euler(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let qa = Quat::from_euler(EulerRot::XYZ, a.x, a.y, a.z);
    let qb = Quat::from_euler(EulerRot::XYZ, b.x, b.y, b.z);
    let (x, y, z) = qa.slerp(qb, t).to_euler(EulerRot::XYZ);
    Vec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
    ];

    // ==================== EASE FUNCTION TESTS ====================

    #[test]
    fn test_all_easings_fix_endpoints() {
        for e in ALL {
            assert!(approx_eq(ease(e, 0.0), 0.0), "{e:?} at 0");
            assert!(approx_eq(ease(e, 1.0), 1.0), "{e:?} at 1");
        }
    }

    #[test]
    fn test_ease_clamps_out_of_range_input() {
        for e in ALL {
            assert!(approx_eq(ease(e, -0.5), 0.0));
            assert!(approx_eq(ease(e, 1.5), 1.0));
        }
    }

    #[test]
    fn test_quad_out_polynomial() {
        assert!(approx_eq(ease(Easing::QuadOut, 0.5), 0.75));
        assert!(approx_eq(ease(Easing::QuadOut, 0.25), 0.4375));
    }

    #[test]
    fn test_quad_in_out_branches() {
        assert!(approx_eq(ease(Easing::QuadInOut, 0.25), 0.125));
        assert!(approx_eq(ease(Easing::QuadInOut, 0.5), 0.5));
        assert!(approx_eq(ease(Easing::QuadInOut, 0.75), 0.875));
    }

    #[test]
    fn test_cubic_curves() {
        assert!(approx_eq(ease(Easing::CubicIn, 0.5), 0.125));
        assert!(approx_eq(ease(Easing::CubicOut, 0.5), 0.875));
        assert!(approx_eq(ease(Easing::CubicInOut, 0.25), 0.0625));
        assert!(approx_eq(ease(Easing::CubicInOut, 0.75), 0.9375));
    }

    // ==================== PARSE TESTS ====================

    #[test]
    fn test_parse_easing_script_names() {
        assert_eq!(parse_easing("easeInQuad"), Easing::QuadIn);
        assert_eq!(parse_easing("easeOutQuad"), Easing::QuadOut);
        assert_eq!(parse_easing("easeInOutQuad"), Easing::QuadInOut);
        assert_eq!(parse_easing("easeInCubic"), Easing::CubicIn);
        assert_eq!(parse_easing("easeOutCubic"), Easing::CubicOut);
        assert_eq!(parse_easing("easeInOutCubic"), Easing::CubicInOut);
        assert_eq!(parse_easing("cubic_in_out"), Easing::CubicInOut);
    }

    #[test]
    fn test_parse_easing_unknown_is_linear() {
        assert_eq!(parse_easing("bounce"), Easing::Linear);
        assert_eq!(parse_easing(""), Easing::Linear);
    }

    // ==================== LERP TESTS ====================

    #[test]
    fn test_lerp_f32() {
        assert!(approx_eq(lerp_f32(0.0, 10.0, 0.3), 3.0));
        assert!(approx_eq(lerp_f32(-5.0, 5.0, 0.5), 0.0));
    }

    #[test]
    fn test_lerp_vec3_component_independence() {
        let r = lerp_vec3(Vec3::new(0.0, 100.0, 4.0), Vec3::new(100.0, 0.0, 4.0), 0.25);
        assert!(approx_eq(r.x, 25.0));
        assert!(approx_eq(r.y, 75.0));
        assert!(approx_eq(r.z, 4.0));
    }

    #[test]
    fn test_slerp_euler_single_axis_matches_linear() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let r = slerp_euler(a, b, 0.5);
        assert!(approx_eq(r.x, 0.0));
        assert!(approx_eq(r.y, std::f32::consts::FRAC_PI_4));
        assert!(approx_eq(r.z, 0.0));
    }

    #[test]
    fn test_slerp_euler_endpoints() {
        let a = Vec3::new(0.1, 0.2, 0.3);
        let b = Vec3::new(0.4, -0.2, 1.0);
        let start = slerp_euler(a, b, 0.0);
        let end = slerp_euler(a, b, 1.0);
        assert!((start - a).length() < 1e-4);
        assert!((end - b).length() < 1e-4);
    }
}
