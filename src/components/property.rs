//! Dotted property paths over a scene object's animatable state.
//!
//! A [`PropertyPath`] is parsed once, when an animation is created, so that an
//! unknown path or an incompatible goal value is rejected before anything is
//! written. Accepted paths:
//!
//! | path                                   | value kind |
//! |----------------------------------------|------------|
//! | `position`, `scale`                    | vector     |
//! | `rotation`                             | rotation   |
//! | `position.x`, `rotation.y`, `scale.z`… | number     |
//! | `material.color`                       | color      |
//! | `material.color.r` / `.g` / `.b`       | number     |
//! | `material.opacity`                     | number     |
//! | `visible`                              | flag       |

use super::material::{Material, Rgb};
use super::script::Visible;
use super::transform::Transform3;
use crate::error::PropertyError;
use crate::systems::tween::{lerp_f32, lerp_vec3, slerp_euler};
use glam::Vec3;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    Position,
    Rotation,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    R,
    G,
    B,
}

/// A validated property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyPath {
    Transform(TransformField, Option<Axis>),
    Color(Option<Channel>),
    Opacity,
    Visible,
}

/// The kind of value a path holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Number,
    Vector,
    Rotation,
    Color,
    Flag,
}

impl PropertyKind {
    fn name(self) -> &'static str {
        match self {
            PropertyKind::Number => "number",
            PropertyKind::Vector => "vector",
            PropertyKind::Rotation => "rotation",
            PropertyKind::Color => "color",
            PropertyKind::Flag => "boolean",
        }
    }
}

/// A property value read from or written to an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Number(f32),
    Vector(Vec3),
    /// Euler angles in radians, XYZ order.
    Rotation(Vec3),
    Color(Rgb),
    Flag(bool),
}

impl PropertyValue {
    /// Blend toward `to` at eased progress `t`.
    ///
    /// Rotations go through a quaternion slerp. Flags (and mismatched kinds)
    /// switch to the goal value at the halfway point.
    pub fn interpolate(&self, to: &PropertyValue, t: f32) -> PropertyValue {
        match (self, to) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => {
                PropertyValue::Number(lerp_f32(*a, *b, t))
            }
            (PropertyValue::Vector(a), PropertyValue::Vector(b)) => {
                PropertyValue::Vector(lerp_vec3(*a, *b, t))
            }
            (PropertyValue::Rotation(a), PropertyValue::Rotation(b)) => {
                PropertyValue::Rotation(slerp_euler(*a, *b, t))
            }
            (PropertyValue::Color(a), PropertyValue::Color(b)) => {
                PropertyValue::Color(Rgb::from_vec3(lerp_vec3(a.to_vec3(), b.to_vec3(), t)))
            }
            _ => {
                if t < 0.5 {
                    *self
                } else {
                    *to
                }
            }
        }
    }
}

impl FromStr for PropertyPath {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PropertyError::InvalidPath(s.to_string());
        let segments: Vec<&str> = s.split('.').collect();
        let axis = |seg: &str| match seg {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        };
        let transform = |field: TransformField, rest: &[&str]| match rest {
            [] => Ok(PropertyPath::Transform(field, None)),
            [a] => axis(*a)
                .map(|a| PropertyPath::Transform(field, Some(a)))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        };

        match segments.as_slice() {
            ["position", rest @ ..] => transform(TransformField::Position, rest),
            ["rotation", rest @ ..] => transform(TransformField::Rotation, rest),
            ["scale", rest @ ..] => transform(TransformField::Scale, rest),
            ["material", "color"] => Ok(PropertyPath::Color(None)),
            ["material", "color", c] => match *c {
                "r" => Ok(PropertyPath::Color(Some(Channel::R))),
                "g" => Ok(PropertyPath::Color(Some(Channel::G))),
                "b" => Ok(PropertyPath::Color(Some(Channel::B))),
                _ => Err(invalid()),
            },
            ["material", "opacity"] => Ok(PropertyPath::Opacity),
            ["visible"] => Ok(PropertyPath::Visible),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Transform(field, axis) => {
                let field = match field {
                    TransformField::Position => "position",
                    TransformField::Rotation => "rotation",
                    TransformField::Scale => "scale",
                };
                match axis {
                    None => write!(f, "{field}"),
                    Some(Axis::X) => write!(f, "{field}.x"),
                    Some(Axis::Y) => write!(f, "{field}.y"),
                    Some(Axis::Z) => write!(f, "{field}.z"),
                }
            }
            PropertyPath::Color(None) => write!(f, "material.color"),
            PropertyPath::Color(Some(Channel::R)) => write!(f, "material.color.r"),
            PropertyPath::Color(Some(Channel::G)) => write!(f, "material.color.g"),
            PropertyPath::Color(Some(Channel::B)) => write!(f, "material.color.b"),
            PropertyPath::Opacity => write!(f, "material.opacity"),
            PropertyPath::Visible => write!(f, "visible"),
        }
    }
}

fn axis_mut(v: &mut Vec3, axis: Axis) -> &mut f32 {
    match axis {
        Axis::X => &mut v.x,
        Axis::Y => &mut v.y,
        Axis::Z => &mut v.z,
    }
}

fn channel_mut(c: &mut Rgb, channel: Channel) -> &mut f32 {
    match channel {
        Channel::R => &mut c.r,
        Channel::G => &mut c.g,
        Channel::B => &mut c.b,
    }
}

impl PropertyPath {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyPath::Transform(_, Some(_)) | PropertyPath::Color(Some(_)) => {
                PropertyKind::Number
            }
            PropertyPath::Transform(TransformField::Rotation, None) => PropertyKind::Rotation,
            PropertyPath::Transform(_, None) => PropertyKind::Vector,
            PropertyPath::Color(None) => PropertyKind::Color,
            PropertyPath::Opacity => PropertyKind::Number,
            PropertyPath::Visible => PropertyKind::Flag,
        }
    }

    /// Check that `value` fits this path, converting vector-shaped values to
    /// the rotation or color kind when the path expects one.
    pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue, PropertyError> {
        let kind = self.kind();
        let coerced = match (kind, value) {
            (PropertyKind::Number, PropertyValue::Number(_)) => Some(value),
            (PropertyKind::Vector, PropertyValue::Vector(_)) => Some(value),
            (PropertyKind::Vector, PropertyValue::Rotation(v)) => Some(PropertyValue::Vector(v)),
            (PropertyKind::Rotation, PropertyValue::Rotation(_)) => Some(value),
            (PropertyKind::Rotation, PropertyValue::Vector(v)) => Some(PropertyValue::Rotation(v)),
            (PropertyKind::Color, PropertyValue::Color(_)) => Some(value),
            (PropertyKind::Color, PropertyValue::Vector(v)) => {
                Some(PropertyValue::Color(Rgb::from_vec3(v)))
            }
            (PropertyKind::Flag, PropertyValue::Flag(_)) => Some(value),
            _ => None,
        };
        coerced.ok_or_else(|| PropertyError::TypeMismatch {
            path: self.to_string(),
            expected: kind.name(),
        })
    }

    pub fn read(&self, transform: &Transform3, material: &Material, visible: &Visible) -> PropertyValue {
        match *self {
            PropertyPath::Transform(field, axis) => {
                let v = match field {
                    TransformField::Position => transform.position,
                    TransformField::Rotation => transform.rotation,
                    TransformField::Scale => transform.scale,
                };
                match axis {
                    Some(Axis::X) => PropertyValue::Number(v.x),
                    Some(Axis::Y) => PropertyValue::Number(v.y),
                    Some(Axis::Z) => PropertyValue::Number(v.z),
                    None if field == TransformField::Rotation => PropertyValue::Rotation(v),
                    None => PropertyValue::Vector(v),
                }
            }
            PropertyPath::Color(None) => PropertyValue::Color(material.color),
            PropertyPath::Color(Some(Channel::R)) => PropertyValue::Number(material.color.r),
            PropertyPath::Color(Some(Channel::G)) => PropertyValue::Number(material.color.g),
            PropertyPath::Color(Some(Channel::B)) => PropertyValue::Number(material.color.b),
            PropertyPath::Opacity => PropertyValue::Number(material.opacity),
            PropertyPath::Visible => PropertyValue::Flag(visible.0),
        }
    }

    pub fn write(
        &self,
        value: PropertyValue,
        transform: &mut Transform3,
        material: &mut Material,
        visible: &mut Visible,
    ) -> Result<(), PropertyError> {
        let mismatch = || PropertyError::TypeMismatch {
            path: self.to_string(),
            expected: self.kind().name(),
        };
        match (*self, self.coerce(value)?) {
            (PropertyPath::Transform(field, axis), value) => {
                let target = match field {
                    TransformField::Position => &mut transform.position,
                    TransformField::Rotation => &mut transform.rotation,
                    TransformField::Scale => &mut transform.scale,
                };
                match (axis, value) {
                    (Some(a), PropertyValue::Number(n)) => *axis_mut(target, a) = n,
                    (None, PropertyValue::Vector(v) | PropertyValue::Rotation(v)) => *target = v,
                    _ => return Err(mismatch()),
                }
            }
            (PropertyPath::Color(None), PropertyValue::Color(c)) => material.color = c,
            (PropertyPath::Color(Some(ch)), PropertyValue::Number(n)) => {
                *channel_mut(&mut material.color, ch) = n
            }
            (PropertyPath::Opacity, PropertyValue::Number(n)) => material.opacity = n.clamp(0.0, 1.0),
            (PropertyPath::Visible, PropertyValue::Flag(b)) => visible.0 = b,
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn parts() -> (Transform3, Material, Visible) {
        (Transform3::default(), Material::default(), Visible::default())
    }

    #[test]
    fn test_parse_and_display_roundtrip_names() {
        for s in [
            "position",
            "position.y",
            "rotation",
            "rotation.z",
            "scale.x",
            "material.color",
            "material.color.g",
            "material.opacity",
            "visible",
        ] {
            let p: PropertyPath = s.parse().unwrap();
            assert_eq!(p.to_string(), s);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_paths() {
        for s in ["position.w", "mass", "material", "material.color.a", "visible.x", ""] {
            assert_eq!(
                s.parse::<PropertyPath>(),
                Err(PropertyError::InvalidPath(s.to_string()))
            );
        }
    }

    #[test]
    fn test_coerce_vector_into_rotation_and_color() {
        let rot: PropertyPath = "rotation".parse().unwrap();
        assert_eq!(
            rot.coerce(PropertyValue::Vector(Vec3::X)),
            Ok(PropertyValue::Rotation(Vec3::X))
        );
        let color: PropertyPath = "material.color".parse().unwrap();
        assert_eq!(
            color.coerce(PropertyValue::Vector(Vec3::ONE)),
            Ok(PropertyValue::Color(Rgb::new(1.0, 1.0, 1.0)))
        );
    }

    #[test]
    fn test_coerce_rejects_mismatch() {
        let p: PropertyPath = "position.x".parse().unwrap();
        assert!(matches!(
            p.coerce(PropertyValue::Vector(Vec3::ONE)),
            Err(PropertyError::TypeMismatch { expected: "number", .. })
        ));
        let v: PropertyPath = "visible".parse().unwrap();
        assert!(v.coerce(PropertyValue::Number(1.0)).is_err());
    }

    #[test]
    fn test_write_then_read_components() {
        let (mut t, mut m, mut v) = parts();
        let py: PropertyPath = "position.y".parse().unwrap();
        py.write(PropertyValue::Number(3.0), &mut t, &mut m, &mut v).unwrap();
        assert_eq!(py.read(&t, &m, &v), PropertyValue::Number(3.0));
        assert!(approx_eq(t.position.y, 3.0));

        let op: PropertyPath = "material.opacity".parse().unwrap();
        op.write(PropertyValue::Number(1.5), &mut t, &mut m, &mut v).unwrap();
        assert!(approx_eq(m.opacity, 1.0));

        let vis: PropertyPath = "visible".parse().unwrap();
        vis.write(PropertyValue::Flag(false), &mut t, &mut m, &mut v).unwrap();
        assert!(!v.0);
    }

    #[test]
    fn test_interpolate_kinds() {
        let a = PropertyValue::Number(0.0);
        let b = PropertyValue::Number(10.0);
        assert_eq!(a.interpolate(&b, 0.5), PropertyValue::Number(5.0));

        let a = PropertyValue::Flag(false);
        let b = PropertyValue::Flag(true);
        assert_eq!(a.interpolate(&b, 0.4), PropertyValue::Flag(false));
        assert_eq!(a.interpolate(&b, 0.5), PropertyValue::Flag(true));

        let a = PropertyValue::Color(Rgb::new(0.0, 0.0, 0.0));
        let b = PropertyValue::Color(Rgb::new(1.0, 0.5, 0.0));
        match a.interpolate(&b, 0.5) {
            PropertyValue::Color(c) => {
                assert!(approx_eq(c.r, 0.5));
                assert!(approx_eq(c.g, 0.25));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
