//! Live render-target handle passed to object scripts as `mesh`.
//!
//! ```lua
//! mesh.position.y = mesh.position.y + delta
//! mesh.rotation:set(0, time, 0)
//! mesh.material.color:setHex(0xff8800)
//! mesh.material.opacity = 0.5
//! mesh.visible = false
//! ```
//!
//! Every field access reads or writes the scene world directly, so changes
//! are visible to animations and other scripts in the same frame.

use super::convert::vec3_from_lua;
use crate::components::material::Rgb;
use crate::components::property::{Axis, Channel, PropertyPath, PropertyValue, TransformField};
use crate::resources::animations::AnimationTarget;
use crate::resources::sceneworld::SceneObjectHandle;
use glam::Vec3;
use mlua::prelude::*;

fn read(handle: &SceneObjectHandle, path: PropertyPath) -> LuaResult<PropertyValue> {
    handle.read_property(&path).map_err(LuaError::external)
}

fn write(handle: &SceneObjectHandle, path: PropertyPath, value: PropertyValue) -> LuaResult<()> {
    handle.write_property(&path, value).map_err(LuaError::external)
}

fn number(value: PropertyValue) -> f32 {
    match value {
        PropertyValue::Number(n) => n,
        _ => 0.0,
    }
}

/// `mesh.position`, `mesh.rotation` or `mesh.scale`.
#[derive(Clone)]
pub struct LuaVec3 {
    handle: SceneObjectHandle,
    field: TransformField,
}

impl LuaVec3 {
    fn axis(&self, axis: Axis) -> LuaResult<f32> {
        read(&self.handle, PropertyPath::Transform(self.field, Some(axis))).map(number)
    }

    fn set_axis(&self, axis: Axis, value: f32) -> LuaResult<()> {
        write(
            &self.handle,
            PropertyPath::Transform(self.field, Some(axis)),
            PropertyValue::Number(value),
        )
    }

    pub fn get_all(&self) -> LuaResult<Vec3> {
        match read(&self.handle, PropertyPath::Transform(self.field, None))? {
            PropertyValue::Vector(v) | PropertyValue::Rotation(v) => Ok(v),
            _ => Ok(Vec3::ZERO),
        }
    }

    fn set_all(&self, v: Vec3) -> LuaResult<()> {
        write(
            &self.handle,
            PropertyPath::Transform(self.field, None),
            PropertyValue::Vector(v),
        )
    }
}

impl LuaUserData for LuaVec3 {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| this.axis(Axis::X));
        fields.add_field_method_get("y", |_, this| this.axis(Axis::Y));
        fields.add_field_method_get("z", |_, this| this.axis(Axis::Z));
        fields.add_field_method_set("x", |_, this, v: f32| this.set_axis(Axis::X, v));
        fields.add_field_method_set("y", |_, this, v: f32| this.set_axis(Axis::Y, v));
        fields.add_field_method_set("z", |_, this, v: f32| this.set_axis(Axis::Z, v));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("set", |_, this, (x, y, z): (f32, f32, f32)| {
            this.set_all(Vec3::new(x, y, z))
        });
        methods.add_method("copy", |_, this, other: LuaValue| {
            this.set_all(vec3_from_lua(&other)?)
        });
        methods.add_method("add", |_, this, other: LuaValue| {
            let v = this.get_all()? + vec3_from_lua(&other)?;
            this.set_all(v)
        });
        methods.add_method("distanceTo", |_, this, other: LuaValue| {
            Ok(this.get_all()?.distance(vec3_from_lua(&other)?))
        });
        methods.add_method("clone", |lua, this, ()| {
            super::convert::vec3_to_lua(lua, this.get_all()?)
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            let v = this.get_all()?;
            Ok(format!("({}, {}, {})", v.x, v.y, v.z))
        });
    }
}

/// `mesh.material.color`.
#[derive(Clone)]
pub struct LuaColor {
    handle: SceneObjectHandle,
}

impl LuaColor {
    fn channel(&self, channel: Channel) -> LuaResult<f32> {
        read(&self.handle, PropertyPath::Color(Some(channel))).map(number)
    }

    fn set_channel(&self, channel: Channel, value: f32) -> LuaResult<()> {
        write(
            &self.handle,
            PropertyPath::Color(Some(channel)),
            PropertyValue::Number(value),
        )
    }

    pub fn get_all(&self) -> LuaResult<Rgb> {
        match read(&self.handle, PropertyPath::Color(None))? {
            PropertyValue::Color(c) => Ok(c),
            _ => Ok(Rgb::new(0.0, 0.0, 0.0)),
        }
    }

    fn set_all(&self, color: Rgb) -> LuaResult<()> {
        write(&self.handle, PropertyPath::Color(None), PropertyValue::Color(color))
    }
}

impl LuaUserData for LuaColor {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("r", |_, this| this.channel(Channel::R));
        fields.add_field_method_get("g", |_, this| this.channel(Channel::G));
        fields.add_field_method_get("b", |_, this| this.channel(Channel::B));
        fields.add_field_method_set("r", |_, this, v: f32| this.set_channel(Channel::R, v));
        fields.add_field_method_set("g", |_, this, v: f32| this.set_channel(Channel::G, v));
        fields.add_field_method_set("b", |_, this, v: f32| this.set_channel(Channel::B, v));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        // Accepts 0xRRGGBB or "#rrggbb"
        methods.add_method("setHex", |_, this, value: LuaValue| {
            let color = match &value {
                LuaValue::Integer(i) => Some(Rgb::from_u32(*i as u32)),
                LuaValue::Number(n) => Some(Rgb::from_u32(*n as u32)),
                LuaValue::String(s) => Rgb::from_hex(&s.to_str()?),
                _ => None,
            };
            match color {
                Some(c) => this.set_all(c),
                None => Err(LuaError::runtime("setHex expects 0xRRGGBB or '#rrggbb'")),
            }
        });
        methods.add_method("getHex", |_, this, ()| Ok(this.get_all()?.to_u32()));
        methods.add_method("getHexString", |_, this, ()| Ok(this.get_all()?.to_hex()));
        methods.add_method("setRGB", |_, this, (r, g, b): (f32, f32, f32)| {
            this.set_all(Rgb::new(r, g, b))
        });
    }
}

/// `mesh.material`.
#[derive(Clone)]
pub struct LuaMaterial {
    handle: SceneObjectHandle,
}

impl LuaUserData for LuaMaterial {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("color", |_, this| {
            Ok(LuaColor {
                handle: this.handle.clone(),
            })
        });
        fields.add_field_method_get("opacity", |_, this| {
            read(&this.handle, PropertyPath::Opacity).map(number)
        });
        fields.add_field_method_set("opacity", |_, this, v: f32| {
            write(&this.handle, PropertyPath::Opacity, PropertyValue::Number(v))
        });
        fields.add_field_method_set("color", |_, this, v: LuaValue| {
            let color = match super::convert::property_value_from_lua(&v)? {
                PropertyValue::Color(c) => c,
                PropertyValue::Vector(v) => Rgb::from_vec3(v),
                _ => return Err(LuaError::runtime("expected a color")),
            };
            write(&this.handle, PropertyPath::Color(None), PropertyValue::Color(color))
        });
    }
}

/// The object's render-target handle.
#[derive(Clone)]
pub struct LuaMesh {
    handle: SceneObjectHandle,
}

impl LuaMesh {
    pub fn new(handle: SceneObjectHandle) -> Self {
        Self { handle }
    }

    fn vector(&self, field: TransformField) -> LuaVec3 {
        LuaVec3 {
            handle: self.handle.clone(),
            field,
        }
    }
}

impl LuaUserData for LuaMesh {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("position", |_, this| Ok(this.vector(TransformField::Position)));
        fields.add_field_method_get("rotation", |_, this| Ok(this.vector(TransformField::Rotation)));
        fields.add_field_method_get("scale", |_, this| Ok(this.vector(TransformField::Scale)));
        fields.add_field_method_set("position", |_, this, v: LuaValue| {
            this.vector(TransformField::Position).set_all(vec3_from_lua(&v)?)
        });
        fields.add_field_method_set("rotation", |_, this, v: LuaValue| {
            this.vector(TransformField::Rotation).set_all(vec3_from_lua(&v)?)
        });
        fields.add_field_method_set("scale", |_, this, v: LuaValue| {
            this.vector(TransformField::Scale).set_all(vec3_from_lua(&v)?)
        });
        fields.add_field_method_get("material", |_, this| {
            Ok(LuaMaterial {
                handle: this.handle.clone(),
            })
        });
        fields.add_field_method_get("visible", |_, this| {
            Ok(matches!(read(&this.handle, PropertyPath::Visible)?, PropertyValue::Flag(true)))
        });
        fields.add_field_method_set("visible", |_, this, v: bool| {
            write(&this.handle, PropertyPath::Visible, PropertyValue::Flag(v))
        });
        fields.add_field_method_get("id", |_, this| Ok(this.handle.id().to_string()));
    }
}
