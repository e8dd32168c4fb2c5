//! Conversions between Lua values and runtime values.

use super::mesh::{LuaColor, LuaVec3};
use crate::components::material::Rgb;
use crate::components::property::PropertyValue;
use crate::resources::gui::GuiValue;
use glam::Vec3;
use mlua::prelude::*;
use mlua::{DeserializeOptions, SerializeOptions};
use serde_json::Value;

fn number_field(table: &LuaTable, key: &str, index: i64) -> LuaResult<Option<f32>> {
    match table.get::<Option<f32>>(key)? {
        Some(v) => Ok(Some(v)),
        None => table.get::<Option<f32>>(index),
    }
}

fn vec3_from_table(table: &LuaTable) -> LuaResult<Option<Vec3>> {
    let x = number_field(table, "x", 1)?;
    let y = number_field(table, "y", 2)?;
    let z = number_field(table, "z", 3)?;
    Ok(match (x, y, z) {
        (Some(x), Some(y), Some(z)) => Some(Vec3::new(x, y, z)),
        _ => None,
    })
}

/// Read an animation goal.
///
/// Numbers, booleans, `{x, y, z}` (or `{1, 2, 3}`) tables, `{r, g, b}`
/// tables, hex color strings and mesh vector/color handles are accepted.
pub fn property_value_from_lua(value: &LuaValue) -> LuaResult<PropertyValue> {
    let bad = |what: &str| LuaError::runtime(format!("cannot animate to {}", what));
    match value {
        LuaValue::Integer(i) => Ok(PropertyValue::Number(*i as f32)),
        LuaValue::Number(n) => Ok(PropertyValue::Number(*n as f32)),
        LuaValue::Boolean(b) => Ok(PropertyValue::Flag(*b)),
        LuaValue::String(s) => {
            let text = s.to_str()?;
            Rgb::from_hex(&text)
                .map(PropertyValue::Color)
                .ok_or_else(|| bad(&format!("'{}'", &*text)))
        }
        LuaValue::Table(t) => {
            if let (Some(r), Some(g), Some(b)) = (
                t.get::<Option<f32>>("r")?,
                t.get::<Option<f32>>("g")?,
                t.get::<Option<f32>>("b")?,
            ) {
                return Ok(PropertyValue::Color(Rgb::new(r, g, b)));
            }
            vec3_from_table(t)?
                .map(PropertyValue::Vector)
                .ok_or_else(|| bad("a table without x/y/z"))
        }
        LuaValue::UserData(ud) => {
            if let Ok(v) = ud.borrow::<LuaVec3>() {
                return Ok(PropertyValue::Vector(v.get_all()?));
            }
            if let Ok(c) = ud.borrow::<LuaColor>() {
                return Ok(PropertyValue::Color(c.get_all()?));
            }
            Err(bad("this userdata"))
        }
        other => Err(bad(other.type_name())),
    }
}

pub fn vec3_to_lua(lua: &Lua, v: Vec3) -> LuaResult<LuaTable> {
    let t = lua.create_table()?;
    t.set("x", v.x)?;
    t.set("y", v.y)?;
    t.set("z", v.z)?;
    Ok(t)
}

/// Read a vector from a table or a mesh vector handle.
pub fn vec3_from_lua(value: &LuaValue) -> LuaResult<Vec3> {
    match property_value_from_lua(value)? {
        PropertyValue::Vector(v) | PropertyValue::Rotation(v) => Ok(v),
        _ => Err(LuaError::runtime("expected a vector")),
    }
}

pub fn property_value_to_lua(lua: &Lua, value: PropertyValue) -> LuaResult<LuaValue> {
    Ok(match value {
        PropertyValue::Number(n) => LuaValue::Number(n as f64),
        PropertyValue::Flag(b) => LuaValue::Boolean(b),
        PropertyValue::Vector(v) | PropertyValue::Rotation(v) => LuaValue::Table(vec3_to_lua(lua, v)?),
        PropertyValue::Color(c) => {
            let t = lua.create_table()?;
            t.set("r", c.r)?;
            t.set("g", c.g)?;
            t.set("b", c.b)?;
            LuaValue::Table(t)
        }
    })
}

/// `nil` and unsupported values become `None`.
pub fn gui_value_from_lua(value: &LuaValue) -> Option<GuiValue> {
    match value {
        LuaValue::Boolean(b) => Some(GuiValue::Bool(*b)),
        LuaValue::Integer(i) => Some(GuiValue::Number(*i as f64)),
        LuaValue::Number(n) => Some(GuiValue::Number(*n)),
        LuaValue::String(s) => Some(GuiValue::Text(s.to_string_lossy())),
        _ => None,
    }
}

pub fn gui_value_to_lua(lua: &Lua, value: Option<&GuiValue>) -> LuaResult<LuaValue> {
    Ok(match value {
        None => LuaValue::Nil,
        Some(GuiValue::Bool(b)) => LuaValue::Boolean(*b),
        Some(GuiValue::Number(n)) => LuaValue::Number(*n),
        Some(GuiValue::Text(s)) => LuaValue::String(lua.create_string(s)?),
    })
}

/// Message payload from a script. Functions and userdata are skipped.
pub fn json_from_lua(lua: &Lua, value: LuaValue) -> LuaResult<Value> {
    if value.is_nil() {
        return Ok(Value::Null);
    }
    let options = DeserializeOptions::new()
        .deny_unsupported_types(false)
        .deny_recursive_tables(true);
    lua.from_value_with(value, options)
}

/// Message payload for a script; JSON `null` becomes `nil`.
pub fn json_to_lua(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_goal_values_from_lua() {
        let lua = Lua::new();
        let num: LuaValue = lua.load("return 2.5").eval().unwrap();
        assert_eq!(property_value_from_lua(&num).unwrap(), PropertyValue::Number(2.5));

        let vec: LuaValue = lua.load("return {x = 1, y = 2, z = 3}").eval().unwrap();
        assert_eq!(
            property_value_from_lua(&vec).unwrap(),
            PropertyValue::Vector(Vec3::new(1.0, 2.0, 3.0))
        );

        let arr: LuaValue = lua.load("return {4, 5, 6}").eval().unwrap();
        assert_eq!(
            property_value_from_lua(&arr).unwrap(),
            PropertyValue::Vector(Vec3::new(4.0, 5.0, 6.0))
        );

        let hex: LuaValue = lua.load("return '#ff0000'").eval().unwrap();
        assert_eq!(
            property_value_from_lua(&hex).unwrap(),
            PropertyValue::Color(Rgb::new(1.0, 0.0, 0.0))
        );

        let bad: LuaValue = lua.load("return {a = 1}").eval().unwrap();
        assert!(property_value_from_lua(&bad).is_err());
    }

    #[test]
    fn test_json_round_trip_through_lua() {
        let lua = Lua::new();
        let payload = json!({"damage": 10, "kind": "fire", "crit": null});
        let value = json_to_lua(&lua, &payload).unwrap();
        let table = value.as_table().unwrap();
        assert_eq!(table.get::<i64>("damage").unwrap(), 10);
        assert!(table.get::<LuaValue>("crit").unwrap().is_nil());

        let back = json_from_lua(&lua, LuaValue::Table(table.clone())).unwrap();
        assert_eq!(back["kind"], json!("fire"));
        assert_eq!(back["damage"].as_f64(), Some(10.0));
    }

    #[test]
    fn test_json_from_lua_skips_functions() {
        let lua = Lua::new();
        let value: LuaValue = lua.load("return {n = 1, f = function() end}").eval().unwrap();
        let json = json_from_lua(&lua, value).unwrap();
        assert_eq!(json["n"].as_f64(), Some(1.0));
        assert!(json.get("f").is_none());
    }

    #[test]
    fn test_gui_values() {
        let lua = Lua::new();
        assert_eq!(gui_value_from_lua(&LuaValue::Integer(7)), Some(GuiValue::Number(7.0)));
        assert_eq!(gui_value_from_lua(&LuaValue::Nil), None);
        let v = gui_value_to_lua(&lua, Some(&GuiValue::Bool(true))).unwrap();
        assert_eq!(v, LuaValue::Boolean(true));
    }
}
