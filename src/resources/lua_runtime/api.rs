//! Capability tables handed to scripts.
//!
//! ```lua
//! -- object script
//! if input.wasKeyPressed("Space") then
//!     object.animate({ property = "position.y", to = mesh.position.y + 2,
//!                      duration = 300, easing = "easeOutQuad" })
//!     engine.setTimeout(function() engine.playSound("land.wav", 0.5) end, 300)
//! end
//!
//! object.onMessage = function(kind, data)
//!     if kind == "takeDamage" then object.health = (object.health or 100) - data end
//! end
//!
//! -- global script
//! gui.addSlider("Speed", 0, 5, 1, function(v) scene.speed = v end)
//! scene.onUpdate = function(delta, time) end
//! ```
//!
//! `engine`, `scene`, `input` and `gui` are shared by every script of a
//! session; `object` and `mesh` are per object. All functions use dot-call
//! syntax. `object` functions also accept colon calls.

use super::context::PlayContext;
use super::convert::{
    gui_value_from_lua, gui_value_to_lua, json_from_lua, json_to_lua, property_value_from_lua,
    property_value_to_lua,
};
use super::mesh::LuaMesh;
use super::runtime::LuaAppData;
use crate::components::property::PropertyValue;
use crate::error::ScriptError;
use crate::events::host::HostCmd;
use crate::resources::animations::{
    AnimationOptions, AnimationTarget, CompleteCallback, SequenceStep, UpdateCallback,
};
use crate::resources::gui::{DEFAULT_CONTAINER, GuiCallback, GuiElementUpdate, GuiValue};
use crate::resources::input::InputRef;
use crate::resources::messages::MessageHandler;
use crate::resources::sceneworld::{SceneObjectHandle, SceneWorld};
use crate::resources::timers::{TimerCallback, TimerId};
use crate::systems::tween::parse_easing;
use log::info;
use mlua::prelude::*;
use serde_json::Value;
use std::rc::{Rc, Weak};

/// The shared capability tables of a session.
#[derive(Clone)]
pub struct ApiTables {
    pub engine: LuaTable,
    pub scene: LuaTable,
    pub input: LuaTable,
    pub gui: LuaTable,
}

/// Registers a Lua function that pushes a host command to the `LuaAppData` queue.
macro_rules! register_cmd {
    ($table:expr, $lua:expr, $name:expr, |$args:pat_param| $arg_ty:ty, $cmd:expr) => {
        $table.set(
            $name,
            $lua.create_function(|lua, $args: $arg_ty| {
                lua.app_data_ref::<LuaAppData>()
                    .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                    .host_commands
                    .borrow_mut()
                    .push($cmd);
                Ok(())
            })?,
        )?;
    };
}

fn upgrade(ctx: &Weak<PlayContext>) -> LuaResult<Rc<PlayContext>> {
    ctx.upgrade()
        .ok_or_else(|| LuaError::runtime("play session has ended"))
}

/// Drop a leading `self` table so both `t.f(a)` and `t:f(a)` work.
fn without_self(mut args: LuaMultiValue) -> LuaMultiValue {
    if matches!(args.front(), Some(LuaValue::Table(_))) {
        args.pop_front();
    }
    args
}

fn last_table(args: &LuaMultiValue) -> LuaResult<LuaTable> {
    args.iter()
        .rev()
        .find_map(|v| v.as_table().cloned())
        .ok_or_else(|| LuaError::runtime("expected an options table"))
}

// ==================== CALLBACK ADAPTERS ====================

pub(crate) fn timer_callback(ctx: &Weak<PlayContext>, func: LuaFunction) -> TimerCallback {
    let ctx = ctx.clone();
    Rc::new(move || match ctx.upgrade() {
        Some(ctx) => ctx.invoke(&func, ()),
        None => Ok(()),
    })
}

fn update_callback(ctx: &Weak<PlayContext>, func: LuaFunction) -> UpdateCallback {
    let ctx = ctx.clone();
    Rc::new(move |value: PropertyValue| {
        let Some(ctx) = ctx.upgrade() else {
            return Ok(());
        };
        let arg = property_value_to_lua(ctx.lua(), value)?;
        ctx.invoke(&func, arg)
    })
}

fn gui_callback(ctx: &Weak<PlayContext>, func: LuaFunction) -> GuiCallback {
    let ctx = ctx.clone();
    Rc::new(move |value: Option<GuiValue>| {
        let Some(ctx) = ctx.upgrade() else {
            return Ok(());
        };
        let arg = gui_value_to_lua(ctx.lua(), value.as_ref())?;
        ctx.invoke(&func, arg)
    })
}

/// Forwards every message addressed to an object to its `onMessage` slot.
pub(crate) fn slot_message_handler(ctx: &Weak<PlayContext>, record: LuaTable) -> MessageHandler {
    let ctx = ctx.clone();
    Rc::new(move |message_type: &str, data: &Value| -> Result<(), ScriptError> {
        let Some(ctx) = ctx.upgrade() else {
            return Ok(());
        };
        let Some(func) = record.get::<Option<LuaFunction>>("onMessage")? else {
            return Ok(());
        };
        let data = json_to_lua(ctx.lua(), data)?;
        ctx.invoke(&func, (message_type, data))
    })
}

// ==================== ENGINE ====================

fn engine_table(lua: &Lua, ctx: &Weak<PlayContext>, wait: LuaFunction) -> LuaResult<LuaTable> {
    let engine = lua.create_table()?;

    // engine.playSound(url, volume = 1.0)
    let weak = ctx.clone();
    engine.set(
        "playSound",
        lua.create_function(move |_, (url, volume): (String, Option<f32>)| {
            upgrade(&weak)?.play_sound(&url, volume.unwrap_or(1.0));
            Ok(())
        })?,
    )?;

    register_cmd!(engine, lua, "setGravity",
        |(x, y, z)| (f32, f32, f32), HostCmd::SetGravity { x, y, z });

    // engine.spawn(type, options)
    engine.set(
        "spawn",
        lua.create_function(|lua, (object_type, options): (String, Option<LuaValue>)| {
            let options = match options {
                Some(v) => json_from_lua(lua, v)?,
                None => Value::Object(Default::default()),
            };
            info!(target: "lua", "spawn requested: {}", object_type);
            lua.app_data_ref::<LuaAppData>()
                .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                .host_commands
                .borrow_mut()
                .push(HostCmd::Spawn { object_type, options });
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    engine.set(
        "setTimeout",
        lua.create_function(move |_, (func, delay): (LuaFunction, Option<f32>)| {
            let ctx = upgrade(&weak)?;
            Ok(ctx.timers.set_timeout(timer_callback(&weak, func), delay.unwrap_or(0.0)))
        })?,
    )?;

    let weak = ctx.clone();
    engine.set(
        "setInterval",
        lua.create_function(move |_, (func, interval): (LuaFunction, Option<f32>)| {
            let ctx = upgrade(&weak)?;
            Ok(ctx.timers.set_interval(timer_callback(&weak, func), interval.unwrap_or(0.0)))
        })?,
    )?;

    let weak = ctx.clone();
    engine.set(
        "clearTimeout",
        lua.create_function(move |_, id: Option<TimerId>| {
            if let Some(id) = id {
                upgrade(&weak)?.timers.clear_timeout(id);
            }
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    engine.set(
        "clearInterval",
        lua.create_function(move |_, id: Option<TimerId>| {
            if let Some(id) = id {
                upgrade(&weak)?.timers.clear_interval(id);
            }
            Ok(())
        })?,
    )?;

    engine.set("wait", wait)?;

    let weak = ctx.clone();
    engine.set(
        "activeTimerCount",
        lua.create_function(move |_, ()| Ok(upgrade(&weak)?.timers.active_timer_count()))?,
    )?;

    let weak = ctx.clone();
    engine.set(
        "stopAnimation",
        lua.create_function(move |_, id: String| {
            upgrade(&weak)?.animations.stop_animation(&id);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    engine.set(
        "stopAllAnimations",
        lua.create_function(move |_, ()| {
            upgrade(&weak)?.animations.stop_all_animations();
            Ok(())
        })?,
    )?;

    engine.set(
        "log",
        lua.create_function(|_, msg: String| {
            info!(target: "lua", "{}", msg);
            Ok(())
        })?,
    )?;

    Ok(engine)
}

// ==================== SCENE ====================

fn records_of(ctx: &PlayContext, ids: &[String]) -> Vec<LuaTable> {
    ids.iter().filter_map(|id| ctx.record(id)).collect()
}

fn scene_table(lua: &Lua, ctx: &Weak<PlayContext>) -> LuaResult<LuaTable> {
    let scene = lua.create_table()?;

    let weak = ctx.clone();
    scene.set(
        "getObjectByName",
        lua.create_function(move |_, name: String| {
            let ctx = upgrade(&weak)?;
            let id = ctx.world.borrow().find_by_name(&name).map(String::from);
            Ok(id.and_then(|id| ctx.record(&id)))
        })?,
    )?;

    let weak = ctx.clone();
    scene.set(
        "findObjectsByTag",
        lua.create_function(move |_, tag: String| {
            let ctx = upgrade(&weak)?;
            let ids = ctx.world.borrow().find_by_tag(&tag);
            Ok(records_of(&ctx, &ids))
        })?,
    )?;

    let weak = ctx.clone();
    scene.set(
        "getObjects",
        lua.create_function(move |_, ()| {
            let ctx = upgrade(&weak)?;
            let ids = ctx.world.borrow().ids().to_vec();
            Ok(records_of(&ctx, &ids))
        })?,
    )?;

    let weak = ctx.clone();
    scene.set(
        "sendMessage",
        lua.create_function(move |lua, (target, kind, data): (String, String, LuaValue)| {
            let data = json_from_lua(lua, data)?;
            upgrade(&weak)?.messages.send_message(&target, &kind, &data);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    scene.set(
        "sendMessageToTag",
        lua.create_function(move |lua, (tag, kind, data): (String, String, LuaValue)| {
            let data = json_from_lua(lua, data)?;
            upgrade(&weak)?.messages.send_message_to_tag(None, &tag, &kind, &data);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    scene.set(
        "broadcast",
        lua.create_function(move |lua, (kind, data): (String, LuaValue)| {
            let data = json_from_lua(lua, data)?;
            upgrade(&weak)?.messages.broadcast(None, &kind, &data);
            Ok(())
        })?,
    )?;

    register_cmd!(scene, lua, "restart", |()| (), HostCmd::Restart);

    Ok(scene)
}

// ==================== INPUT ====================

fn input_ref(value: &LuaValue) -> LuaResult<InputRefOwned> {
    match value {
        LuaValue::Integer(i) => Ok(InputRefOwned::Index((*i).max(0) as usize)),
        LuaValue::Number(n) => Ok(InputRefOwned::Index(n.max(0.0) as usize)),
        LuaValue::String(s) => Ok(InputRefOwned::Name(s.to_str()?.to_string())),
        other => Err(LuaError::runtime(format!(
            "expected a button index or name, got {}",
            other.type_name()
        ))),
    }
}

enum InputRefOwned {
    Index(usize),
    Name(String),
}

impl InputRefOwned {
    fn borrowed(&self) -> InputRef<'_> {
        match self {
            InputRefOwned::Index(i) => InputRef::Index(*i),
            InputRefOwned::Name(n) => InputRef::Name(n),
        }
    }
}

fn input_table(lua: &Lua, ctx: &Weak<PlayContext>) -> LuaResult<LuaTable> {
    let input = lua.create_table()?;

    let weak = ctx.clone();
    input.set(
        "isKeyDown",
        lua.create_function(move |_, key: String| Ok(upgrade(&weak)?.input.borrow().is_key_down(&key)))?,
    )?;

    let weak = ctx.clone();
    input.set(
        "wasKeyPressed",
        lua.create_function(move |_, key: String| {
            Ok(upgrade(&weak)?.input.borrow().was_key_pressed(&key))
        })?,
    )?;

    let weak = ctx.clone();
    input.set(
        "wasKeyReleased",
        lua.create_function(move |_, key: String| {
            Ok(upgrade(&weak)?.input.borrow().was_key_released(&key))
        })?,
    )?;

    let weak = ctx.clone();
    input.set(
        "isMouseDown",
        lua.create_function(move |_, button: Option<LuaValue>| {
            let button = match button {
                Some(v) => input_ref(&v)?,
                None => InputRefOwned::Index(0),
            };
            Ok(upgrade(&weak)?.input.borrow().is_mouse_down(button.borrowed()))
        })?,
    )?;

    let weak = ctx.clone();
    input.set(
        "getMousePosition",
        lua.create_function(move |lua, ()| {
            let (x, y) = upgrade(&weak)?.input.borrow().mouse_position();
            let pos = lua.create_table()?;
            pos.set("x", x)?;
            pos.set("y", y)?;
            Ok(pos)
        })?,
    )?;

    let weak = ctx.clone();
    input.set(
        "getGamepadAxis",
        lua.create_function(move |_, (pad, axis): (usize, LuaValue)| {
            let axis = input_ref(&axis)?;
            Ok(upgrade(&weak)?.input.borrow().gamepad_axis(pad, axis.borrowed()))
        })?,
    )?;

    let weak = ctx.clone();
    input.set(
        "getGamepadButton",
        lua.create_function(move |_, (pad, button): (usize, LuaValue)| {
            let button = input_ref(&button)?;
            Ok(upgrade(&weak)?.input.borrow().gamepad_button(pad, button.borrowed()))
        })?,
    )?;

    let weak = ctx.clone();
    input.set(
        "getGamepadCount",
        lua.create_function(move |_, ()| Ok(upgrade(&weak)?.input.borrow().gamepad_count()))?,
    )?;

    Ok(input)
}

// ==================== GUI ====================

fn gui_table(lua: &Lua, ctx: &Weak<PlayContext>) -> LuaResult<LuaTable> {
    let gui = lua.create_table()?;

    let weak = ctx.clone();
    gui.set(
        "addButton",
        lua.create_function(
            move |_, (label, func, container): (String, LuaFunction, Option<String>)| {
                let ctx = upgrade(&weak)?;
                Ok(ctx.gui.add_button(&label, gui_callback(&weak, func), container.as_deref()))
            },
        )?,
    )?;

    // gui.addSlider(label, min, max, value, callback, step?, container?)
    // The sixth argument may be the container name when no step is given.
    let weak = ctx.clone();
    gui.set(
        "addSlider",
        lua.create_function(
            move |_,
                  (label, min, max, value, func, sixth, seventh): (
                String,
                f64,
                f64,
                f64,
                LuaFunction,
                LuaValue,
                Option<String>,
            )| {
                let (step, container) = match sixth {
                    LuaValue::Integer(i) => (Some(i as f64), seventh),
                    LuaValue::Number(n) => (Some(n), seventh),
                    LuaValue::String(s) => (None, Some(s.to_str()?.to_string())),
                    _ => (None, seventh),
                };
                let ctx = upgrade(&weak)?;
                Ok(ctx.gui.add_slider(
                    &label,
                    min,
                    max,
                    value,
                    gui_callback(&weak, func),
                    step,
                    container.as_deref(),
                ))
            },
        )?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "addToggle",
        lua.create_function(
            move |_, (label, value, func, container): (String, bool, LuaFunction, Option<String>)| {
                let ctx = upgrade(&weak)?;
                Ok(ctx.gui.add_toggle(&label, value, gui_callback(&weak, func), container.as_deref()))
            },
        )?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "addText",
        lua.create_function(move |_, (text, container): (String, Option<String>)| {
            Ok(upgrade(&weak)?.gui.add_text(&text, container.as_deref()))
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "addInput",
        lua.create_function(
            move |_, (label, value, func, container): (String, String, LuaFunction, Option<String>)| {
                let ctx = upgrade(&weak)?;
                Ok(ctx.gui.add_input(&label, &value, gui_callback(&weak, func), container.as_deref()))
            },
        )?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "removeElement",
        lua.create_function(move |_, id: String| {
            upgrade(&weak)?.gui.remove_element(&id);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "clearContainer",
        lua.create_function(move |_, name: Option<String>| {
            upgrade(&weak)?
                .gui
                .clear_container(name.as_deref().unwrap_or(DEFAULT_CONTAINER));
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "clearAll",
        lua.create_function(move |_, ()| {
            upgrade(&weak)?.gui.clear_all();
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "getElements",
        lua.create_function(move |lua, container: Option<String>| {
            let elements = upgrade(&weak)?
                .gui
                .get_elements(container.as_deref().unwrap_or(DEFAULT_CONTAINER));
            lua.to_value(&elements)
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "getElement",
        lua.create_function(move |lua, id: String| match upgrade(&weak)?.gui.get_element(&id) {
            Some(element) => lua.to_value(&element),
            None => Ok(LuaValue::Nil),
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "getAllContainers",
        lua.create_function(move |_, ()| Ok(upgrade(&weak)?.gui.get_all_containers()))?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "updateElement",
        lua.create_function(move |lua, (id, fields): (String, LuaTable)| {
            let update: GuiElementUpdate = lua.from_value(LuaValue::Table(fields))?;
            upgrade(&weak)?.gui.update_element(&id, update);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    gui.set(
        "triggerElement",
        lua.create_function(move |_, (id, value): (String, LuaValue)| {
            upgrade(&weak)?.gui.trigger_element(&id, gui_value_from_lua(&value));
            Ok(())
        })?,
    )?;

    Ok(gui)
}

pub(crate) fn build_api(lua: &Lua, ctx: &Weak<PlayContext>, wait: LuaFunction) -> LuaResult<ApiTables> {
    Ok(ApiTables {
        engine: engine_table(lua, ctx, wait)?,
        scene: scene_table(lua, ctx)?,
        input: input_table(lua, ctx)?,
        gui: gui_table(lua, ctx)?,
    })
}

// ==================== OBJECT RECORD ====================

fn animation_options(ctx: &Weak<PlayContext>, table: &LuaTable) -> LuaResult<(AnimationOptions, f32)> {
    let property: String = table.get("property")?;
    let to = property_value_from_lua(&table.get::<LuaValue>("to")?)?;
    let duration = table.get::<Option<f32>>("duration")?.unwrap_or(1000.0);
    let easing = table
        .get::<Option<String>>("easing")?
        .map(|name| parse_easing(&name))
        .unwrap_or_default();
    let delay = table.get::<Option<f32>>("delay")?.unwrap_or(0.0);

    let capture_at_start = table.get::<Option<bool>>("captureAtStart")?.unwrap_or(false);

    let mut options = AnimationOptions::new(property, to, duration)
        .with_easing(easing)
        .with_capture_at_start(capture_at_start);
    if let Some(func) = table.get::<Option<LuaFunction>>("onUpdate")? {
        options = options.with_on_update(update_callback(ctx, func));
    }
    if let Some(func) = table.get::<Option<LuaFunction>>("onComplete")? {
        let on_complete: CompleteCallback = timer_callback(ctx, func);
        options = options.with_on_complete(on_complete);
    }
    Ok((options, delay))
}

/// Build the `object` record of one live object.
///
/// The record carries `id`, `name`, `type`, `tags` and `mesh`, the
/// `animate`/`animateSequence` helpers, message helpers that send with the
/// object as source, and the empty `onClick`, `onHoverEnter`, `onHoverExit`
/// and `onMessage` slots for the script to fill.
pub(crate) fn object_record(
    lua: &Lua,
    ctx: &Weak<PlayContext>,
    world: &SceneWorld,
    world_rc: &Rc<std::cell::RefCell<SceneWorld>>,
    id: &str,
) -> LuaResult<LuaTable> {
    let record = lua.create_table()?;
    record.set("id", id)?;
    record.set("name", world.name(id).unwrap_or_default())?;
    record.set("type", world.geometry(id).map(|g| g.as_str()).unwrap_or("box"))?;
    let tags: Vec<String> = world
        .tags(id)
        .map(|t| t.iter().map(String::from).collect())
        .unwrap_or_default();
    record.set("tags", tags.clone())?;

    let handle = SceneObjectHandle::new(world_rc.clone(), id);
    record.set("mesh", LuaMesh::new(handle.clone()))?;

    let target: Rc<dyn AnimationTarget> = Rc::new(handle);

    let weak = ctx.clone();
    let anim_target = target.clone();
    record.set(
        "animate",
        lua.create_function(move |_, args: LuaMultiValue| {
            let table = last_table(&args)?;
            let (options, _) = animation_options(&weak, &table)?;
            upgrade(&weak)?
                .animations
                .animate(anim_target.clone(), options)
                .map_err(LuaError::external)
        })?,
    )?;

    let weak = ctx.clone();
    let seq_target = target;
    record.set(
        "animateSequence",
        lua.create_function(move |_, args: LuaMultiValue| {
            let list = last_table(&args)?;
            let mut steps = Vec::new();
            for step in list.sequence_values::<LuaTable>() {
                let (options, delay) = animation_options(&weak, &step?)?;
                steps.push(SequenceStep { options, delay });
            }
            upgrade(&weak)?
                .animations
                .animate_sequence(seq_target.clone(), steps)
                .map_err(LuaError::external)
        })?,
    )?;

    let weak = ctx.clone();
    let source = id.to_string();
    record.set(
        "sendMessage",
        lua.create_function(move |lua, args: LuaMultiValue| {
            let (target, kind, data): (String, String, LuaValue) = lua.unpack_multi(without_self(args))?;
            let data = json_from_lua(lua, data)?;
            upgrade(&weak)?
                .messages
                .send_message_from(Some(&source), &target, &kind, &data);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    let source = id.to_string();
    record.set(
        "sendMessageToTag",
        lua.create_function(move |lua, args: LuaMultiValue| {
            let (tag, kind, data): (String, String, LuaValue) = lua.unpack_multi(without_self(args))?;
            let data = json_from_lua(lua, data)?;
            upgrade(&weak)?
                .messages
                .send_message_to_tag(Some(&source), &tag, &kind, &data);
            Ok(())
        })?,
    )?;

    let weak = ctx.clone();
    let source = id.to_string();
    record.set(
        "broadcast",
        lua.create_function(move |lua, args: LuaMultiValue| {
            let (kind, data): (String, LuaValue) = lua.unpack_multi(without_self(args))?;
            let data = json_from_lua(lua, data)?;
            upgrade(&weak)?.messages.broadcast(Some(&source), &kind, &data);
            Ok(())
        })?,
    )?;

    record.set(
        "hasTag",
        lua.create_function(move |lua, args: LuaMultiValue| {
            let tag: String = lua.unpack_multi(without_self(args))?;
            Ok(tags.iter().any(|t| *t == tag))
        })?,
    )?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::runtimeconfig::RuntimeConfig;
    use crate::resources::sceneworld::SceneObject;

    fn context() -> Rc<PlayContext> {
        let ctx = PlayContext::new(&RuntimeConfig::new()).unwrap();
        ctx.world.borrow_mut().set_objects(vec![
            SceneObject::new("p", "Player").with_tags(["hero"]),
            SceneObject::new("e", "Enemy").with_tags(["enemy"]),
        ]);
        let world = ctx.world.clone();
        for id in ["p", "e"] {
            let record = object_record(ctx.lua(), &ctx.weak(), &world.borrow(), &world, id).unwrap();
            ctx.set_record(id, record);
        }
        ctx
    }

    fn run(ctx: &PlayContext, code: &str) {
        let api = ctx.api().unwrap();
        let func = ctx
            .runtime()
            .compile("test", "engine, scene, input, gui", code)
            .unwrap();
        ctx.invoke(&func, (api.engine, api.scene, api.input, api.gui)).unwrap();
    }

    #[test]
    fn test_set_timeout_returns_id_and_schedules() {
        let ctx = context();
        run(&ctx, "local id = engine.setTimeout(function() end, 100); assert(id == 1)");
        assert_eq!(ctx.timers.active_timer_count(), 1);
        run(&ctx, "engine.clearTimeout(1)");
        assert_eq!(ctx.timers.active_timer_count(), 0);
    }

    #[test]
    fn test_scene_lookups_return_records_with_mesh() {
        let ctx = context();
        run(
            &ctx,
            r#"
            local p = scene.getObjectByName("Player")
            assert(p.id == "p" and p.mesh ~= nil)
            assert(scene.getObjectByName("Nobody") == nil)
            local enemies = scene.findObjectsByTag("enemy")
            assert(#enemies == 1 and enemies[1].name == "Enemy")
            "#,
        );
    }

    #[test]
    fn test_host_commands_are_queued() {
        let ctx = context();
        run(&ctx, "engine.setGravity(0, -9.8, 0); engine.spawn('cube', {name = 'x'}); scene.restart()");
        let cmds = ctx.runtime().drain_host_commands();
        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds[0], HostCmd::SetGravity { .. }));
        assert!(matches!(&cmds[1], HostCmd::Spawn { object_type, .. } if object_type == "cube"));
        assert_eq!(cmds[2], HostCmd::Restart);
        assert!(ctx.runtime().drain_host_commands().is_empty());
    }

    #[test]
    fn test_gui_functions_build_elements() {
        let ctx = context();
        run(
            &ctx,
            r#"
            gui.addButton("Go", function() end)
            gui.addSlider("Speed", 0, 10, 5, function(v) end, "panel")
            gui.addToggle("On", true, function(v) end, "panel")
            assert(#gui.getElements("panel") == 2)
            "#,
        );
        assert_eq!(ctx.gui.get_all_containers(), vec!["default", "panel"]);
    }

    #[test]
    fn test_object_animate_validates_path() {
        let ctx = context();
        let record = ctx.record("p").unwrap();
        let animate: LuaFunction = record.get("animate").unwrap();
        let lua = ctx.lua();
        let good = lua.load("return {property = 'position.y', to = 2, duration = 100}").eval::<LuaTable>().unwrap();
        let bad = lua.load("return {property = 'position.w', to = 2, duration = 100}").eval::<LuaTable>().unwrap();
        assert!(animate.call::<String>(good).is_ok());
        assert!(animate.call::<String>(bad).is_err());
        assert_eq!(ctx.animations.active_count(), 1);
    }

    #[test]
    fn test_object_has_tag_accepts_colon_call() {
        let ctx = context();
        let record = ctx.record("e").unwrap();
        let has_tag: LuaFunction = record.get("hasTag").unwrap();
        assert!(has_tag.call::<bool>("enemy").unwrap());
        assert!(has_tag.call::<bool>((record.clone(), "enemy")).unwrap());
        assert!(!has_tag.call::<bool>("hero").unwrap());
    }
}
