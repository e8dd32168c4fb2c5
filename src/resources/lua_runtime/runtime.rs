//! Lua runtime core implementation.
//!
//! This module contains the [`LuaRuntime`] struct which owns the sandboxed
//! Lua state that every script of a play session runs in.
//!
//! # Sandbox
//!
//! Only the `base`, `table`, `string` and `math` libraries are opened. Code
//! loading (`load`, `loadstring`, `dofile`, `loadfile`, `require`), function
//! environments (`setfenv`, `getfenv`) and `string.dump` are removed, and
//! `print` is routed to the `lua` log target. Scripts reach the engine only
//! through the capability tables passed to them as arguments.
//!
//! Each compiled script gets its own environment table that falls back to
//! the shared globals, so script-level globals do not leak between objects.

use crate::events::host::HostCmd;
use mlua::prelude::*;
use std::cell::RefCell;

use log::{info, warn};

/// First value yielded by `engine.wait`.
pub(super) const WAIT_MARKER: &str = "__sceneplay_wait";

/// Parameter list of an object script body.
pub const OBJECT_SCRIPT_PARAMS: &str = "object, mesh, delta, time, engine, scene, input, gui";
/// Parameter list of the global scene script body.
pub const GLOBAL_SCRIPT_PARAMS: &str = "engine, scene, input, gui, time, delta";

const REMOVED_GLOBALS: &[&str] = &[
    "dofile",
    "loadfile",
    "load",
    "loadstring",
    "require",
    "module",
    "setfenv",
    "getfenv",
    "collectgarbage",
    "newproxy",
];

/// Shared state accessible from Lua function closures.
/// This is stored in Lua's app_data and allows Lua functions to queue commands.
pub(super) struct LuaAppData {
    pub(super) host_commands: RefCell<Vec<HostCmd>>,
}

/// The Lua interpreter of one play session.
pub struct LuaRuntime {
    lua: Lua,
    make_env: LuaFunction,
    wait: LuaFunction,
}

impl LuaRuntime {
    /// Creates a new sandboxed Lua runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization fails.
    pub fn new() -> LuaResult<Self> {
        let lua = Lua::new_with(
            LuaStdLib::TABLE | LuaStdLib::STRING | LuaStdLib::MATH,
            LuaOptions::default(),
        )?;

        lua.set_app_data(LuaAppData {
            host_commands: RefCell::new(Vec::new()),
        });

        Self::sandbox(&lua)?;

        let make_env = lua
            .load("return function() return setmetatable({}, { __index = _G }) end")
            .set_name("=sandbox")
            .eval::<LuaFunction>()?;

        let wait = lua
            .load(format!(
                r#"
                local yield, running = coroutine.yield, coroutine.running
                return function(ms)
                    local co, main = running()
                    if co == nil or main then
                        error("engine.wait can only be used inside a script", 2)
                    end
                    yield("{WAIT_MARKER}", tonumber(ms) or 0)
                end
                "#
            ))
            .set_name("=engine.wait")
            .eval::<LuaFunction>()?;

        Ok(Self { lua, make_env, wait })
    }

    fn sandbox(lua: &Lua) -> LuaResult<()> {
        let globals = lua.globals();
        for name in REMOVED_GLOBALS {
            globals.raw_set(*name, LuaValue::Nil)?;
        }
        if let Ok(string) = globals.get::<LuaTable>("string") {
            string.raw_set("dump", LuaValue::Nil)?;
        }

        globals.set(
            "print",
            lua.create_function(|_, args: LuaVariadic<LuaValue>| {
                let parts: Vec<String> = args
                    .iter()
                    .map(|v| v.to_string().unwrap_or_else(|_| v.type_name().to_string()))
                    .collect();
                info!(target: "lua", "{}", parts.join("\t"));
                Ok(())
            })?,
        )?;

        globals.set(
            "warn",
            lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        Ok(())
    }

    /// Compiles a script body into a function taking `params`.
    ///
    /// The parameter declaration is prepended on the script's first line so
    /// error line numbers match the source the user wrote.
    ///
    /// # Errors
    ///
    /// Returns the syntax error, if any.
    pub fn compile(&self, name: &str, params: &str, source: &str) -> LuaResult<LuaFunction> {
        let env: LuaTable = self.make_env.call(())?;
        self.lua
            .load(format!("local {params} = ...; {source}"))
            .set_name(format!("={name}"))
            .set_environment(env)
            .into_function()
    }

    /// The function exposed as `engine.wait`.
    pub fn wait_function(&self) -> LuaFunction {
        self.wait.clone()
    }

    /// Drains the host commands queued by scripts since the last call.
    pub fn drain_host_commands(&self) -> Vec<HostCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.host_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    /// Returns a reference to the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}
