//! Live scene objects during play.
//!
//! The host hands the engine a list of [`SceneObject`] descriptions when play
//! starts. Each object is spawned as an ECS entity carrying the components
//! from [`crate::components`], and the engine reads them back every frame with
//! [`SceneWorld::objects`] so the host can render the current state.
//!
//! Object ids are the editor's ids; [`SceneWorld`] keeps an id-to-entity index
//! and the original ordering so lookups such as [`SceneWorld::find_by_name`]
//! return the first match in scene order.

use crate::components::material::Material;
use crate::components::objectinfo::{Geometry, ObjectId, ObjectName};
use crate::components::property::{PropertyPath, PropertyValue};
use crate::components::script::{Script, Visible};
use crate::components::tags::Tags;
use crate::components::transform::Transform3;
use crate::error::PropertyError;
use crate::resources::animations::AnimationTarget;
use bevy_ecs::prelude::*;
use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_visible() -> bool {
    true
}

/// Serializable description of one scene object, as exchanged with the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl SceneObject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            geometry: Geometry::default(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
            material: Material::default(),
            tags: Vec::new(),
            script: None,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }
}

/// A whole scene file: objects plus the optional global script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescription {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_script: Option<String>,
}

/// Frame timing of the running session.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since play started.
    pub elapsed: f32,
    pub frame: u64,
}

/// ECS-backed store of the live objects.
pub struct SceneWorld {
    world: World,
    index: FxHashMap<String, Entity>,
    order: Vec<String>,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(FrameTime::default());
        Self {
            world,
            index: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Replace the live object list.
    pub fn set_objects(&mut self, objects: Vec<SceneObject>) {
        for entity in self.index.drain().map(|(_, e)| e) {
            self.world.despawn(entity);
        }
        self.order.clear();
        for obj in objects {
            if self.index.contains_key(&obj.id) {
                log::warn!("Duplicate scene object id '{}' skipped", obj.id);
                continue;
            }
            self.insert(obj);
        }
    }

    fn insert(&mut self, obj: SceneObject) {
        let entity = self
            .world
            .spawn((
                ObjectId(obj.id.clone()),
                ObjectName(obj.name),
                obj.geometry,
                Transform3 {
                    position: obj.position,
                    rotation: obj.rotation,
                    scale: obj.scale,
                },
                obj.material,
                Visible(obj.visible),
                obj.tags.into_iter().collect::<Tags>(),
                Script(obj.script.unwrap_or_default()),
            ))
            .id();
        self.order.push(obj.id.clone());
        self.index.insert(obj.id, entity);
    }

    /// Add one object at the end of the scene order.
    pub fn spawn_object(&mut self, obj: SceneObject) -> bool {
        if self.index.contains_key(&obj.id) {
            return false;
        }
        self.insert(obj);
        true
    }

    pub fn despawn_object(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(entity) => {
                self.world.despawn(entity);
                self.order.retain(|o| o != id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Object ids in scene order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    fn get<T: Component>(&self, id: &str) -> Option<&T> {
        self.index.get(id).and_then(|e| self.world.get::<T>(*e))
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.get::<ObjectName>(id).map(|n| n.0.as_str())
    }

    pub fn geometry(&self, id: &str) -> Option<Geometry> {
        self.get::<Geometry>(id).copied()
    }

    pub fn tags(&self, id: &str) -> Option<&Tags> {
        self.get::<Tags>(id)
    }

    pub fn script(&self, id: &str) -> Option<&str> {
        self.get::<Script>(id)
            .filter(|s| !s.is_blank())
            .map(|s| s.0.as_str())
    }

    pub fn transform(&self, id: &str) -> Option<Transform3> {
        self.get::<Transform3>(id).copied()
    }

    pub fn material(&self, id: &str) -> Option<Material> {
        self.get::<Material>(id).copied()
    }

    pub fn visible(&self, id: &str) -> Option<bool> {
        self.get::<Visible>(id).map(|v| v.0)
    }

    /// First object in scene order with this display name.
    pub fn find_by_name(&self, name: &str) -> Option<&str> {
        self.order
            .iter()
            .find(|id| self.name(id) == Some(name))
            .map(String::as_str)
    }

    /// Objects carrying `tag`, in scene order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.tags(id).is_some_and(|t| t.has(tag)))
            .cloned()
            .collect()
    }

    /// Number of objects currently rendered.
    pub fn visible_count(&mut self) -> usize {
        let mut query = self.world.query::<&Visible>();
        query.iter(&self.world).filter(|v| v.0).count()
    }

    fn parts(&self, id: &str) -> Result<(Entity, Transform3, Material, Visible), PropertyError> {
        let missing = || PropertyError::MissingTarget(id.to_string());
        let entity = *self.index.get(id).ok_or_else(missing)?;
        let transform = *self.world.get::<Transform3>(entity).ok_or_else(missing)?;
        let material = *self.world.get::<Material>(entity).ok_or_else(missing)?;
        let visible = *self.world.get::<Visible>(entity).ok_or_else(missing)?;
        Ok((entity, transform, material, visible))
    }

    pub fn read_property(&self, id: &str, path: &PropertyPath) -> Result<PropertyValue, PropertyError> {
        let (_, t, m, v) = self.parts(id)?;
        Ok(path.read(&t, &m, &v))
    }

    pub fn write_property(
        &mut self,
        id: &str,
        path: &PropertyPath,
        value: PropertyValue,
    ) -> Result<(), PropertyError> {
        let (entity, mut t, mut m, mut v) = self.parts(id)?;
        path.write(value, &mut t, &mut m, &mut v)?;
        match self.world.get_entity_mut(entity) {
            Ok(mut e) => {
                e.insert((t, m, v));
                Ok(())
            }
            Err(_) => Err(PropertyError::MissingTarget(id.to_string())),
        }
    }

    /// Description of one object with its current state.
    pub fn object(&self, id: &str) -> Option<SceneObject> {
        let (_, t, m, v) = self.parts(id).ok()?;
        Some(SceneObject {
            id: id.to_string(),
            name: self.name(id)?.to_string(),
            geometry: self.geometry(id)?,
            position: t.position,
            rotation: t.rotation,
            scale: t.scale,
            visible: v.0,
            material: m,
            tags: self.tags(id).map(|t| t.iter().map(String::from).collect()).unwrap_or_default(),
            script: self.script(id).map(String::from),
        })
    }

    /// All objects with their current state, in scene order.
    pub fn objects(&self) -> Vec<SceneObject> {
        self.order.iter().filter_map(|id| self.object(id)).collect()
    }

    pub fn set_frame_time(&mut self, delta: f32, elapsed: f32) {
        if let Some(mut ft) = self.world.get_resource_mut::<FrameTime>() {
            ft.delta = delta;
            ft.elapsed = elapsed;
            ft.frame += 1;
        }
    }

    pub fn frame_time(&self) -> FrameTime {
        self.world.get_resource::<FrameTime>().copied().unwrap_or_default()
    }
}

/// Shared handle to one object, used as an animation target and by scripts.
#[derive(Clone)]
pub struct SceneObjectHandle {
    world: Rc<RefCell<SceneWorld>>,
    id: String,
}

impl SceneObjectHandle {
    pub fn new(world: Rc<RefCell<SceneWorld>>, id: impl Into<String>) -> Self {
        Self { world, id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exists(&self) -> bool {
        self.world.borrow().contains(&self.id)
    }

    pub fn with_world<R>(&self, f: impl FnOnce(&SceneWorld, &str) -> R) -> R {
        f(&self.world.borrow(), &self.id)
    }
}

impl AnimationTarget for SceneObjectHandle {
    fn read_property(&self, path: &PropertyPath) -> Result<PropertyValue, PropertyError> {
        self.world.borrow().read_property(&self.id, path)
    }

    fn write_property(&self, path: &PropertyPath, value: PropertyValue) -> Result<(), PropertyError> {
        self.world.borrow_mut().write_property(&self.id, path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SceneWorld {
        let mut world = SceneWorld::new();
        world.set_objects(vec![
            SceneObject::new("a", "Player").with_tags(["hero"]).with_script("-- move"),
            SceneObject::new("b", "Goblin").with_tags(["enemy"]),
            SceneObject::new("c", "Goblin").with_tags(["enemy", "boss"]),
        ]);
        world
    }

    #[test]
    fn test_lookup_by_name_and_tag_in_scene_order() {
        let world = sample();
        assert_eq!(world.find_by_name("Goblin"), Some("b"));
        assert_eq!(world.find_by_name("Nobody"), None);
        assert_eq!(world.find_by_tag("enemy"), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(world.script("a"), Some("-- move"));
        assert_eq!(world.script("b"), None);
    }

    #[test]
    fn test_property_roundtrip_through_ecs() {
        let mut world = sample();
        let path: PropertyPath = "position.x".parse().unwrap();
        world.write_property("b", &path, PropertyValue::Number(4.0)).unwrap();
        assert_eq!(world.read_property("b", &path), Ok(PropertyValue::Number(4.0)));
        assert_eq!(world.object("b").unwrap().position.x, 4.0);
        assert_eq!(
            world.read_property("zzz", &path),
            Err(PropertyError::MissingTarget("zzz".into()))
        );
    }

    #[test]
    fn test_set_objects_replaces_and_skips_duplicates() {
        let mut world = sample();
        world.set_objects(vec![SceneObject::new("x", "One"), SceneObject::new("x", "Two")]);
        assert_eq!(world.len(), 1);
        assert_eq!(world.name("x"), Some("One"));
        assert!(!world.contains("a"));
    }

    #[test]
    fn test_visible_count_and_despawn() {
        let mut world = sample();
        let vis: PropertyPath = "visible".parse().unwrap();
        world.write_property("a", &vis, PropertyValue::Flag(false)).unwrap();
        assert_eq!(world.visible_count(), 2);
        assert!(world.despawn_object("b"));
        assert_eq!(world.ids(), ["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_scene_description_json() {
        let json = r#"{
            "objects": [
                {"id": "1", "name": "Cube", "type": "cube", "position": [0, 1, 0],
                 "material": {"color": {"r": 1, "g": 0, "b": 0}, "opacity": 0.5}}
            ],
            "globalScript": "print('hi')"
        }"#;
        let scene: SceneDescription = serde_json::from_str(json).unwrap();
        let obj = &scene.objects[0];
        assert_eq!(obj.geometry, Geometry::Box);
        assert_eq!(obj.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(obj.scale, Vec3::ONE);
        assert!(obj.visible);
        assert_eq!(obj.material.opacity, 0.5);
        assert_eq!(scene.global_script.as_deref(), Some("print('hi')"));
    }

    #[test]
    fn test_frame_time_resource() {
        let mut world = SceneWorld::new();
        world.set_frame_time(0.016, 0.016);
        world.set_frame_time(0.016, 0.032);
        let ft = world.frame_time();
        assert_eq!(ft.frame, 2);
        assert_eq!(ft.elapsed, 0.032);
    }
}
