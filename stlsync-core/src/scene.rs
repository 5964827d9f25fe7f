/// Scene host seam and an in-memory implementation.
///
/// The host editor owns objects, their world matrices, mesh data and
/// material slots. `SceneHost` is the slice of that API the importer
/// consumes; `MemoryScene` is a name-indexed object table that stands in
/// for a real editor.
use std::collections::HashMap;
use std::fmt;

use nalgebra::Matrix4;
use tracing::debug;

use crate::error::SceneError;
use crate::geometry::MeshData;

/// Stable handle to a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of entity an object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    /// Any non-mesh entity (empties, cameras, lights).
    Other,
}

/// Where a material slot stores its material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLink {
    /// Stored on the mesh data; lost when the mesh is replaced.
    Data,
    /// Stored on the object; survives mesh replacement.
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSlot {
    pub link: SlotLink,
    pub material: Option<String>,
}

impl MaterialSlot {
    pub fn empty() -> Self {
        Self {
            link: SlotLink::Data,
            material: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub world_matrix: Matrix4<f32>,
    pub mesh: Option<MeshData>,
    pub material_slots: Vec<MaterialSlot>,
}

impl SceneObject {
    pub fn is_mesh(&self) -> bool {
        self.kind == ObjectKind::Mesh
    }

    /// Append one empty slot when the object has none.
    pub fn ensure_material_slot(&mut self) {
        if self.material_slots.is_empty() {
            self.material_slots.push(MaterialSlot::empty());
        }
    }
}

/// Host editor primitives used by the importer and the commands.
pub trait SceneHost {
    /// First object with this name, if any.
    fn find_object(&self, name: &str) -> Option<ObjectId>;

    fn object(&self, id: ObjectId) -> Option<&SceneObject>;

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject>;

    /// All objects in creation order.
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Create a mesh object, link it into the scene and return its id.
    fn create_mesh_object(&mut self, name: &str, mesh: MeshData) -> Result<ObjectId, SceneError>;

    /// Swap an object's mesh data, keeping its id, world matrix and slots.
    ///
    /// Materials held by data-linked slots belonged to the old mesh and are
    /// cleared; object-linked slots keep their material.
    fn replace_mesh(&mut self, id: ObjectId, mesh: MeshData) -> Result<(), SceneError> {
        let object = self.object_mut(id).ok_or(SceneError::NoSuchObject(id))?;
        if !object.is_mesh() {
            return Err(SceneError::NotAMesh(object.name.clone()));
        }
        for slot in &mut object.material_slots {
            if slot.link == SlotLink::Data {
                slot.material = None;
            }
        }
        object.mesh = Some(mesh);
        Ok(())
    }
}

/// Switch every data-linked material slot to an object link, keeping the
/// material it showed. Returns how many slots changed.
pub fn relink_materials<S: SceneHost + ?Sized>(scene: &mut S) -> usize {
    let mut relinked = 0;
    for id in scene.object_ids() {
        let Some(object) = scene.object_mut(id) else {
            continue;
        };
        for slot in &mut object.material_slots {
            if slot.link == SlotLink::Data {
                slot.link = SlotLink::Object;
                relinked += 1;
            }
        }
    }
    relinked
}

/// Copy `source`'s world matrix onto every target other than `source`.
/// Returns how many objects were changed.
pub fn copy_transform<S: SceneHost + ?Sized>(
    scene: &mut S,
    source: ObjectId,
    targets: &[ObjectId],
) -> Result<usize, SceneError> {
    let matrix = scene
        .object(source)
        .ok_or(SceneError::NoSuchObject(source))?
        .world_matrix;

    let mut copied = 0;
    for &target in targets.iter().filter(|&&t| t != source) {
        let object = scene
            .object_mut(target)
            .ok_or(SceneError::NoSuchObject(target))?;
        object.world_matrix = matrix;
        copied += 1;
    }
    Ok(copied)
}

/// In-memory scene with unique object names.
#[derive(Debug, Default)]
pub struct MemoryScene {
    objects: Vec<SceneObject>,
    names: HashMap<String, ObjectId>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// Look an object up by name.
    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.find_object(name).and_then(|id| self.object(id))
    }

    /// Add a non-mesh object, e.g. an empty used as a parent.
    pub fn add_object(&mut self, name: &str, kind: ObjectKind) -> Result<ObjectId, SceneError> {
        self.insert(name, kind, None)
    }

    fn insert(
        &mut self,
        name: &str,
        kind: ObjectKind,
        mesh: Option<MeshData>,
    ) -> Result<ObjectId, SceneError> {
        if self.names.contains_key(name) {
            return Err(SceneError::DuplicateName(name.to_string()));
        }
        let id = ObjectId(self.objects.len());
        self.objects.push(SceneObject {
            id,
            name: name.to_string(),
            kind,
            world_matrix: Matrix4::identity(),
            mesh,
            material_slots: Vec::new(),
        });
        self.names.insert(name.to_string(), id);
        debug!(object = name, %id, "linked object into scene");
        Ok(id)
    }
}

impl SceneHost for MemoryScene {
    fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    fn create_mesh_object(&mut self, name: &str, mesh: MeshData) -> Result<ObjectId, SceneError> {
        self.insert(name, ObjectKind::Mesh, Some(mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_rejected() {
        let mut scene = MemoryScene::new();
        scene.create_mesh_object("part", MeshData::default()).unwrap();
        let err = scene.add_object("part", ObjectKind::Other).unwrap_err();
        assert_eq!(err, SceneError::DuplicateName("part".into()));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_replace_mesh_keeps_object_linked_materials() {
        let mut scene = MemoryScene::new();
        let id = scene.create_mesh_object("part", MeshData::default()).unwrap();
        {
            let object = scene.object_mut(id).unwrap();
            object.world_matrix = Matrix4::new_translation(&nalgebra::Vector3::new(1.0, 2.0, 3.0));
            object.material_slots = vec![
                MaterialSlot {
                    link: SlotLink::Object,
                    material: Some("steel".into()),
                },
                MaterialSlot {
                    link: SlotLink::Data,
                    material: Some("paint".into()),
                },
            ];
        }

        let mesh = MeshData {
            faces: vec![[0, 1, 2]],
            ..MeshData::default()
        };
        scene.replace_mesh(id, mesh).unwrap();

        let object = scene.object(id).unwrap();
        assert_eq!(object.mesh.as_ref().unwrap().face_count(), 1);
        assert_eq!(object.world_matrix[(0, 3)], 1.0);
        assert_eq!(object.material_slots[0].material.as_deref(), Some("steel"));
        assert_eq!(object.material_slots[1].material, None);
    }

    #[test]
    fn test_replace_mesh_rejects_non_mesh() {
        let mut scene = MemoryScene::new();
        let id = scene.add_object("rig", ObjectKind::Other).unwrap();
        assert_eq!(
            scene.replace_mesh(id, MeshData::default()),
            Err(SceneError::NotAMesh("rig".into()))
        );
    }

    #[test]
    fn test_relink_materials() {
        let mut scene = MemoryScene::new();
        let id = scene.create_mesh_object("part", MeshData::default()).unwrap();
        scene.object_mut(id).unwrap().material_slots = vec![
            MaterialSlot {
                link: SlotLink::Data,
                material: Some("paint".into()),
            },
            MaterialSlot {
                link: SlotLink::Object,
                material: None,
            },
        ];

        assert_eq!(relink_materials(&mut scene), 1);
        let slots = &scene.object(id).unwrap().material_slots;
        assert!(slots.iter().all(|s| s.link == SlotLink::Object));
        assert_eq!(slots[0].material.as_deref(), Some("paint"));
        assert_eq!(relink_materials(&mut scene), 0);
    }

    #[test]
    fn test_copy_transform_skips_source() {
        let mut scene = MemoryScene::new();
        let a = scene.create_mesh_object("a", MeshData::default()).unwrap();
        let b = scene.create_mesh_object("b", MeshData::default()).unwrap();
        let c = scene.add_object("c", ObjectKind::Other).unwrap();
        scene.object_mut(a).unwrap().world_matrix = Matrix4::new_scaling(3.0);

        assert_eq!(copy_transform(&mut scene, a, &[a, b, c]).unwrap(), 2);
        assert_eq!(scene.object(b).unwrap().world_matrix, Matrix4::new_scaling(3.0));
        assert_eq!(scene.object(c).unwrap().world_matrix, Matrix4::new_scaling(3.0));
    }

    #[test]
    fn test_copy_transform_missing_target() {
        let mut scene = MemoryScene::new();
        let a = scene.create_mesh_object("a", MeshData::default()).unwrap();
        assert_eq!(
            copy_transform(&mut scene, a, &[ObjectId(9)]),
            Err(SceneError::NoSuchObject(ObjectId(9)))
        );
    }
}
