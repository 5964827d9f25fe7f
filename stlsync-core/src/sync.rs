/// Import-or-update pass over a folder of STL files.
use std::path::Path;

use nalgebra::Matrix4;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::geometry::MeshData;
use crate::scene::{relink_materials, SceneHost};
use crate::snapshot::list_files;
use crate::stl::read_stl;
use crate::transform::TransformConfig;

/// Case-sensitive suffix of files the pass picks up.
pub const STL_SUFFIX: &str = ".stl";

/// Object name for a mesh file, or `None` if the file is not one.
pub fn object_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(STL_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

/// What a pass did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
}

/// A file the pass skipped, with the reason.
#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: SyncError,
}

/// Outcome of one [`import_or_update`] pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub updated: usize,
    pub created: usize,
    pub failures: Vec<FileFailure>,
}

impl SyncReport {
    pub fn counts(&self) -> (usize, usize) {
        (self.updated, self.created)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Create or refresh one scene object per `.stl` file in `dir`.
///
/// Per-file failures are collected in the report and never stop the pass;
/// only an unreadable directory or an invalid transform aborts it.
pub fn import_or_update<S: SceneHost + ?Sized>(
    scene: &mut S,
    dir: &Path,
    transform: &TransformConfig,
) -> Result<SyncReport, SyncError> {
    let matrix = transform.matrix()?;
    let files = list_files(dir)?;

    relink_materials(scene);

    let mut report = SyncReport::default();
    for file in files {
        let Some(file_name) = file.name.to_str() else {
            if file.path.extension().is_some_and(|ext| ext == "stl") {
                let error = SyncError::InvalidFileName {
                    path: file.path.clone(),
                };
                warn!(%error, "skipping file");
                report.failures.push(FileFailure {
                    file: file.name.to_string_lossy().into_owned(),
                    error,
                });
            }
            continue;
        };
        let Some(name) = object_name(file_name) else {
            if file_name == STL_SUFFIX {
                warn!(file = file_name, "skipping mesh file with an empty name");
            }
            continue;
        };

        match sync_file(scene, &file.path, name, &matrix) {
            Ok(SyncAction::Created) => {
                info!(object = name, "created");
                report.created += 1;
            }
            Ok(SyncAction::Updated) => {
                info!(object = name, "updated");
                report.updated += 1;
            }
            Err(error) => {
                warn!(file = file_name, %error, "skipping file");
                report.failures.push(FileFailure {
                    file: file_name.to_string(),
                    error,
                });
            }
        }
    }

    info!(
        updated = report.updated,
        created = report.created,
        failed = report.failures.len(),
        "{} updated, {} created.",
        report.updated,
        report.created
    );
    Ok(report)
}

/// Import one file into the object called `name`.
pub fn sync_file<S: SceneHost + ?Sized>(
    scene: &mut S,
    path: &Path,
    name: &str,
    matrix: &Matrix4<f32>,
) -> Result<SyncAction, SyncError> {
    let imported = read_stl(path).map_err(|source| SyncError::ImportFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = MeshData::from_import(&imported, matrix);

    let (id, action) = match scene.find_object(name) {
        Some(id) => {
            let is_mesh = scene.object(id).is_some_and(|o| o.is_mesh());
            if !is_mesh {
                return Err(SyncError::NameCollision {
                    name: name.to_string(),
                });
            }
            scene.replace_mesh(id, mesh)?;
            (id, SyncAction::Updated)
        }
        None => (scene.create_mesh_object(name, mesh)?, SyncAction::Created),
    };

    if let Some(object) = scene.object_mut(id) {
        object.ensure_material_slot();
    }
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MemoryScene, ObjectKind};
    use std::fs;
    use tempfile::TempDir;

    const TRIANGLE: &str = "solid t\nfacet normal 0 0 1\nouter loop\n\
        vertex 0 0 0\nvertex 1000 0 0\nvertex 0 1000 0\nendloop\nendfacet\nendsolid t\n";

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("part.stl"), Some("part"));
        assert_eq!(object_name("part.v2.stl"), Some("part.v2"));
        assert_eq!(object_name("part.STL"), None);
        assert_eq!(object_name(".stl"), None);
        assert_eq!(object_name("readme.txt"), None);
    }

    #[test]
    fn test_create_then_update() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("part.stl"), TRIANGLE).unwrap();
        let mut scene = MemoryScene::new();
        let config = TransformConfig::default();

        let report = import_or_update(&mut scene, temp.path(), &config).unwrap();
        assert_eq!(report.counts(), (0, 1));
        let part = scene.get("part").unwrap();
        assert_eq!(part.material_slots.len(), 1);
        assert!(part.mesh.as_ref().unwrap().smooth);
        let id = part.id;

        let report = import_or_update(&mut scene, temp.path(), &config).unwrap();
        assert_eq!(report.counts(), (1, 0));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.find_object("part"), Some(id));
        assert_eq!(scene.get("part").unwrap().material_slots.len(), 1);
    }

    #[test]
    fn test_name_collision_with_non_mesh() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("rig.stl"), TRIANGLE).unwrap();
        let mut scene = MemoryScene::new();
        scene.add_object("rig", ObjectKind::Other).unwrap();

        let report = import_or_update(&mut scene, temp.path(), &TransformConfig::default()).unwrap();
        assert_eq!(report.counts(), (0, 0));
        assert!(matches!(
            report.failures[0].error,
            SyncError::NameCollision { ref name } if name == "rig"
        ));
    }

    #[test]
    fn test_ignores_other_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("part.STL"), TRIANGLE).unwrap();
        fs::write(temp.path().join("notes.txt"), "hello").unwrap();
        let mut scene = MemoryScene::new();

        let report = import_or_update(&mut scene, temp.path(), &TransformConfig::default()).unwrap();
        assert_eq!(report.counts(), (0, 0));
        assert!(report.is_clean());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_empty_stem_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".stl"), TRIANGLE).unwrap();
        let mut scene = MemoryScene::new();

        let report = import_or_update(&mut scene, temp.path(), &TransformConfig::default()).unwrap();
        assert_eq!(report.counts(), (0, 0));
        assert!(report.is_clean());
        assert!(scene.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_mesh_names_fail_per_file() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        for raw in [&b"a\xff.stl"[..], &b"a\xfe.stl"[..], &b"b\xff.txt"[..]] {
            fs::write(temp.path().join(OsStr::from_bytes(raw)), TRIANGLE).unwrap();
        }
        fs::write(temp.path().join("part.stl"), TRIANGLE).unwrap();
        let mut scene = MemoryScene::new();

        let report = import_or_update(&mut scene, temp.path(), &TransformConfig::default()).unwrap();
        assert_eq!(report.counts(), (0, 1));
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, SyncError::InvalidFileName { .. })));
        assert_eq!(scene.len(), 1);
        assert!(scene.get("part").is_some());
    }

    #[test]
    fn test_missing_directory_aborts() {
        let temp = TempDir::new().unwrap();
        let mut scene = MemoryScene::new();
        let err = import_or_update(&mut scene, &temp.path().join("nope"), &TransformConfig::default())
            .unwrap_err();
        assert!(err.is_pass_level());
    }
}
