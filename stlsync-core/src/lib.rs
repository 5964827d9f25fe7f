/// stlsync core library - folder-watching STL import
///
/// This library watches a folder of STL exports, parses them, and creates or
/// refreshes matching mesh objects in a scene while keeping their transforms
/// and material slots.

pub mod commands;
pub mod config;
pub mod error;
pub mod geometry;
pub mod scene;
pub mod snapshot;
pub mod stl;
pub mod sync;
pub mod transform;
pub mod watch;

// Re-export commonly used types
pub use commands::{CommandContext, CommandOutput, CommandTable};
pub use config::Settings;
pub use error::{CommandError, ConfigError, SceneError, StlError, SyncError, TransformError};
pub use geometry::{ImportedMesh, Mesh, MeshData, Triangle, Vertex};
pub use scene::{MemoryScene, ObjectId, SceneHost, SceneObject};
pub use snapshot::{FileRecord, Snapshot};
pub use sync::{import_or_update, SyncReport};
pub use transform::{Axis, Transform, TransformConfig};
pub use watch::{ChangeDetector, TickOutcome, WatchSession, WatchState, WatchToggle};
