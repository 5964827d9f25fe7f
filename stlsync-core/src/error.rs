/// Error types for import, scene and watch operations.
use std::path::PathBuf;

use thiserror::Error;

use crate::scene::ObjectId;
use crate::transform::Axis;

/// Errors raised while reading an STL file.
#[derive(Debug, Error)]
pub enum StlError {
    /// The file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes than a binary header plus triangle count.
    #[error("File too small to be a valid STL ({len} bytes)")]
    TooShort { len: usize },

    /// Binary body shorter than the declared triangle count requires.
    #[error("Unexpected end of file: header declares {expected} triangles, data holds {actual}")]
    Truncated { expected: usize, actual: usize },

    /// ASCII body did not follow the `solid`/`facet`/`endsolid` grammar.
    #[error("Failed to parse ASCII STL: {0}")]
    Ascii(String),
}

/// Errors building the import matrix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Forward and up lie on the same axis.
    #[error("Forward axis {forward} and up axis {up} must be different axes")]
    ParallelAxes { forward: Axis, up: Axis },

    /// Scale must be a positive finite number.
    #[error("Invalid scale {0}; expected a positive finite number")]
    InvalidScale(f32),

    /// Axis label not one of X, Y, Z, -X, -Y, -Z.
    #[error("Unknown axis '{0}'; expected one of X, Y, Z, -X, -Y, -Z")]
    UnknownAxis(String),
}

/// Errors raised by a scene host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// An object with this name already exists.
    #[error("An object named '{0}' already exists")]
    DuplicateName(String),

    /// The id does not refer to an object in this scene.
    #[error("No object with id {0}")]
    NoSuchObject(ObjectId),

    /// The object carries no mesh data.
    #[error("Object '{0}' is not a mesh object")]
    NotAMesh(String),
}

/// Errors raised by an import pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The watched directory is missing or unreadable.
    #[error("Watched directory unavailable: {path}: {source}")]
    PathUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One file failed to parse.
    #[error("Import of {path} failed: {source}")]
    ImportFailed {
        path: PathBuf,
        #[source]
        source: StlError,
    },

    /// A mesh file whose name is not valid UTF-8 and so cannot name an object.
    #[error("File name of {path} is not valid UTF-8")]
    InvalidFileName { path: PathBuf },

    /// The derived object name belongs to something that is not a mesh.
    #[error("Object name '{name}' is taken by a non-mesh object")]
    NameCollision { name: String },

    /// The scene refused to create or update an object.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The configured axes or scale do not form a valid matrix.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl SyncError {
    /// Create a directory error with path context.
    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PathUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts a whole pass rather than a single file.
    pub fn is_pass_level(&self) -> bool {
        matches!(self, Self::PathUnavailable { .. } | Self::Transform(_))
    }
}

/// Errors loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("I/O error reading settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`crate::Settings`].
    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Poll interval must be at least one second.
    #[error("Poll interval must be at least 1 second")]
    InvalidInterval,

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Errors dispatching a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No handler is registered under this name.
    #[error("Unknown command '{0}'")]
    Unknown(String),

    /// The command's preconditions do not hold for the current context.
    #[error("Command '{command}' not applicable: {reason}")]
    NotApplicable {
        command: &'static str,
        reason: &'static str,
    },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}
