/// Named commands callable from a host UI or the command line.
use std::collections::BTreeMap;

use tracing::info;

use crate::config::Settings;
use crate::error::CommandError;
use crate::scene::{copy_transform, relink_materials, ObjectId, SceneHost};
use crate::sync::{import_or_update, SyncReport};

pub const IMPORT_OR_UPDATE: &str = "import_or_update";
pub const COPY_TRANSFORM: &str = "copy_transform";
pub const RELINK_MATERIALS: &str = "relink_materials";

/// Everything a command may read or touch.
pub struct CommandContext<'a> {
    pub scene: &'a mut dyn SceneHost,
    pub settings: &'a Settings,
    /// Active object, the source for `copy_transform`.
    pub active: Option<ObjectId>,
    pub selected: Vec<ObjectId>,
}

impl<'a> CommandContext<'a> {
    pub fn new(scene: &'a mut dyn SceneHost, settings: &'a Settings) -> Self {
        Self {
            scene,
            settings,
            active: None,
            selected: Vec::new(),
        }
    }

    pub fn with_selection(mut self, active: ObjectId, selected: Vec<ObjectId>) -> Self {
        self.active = Some(active);
        self.selected = selected;
        self
    }
}

#[derive(Debug)]
pub enum CommandOutput {
    Synced(SyncReport),
    TransformsCopied(usize),
    MaterialsRelinked(usize),
}

pub type Handler = fn(&mut CommandContext<'_>) -> Result<CommandOutput, CommandError>;

/// Name to handler lookup.
pub struct CommandTable {
    handlers: BTreeMap<&'static str, Handler>,
}

impl CommandTable {
    /// Table with the built-in commands registered.
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.register(IMPORT_OR_UPDATE, run_import_or_update);
        table.register(COPY_TRANSFORM, run_copy_transform);
        table.register(RELINK_MATERIALS, run_relink_materials);
        table
    }

    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: &'static str, handler: Handler) {
        self.handlers.insert(name, handler);
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub fn dispatch(
        &self,
        name: &str,
        ctx: &mut CommandContext<'_>,
    ) -> Result<CommandOutput, CommandError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        handler(ctx)
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

fn run_import_or_update(ctx: &mut CommandContext<'_>) -> Result<CommandOutput, CommandError> {
    let report = import_or_update(
        &mut *ctx.scene,
        &ctx.settings.watch_dir,
        &ctx.settings.transform(),
    )?;
    Ok(CommandOutput::Synced(report))
}

fn run_copy_transform(ctx: &mut CommandContext<'_>) -> Result<CommandOutput, CommandError> {
    let source = ctx.active.ok_or(CommandError::NotApplicable {
        command: COPY_TRANSFORM,
        reason: "no active object",
    })?;
    if !ctx.selected.iter().any(|&id| id != source) {
        return Err(CommandError::NotApplicable {
            command: COPY_TRANSFORM,
            reason: "select at least one object besides the active one",
        });
    }
    let copied = copy_transform(&mut *ctx.scene, source, &ctx.selected)?;
    info!(copied, "copied transforms from active object");
    Ok(CommandOutput::TransformsCopied(copied))
}

fn run_relink_materials(ctx: &mut CommandContext<'_>) -> Result<CommandOutput, CommandError> {
    let relinked = relink_materials(&mut *ctx.scene);
    info!(relinked, "linked materials to objects");
    Ok(CommandOutput::MaterialsRelinked(relinked))
}
