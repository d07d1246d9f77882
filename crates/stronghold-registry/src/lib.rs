//! Stronghold Registry — the static mapping from check identifier to its
//! declarative definition.
//!
//! Definitions (skills offered, outcome effect tables) load from YAML;
//! interaction hooks are code and are registered onto a definition after
//! loading.

pub mod definition;
pub mod hooks;
pub mod registry;

pub use definition::{CheckDefinition, GameCommand, OutcomeEffect, SkillOption};
pub use hooks::{
    CheckHooks, ExecuteHook, HookContext, OutcomeHook, PostApplyHook, PreRollHook,
    RequirementsHook,
};
pub use registry::PipelineRegistry;
