//! Module system for extending the daemon

use crate::mode::{Change, ChangeList, ModResult, ModeTarget, ProcessFlags};
use crate::network::Network;
use crate::user::UserId;
use crate::{Message, Result, Server};
use std::sync::Arc;

/// Module trait that all modules must implement
pub trait Module: Send + Sync {
    /// Module name
    fn name(&self) -> &str;

    /// Module version
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// Module description
    fn description(&self) -> &str;

    /// Register modes, watchers and anything else the module provides.
    /// On error, everything the module registered is removed again.
    fn init(&self, server: &mut Server) -> Result<()>;

    /// Called before the module's modes and watchers are removed
    fn cleanup(&self, _server: &mut Server) -> Result<()> {
        Ok(())
    }

    /// Called after the configuration was reloaded
    fn on_rehash(&self, _server: &mut Server) -> Result<()> {
        Ok(())
    }

    /// Inspect a whole MODE command before it is processed. `Allow` lets a
    /// local user change another user's modes and skips access checks.
    fn on_pre_mode(
        &self,
        _net: &mut Network,
        _source: &UserId,
        _target: &ModeTarget,
        _changes: &mut ChangeList,
    ) -> ModResult {
        ModResult::Passthru
    }

    /// Inspect a mode change before any other check. `Deny` drops it when
    /// the source is local; `Allow` skips the channel access check.
    fn on_raw_mode(
        &self,
        _net: &mut Network,
        _source: &UserId,
        _target: &ModeTarget,
        _change: &Change,
    ) -> ModResult {
        ModResult::Passthru
    }

    /// Called with each batch of applied changes after it was announced
    fn on_mode(
        &self,
        _net: &mut Network,
        _source: &UserId,
        _target: &ModeTarget,
        _changes: &ChangeList,
        _flags: ProcessFlags,
    ) {
    }

    /// Commands this module handles, uppercase
    fn commands(&self) -> &[&'static str] {
        &[]
    }

    /// Handle one of [`Module::commands`] sent by a user
    fn handle_command(
        &self,
        _server: &mut Server,
        _source: &UserId,
        _message: &Message,
    ) -> Result<ModuleResult> {
        Ok(ModuleResult::NotHandled)
    }
}

/// Result of module command handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResult {
    /// Command was handled
    Handled,
    /// Command was not handled, continue to next module
    NotHandled,
}

/// Loaded modules in load order
#[derive(Default)]
pub struct ModuleManager {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleManager {
    /// Create a new module manager
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Arc<dyn Module>> {
        let pos = self.modules.iter().position(|m| m.name() == name)?;
        Some(self.modules.remove(pos))
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.get_module(name).is_some()
    }

    /// Names of loaded modules, in load order
    pub fn get_loaded_modules(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Module handling a command, if any
    pub fn command_handler(&self, command: &str) -> Option<Arc<dyn Module>> {
        self.modules
            .iter()
            .find(|m| m.commands().iter().any(|c| c.eq_ignore_ascii_case(command)))
            .cloned()
    }

    /// First non-passthrough pre-mode result, in load order
    pub fn on_pre_mode(
        &self,
        net: &mut Network,
        source: &UserId,
        target: &ModeTarget,
        changes: &mut ChangeList,
    ) -> ModResult {
        for module in &self.modules {
            match module.on_pre_mode(net, source, target, changes) {
                ModResult::Passthru => continue,
                result => return result,
            }
        }
        ModResult::Passthru
    }

    /// First non-passthrough raw mode result, in load order
    pub fn on_raw_mode(
        &self,
        net: &mut Network,
        source: &UserId,
        target: &ModeTarget,
        change: &Change,
    ) -> ModResult {
        for module in &self.modules {
            match module.on_raw_mode(net, source, target, change) {
                ModResult::Passthru => continue,
                result => return result,
            }
        }
        ModResult::Passthru
    }

    /// Tell every module about applied changes
    pub fn on_mode(
        &self,
        net: &mut Network,
        source: &UserId,
        target: &ModeTarget,
        changes: &ChangeList,
        flags: ProcessFlags,
    ) {
        for module in &self.modules {
            module.on_mode(net, source, target, changes, flags);
        }
    }
}
