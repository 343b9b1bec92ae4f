//! Core user modes: invisible, wallops, oper and hideoper

use modeircd_core::mode::{ModeBehavior, ModeContext};
use modeircd_core::{Change, ModeAction, ModeHandler, ModeType, Module, ParamSpec, Result, Server};
use std::sync::Arc;
use tracing::info;

/// `+o`: set by the server when a user opers up. A user may remove it from
/// themselves, which also drops their operator privileges.
pub struct OperMode;

impl ModeBehavior for OperMode {
    fn on_mode_change(
        &self,
        mh: &ModeHandler,
        ctx: &mut ModeContext<'_>,
        change: &mut Change,
    ) -> ModeAction {
        if change.adding && ctx.source_is_local() {
            return ModeAction::Deny;
        }

        let Some(user) = ctx.target_user_mut() else {
            return ModeAction::Deny;
        };
        if user.is_mode_set(mh) == change.adding {
            return ModeAction::Deny;
        }

        user.set_mode(mh, change.adding);
        if !change.adding && user.oper.take().is_some() {
            info!("{} is no longer an operator", user.nick);
        }
        ModeAction::Allow
    }
}

/// Provides `+i`, `+w`, `+o` and `+H`
#[derive(Debug, Default)]
pub struct UserModesModule;

impl UserModesModule {
    pub fn new() -> Self {
        Self
    }
}

impl Module for UserModesModule {
    fn name(&self) -> &str {
        "usermodes"
    }

    fn description(&self) -> &str {
        "Provides the user modes +iowH"
    }

    fn init(&self, server: &mut Server) -> Result<()> {
        server.modes.add_mode(Arc::new(ModeHandler::simple(
            self.name(),
            "invisible",
            'i',
            ModeType::User,
        )))?;
        server.modes.add_mode(Arc::new(ModeHandler::simple(
            self.name(),
            "wallops",
            'w',
            ModeType::User,
        )))?;
        server.modes.add_mode(Arc::new(ModeHandler::custom(
            self.name(),
            "oper",
            'o',
            ParamSpec::None,
            ModeType::User,
            OperMode,
        )))?;
        server.modes.add_mode(Arc::new(
            ModeHandler::simple(self.name(), "hideoper", 'H', ModeType::User).with_oper_only(true),
        ))?;
        Ok(())
    }
}
