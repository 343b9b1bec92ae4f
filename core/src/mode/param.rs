//! Channel modes holding a single parameter (key, limit, ...)

use super::{Change, ModeAction, ModeContext, ModeHandler};
use crate::channel::Channel;

/// Validation and canonicalization for a parameter mode
pub trait ParamBehavior: Send + Sync {
    /// Check a new value. `param` may be rewritten to its canonical form,
    /// which is what gets stored and announced.
    fn on_set(&self, mh: &ModeHandler, ctx: &mut ModeContext<'_>, param: &mut String) -> ModeAction;

    /// Check a removal; `param` is what was given, `current` the value in effect
    fn on_unset(
        &self,
        _mh: &ModeHandler,
        _ctx: &mut ModeContext<'_>,
        _param: &str,
        _current: &str,
    ) -> ModeAction {
        ModeAction::Allow
    }

    /// Merge tie-break: true if `theirs` should replace `ours`
    fn resolve_conflict(&self, theirs: &str, ours: &str) -> bool {
        theirs < ours
    }
}

/// Stores the current value on the channel and drives a [`ParamBehavior`]
pub struct ParamModeBase {
    behavior: Box<dyn ParamBehavior>,
}

impl ParamModeBase {
    pub fn new(behavior: impl ParamBehavior + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
        }
    }

    pub(crate) fn ext_key(mh: &ModeHandler) -> String {
        format!("parammode:{}", mh.name())
    }

    pub fn get_parameter(&self, mh: &ModeHandler, channel: &Channel) -> Option<String> {
        channel.extensions.get::<String>(&Self::ext_key(mh)).cloned()
    }

    pub fn resolve_conflict(&self, theirs: &str, ours: &str) -> bool {
        self.behavior.resolve_conflict(theirs, ours)
    }

    pub(crate) fn on_mode_change(
        &self,
        mh: &ModeHandler,
        ctx: &mut ModeContext<'_>,
        change: &mut Change,
    ) -> ModeAction {
        let Some(channel) = ctx.channel() else {
            return ModeAction::Deny;
        };
        let was_set = channel.is_mode_set(mh);
        let current = self.get_parameter(mh, channel);

        if change.adding {
            if self.behavior.on_set(mh, ctx, &mut change.param) == ModeAction::Deny {
                return ModeAction::Deny;
            }
            if was_set && current.as_deref() == Some(change.param.as_str()) {
                return ModeAction::Deny;
            }
            let Some(channel) = ctx.channel_mut() else {
                return ModeAction::Deny;
            };
            channel.set_mode(mh, true);
            channel
                .extensions
                .set(&Self::ext_key(mh), change.param.clone());
            return ModeAction::Allow;
        }

        if !was_set {
            return ModeAction::Deny;
        }
        let current = current.unwrap_or_default();
        if self.behavior.on_unset(mh, ctx, &change.param, &current) == ModeAction::Deny {
            return ModeAction::Deny;
        }
        if let Some(channel) = ctx.channel_mut() {
            channel.set_mode(mh, false);
            channel.extensions.unset(&Self::ext_key(mh));
        }
        // Removal always announces the value that was in effect
        if mh.needs_param(false) {
            change.param = current;
        }
        ModeAction::Allow
    }
}

impl std::fmt::Debug for ParamModeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamModeBase").finish_non_exhaustive()
    }
}
