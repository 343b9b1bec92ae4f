//! Core channel modes
//!
//! Flags `i`, `m`, `n`, `p`, `s`, `t`, the channel key `k` and the member
//! limit `l`.

use modeircd_core::mode::{ModeContext, ParamBehavior};
use modeircd_core::{ModeAction, ModeHandler, ModeType, Module, ParamSpec, Result, Server};
use std::sync::Arc;

/// Longest accepted channel key
pub const MAX_KEY_LENGTH: usize = 32;

const SIMPLE_MODES: &[(&str, char)] = &[
    ("inviteonly", 'i'),
    ("moderated", 'm'),
    ("noextmsg", 'n'),
    ("private", 'p'),
    ("secret", 's'),
    ("topiclock", 't'),
];

/// Channel key (`+k <key>`)
pub struct KeyMode;

impl ParamBehavior for KeyMode {
    fn on_set(&self, mh: &ModeHandler, ctx: &mut ModeContext<'_>, param: &mut String) -> ModeAction {
        // Local users must remove the old key before setting a new one
        if ctx.source_is_local() && ctx.channel().is_some_and(|c| c.is_mode_set(mh)) {
            return ModeAction::Deny;
        }
        if param.contains(',') {
            return ModeAction::Deny;
        }
        if let Some((idx, _)) = param.char_indices().nth(MAX_KEY_LENGTH) {
            param.truncate(idx);
        }
        ModeAction::Allow
    }

    fn on_unset(
        &self,
        _mh: &ModeHandler,
        ctx: &mut ModeContext<'_>,
        param: &str,
        current: &str,
    ) -> ModeAction {
        if ctx.source_is_local() && param != current {
            ModeAction::Deny
        } else {
            ModeAction::Allow
        }
    }
}

/// Member limit (`+l <count>`)
pub struct LimitMode;

/// Leading decimal digits of `text` as a number, 0 if there are none
fn leading_number(text: &str) -> u64 {
    text.chars()
        .take_while(char::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(d.to_digit(10).unwrap_or(0)))
        })
}

impl ParamBehavior for LimitMode {
    fn on_set(&self, _mh: &ModeHandler, _ctx: &mut ModeContext<'_>, param: &mut String) -> ModeAction {
        let limit = leading_number(param);
        if limit == 0 {
            return ModeAction::Deny;
        }
        *param = limit.to_string();
        ModeAction::Allow
    }

    /// The smaller limit wins
    fn resolve_conflict(&self, theirs: &str, ours: &str) -> bool {
        leading_number(theirs) < leading_number(ours)
    }
}

/// Provides the core channel modes
#[derive(Debug, Default)]
pub struct ChannelModesModule;

impl ChannelModesModule {
    pub fn new() -> Self {
        Self
    }
}

impl Module for ChannelModesModule {
    fn name(&self) -> &str {
        "chanmodes"
    }

    fn description(&self) -> &str {
        "Provides the core channel modes +iklmnpst"
    }

    fn init(&self, server: &mut Server) -> Result<()> {
        for (name, letter) in SIMPLE_MODES {
            server.modes.add_mode(Arc::new(ModeHandler::simple(
                self.name(),
                name,
                *letter,
                ModeType::Channel,
            )))?;
        }

        server.modes.add_mode(Arc::new(
            ModeHandler::param(self.name(), "key", 'k', ParamSpec::Always, KeyMode)
                .with_syntax("<key>"),
        ))?;
        server.modes.add_mode(Arc::new(
            ModeHandler::param(self.name(), "limit", 'l', ParamSpec::SetOnly, LimitMode)
                .with_syntax("<limit>"),
        ))?;
        Ok(())
    }
}
