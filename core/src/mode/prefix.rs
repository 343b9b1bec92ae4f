//! Membership prefix modes (op, halfop, voice, ...)

use super::{Change, ModResult, ModeAction, ModeContext, ModeHandler};
use crate::utils::irc_equals;
use crate::NumericReply;
use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Ranks {
    rank: u32,
    set_rank: u32,
    unset_rank: u32,
    self_remove: bool,
}

/// A channel mode granting a ranked membership privilege, shown as a
/// nickname prefix character.
///
/// Ranks can be changed while the mode is registered (on rehash). The
/// ranks the module registered with are kept so an override can be undone.
#[derive(Debug)]
pub struct PrefixMode {
    prefix: char,
    base: Ranks,
    ranks: RwLock<Ranks>,
}

impl PrefixMode {
    pub fn new(prefix: char, rank: u32) -> Self {
        let base = Ranks {
            rank,
            set_rank: rank,
            unset_rank: rank,
            self_remove: true,
        };
        Self {
            prefix,
            base,
            ranks: RwLock::new(base),
        }
    }

    /// Change the registered set and unset ranks, before the mode is shared
    pub(crate) fn set_base_ranks(&mut self, set_rank: u32, unset_rank: u32) {
        self.base.set_rank = set_rank;
        self.base.unset_rank = unset_rank;
        *self.ranks.get_mut() = self.base;
    }

    /// Go back to the ranks the mode was registered with
    pub fn reset(&self) {
        *self.ranks.write() = self.base;
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn rank(&self) -> u32 {
        self.ranks.read().rank
    }

    /// Rank required to grant this prefix
    pub fn set_rank(&self) -> u32 {
        self.ranks.read().set_rank
    }

    /// Rank required to take this prefix away
    pub fn unset_rank(&self) -> u32 {
        self.ranks.read().unset_rank
    }

    pub fn can_self_remove(&self) -> bool {
        self.ranks.read().self_remove
    }

    /// Replace all rank settings at once
    pub fn update(&self, rank: u32, set_rank: u32, unset_rank: u32, self_remove: bool) {
        *self.ranks.write() = Ranks {
            rank,
            set_rank,
            unset_rank,
            self_remove,
        };
    }

    pub(crate) fn access_check(&self, ctx: &ModeContext<'_>, change: &mut Change) -> ModResult {
        if !change.adding && self.can_self_remove() {
            if let Some(source) = ctx.source_user() {
                if irc_equals(&source.nick, &change.param) {
                    return ModResult::Allow;
                }
            }
        }
        ModResult::Passthru
    }

    pub(crate) fn on_mode_change(
        &self,
        mh: &ModeHandler,
        ctx: &mut ModeContext<'_>,
        change: &mut Change,
    ) -> ModeAction {
        // Local clients name targets by nick, servers by id
        let target = if ctx.source_is_local() {
            ctx.net.find_nick_id(&change.param)
        } else {
            Uuid::parse_str(&change.param)
                .ok()
                .filter(|id| ctx.net.find_user(id).is_some())
                .or_else(|| ctx.net.find_nick_id(&change.param))
        };

        let Some(target) = target else {
            let nick = ctx.source_nick();
            ctx.write_numeric(NumericReply::no_such_nick(&nick, &change.param));
            return ModeAction::Deny;
        };

        let target_nick = ctx.net.nick_of(&target);
        let Some(member) = ctx.channel_mut().and_then(|channel| channel.member_mut(&target)) else {
            return ModeAction::Deny;
        };

        change.param = target_nick;
        if member.set_prefix(mh.letter(), change.adding) {
            ModeAction::Allow
        } else {
            ModeAction::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{HALFOP_VALUE, OP_VALUE, VOICE_VALUE};

    #[test]
    fn test_update_replaces_ranks() {
        let pm = PrefixMode::new('@', OP_VALUE);
        assert_eq!(pm.set_rank(), OP_VALUE);
        assert!(pm.can_self_remove());

        pm.update(OP_VALUE, HALFOP_VALUE, OP_VALUE, false);
        assert_eq!(pm.rank(), OP_VALUE);
        assert_eq!(pm.set_rank(), HALFOP_VALUE);
        assert_eq!(pm.unset_rank(), OP_VALUE);
        assert!(!pm.can_self_remove());

        pm.reset();
        assert_eq!(pm.set_rank(), OP_VALUE);
        assert!(pm.can_self_remove());
    }

    #[test]
    fn test_base_ranks_survive_reset() {
        let mut pm = PrefixMode::new('+', VOICE_VALUE);
        pm.set_base_ranks(HALFOP_VALUE, HALFOP_VALUE);
        pm.update(VOICE_VALUE, OP_VALUE, VOICE_VALUE, true);

        pm.reset();
        assert_eq!(pm.rank(), VOICE_VALUE);
        assert_eq!(pm.set_rank(), HALFOP_VALUE);
        assert_eq!(pm.unset_rank(), HALFOP_VALUE);
    }
}
