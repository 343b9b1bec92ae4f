//! Channel and user mode engine
//!
//! Modes are registered with the [`ModeParser`] by modules. Every change to a
//! mode, whether it comes from a local MODE command, a remote server or a
//! module, is expressed as a [`ChangeList`] and pushed through
//! [`ModeParser::process`], which validates, applies and announces it.

pub mod change;
pub mod handler;
pub mod list;
pub mod param;
pub mod parser;
pub mod prefix;
pub mod watcher;

pub use change::{Change, ChangeList};
pub use handler::{ModeBehavior, ModeContext, ModeHandler, ModeKind};
pub use list::{ListItem, ListModeBase, ListNumerics, ModeList};
pub use param::{ParamBehavior, ParamModeBase};
pub use parser::ModeParser;
pub use prefix::PrefixMode;
pub use watcher::{ModeWatcher, WatcherMap};

use crate::user::UserId;
use std::ops::{BitOr, BitOrAssign};

/// Index into the dense per-entity mode bitset
pub type ModeId = usize;

/// Size of the mode id pool for each target type
pub const MODEID_MAX: usize = 64;

/// Longest parameter accepted when adding a mode
pub const MODE_PARAM_MAX: usize = 250;

/// Rank of the voice prefix
pub const VOICE_VALUE: u32 = 10000;
/// Rank of the halfop prefix
pub const HALFOP_VALUE: u32 = 20000;
/// Rank of the op prefix
pub const OP_VALUE: u32 = 30000;

/// What kind of entity a mode applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeType {
    User,
    Channel,
}

impl ModeType {
    pub(crate) fn index(self) -> usize {
        match self {
            ModeType::User => 0,
            ModeType::Channel => 1,
        }
    }

    /// Lowercase name used in numerics
    pub fn as_str(self) -> &'static str {
        match self {
            ModeType::User => "user",
            ModeType::Channel => "channel",
        }
    }
}

/// When a mode takes a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    /// Never
    None,
    /// Only when being set
    SetOnly,
    /// When being set and when being unset
    Always,
}

/// Outcome of a handler's state mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    Allow,
    Deny,
}

/// Tri-state result of access checks and module hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModResult {
    Deny,
    Passthru,
    Allow,
}

/// Flags controlling [`ModeParser::process`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessFlags(u8);

impl ProcessFlags {
    pub const NONE: ProcessFlags = ProcessFlags(0);
    /// Do not propagate applied changes to linked servers
    pub const LOCAL_ONLY: ProcessFlags = ProcessFlags(1);
    /// Reconcile against existing state using each mode's tie-break
    pub const MERGE: ProcessFlags = ProcessFlags(2);
    /// Run channel access checks against the source's rank
    pub const CHECK_ACCESS: ProcessFlags = ProcessFlags(4);

    pub fn contains(self, other: ProcessFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ProcessFlags {
    type Output = ProcessFlags;

    fn bitor(self, rhs: ProcessFlags) -> ProcessFlags {
        ProcessFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ProcessFlags {
    fn bitor_assign(&mut self, rhs: ProcessFlags) {
        self.0 |= rhs.0;
    }
}

/// The entity a batch of changes is applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeTarget {
    /// A channel, by casemapped name
    Channel(String),
    /// A user, by id
    User(UserId),
}

impl ModeTarget {
    /// Target for the named channel
    pub fn channel(name: &str) -> Self {
        ModeTarget::Channel(crate::utils::irc_to_lower(name))
    }

    pub fn mode_type(&self) -> ModeType {
        match self {
            ModeTarget::Channel(_) => ModeType::Channel,
            ModeTarget::User(_) => ModeType::User,
        }
    }

    pub fn channel_key(&self) -> Option<&str> {
        match self {
            ModeTarget::Channel(key) => Some(key),
            ModeTarget::User(_) => None,
        }
    }
}

/// Dense bitset of mode ids set on an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeBits(u64);

impl ModeBits {
    pub fn get(&self, id: ModeId) -> bool {
        id < MODEID_MAX && self.0 & (1u64 << id) != 0
    }

    pub fn set(&mut self, id: ModeId, value: bool) {
        if id >= MODEID_MAX {
            return;
        }
        if value {
            self.0 |= 1u64 << id;
        } else {
            self.0 &= !(1u64 << id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Ids of the set bits, lowest first
    pub fn iter(&self) -> impl Iterator<Item = ModeId> + '_ {
        (0..MODEID_MAX).filter(move |&id| self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_bits() {
        let mut bits = ModeBits::default();
        assert!(bits.is_empty());
        bits.set(0, true);
        bits.set(63, true);
        assert!(bits.get(0) && bits.get(63));
        assert!(!bits.get(1));
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 63]);
        bits.set(0, false);
        assert!(!bits.get(0));
        bits.set(MODEID_MAX, true);
        assert!(!bits.get(MODEID_MAX));
    }

    #[test]
    fn test_process_flags() {
        let flags = ProcessFlags::LOCAL_ONLY | ProcessFlags::MERGE;
        assert!(flags.contains(ProcessFlags::MERGE));
        assert!(!flags.contains(ProcessFlags::CHECK_ACCESS));
        assert!(ProcessFlags::NONE.contains(ProcessFlags::NONE));
    }
}
