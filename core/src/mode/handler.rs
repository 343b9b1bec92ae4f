//! Mode handlers
//!
//! A [`ModeHandler`] carries a mode's identity and dispatches to its behavior.
//! Behavior comes in a fixed set of shapes ([`ModeKind`]): simple flags,
//! membership prefixes, mask lists, single parameters, and fully custom modes
//! defined by a module through [`ModeBehavior`].

use super::{
    Change, ChangeList, ListModeBase, ModResult, ModeAction, ModeId, ModeParser, ModeTarget,
    ModeType, ParamBehavior, ParamModeBase, ParamSpec, PrefixMode, HALFOP_VALUE, MODEID_MAX,
};
use crate::channel::Channel;
use crate::network::Network;
use crate::user::{User, UserId};
use crate::Message;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Everything a handler or watcher may look at or mutate while a change is
/// being applied
pub struct ModeContext<'a> {
    /// The registry, for looking up other modes and ranks
    pub modes: &'a ModeParser,
    /// Users, channels and outbound queues
    pub net: &'a mut Network,
    /// Who is making the change
    pub source: UserId,
    /// What the change applies to
    pub target: &'a ModeTarget,
}

impl<'a> ModeContext<'a> {
    /// The target channel, if this is a channel change
    pub fn channel(&self) -> Option<&Channel> {
        self.target
            .channel_key()
            .and_then(|key| self.net.find_channel(key))
    }

    /// The target channel, mutably
    pub fn channel_mut(&mut self) -> Option<&mut Channel> {
        match self.target {
            ModeTarget::Channel(key) => self.net.find_channel_mut(key),
            ModeTarget::User(_) => None,
        }
    }

    /// The target user, mutably, if this is a user mode change
    pub fn target_user_mut(&mut self) -> Option<&mut User> {
        match self.target {
            ModeTarget::User(id) => self.net.find_user_mut(id),
            ModeTarget::Channel(_) => None,
        }
    }

    /// The user making the change
    pub fn source_user(&self) -> Option<&User> {
        self.net.find_user(&self.source)
    }

    /// Nickname of the source, `*` if it has vanished
    pub fn source_nick(&self) -> String {
        self.net.nick_of(&self.source)
    }

    /// Whether the source is a user connected to this server
    pub fn source_is_local(&self) -> bool {
        self.net.is_local(&self.source)
    }

    /// Send a numeric to the source
    pub fn write_numeric(&mut self, message: Message) {
        self.net.write_numeric(&self.source, message);
    }
}

/// Behavior of a custom mode
pub trait ModeBehavior: Send + Sync {
    /// Apply the change to the target; return [`ModeAction::Deny`] to drop it
    fn on_mode_change(
        &self,
        mh: &ModeHandler,
        ctx: &mut ModeContext<'_>,
        change: &mut Change,
    ) -> ModeAction;

    /// Channel access check; [`ModResult::Passthru`] falls back to rank comparison
    fn access_check(
        &self,
        _mh: &ModeHandler,
        _ctx: &ModeContext<'_>,
        _change: &mut Change,
    ) -> ModResult {
        ModResult::Passthru
    }

    /// Merge tie-break: true if `theirs` should replace `ours`
    fn resolve_conflict(&self, theirs: &str, ours: &str) -> bool {
        theirs < ours
    }

    /// Current parameter of the mode on a channel
    fn get_parameter(&self, _mh: &ModeHandler, _channel: &Channel) -> Option<String> {
        None
    }
}

/// The shape of a mode's behavior
pub enum ModeKind {
    /// A flag toggled on the target
    Simple,
    /// A membership rank with a nickname prefix
    Prefix(PrefixMode),
    /// A bounded list of masks
    List(ListModeBase),
    /// A single parameter
    Param(ParamModeBase),
    /// Module-defined behavior
    Custom(Box<dyn ModeBehavior>),
}

/// A registered (or registrable) mode
pub struct ModeHandler {
    name: String,
    letter: char,
    mode_type: ModeType,
    params: ParamSpec,
    creator: String,
    oper_only: bool,
    level_required: u32,
    syntax: Option<String>,
    id: AtomicUsize,
    kind: ModeKind,
}

impl ModeHandler {
    fn new(
        creator: &str,
        name: &str,
        letter: char,
        params: ParamSpec,
        mode_type: ModeType,
        kind: ModeKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            letter,
            mode_type,
            params,
            creator: creator.to_string(),
            oper_only: false,
            level_required: HALFOP_VALUE,
            syntax: None,
            id: AtomicUsize::new(MODEID_MAX),
            kind,
        }
    }

    /// A flag mode without a parameter
    pub fn simple(creator: &str, name: &str, letter: char, mode_type: ModeType) -> Self {
        Self::new(creator, name, letter, ParamSpec::None, mode_type, ModeKind::Simple)
    }

    /// A channel membership prefix mode
    pub fn prefix(creator: &str, name: &str, letter: char, rank: u32, prefix: char) -> Self {
        Self::new(
            creator,
            name,
            letter,
            ParamSpec::Always,
            ModeType::Channel,
            ModeKind::Prefix(PrefixMode::new(prefix, rank)),
        )
        .with_syntax("<nick>")
    }

    /// A channel list mode
    pub fn list(creator: &str, name: &str, letter: char, base: ListModeBase) -> Self {
        Self::new(
            creator,
            name,
            letter,
            ParamSpec::Always,
            ModeType::Channel,
            ModeKind::List(base),
        )
        .with_syntax("<mask>")
    }

    /// A channel mode holding one parameter
    pub fn param(
        creator: &str,
        name: &str,
        letter: char,
        params: ParamSpec,
        behavior: impl ParamBehavior + 'static,
    ) -> Self {
        Self::new(
            creator,
            name,
            letter,
            params,
            ModeType::Channel,
            ModeKind::Param(ParamModeBase::new(behavior)),
        )
    }

    /// A mode with module-defined behavior
    pub fn custom(
        creator: &str,
        name: &str,
        letter: char,
        params: ParamSpec,
        mode_type: ModeType,
        behavior: impl ModeBehavior + 'static,
    ) -> Self {
        Self::new(
            creator,
            name,
            letter,
            params,
            mode_type,
            ModeKind::Custom(Box::new(behavior)),
        )
    }

    /// Require operator permission to change this mode
    pub fn with_oper_only(mut self, oper_only: bool) -> Self {
        self.oper_only = oper_only;
        self
    }

    /// Channel rank needed to change this mode
    pub fn with_level_required(mut self, level: u32) -> Self {
        self.level_required = level;
        self
    }

    /// Ranks needed to grant and to take away a prefix mode; ignored for other modes
    pub fn with_prefix_ranks(mut self, set_rank: u32, unset_rank: u32) -> Self {
        if let ModeKind::Prefix(pm) = &mut self.kind {
            pm.set_base_ranks(set_rank, unset_rank);
        }
        self
    }

    /// Parameter syntax shown when the parameter is missing
    pub fn with_syntax(mut self, syntax: &str) -> Self {
        self.syntax = Some(syntax.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn mode_type(&self) -> ModeType {
        self.mode_type
    }

    pub fn param_spec(&self) -> ParamSpec {
        self.params
    }

    /// Name of the module that created this mode
    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn is_oper_only(&self) -> bool {
        self.oper_only
    }

    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    pub fn kind(&self) -> &ModeKind {
        &self.kind
    }

    /// Dense id, if the mode holds one
    pub fn id(&self) -> Option<ModeId> {
        let id = self.id.load(Ordering::Relaxed);
        (id < MODEID_MAX).then_some(id)
    }

    pub(crate) fn set_id(&self, id: Option<ModeId>) {
        self.id.store(id.unwrap_or(MODEID_MAX), Ordering::Relaxed);
    }

    /// Whether a change in the given direction needs a parameter
    pub fn needs_param(&self, adding: bool) -> bool {
        match self.params {
            ParamSpec::Always => true,
            ParamSpec::SetOnly => adding,
            ParamSpec::None => false,
        }
    }

    /// List and prefix modes: changes target entries rather than the whole mode
    pub fn is_list_mode(&self) -> bool {
        matches!(self.kind, ModeKind::List(_) | ModeKind::Prefix(_))
    }

    pub fn is_prefix_mode(&self) -> Option<&PrefixMode> {
        match &self.kind {
            ModeKind::Prefix(pm) => Some(pm),
            _ => None,
        }
    }

    pub fn is_list_mode_base(&self) -> Option<&ListModeBase> {
        match &self.kind {
            ModeKind::List(lm) => Some(lm),
            _ => None,
        }
    }

    pub fn is_param_mode(&self) -> Option<&ParamModeBase> {
        match &self.kind {
            ModeKind::Param(pm) => Some(pm),
            _ => None,
        }
    }

    /// Whether registration should allocate a dense id for this mode
    pub(crate) fn wants_id(&self) -> bool {
        self.mode_type == ModeType::User
            || matches!(self.kind, ModeKind::Param(_))
            || !self.is_list_mode()
    }

    /// Channel rank required to add or remove this mode
    pub fn level_required(&self, adding: bool) -> u32 {
        match &self.kind {
            ModeKind::Prefix(pm) => {
                if adding {
                    pm.set_rank()
                } else {
                    pm.unset_rank()
                }
            }
            _ => self.level_required,
        }
    }

    pub fn access_check(&self, ctx: &ModeContext<'_>, change: &mut Change) -> ModResult {
        match &self.kind {
            ModeKind::Prefix(pm) => pm.access_check(ctx, change),
            ModeKind::Custom(behavior) => behavior.access_check(self, ctx, change),
            _ => ModResult::Passthru,
        }
    }

    /// Apply the change to the target in `ctx`
    pub fn on_mode_change(&self, ctx: &mut ModeContext<'_>, change: &mut Change) -> ModeAction {
        match &self.kind {
            ModeKind::Simple => self.simple_mode_change(ctx, change),
            ModeKind::Prefix(pm) => pm.on_mode_change(self, ctx, change),
            ModeKind::List(lm) => lm.on_mode_change(self, ctx, change),
            ModeKind::Param(pm) => pm.on_mode_change(self, ctx, change),
            ModeKind::Custom(behavior) => behavior.on_mode_change(self, ctx, change),
        }
    }

    fn simple_mode_change(&self, ctx: &mut ModeContext<'_>, change: &Change) -> ModeAction {
        match ctx.target {
            ModeTarget::Channel(key) => match ctx.net.find_channel_mut(key) {
                Some(channel) if channel.is_mode_set(self) != change.adding => {
                    channel.set_mode(self, change.adding);
                    ModeAction::Allow
                }
                _ => ModeAction::Deny,
            },
            ModeTarget::User(id) => match ctx.net.find_user_mut(id) {
                Some(user) if user.is_mode_set(self) != change.adding => {
                    user.set_mode(self, change.adding);
                    ModeAction::Allow
                }
                _ => ModeAction::Deny,
            },
        }
    }

    /// Merge tie-break: true if the incoming parameter should replace ours
    pub fn resolve_conflict(&self, theirs: &str, ours: &str) -> bool {
        match &self.kind {
            ModeKind::Param(pm) => pm.resolve_conflict(theirs, ours),
            ModeKind::Custom(behavior) => behavior.resolve_conflict(theirs, ours),
            _ => theirs < ours,
        }
    }

    /// Current parameter of this mode on a channel
    pub fn get_parameter(&self, channel: &Channel) -> Option<String> {
        match &self.kind {
            ModeKind::Param(pm) => pm.get_parameter(self, channel),
            ModeKind::Custom(behavior) => behavior.get_parameter(self, channel),
            _ => None,
        }
    }

    /// Drop every trace of this mode from a channel without going through
    /// the pipeline. Returns true if anything was left to drop.
    pub(crate) fn force_remove(&self, channel: &mut Channel) -> bool {
        let mut found = channel.is_mode_set(self);
        channel.set_mode(self, false);
        match &self.kind {
            ModeKind::Prefix(_) => {
                for member in channel.members_mut() {
                    found |= member.set_prefix(self.letter, false);
                }
            }
            ModeKind::List(_) => found |= channel.extensions.unset(&ListModeBase::ext_key(self)),
            ModeKind::Param(_) => found |= channel.extensions.unset(&ParamModeBase::ext_key(self)),
            _ => {}
        }
        found
    }

    /// Queue changes that remove this mode entirely from a channel
    pub fn remove_mode(self: &Arc<Self>, net: &Network, channel: &Channel, changes: &mut ChangeList) {
        match &self.kind {
            ModeKind::Prefix(_) => {
                for member in channel.members() {
                    if member.has_mode(self.letter) {
                        if let Some(user) = net.find_user(&member.user_id) {
                            changes.push_remove_param(self, user.nick.clone());
                        }
                    }
                }
            }
            ModeKind::List(lm) => {
                if let Some(list) = lm.get_list(self, channel) {
                    for entry in list {
                        changes.push_remove_param(self, entry.mask.clone());
                    }
                }
            }
            _ => {
                if channel.is_mode_set(self) {
                    if self.needs_param(false) {
                        let param = self.get_parameter(channel).unwrap_or_default();
                        changes.push_remove_param(self, param);
                    } else {
                        changes.push_remove(self);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for ModeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeHandler")
            .field("name", &self.name)
            .field("letter", &self.letter)
            .field("mode_type", &self.mode_type)
            .field("id", &self.id())
            .finish()
    }
}
