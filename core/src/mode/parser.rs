//! The mode registry and change pipeline

use super::{
    Change, ChangeList, ModResult, ModeAction, ModeContext, ModeHandler, ModeId, ModeKind,
    ModeTarget, ModeType, ModeWatcher, ProcessFlags, WatcherMap, MODEID_MAX, MODE_PARAM_MAX,
};
use crate::channel::Channel;
use crate::config::Config;
use crate::module::ModuleManager;
use crate::network::Network;
use crate::user::{User, UserId};
use crate::{Error, Message, MessageType, NumericReply, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const TYPES: usize = 2;

/// Owns every registered mode handler and watcher, and applies batches of
/// mode changes to users and channels.
pub struct ModeParser {
    by_letter: [FxHashMap<char, Arc<ModeHandler>>; TYPES],
    by_name: [FxHashMap<String, Arc<ModeHandler>>; TYPES],
    by_id: [Vec<Option<Arc<ModeHandler>>>; TYPES],
    free_ids: [Vec<ModeId>; TYPES],
    prefix_modes: Vec<Arc<ModeHandler>>,
    list_modes: Vec<Arc<ModeHandler>>,
    watchers: WatcherMap,
    max_modes: usize,
}

impl Default for ModeParser {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ModeParser {
    /// Create an empty registry announcing at most `max_modes` changes per line
    pub fn new(max_modes: usize) -> Self {
        let pool = || (0..MODEID_MAX).rev().collect::<Vec<_>>();
        Self {
            by_letter: Default::default(),
            by_name: Default::default(),
            by_id: [vec![None; MODEID_MAX], vec![None; MODEID_MAX]],
            free_ids: [pool(), pool()],
            prefix_modes: Vec::new(),
            list_modes: Vec::new(),
            watchers: WatcherMap::new(),
            max_modes: max_modes.max(1),
        }
    }

    pub fn max_modes(&self) -> usize {
        self.max_modes
    }

    pub fn set_max_modes(&mut self, max_modes: usize) {
        self.max_modes = max_modes.max(1);
    }

    /// Mode letters are ASCII letters only
    pub fn is_mode_char(letter: char) -> bool {
        letter.is_ascii_alphabetic()
    }

    /// Register a mode handler.
    ///
    /// Fails without changing anything if the letter, name or prefix is
    /// invalid or taken, or if no dense id is left for the mode's type.
    pub fn add_mode(&mut self, mh: Arc<ModeHandler>) -> Result<()> {
        let letter = mh.letter();
        if !Self::is_mode_char(letter) {
            return Err(Error::InvalidModeLetter {
                name: mh.name().to_string(),
                letter,
            });
        }

        if let Some(pm) = mh.is_prefix_mode() {
            let prefix = pm.prefix();
            if !prefix.is_ascii_graphic() || matches!(prefix, ',' | ':' | '#') {
                return Err(Error::InvalidPrefix {
                    name: mh.name().to_string(),
                    prefix,
                });
            }
            if let Some(other) = self.find_prefix(prefix) {
                return Err(Error::DuplicatePrefix {
                    name: mh.name().to_string(),
                    prefix,
                    other: other.name().to_string(),
                    creator: other.creator().to_string(),
                });
            }
        }

        let ty = mh.mode_type().index();
        if let Some(other) = self.by_letter[ty].get(&letter) {
            return Err(Error::DuplicateModeLetter {
                name: mh.name().to_string(),
                letter,
                other: other.name().to_string(),
                creator: other.creator().to_string(),
            });
        }
        if let Some(other) = self.by_name[ty].get(mh.name()) {
            return Err(Error::DuplicateModeName {
                name: mh.name().to_string(),
                letter: other.letter(),
                creator: other.creator().to_string(),
            });
        }

        if mh.wants_id() {
            let id = self.free_ids[ty]
                .pop()
                .ok_or(Error::OutOfModeIds(mh.mode_type().as_str()))?;
            mh.set_id(Some(id));
            self.by_id[ty][id] = Some(Arc::clone(&mh));
        }

        if mh.is_prefix_mode().is_some() {
            self.prefix_modes.push(Arc::clone(&mh));
        }
        if mh.is_list_mode_base().is_some() {
            self.list_modes.push(Arc::clone(&mh));
        }
        self.by_letter[ty].insert(letter, Arc::clone(&mh));
        self.by_name[ty].insert(mh.name().to_string(), Arc::clone(&mh));

        debug!(
            "Registered {} mode {} ({}) from {}",
            mh.mode_type().as_str(),
            mh.name(),
            letter,
            mh.creator()
        );
        Ok(())
    }

    /// Unregister a mode handler, first removing the mode from every user or
    /// channel holding it. Returns false if `mh` is not the registered
    /// handler for its letter and name.
    pub fn del_mode(
        &mut self,
        net: &mut Network,
        modules: &ModuleManager,
        mh: &Arc<ModeHandler>,
    ) -> bool {
        if !self.is_registered(mh) {
            return false;
        }

        let fake = net.fake_client();
        match mh.mode_type() {
            ModeType::User => {
                let holders: Vec<UserId> = net
                    .users()
                    .filter(|user| user.is_mode_set(mh))
                    .map(|user| user.id)
                    .collect();
                for id in holders {
                    let mut changes = ChangeList::new();
                    changes.push_remove(mh);
                    self.process(
                        net,
                        modules,
                        &fake,
                        &ModeTarget::User(id),
                        &mut changes,
                        ProcessFlags::LOCAL_ONLY,
                    );
                }
            }
            ModeType::Channel => {
                let keys: Vec<String> = net.channel_keys().cloned().collect();
                for key in keys {
                    let mut changes = ChangeList::new();
                    if let Some(channel) = net.find_channel(&key) {
                        mh.remove_mode(net, channel, &mut changes);
                    }
                    if !changes.is_empty() {
                        self.process(
                            net,
                            modules,
                            &fake,
                            &ModeTarget::Channel(key),
                            &mut changes,
                            ProcessFlags::LOCAL_ONLY,
                        );
                    }
                }
            }
        }

        // A watcher or the handler may have refused the removal
        let mut leftover = 0;
        match mh.mode_type() {
            ModeType::User => {
                for user in net.users_mut().filter(|user| user.is_mode_set(mh)) {
                    user.set_mode(mh, false);
                    leftover += 1;
                }
            }
            ModeType::Channel => {
                for channel in net.channels_mut() {
                    if mh.force_remove(channel) {
                        leftover += 1;
                    }
                }
            }
        }
        if leftover > 0 {
            warn!(
                "Mode {} ({}) was still set on {} {}s, cleared",
                mh.name(),
                mh.letter(),
                leftover,
                mh.mode_type().as_str()
            );
        }

        let ty = mh.mode_type().index();
        self.by_letter[ty].remove(&mh.letter());
        self.by_name[ty].remove(mh.name());
        if let Some(id) = mh.id() {
            self.by_id[ty][id] = None;
            self.free_ids[ty].push(id);
            mh.set_id(None);
        }
        self.prefix_modes.retain(|other| !Arc::ptr_eq(other, mh));
        self.list_modes.retain(|other| !Arc::ptr_eq(other, mh));

        debug!(
            "Unregistered {} mode {} ({}) from {}",
            mh.mode_type().as_str(),
            mh.name(),
            mh.letter(),
            mh.creator()
        );
        true
    }

    /// Unregister every mode and watcher created by a module
    pub fn del_modes_by_creator(
        &mut self,
        net: &mut Network,
        modules: &ModuleManager,
        creator: &str,
    ) -> usize {
        let owned: Vec<Arc<ModeHandler>> = self
            .by_name
            .iter()
            .flat_map(|map| map.values())
            .filter(|mh| mh.creator() == creator)
            .cloned()
            .collect();

        let removed = owned
            .iter()
            .filter(|mh| self.del_mode(net, modules, mh))
            .count();
        let watchers = self.watchers.remove_by_creator(creator);
        if removed > 0 || watchers > 0 {
            debug!(
                "Removed {} modes and {} watchers owned by {}",
                removed, watchers, creator
            );
        }
        removed
    }

    /// Whether this exact handler is the one registered for its letter and name
    pub fn is_registered(&self, mh: &Arc<ModeHandler>) -> bool {
        let ty = mh.mode_type().index();
        let same = |found: Option<&Arc<ModeHandler>>| found.is_some_and(|f| Arc::ptr_eq(f, mh));
        same(self.by_letter[ty].get(&mh.letter())) && same(self.by_name[ty].get(mh.name()))
    }

    pub fn find_mode(&self, letter: char, mode_type: ModeType) -> Option<&Arc<ModeHandler>> {
        self.by_letter[mode_type.index()].get(&letter)
    }

    pub fn find_mode_by_name(&self, name: &str, mode_type: ModeType) -> Option<&Arc<ModeHandler>> {
        self.by_name[mode_type.index()].get(name)
    }

    pub fn find_mode_by_id(&self, id: ModeId, mode_type: ModeType) -> Option<&Arc<ModeHandler>> {
        self.by_id[mode_type.index()].get(id)?.as_ref()
    }

    /// Prefix mode by mode letter
    pub fn find_prefix_mode(&self, letter: char) -> Option<&Arc<ModeHandler>> {
        self.find_mode(letter, ModeType::Channel)
            .filter(|mh| mh.is_prefix_mode().is_some())
    }

    /// Prefix mode by prefix character
    pub fn find_prefix(&self, prefix: char) -> Option<&Arc<ModeHandler>> {
        self.prefix_modes
            .iter()
            .find(|mh| mh.is_prefix_mode().is_some_and(|pm| pm.prefix() == prefix))
    }

    /// Registered prefix modes, in registration order
    pub fn prefix_modes(&self) -> &[Arc<ModeHandler>] {
        &self.prefix_modes
    }

    /// Registered list modes (excluding prefix modes), in registration order
    pub fn list_modes(&self) -> &[Arc<ModeHandler>] {
        &self.list_modes
    }

    /// All modes of a type, ordered by letter
    pub fn modes(&self, mode_type: ModeType) -> Vec<&Arc<ModeHandler>> {
        let mut modes: Vec<_> = self.by_letter[mode_type.index()].values().collect();
        modes.sort_by_key(|mh| mh.letter());
        modes
    }

    pub fn add_mode_watcher(&mut self, watcher: Arc<dyn ModeWatcher>) {
        debug!(
            "Added watcher on {} mode {} from {}",
            watcher.mode_type().as_str(),
            watcher.mode_name(),
            watcher.creator()
        );
        self.watchers.add(watcher);
    }

    pub fn del_mode_watcher(&mut self, watcher: &Arc<dyn ModeWatcher>) -> bool {
        self.watchers.remove(watcher)
    }

    pub fn watchers(&self) -> &WatcherMap {
        &self.watchers
    }

    /// Highest prefix rank a user holds on a channel, 0 if none or not a member
    pub fn prefix_rank(&self, channel: &Channel, user: &UserId) -> u32 {
        channel
            .get_member(user)
            .map(|member| {
                member
                    .modes()
                    .chars()
                    .filter_map(|letter| self.find_prefix_mode(letter))
                    .filter_map(|mh| mh.is_prefix_mode().map(|pm| pm.rank()))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Prefix characters a member holds, highest rank first
    pub fn member_prefixes(&self, channel: &Channel, user: &UserId) -> String {
        let Some(member) = channel.get_member(user) else {
            return String::new();
        };
        let mut held: Vec<_> = member
            .modes()
            .chars()
            .filter_map(|letter| self.find_prefix_mode(letter))
            .filter_map(|mh| mh.is_prefix_mode())
            .map(|pm| (pm.rank(), pm.prefix()))
            .collect();
        held.sort_by(|a, b| b.0.cmp(&a.0));
        held.into_iter().map(|(_, prefix)| prefix).collect()
    }

    /// Turn MODE parameters (`+ov-b`, `alice`, `bob`, `*!*@x`) into changes.
    ///
    /// Unknown letters are reported to `source` and skipped. Modes needing
    /// a parameter consume the next one if any is left.
    pub fn mode_params_to_change_list(
        &self,
        net: &mut Network,
        source: &UserId,
        mode_type: ModeType,
        params: &[String],
        changes: &mut ChangeList,
    ) {
        let Some((sequence, rest)) = params.split_first() else {
            return;
        };
        let mut rest = rest.iter();
        let mut adding = true;

        for letter in sequence.chars() {
            match letter {
                '+' => adding = true,
                '-' => adding = false,
                _ => {
                    let Some(mh) = self.find_mode(letter, mode_type) else {
                        let nick = net.nick_of(source);
                        let reply = match mode_type {
                            ModeType::Channel => NumericReply::unknown_mode(&nick, letter),
                            ModeType::User => NumericReply::unknown_user_mode(&nick, letter),
                        };
                        net.write_numeric(source, reply);
                        continue;
                    };
                    let param = if mh.needs_param(adding) {
                        rest.next().cloned().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    changes.push(mh, adding, param);
                }
            }
        }
    }

    /// Apply a batch of changes, announcing them in lines of at most
    /// `max_modes` applied changes. Returns the announced batches.
    pub fn process(
        &self,
        net: &mut Network,
        modules: &ModuleManager,
        source: &UserId,
        target: &ModeTarget,
        changes: &mut ChangeList,
        flags: ProcessFlags,
    ) -> Vec<ChangeList> {
        let mut batches = Vec::new();
        let mut processed = 0;
        while processed < changes.len() {
            let (examined, applied) =
                self.process_single(net, modules, source, target, changes, flags, processed);
            processed += examined;
            if !applied.is_empty() {
                batches.push(applied);
            }
        }
        batches
    }

    /// Process changes starting at `begin` until the end of the list or until
    /// `max_modes` changes were applied. Returns how many input changes were
    /// examined and the applied changes, which have already been announced.
    #[allow(clippy::too_many_arguments)]
    pub fn process_single(
        &self,
        net: &mut Network,
        modules: &ModuleManager,
        source: &UserId,
        target: &ModeTarget,
        changes: &mut ChangeList,
        flags: ProcessFlags,
        begin: usize,
    ) -> (usize, ChangeList) {
        let mut applied = ChangeList::new();
        let mut examined = 0;
        let skip_acl = !flags.contains(ProcessFlags::CHECK_ACCESS);

        for change in changes.items_mut().iter_mut().skip(begin) {
            examined += 1;

            // The handler may have been unregistered by an earlier change
            if !self.is_registered(&change.handler) {
                continue;
            }

            let mh = Arc::clone(&change.handler);
            if mh.needs_param(change.adding) {
                if !self.is_mode_param_valid(net, source, target, change) {
                    continue;
                }
                if flags.contains(ProcessFlags::MERGE)
                    && !Self::should_apply_merged_mode(net, target, change)
                {
                    continue;
                }
            }

            if self.try_mode(net, modules, source, target, change, skip_acl) != ModeAction::Allow {
                continue;
            }

            applied.push(&mh, change.adding, change.param.clone());
            if applied.len() >= self.max_modes {
                break;
            }
        }

        if !applied.is_empty() {
            self.announce(net, modules, source, target, &applied, flags);
        }
        (examined, applied)
    }

    fn try_mode(
        &self,
        net: &mut Network,
        modules: &ModuleManager,
        source: &UserId,
        target: &ModeTarget,
        change: &mut Change,
        skip_acl: bool,
    ) -> ModeAction {
        let mh = Arc::clone(&change.handler);
        let adding = change.adding;
        let needs_param = mh.needs_param(adding);
        let source_local = net.is_local(source);

        if adding {
            truncate_chars(&mut change.param, MODE_PARAM_MAX);
        }

        let raw = modules.on_raw_mode(net, source, target, change);
        if source_local && raw == ModResult::Deny {
            return ModeAction::Deny;
        }

        if let ModeTarget::Channel(key) = target {
            if !skip_acl && raw != ModResult::Allow {
                let ctx = ModeContext {
                    modes: self,
                    net: &mut *net,
                    source: *source,
                    target,
                };
                match mh.access_check(&ctx, change) {
                    ModResult::Deny => return ModeAction::Deny,
                    ModResult::Allow => {}
                    ModResult::Passthru => {
                        let needed = mh.level_required(adding);
                        let ours = net
                            .find_channel(key)
                            .map_or(0, |channel| self.prefix_rank(channel, source));
                        if ours < needed {
                            self.deny_rank(net, source, key, &mh, adding, needed);
                            return ModeAction::Deny;
                        }
                    }
                }
            }
        }

        let mut ctx = ModeContext {
            modes: self,
            net,
            source: *source,
            target,
        };

        for watcher in self.watchers.for_mode(mh.name(), mh.mode_type()) {
            if !watcher.before_mode(&mut ctx, change) {
                return ModeAction::Deny;
            }
            if needs_param && change.param.is_empty() {
                return ModeAction::Deny;
            }
        }

        let applies_to_oper_check = matches!(target, ModeTarget::Channel(_)) || adding;
        if applies_to_oper_check && source_local && mh.is_oper_only() {
            let permitted = ctx
                .source_user()
                .is_some_and(|user| user.has_mode_permission(&mh));
            if !permitted {
                let text = match ctx.source_user().and_then(|user| user.oper.as_ref()) {
                    Some(oper) => format!(
                        "Permission Denied - Oper type {} does not have access to {}set {} mode {}",
                        oper.oper_type,
                        if adding { "" } else { "un" },
                        mh.mode_type().as_str(),
                        mh.letter()
                    ),
                    None => format!(
                        "Permission Denied - Only operators may {}set {} mode {}",
                        if adding { "" } else { "un" },
                        mh.mode_type().as_str(),
                        mh.letter()
                    ),
                };
                let nick = ctx.source_nick();
                ctx.write_numeric(NumericReply::no_privileges(&nick, text));
                return ModeAction::Deny;
            }
        }

        let action = mh.on_mode_change(&mut ctx, change);
        if needs_param && change.param.is_empty() {
            return ModeAction::Deny;
        }
        if action != ModeAction::Allow {
            return action;
        }

        for watcher in self.watchers.for_mode(mh.name(), mh.mode_type()) {
            watcher.after_mode(&mut ctx, change);
        }
        ModeAction::Allow
    }

    fn deny_rank(
        &self,
        net: &mut Network,
        source: &UserId,
        channel_key: &str,
        mh: &ModeHandler,
        adding: bool,
        needed: u32,
    ) {
        let sufficient = self
            .prefix_modes
            .iter()
            .filter_map(|pm| pm.is_prefix_mode().map(|p| (pm, p.rank())))
            .filter(|(_, rank)| *rank >= needed)
            .min_by_key(|(_, rank)| *rank);

        let un = if adding { "" } else { "un" };
        let text = match sufficient {
            Some((pm, _)) => format!(
                "You must have channel {} access or above to {}set channel mode {}",
                pm.name(),
                un,
                mh.letter()
            ),
            None => format!("You cannot {}set channel mode {}", un, mh.letter()),
        };
        let nick = net.nick_of(source);
        let channel_name = net
            .find_channel(channel_key)
            .map_or_else(|| channel_key.to_string(), |c| c.name.clone());
        net.write_numeric(
            source,
            NumericReply::chan_op_privs_needed(&nick, &channel_name, text),
        );
    }

    fn is_mode_param_valid(
        &self,
        net: &mut Network,
        source: &UserId,
        target: &ModeTarget,
        change: &Change,
    ) -> bool {
        let mh = &change.handler;
        let text = if change.param.is_empty() {
            // Listing is handled by the MODE command
            if mh.is_list_mode_base().is_some() {
                return false;
            }
            let mut text = format!("You must specify a parameter for the {} mode.", mh.name());
            if let Some(syntax) = mh.syntax() {
                text.push_str(&format!(" Syntax: {}.", syntax));
            }
            text
        } else if change.param.starts_with(':') || change.param.contains(' ') {
            format!("Invalid {} mode parameter.", mh.name())
        } else {
            return true;
        };

        let nick = net.nick_of(source);
        let target_name = Self::target_name(net, target);
        net.write_numeric(
            source,
            NumericReply::invalid_mode_param(&nick, &target_name, mh.letter(), &change.param, text),
        );
        false
    }

    fn should_apply_merged_mode(net: &Network, target: &ModeTarget, change: &Change) -> bool {
        let mh = &change.handler;
        let Some(channel) = target.channel_key().and_then(|key| net.find_channel(key)) else {
            return true;
        };
        if !channel.is_mode_set(mh) || mh.is_list_mode() {
            return true;
        }
        let ours = mh.get_parameter(channel).unwrap_or_default();
        mh.resolve_conflict(&change.param, &ours)
    }

    fn target_name(net: &Network, target: &ModeTarget) -> String {
        match target {
            ModeTarget::Channel(key) => net
                .find_channel(key)
                .map_or_else(|| key.clone(), |c| c.name.clone()),
            ModeTarget::User(id) => net.nick_of(id),
        }
    }

    /// Send MODE to local recipients, notify modules, and queue propagation
    fn announce(
        &self,
        net: &mut Network,
        modules: &ModuleManager,
        source: &UserId,
        target: &ModeTarget,
        applied: &ChangeList,
        flags: ProcessFlags,
    ) {
        let prefix = net.prefix_of(source);
        let params = applied.to_params();

        match target {
            ModeTarget::Channel(key) => {
                let Some(channel) = net.find_channel(key) else {
                    return;
                };
                let name = channel.name.clone();
                let ts = channel.created_at;
                let recipients: Vec<UserId> = channel.members().map(|m| m.user_id).collect();

                let mut line = vec![name.clone()];
                line.extend(params.iter().cloned());
                let message = Message::with_prefix(prefix.clone(), MessageType::Mode, line);
                for recipient in &recipients {
                    net.send_to(recipient, message.clone());
                }
                info!("{} set modes on {}: {}", prefix, name, params.join(" "));

                if !flags.contains(ProcessFlags::LOCAL_ONLY) {
                    let mut line = vec![name, ts.to_string()];
                    line.extend(self.wire_params(net, applied));
                    let origin = net.server_prefix_of(source);
                    net.propagate(Message::with_prefix(origin, MessageType::FMode, line));
                }
            }
            ModeTarget::User(id) => {
                let nick = net.nick_of(id);
                let mut line = vec![nick.clone()];
                line.extend(params.iter().cloned());
                net.send_to(id, Message::with_prefix(prefix, MessageType::Mode, line));
                debug!("User modes for {} changed: {}", nick, params.join(" "));

                if !flags.contains(ProcessFlags::LOCAL_ONLY) {
                    let mut line = vec![id.to_string()];
                    line.extend(params);
                    let origin = net.server_prefix_of(source);
                    net.propagate(Message::with_prefix(origin, MessageType::Mode, line));
                }
            }
        }

        modules.on_mode(net, source, target, applied, flags);
    }

    /// Mode parameters as sent to servers: prefix targets by id, not nick
    fn wire_params(&self, net: &Network, applied: &ChangeList) -> Vec<String> {
        let mut wire = applied.clone();
        for change in wire.items_mut() {
            if change.handler.is_prefix_mode().is_some() {
                if let Some(id) = net.find_nick_id(&change.param) {
                    change.param = id.to_string();
                }
            }
        }
        wire.to_params()
    }

    /// Show the entries of a list mode to `source`, subject to module and
    /// watcher approval. A denied request sees an empty list.
    pub fn show_list_mode_list(
        &self,
        net: &mut Network,
        modules: &ModuleManager,
        source: &UserId,
        target: &ModeTarget,
        mh: &Arc<ModeHandler>,
    ) {
        let (Some(lm), Some(key)) = (mh.is_list_mode_base(), target.channel_key()) else {
            return;
        };

        let mut query = Change::new(Arc::clone(mh), true, "");
        if modules.on_raw_mode(net, source, target, &mut query) == ModResult::Deny {
            return;
        }

        let mut ctx = ModeContext {
            modes: self,
            net: &mut *net,
            source: *source,
            target,
        };
        let display = self
            .watchers
            .for_mode(mh.name(), ModeType::Channel)
            .all(|watcher| watcher.before_mode(&mut ctx, &mut query));

        if display {
            lm.display_list(mh, net, source, key);
        } else {
            lm.display_empty_list(net, source, key);
        }
    }

    /// Canonicalize a ban-style mask to `nick!user@host`
    pub fn clean_mask(mask: &mut String) {
        if mask.is_empty() {
            return;
        }
        // Extended bans (`x:...`) are left alone
        if mask.chars().nth(1) == Some(':') {
            return;
        }

        let has_pling = mask.contains('!');
        let has_at = mask.contains('@');
        match (has_pling, has_at) {
            (false, false) => {
                if !mask.contains('.') && !mask.contains("::") && !mask.starts_with(':') {
                    mask.push_str("!*@*");
                } else {
                    mask.insert_str(0, "*!*@");
                }
            }
            (false, true) => mask.insert_str(0, "*!"),
            (true, false) => mask.push_str("@*"),
            (true, true) => {}
        }
    }

    /// PREFIX token, e.g. `(ohv)@%+`, highest rank first
    pub fn build_prefixes(&self) -> String {
        let mut ranked: Vec<_> = self
            .prefix_modes
            .iter()
            .filter_map(|mh| mh.is_prefix_mode().map(|pm| (pm.rank(), mh.letter(), pm.prefix())))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let letters: String = ranked.iter().map(|(_, letter, _)| *letter).collect();
        let prefixes: String = ranked.iter().map(|(_, _, prefix)| *prefix).collect();
        format!("({}){}", letters, prefixes)
    }

    /// CHANMODES token: list modes, always-param, set-only-param, flags
    pub fn chanmodes_token(&self) -> String {
        let mut groups: [String; 4] = Default::default();
        for mh in self.modes(ModeType::Channel) {
            let group = match mh.kind() {
                ModeKind::Prefix(_) => continue,
                ModeKind::List(_) => 0,
                _ if mh.needs_param(false) => 1,
                _ if mh.needs_param(true) => 2,
                _ => 3,
            };
            groups[group].push(mh.letter());
        }
        groups.join(",")
    }

    /// Current channel modes as MODE parameters (`+ntl`, `10`).
    /// Without `show_params`, parameter values are replaced by `<name>`.
    pub fn channel_modes(&self, channel: &Channel, show_params: bool) -> Vec<String> {
        let mut letters = String::from("+");
        let mut params = Vec::new();
        for mh in self.modes(ModeType::Channel) {
            if mh.is_list_mode() || !channel.is_mode_set(mh) {
                continue;
            }
            letters.push(mh.letter());
            if mh.needs_param(true) {
                if show_params {
                    params.push(mh.get_parameter(channel).unwrap_or_default());
                } else {
                    params.push(format!("<{}>", mh.name()));
                }
            }
        }
        let mut out = vec![letters];
        out.extend(params);
        out
    }

    /// Current user modes, e.g. `+iw`
    pub fn user_modes(&self, user: &User) -> String {
        let mut letters: Vec<char> = user
            .modes
            .iter()
            .filter_map(|id| self.find_mode_by_id(id, ModeType::User))
            .map(|mh| mh.letter())
            .collect();
        letters.sort_unstable();
        let mut out = String::from("+");
        out.extend(letters);
        out
    }

    /// Apply limits and prefix rank overrides from configuration
    pub fn apply_config(&mut self, config: &Config) {
        self.set_max_modes(config.limits.max_modes);

        for mh in &self.list_modes {
            if let Some(lm) = mh.is_list_mode_base() {
                lm.set_limits(mh, &config.limits.max_list);
            }
        }

        // Overrides dropped from the config fall back to the module's ranks
        for pm in self.prefix_modes.iter().filter_map(|mh| mh.is_prefix_mode()) {
            pm.reset();
        }

        for prefix in &config.prefixes {
            let Some(pm) = self
                .find_mode_by_name(&prefix.name, ModeType::Channel)
                .and_then(|mh| mh.is_prefix_mode())
            else {
                debug!("Rank override for prefix mode {} not loaded", prefix.name);
                continue;
            };
            pm.update(
                prefix.rank.unwrap_or_else(|| pm.rank()),
                prefix.set_rank.unwrap_or_else(|| pm.set_rank()),
                prefix.unset_rank.unwrap_or_else(|| pm.unset_rank()),
                prefix.self_remove.unwrap_or_else(|| pm.can_self_remove()),
            );
        }
    }
}

fn truncate_chars(text: &mut String, max: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
}
