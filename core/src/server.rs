//! Server state and client command dispatch

use crate::config::Config;
use crate::mode::{ChangeList, ModResult, ModeParser, ModeTarget, ModeType, ProcessFlags};
use crate::module::{Module, ModuleManager, ModuleResult};
use crate::network::Network;
use crate::user::{OperInfo, UserId};
use crate::utils::{current_unix_timestamp, irc_to_lower, is_channel_name, wildcard_match};
use crate::{Error, Message, MessageType, NumericReply, Result};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main server state.
///
/// Fields are public so modules can borrow the registry, the network and
/// the module list separately while processing mode changes.
pub struct Server {
    /// Server configuration
    pub config: Config,
    /// Users, channels and outbound queues
    pub net: Network,
    /// Mode registry and change pipeline
    pub modes: ModeParser,
    /// Loaded modules
    pub modules: ModuleManager,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let net = Network::new(&config.server.name);
        let modes = ModeParser::new(config.limits.max_modes);
        Self {
            config,
            net,
            modes,
            modules: ModuleManager::new(),
        }
    }

    /// Server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load and initialize a module. If initialization fails, every mode
    /// and watcher it managed to register is removed again.
    pub fn load_module(&mut self, module: Arc<dyn Module>) -> Result<()> {
        let name = module.name().to_string();
        if self.modules.is_loaded(&name) {
            return Err(Error::Module(format!("Module {} is already loaded", name)));
        }

        if let Err(e) = module.init(self) {
            warn!("Failed to load module {}: {}", name, e);
            self.modes
                .del_modes_by_creator(&mut self.net, &self.modules, &name);
            return Err(e);
        }

        self.modules.insert(module);
        self.modes.apply_config(&self.config);
        info!("Loaded module {}", name);
        Ok(())
    }

    /// Unload a module, removing its modes from every user and channel
    pub fn unload_module(&mut self, name: &str) -> Result<()> {
        let module = self
            .modules
            .get_module(name)
            .cloned()
            .ok_or_else(|| Error::Module(format!("Module {} is not loaded", name)))?;

        if let Err(e) = module.cleanup(self) {
            warn!("Error cleaning up module {}: {}", name, e);
        }
        let removed = self
            .modes
            .del_modes_by_creator(&mut self.net, &self.modules, name);
        self.modules.remove(name);
        info!("Unloaded module {} ({} modes removed)", name, removed);
        Ok(())
    }

    /// Replace the configuration and reapply mode limits and prefix ranks
    pub fn rehash(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.modes.apply_config(&self.config);

        let modules: Vec<Arc<dyn Module>> = self
            .modules
            .get_loaded_modules()
            .into_iter()
            .filter_map(|name| self.modules.get_module(name).cloned())
            .collect();
        for module in modules {
            if let Err(e) = module.on_rehash(self) {
                warn!("Module {} failed to rehash: {}", module.name(), e);
            }
        }
        info!("Configuration reloaded");
        Ok(())
    }

    /// Push changes through the mode pipeline
    pub fn process_modes(
        &mut self,
        source: &UserId,
        target: &ModeTarget,
        changes: &mut ChangeList,
        flags: ProcessFlags,
    ) -> Vec<ChangeList> {
        self.modes
            .process(&mut self.net, &self.modules, source, target, changes, flags)
    }

    /// ISUPPORT tokens describing the registered modes
    pub fn isupport(&self) -> Vec<String> {
        vec![
            "CHANTYPES=#".to_string(),
            format!("PREFIX={}", self.modes.build_prefixes()),
            format!("CHANMODES={}", self.modes.chanmodes_token()),
            format!("MODES={}", self.modes.max_modes()),
        ]
    }

    /// Handle a command from a local user
    pub fn handle_message(&mut self, source: &UserId, message: &Message) -> Result<()> {
        if self.net.find_user(source).is_none() {
            return Err(Error::User("Client not found".to_string()));
        }

        match &message.command {
            MessageType::Mode => self.handle_mode(source, message),
            MessageType::Join => self.handle_join(source, message),
            MessageType::Part => self.handle_part(source, message),
            MessageType::Oper => self.handle_oper(source, message),
            MessageType::Quit => self.handle_quit(source, message),
            MessageType::Custom(command) => {
                let command = command.clone();
                if let Some(module) = self.modules.command_handler(&command) {
                    if module.handle_command(self, source, message)? == ModuleResult::Handled {
                        return Ok(());
                    }
                }
                let nick = self.net.nick_of(source);
                self.net
                    .write_numeric(source, NumericReply::unknown_command(&nick, &command));
                Ok(())
            }
            other => {
                debug!("Unhandled command: {:?}", other);
                Ok(())
            }
        }
    }

    /// Handle MODE command
    fn handle_mode(&mut self, source: &UserId, message: &Message) -> Result<()> {
        let nick = self.net.nick_of(source);
        let Some(target_name) = message.params.first() else {
            self.net
                .write_numeric(source, NumericReply::need_more_params(&nick, "MODE"));
            return Ok(());
        };

        let target = if let Some(channel) = self.net.find_channel_by_name(target_name) {
            ModeTarget::channel(&channel.name)
        } else if let Some(id) = self.net.find_nick_id(target_name) {
            ModeTarget::User(id)
        } else {
            let reply = if target_name.starts_with('#') {
                NumericReply::no_such_channel(&nick, target_name)
            } else {
                NumericReply::no_such_nick(&nick, target_name)
            };
            self.net.write_numeric(source, reply);
            return Ok(());
        };

        if message.params.len() == 1 {
            self.display_current_modes(source, &target);
            return Ok(());
        }

        let mut changes = ChangeList::new();
        self.modes.mode_params_to_change_list(
            &mut self.net,
            source,
            target.mode_type(),
            &message.params[1..],
            &mut changes,
        );

        let local = self.net.is_local(source);
        let mut flags = ProcessFlags::NONE;
        if local {
            match self
                .modules
                .on_pre_mode(&mut self.net, source, &target, &mut changes)
            {
                ModResult::Deny => return Ok(()),
                ModResult::Allow => {}
                ModResult::Passthru => {
                    if matches!(target, ModeTarget::User(id) if id != *source) {
                        self.net.write_numeric(
                            source,
                            NumericReply::users_dont_match(&nick, "Can't change mode for other users"),
                        );
                        return Ok(());
                    }
                    flags |= ProcessFlags::CHECK_ACCESS;
                }
            }
        } else {
            flags |= ProcessFlags::LOCAL_ONLY;
        }

        // A local user gets one line of changes per command
        let applied = if local {
            let (_, applied) = self.modes.process_single(
                &mut self.net,
                &self.modules,
                source,
                &target,
                &mut changes,
                flags,
                0,
            );
            !applied.is_empty()
        } else {
            !self.process_modes(source, &target, &mut changes, flags).is_empty()
        };

        if !applied && message.params.len() == 2 {
            if let ModeTarget::Channel(_) = target {
                self.display_list_modes(source, &target, &message.params[1]);
            }
        }
        Ok(())
    }

    fn display_current_modes(&mut self, source: &UserId, target: &ModeTarget) {
        let nick = self.net.nick_of(source);
        match target {
            ModeTarget::Channel(key) => {
                let Some(channel) = self.net.find_channel(key) else {
                    return;
                };
                let show_params = channel.has_member(source)
                    || self.net.find_user(source).is_some_and(|u| u.is_oper());
                let modes = self.modes.channel_modes(channel, show_params);
                let name = channel.name.clone();
                let ts = channel.created_at;
                self.net
                    .write_numeric(source, NumericReply::channel_mode_is(&nick, &name, modes));
                self.net
                    .write_numeric(source, NumericReply::creation_time(&nick, &name, ts));
            }
            ModeTarget::User(id) if id == source => {
                let modes = self
                    .net
                    .find_user(id)
                    .map(|user| self.modes.user_modes(user))
                    .unwrap_or_default();
                self.net
                    .write_numeric(source, NumericReply::umode_is(&nick, &modes));
            }
            ModeTarget::User(_) => {
                self.net.write_numeric(
                    source,
                    NumericReply::users_dont_match(&nick, "Can't view modes for other users"),
                );
            }
        }
    }

    /// `MODE #chan b` and `MODE #chan +be`: show each requested list once
    fn display_list_modes(&mut self, source: &UserId, target: &ModeTarget, sequence: &str) {
        let mut seen = FxHashSet::default();
        for letter in sequence.chars() {
            if letter == '+' {
                continue;
            }
            let Some(mh) = self.modes.find_mode(letter, ModeType::Channel) else {
                return;
            };
            if !mh.is_list_mode() {
                return;
            }
            if !seen.insert(letter) {
                continue;
            }
            let mh = Arc::clone(mh);
            self.modes
                .show_list_mode_list(&mut self.net, &self.modules, source, target, &mh);
        }
    }

    /// Handle JOIN command
    fn handle_join(&mut self, source: &UserId, message: &Message) -> Result<()> {
        let nick = self.net.nick_of(source);
        let Some(names) = message.params.first() else {
            self.net
                .write_numeric(source, NumericReply::need_more_params(&nick, "JOIN"));
            return Ok(());
        };

        for name in names.split(',') {
            if !is_channel_name(name) {
                self.net
                    .write_numeric(source, NumericReply::no_such_channel(&nick, name));
                continue;
            }
            let key = irc_to_lower(name);
            if self
                .net
                .find_channel(&key)
                .is_some_and(|c| c.has_member(source))
            {
                continue;
            }

            let created = self.net.join(source, name, current_unix_timestamp())?;
            // The first member of a new channel is opped
            if created {
                if let Some(op) = self.modes.find_prefix_mode('o') {
                    let letter = op.letter();
                    if let Some(member) = self
                        .net
                        .find_channel_mut(&key)
                        .and_then(|c| c.member_mut(source))
                    {
                        member.set_prefix(letter, true);
                    }
                }
            }

            let (channel_name, ts, recipients) = match self.net.find_channel(&key) {
                Some(channel) => (
                    channel.name.clone(),
                    channel.created_at,
                    channel.members().map(|m| m.user_id).collect::<Vec<_>>(),
                ),
                None => continue,
            };
            let join = Message::with_prefix(
                self.net.prefix_of(source),
                MessageType::Join,
                vec![channel_name.clone()],
            );
            for recipient in &recipients {
                self.net.send_to(recipient, join.clone());
            }
            let origin = self.net.server_prefix_of(source);
            self.net.propagate(Message::with_prefix(
                origin,
                MessageType::Join,
                vec![channel_name.clone(), ts.to_string()],
            ));
            info!("{} joined {}", nick, channel_name);
        }
        Ok(())
    }

    /// Handle PART command
    /// Disconnect a user, telling everyone sharing a channel with them
    fn handle_quit(&mut self, source: &UserId, message: &Message) -> Result<()> {
        let reason = message
            .params
            .first()
            .map_or_else(|| "Client Quit".to_string(), |r| format!("Quit: {}", r));
        let quit = Message::with_prefix(
            self.net.prefix_of(source),
            MessageType::Quit,
            vec![reason.clone()],
        );

        let mut peers = FxHashSet::default();
        if let Some(user) = self.net.find_user(source) {
            for key in &user.channels {
                if let Some(channel) = self.net.find_channel(key) {
                    peers.extend(channel.members().map(|m| m.user_id));
                }
            }
        }
        peers.remove(source);
        for peer in &peers {
            self.net.send_to(peer, quit.clone());
        }

        if let Some(user) = self.net.remove_user(source) {
            info!("{} quit ({})", user.nick, reason);
        }
        Ok(())
    }

    fn handle_part(&mut self, source: &UserId, message: &Message) -> Result<()> {
        let nick = self.net.nick_of(source);
        let Some(names) = message.params.first() else {
            self.net
                .write_numeric(source, NumericReply::need_more_params(&nick, "PART"));
            return Ok(());
        };

        for name in names.split(',') {
            let key = irc_to_lower(name);
            let Some(channel) = self.net.find_channel(&key) else {
                self.net
                    .write_numeric(source, NumericReply::no_such_channel(&nick, name));
                continue;
            };
            if !channel.has_member(source) {
                let channel_name = channel.name.clone();
                self.net
                    .write_numeric(source, NumericReply::not_on_channel(&nick, &channel_name));
                continue;
            }

            let channel_name = channel.name.clone();
            let recipients: Vec<UserId> = channel.members().map(|m| m.user_id).collect();
            let part = Message::with_prefix(
                self.net.prefix_of(source),
                MessageType::Part,
                vec![channel_name.clone()],
            );
            for recipient in &recipients {
                self.net.send_to(recipient, part.clone());
            }
            self.net.part(source, &key)?;
            let origin = self.net.server_prefix_of(source);
            self.net
                .propagate(Message::with_prefix(origin, MessageType::Part, vec![channel_name]));
        }
        Ok(())
    }

    /// Handle OPER command. Operator blocks are matched by name and hostmask.
    fn handle_oper(&mut self, source: &UserId, message: &Message) -> Result<()> {
        let nick = self.net.nick_of(source);
        let Some(name) = message.params.first() else {
            self.net
                .write_numeric(source, NumericReply::need_more_params(&nick, "OPER"));
            return Ok(());
        };

        let userhost = self
            .net
            .find_user(source)
            .map(|u| u.userhost())
            .unwrap_or_default();
        let oper = self
            .config
            .find_operator(name)
            .filter(|o| wildcard_match(&o.hostmask, &userhost))
            .map(OperInfo::from);

        let Some(oper) = oper else {
            warn!("Failed operator attempt for {} by {}", name, nick);
            self.net.write_numeric(source, NumericReply::no_oper_host(&nick));
            return Ok(());
        };

        let oper_type = oper.oper_type.clone();
        if let Some(user) = self.net.find_user_mut(source) {
            user.oper = Some(oper);
        }
        self.net
            .write_numeric(source, NumericReply::youre_oper(&nick, &oper_type));

        if let Some(mh) = self.modes.find_mode_by_name("oper", ModeType::User).cloned() {
            let mut changes = ChangeList::new();
            changes.push_add(&mh);
            let fake = self.net.fake_client();
            self.process_modes(&fake, &ModeTarget::User(*source), &mut changes, ProcessFlags::NONE);
        }
        info!("{} is now an operator of type {}", nick, oper_type);
        Ok(())
    }
}
