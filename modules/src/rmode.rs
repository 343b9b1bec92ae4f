//! RMODE command: remove every instance of a channel mode
//!
//! `RMODE <channel> <mode> [pattern]` removes list entries or prefixes
//! matching the pattern (default `*`), or unsets the mode.

use modeircd_core::mode::{ModeKind, VOICE_VALUE};
use modeircd_core::utils::{irc_to_lower, wildcard_match};
use modeircd_core::{
    ChangeList, Message, MessageType, ModeTarget, ModeType, Module, ModuleResult, NumericReply,
    ProcessFlags, Result, Server, UserId,
};

/// Provides the RMODE command
#[derive(Debug, Default)]
pub struct RemoveModeModule;

impl RemoveModeModule {
    pub fn new() -> Self {
        Self
    }

    fn notice(server: &mut Server, source: &UserId, text: String) {
        let nick = server.net.nick_of(source);
        let notice = Message::new(MessageType::Notice, vec![nick, text]);
        server.net.write_numeric(source, notice);
    }
}

impl Module for RemoveModeModule {
    fn name(&self) -> &str {
        "rmode"
    }

    fn description(&self) -> &str {
        "Provides the RMODE command to remove all instances of a channel mode"
    }

    fn init(&self, _server: &mut Server) -> Result<()> {
        Ok(())
    }

    fn commands(&self) -> &[&'static str] {
        &["RMODE"]
    }

    fn handle_command(
        &self,
        server: &mut Server,
        source: &UserId,
        message: &Message,
    ) -> Result<ModuleResult> {
        let [channel_name, mode, rest @ ..] = message.params.as_slice() else {
            let nick = server.net.nick_of(source);
            server
                .net
                .write_numeric(source, NumericReply::need_more_params(&nick, "RMODE"));
            return Ok(ModuleResult::Handled);
        };

        let key = irc_to_lower(channel_name);
        if server.net.find_channel(&key).is_none() {
            Self::notice(
                server,
                source,
                format!("The channel {} does not exist.", channel_name),
            );
            return Ok(ModuleResult::Handled);
        }

        let mut letters = mode.chars();
        let mh = match (letters.next(), letters.next()) {
            (Some(letter), None) => server.modes.find_mode(letter, ModeType::Channel).cloned(),
            _ => None,
        };
        let Some(mh) = mh else {
            Self::notice(server, source, format!("{} is not a valid channel mode.", mode));
            return Ok(ModuleResult::Handled);
        };

        let Some(channel) = server.net.find_channel(&key) else {
            return Ok(ModuleResult::Handled);
        };
        if server.modes.prefix_rank(channel, source) < mh.level_required(false) {
            let text = format!(
                "You do not have access to unset {} on {}.",
                mh.letter(),
                channel.name
            );
            Self::notice(server, source, text);
            return Ok(ModuleResult::Handled);
        }

        let pattern = rest.first().map_or("*", String::as_str);
        let mut changes = ChangeList::new();
        match mh.kind() {
            ModeKind::Prefix(pm) => {
                for member in channel.members() {
                    if !member.has_mode(mh.letter()) {
                        continue;
                    }
                    // Ranked members keep their own status
                    if member.user_id == *source && pm.rank() > VOICE_VALUE {
                        continue;
                    }
                    let nick = server.net.nick_of(&member.user_id);
                    if wildcard_match(pattern, &nick) {
                        changes.push_remove_param(&mh, nick);
                    }
                }
            }
            ModeKind::List(lm) => {
                for entry in lm.get_list(&mh, channel).into_iter().flatten() {
                    if wildcard_match(pattern, &entry.mask) {
                        changes.push_remove_param(&mh, entry.mask.clone());
                    }
                }
            }
            _ => mh.remove_mode(&server.net, channel, &mut changes),
        }

        server.process_modes(source, &ModeTarget::Channel(key), &mut changes, ProcessFlags::NONE);
        Ok(ModuleResult::Handled)
    }
}
