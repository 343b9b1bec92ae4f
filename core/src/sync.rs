//! Applying channel and mode state received from linked servers

use crate::mode::{ChangeList, ModeTarget, ModeType, ProcessFlags};
use crate::user::UserId;
use crate::utils::irc_to_lower;
use crate::{Error, Message, MessageType, Result, Server};
use std::cmp::Ordering;
use tracing::{debug, info};
use uuid::Uuid;

/// A channel as announced by a linked server during burst
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBurst {
    pub name: String,
    pub created_at: i64,
    /// MODE parameters, e.g. `["+ntk", "secret"]`
    pub modes: Vec<String>,
    /// Members with the prefix mode letters they hold, e.g. `("ov", id)`
    pub members: Vec<(String, UserId)>,
}

impl Server {
    /// Merge a channel burst into local state.
    ///
    /// The older channel wins: if theirs is older our modes and prefixes are
    /// removed before theirs are applied, if ours is older theirs are ignored,
    /// and on a tie both sets are merged using each mode's tie-break.
    pub fn apply_channel_burst(&mut self, burst: &ChannelBurst) -> Result<()> {
        let key = irc_to_lower(&burst.name);
        let fake = self.net.fake_client();
        let target = ModeTarget::Channel(key.clone());

        let ours = self.net.find_channel(&key).map(|c| c.created_at);
        let accept_modes = match ours.map(|ts| burst.created_at.cmp(&ts)) {
            None | Some(Ordering::Less) => {
                if ours.is_some() {
                    info!(
                        "Channel {} is older on the remote side ({} < {:?}), resetting modes",
                        burst.name, burst.created_at, ours
                    );
                    self.clear_channel_modes(&key);
                }
                Some(ProcessFlags::LOCAL_ONLY)
            }
            Some(Ordering::Equal) => Some(ProcessFlags::LOCAL_ONLY | ProcessFlags::MERGE),
            Some(Ordering::Greater) => None,
        };

        for (_, id) in &burst.members {
            if self.net.find_user(id).is_none() {
                return Err(Error::User(format!("Burst for {} names unknown user {}", burst.name, id)));
            }
            let already = self
                .net
                .find_channel(&key)
                .is_some_and(|c| c.has_member(id));
            if !already {
                self.net.join(id, &burst.name, burst.created_at)?;
            }
        }
        if let Some(channel) = self.net.find_channel_mut(&key) {
            channel.created_at = channel.created_at.min(burst.created_at);
        }

        let Some(flags) = accept_modes else {
            debug!("Ignoring modes for newer channel {}", burst.name);
            return Ok(());
        };

        let mut changes = ChangeList::new();
        if !burst.modes.is_empty() {
            self.modes.mode_params_to_change_list(
                &mut self.net,
                &fake,
                ModeType::Channel,
                &burst.modes,
                &mut changes,
            );
        }
        for (prefixes, id) in &burst.members {
            for letter in prefixes.chars() {
                if let Some(mh) = self.modes.find_prefix_mode(letter) {
                    changes.push_add_param(mh, id.to_string());
                }
            }
        }
        self.process_modes(&fake, &target, &mut changes, flags);
        Ok(())
    }

    /// Remove every mode from a channel as the server, announcing the removals locally
    fn clear_channel_modes(&mut self, key: &str) {
        let fake = self.net.fake_client();
        let mut changes = ChangeList::new();
        if let Some(channel) = self.net.find_channel(key) {
            for mh in self.modes.modes(ModeType::Channel) {
                mh.remove_mode(&self.net, channel, &mut changes);
            }
        }
        self.process_modes(
            &fake,
            &ModeTarget::Channel(key.to_string()),
            &mut changes,
            ProcessFlags::LOCAL_ONLY,
        );
    }

    /// Handle a mode change relayed by a linked server.
    ///
    /// `FMODE <channel> <ts> <modes...>` is dropped if the timestamp is newer
    /// than ours and merged if it is equal. `MODE <user id> <modes...>` is
    /// applied as is.
    pub fn handle_remote_mode(&mut self, message: &Message) -> Result<()> {
        let source = match &message.prefix {
            Some(crate::Prefix::Server(origin)) => Uuid::parse_str(origin)
                .ok()
                .filter(|id| self.net.find_user(id).is_some())
                .unwrap_or_else(|| self.net.fake_client()),
            _ => self.net.fake_client(),
        };

        match message.command {
            MessageType::FMode => {
                let [name, ts, modes @ ..] = message.params.as_slice() else {
                    return Err(Error::MessageParse("FMODE needs a channel and timestamp".to_string()));
                };
                let ts: i64 = ts
                    .parse()
                    .map_err(|_| Error::MessageParse(format!("Bad FMODE timestamp {}", ts)))?;
                let key = irc_to_lower(name);
                let Some(ours) = self.net.find_channel(&key).map(|c| c.created_at) else {
                    return Err(Error::Channel(format!("FMODE for unknown channel {}", name)));
                };

                let mut flags = ProcessFlags::LOCAL_ONLY;
                match ts.cmp(&ours) {
                    Ordering::Greater => {
                        debug!("Dropping FMODE for {} with newer timestamp {}", name, ts);
                        return Ok(());
                    }
                    Ordering::Equal => flags |= ProcessFlags::MERGE,
                    Ordering::Less => {}
                }

                let mut changes = ChangeList::new();
                self.modes.mode_params_to_change_list(
                    &mut self.net,
                    &source,
                    ModeType::Channel,
                    modes,
                    &mut changes,
                );
                self.process_modes(&source, &ModeTarget::Channel(key), &mut changes, flags);
                Ok(())
            }
            MessageType::Mode => {
                let [target, modes @ ..] = message.params.as_slice() else {
                    return Err(Error::MessageParse("MODE needs a target".to_string()));
                };
                let target = Uuid::parse_str(target)
                    .ok()
                    .filter(|id| self.net.find_user(id).is_some())
                    .ok_or_else(|| Error::User(format!("MODE for unknown user {}", target)))?;

                let mut changes = ChangeList::new();
                self.modes.mode_params_to_change_list(
                    &mut self.net,
                    &source,
                    ModeType::User,
                    modes,
                    &mut changes,
                );
                self.process_modes(
                    &source,
                    &ModeTarget::User(target),
                    &mut changes,
                    ProcessFlags::LOCAL_ONLY,
                );
                Ok(())
            }
            ref other => Err(Error::MessageParse(format!("Not a mode message: {}", other))),
        }
    }
}
