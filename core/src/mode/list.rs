//! List modes (bans, exceptions, invite exceptions, ...)

use super::{Change, ModeAction, ModeContext, ModeHandler, ModeParser};
use crate::channel::Channel;
use crate::config::ListLimitConfig;
use crate::network::Network;
use crate::user::UserId;
use crate::utils::{irc_equals, wildcard_match};
use crate::NumericReply;
use parking_lot::RwLock;

/// Entry limit used when no configured limit matches a channel
pub const DEFAULT_LIST_SIZE: usize = 100;

/// One entry on a channel list mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub mask: String,
    pub setter: String,
    pub time: i64,
}

/// The entries of one list mode on one channel, oldest first
pub type ModeList = Vec<ListItem>;

/// Numerics used to display a list
#[derive(Debug, Clone, Copy)]
pub struct ListNumerics {
    pub entry: NumericReply,
    pub end: NumericReply,
    pub end_text: &'static str,
}

/// Shared behavior of list modes.
///
/// Entries live on the channel as an extension; adding and removing
/// targets single entries, never the whole mode.
#[derive(Debug)]
pub struct ListModeBase {
    numerics: ListNumerics,
    tidy: bool,
    limits: RwLock<Vec<ListLimitConfig>>,
}

impl ListModeBase {
    /// `tidy` canonicalizes masks with [`ModeParser::clean_mask`] before use
    pub fn new(numerics: ListNumerics, tidy: bool) -> Self {
        Self {
            numerics,
            tidy,
            limits: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn ext_key(mh: &ModeHandler) -> String {
        format!("listmode:{}", mh.name())
    }

    pub fn numerics(&self) -> ListNumerics {
        self.numerics
    }

    /// Entries of this mode on a channel, if any were ever added
    pub fn get_list<'c>(&self, mh: &ModeHandler, channel: &'c Channel) -> Option<&'c ModeList> {
        channel.extensions.get::<ModeList>(&Self::ext_key(mh))
    }

    /// Replace the configured limits; entries whose `mode` names another mode are ignored
    pub fn set_limits(&self, mh: &ModeHandler, limits: &[ListLimitConfig]) {
        *self.limits.write() = limits
            .iter()
            .filter(|l| l.mode.as_deref().map_or(true, |m| m == mh.name()))
            .cloned()
            .collect();
    }

    /// Maximum number of entries for a channel: first matching configured limit
    pub fn get_limit(&self, channel_name: &str) -> usize {
        self.limits
            .read()
            .iter()
            .find(|l| wildcard_match(&l.channel, channel_name))
            .map(|l| l.limit)
            .unwrap_or(DEFAULT_LIST_SIZE)
    }

    /// Whether the list has reached its limit
    pub fn is_full(&self, mh: &ModeHandler, channel: &Channel) -> bool {
        let size = self.get_list(mh, channel).map_or(0, Vec::len);
        size >= self.get_limit(&channel.name)
    }

    /// First entry whose mask matches `text` as a wildcard pattern
    pub fn find_match<'c>(
        &self,
        mh: &ModeHandler,
        channel: &'c Channel,
        text: &str,
    ) -> Option<&'c ListItem> {
        self.get_list(mh, channel)?
            .iter()
            .find(|entry| wildcard_match(&entry.mask, text))
    }

    pub(crate) fn on_mode_change(
        &self,
        mh: &ModeHandler,
        ctx: &mut ModeContext<'_>,
        change: &mut Change,
    ) -> ModeAction {
        if self.tidy {
            ModeParser::clean_mask(&mut change.param);
        }

        let setter = ctx.source_nick();
        let source_local = ctx.source_is_local();
        let key = Self::ext_key(mh);
        let Some(channel) = ctx.channel_mut() else {
            return ModeAction::Deny;
        };
        let channel_name = channel.name.clone();

        if change.adding {
            let limit = self.get_limit(&channel_name);
            let list = channel.extensions.get_or_insert_with(&key, ModeList::new);
            if list.iter().any(|entry| irc_equals(&entry.mask, &change.param)) {
                ctx.write_numeric(NumericReply::list_mode_already_set(
                    &setter,
                    &channel_name,
                    &change.param,
                    mh.letter(),
                    mh.name(),
                ));
                return ModeAction::Deny;
            }
            // Remote servers already accepted the entry
            if source_local && list.len() >= limit {
                let text = format!(
                    "Channel {} list is full (maximum entries for this channel is {})",
                    mh.name(),
                    limit
                );
                ctx.write_numeric(NumericReply::ban_list_full(
                    &setter,
                    &channel_name,
                    mh.letter(),
                    text,
                ));
                return ModeAction::Deny;
            }
            list.push(ListItem {
                mask: change.param.clone(),
                setter,
                time: crate::utils::current_unix_timestamp(),
            });
            return ModeAction::Allow;
        }

        let removed = match channel.extensions.get_mut::<ModeList>(&key) {
            Some(list) => match list.iter().position(|entry| irc_equals(&entry.mask, &change.param)) {
                Some(pos) => {
                    // Announce the stored spelling of the mask
                    change.param = list.remove(pos).mask;
                    if list.is_empty() {
                        channel.extensions.unset(&key);
                    }
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            ModeAction::Allow
        } else {
            ctx.write_numeric(NumericReply::list_mode_not_set(
                &setter,
                &channel_name,
                &change.param,
                mh.letter(),
                mh.name(),
            ));
            ModeAction::Deny
        }
    }

    /// Send every entry followed by the end-of-list numeric
    pub fn display_list(&self, mh: &ModeHandler, net: &mut Network, source: &UserId, channel_key: &str) {
        let nick = net.nick_of(source);
        let Some(channel) = net.find_channel(channel_key) else {
            return;
        };
        let channel_name = channel.name.clone();
        let mut replies: Vec<_> = self
            .get_list(mh, channel)
            .into_iter()
            .flatten()
            .map(|entry| {
                self.numerics.entry.reply(
                    &nick,
                    vec![
                        channel_name.clone(),
                        entry.mask.clone(),
                        entry.setter.clone(),
                        entry.time.to_string(),
                    ],
                )
            })
            .collect();
        replies.push(
            self.numerics
                .end
                .reply(&nick, vec![channel_name, self.numerics.end_text.to_string()]),
        );
        for reply in replies {
            net.write_numeric(source, reply);
        }
    }

    /// Send only the end-of-list numeric
    pub fn display_empty_list(&self, net: &mut Network, source: &UserId, channel_key: &str) {
        let nick = net.nick_of(source);
        let Some(channel) = net.find_channel(channel_key) else {
            return;
        };
        let reply = self
            .numerics
            .end
            .reply(&nick, vec![channel.name.clone(), self.numerics.end_text.to_string()]);
        net.write_numeric(source, reply);
    }
}
