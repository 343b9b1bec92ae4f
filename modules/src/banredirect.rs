//! Ban redirection: `+b nick!user@host#channel`
//!
//! Watches the ban list mode. A ban whose mask ends in a channel name is
//! stored as a normal ban and additionally remembered as a redirect to that
//! channel.

use modeircd_core::mode::{ModeContext, ModeWatcher, OP_VALUE};
use modeircd_core::utils::{irc_equals, is_channel_name, irc_to_lower, wildcard_match};
use modeircd_core::{Change, Channel, ModeType, Module, NumericReply, Result, Server};
use std::sync::Arc;

const EXT_KEY: &str = "banredirect";

/// A ban that sends matching users to another channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRedirect {
    /// Ban mask without the channel
    pub mask: String,
    /// Channel matching users are redirected to
    pub target: String,
}

/// Redirects recorded on a channel
pub fn redirects(channel: &Channel) -> &[BanRedirect] {
    channel
        .extensions
        .get::<Vec<BanRedirect>>(EXT_KEY)
        .map_or(&[], Vec::as_slice)
}

/// Channel a user matching `nuh` (`nick!user@host`) is redirected to, if any
pub fn redirect_for<'c>(channel: &'c Channel, nuh: &str) -> Option<&'c str> {
    redirects(channel)
        .iter()
        .find(|r| wildcard_match(&r.mask, nuh))
        .map(|r| r.target.as_str())
}

/// Split `nick!user@host#chan` into a full `nick!user@host` and the channel.
/// `nick@host` is read as `*!nick@host`; missing parts become `*`.
fn split_redirect_mask(param: &str) -> (String, String) {
    #[derive(Clone, Copy, PartialEq)]
    enum Part {
        Nick,
        Ident,
        Host,
        Chan,
    }

    let mut parts: [String; 4] = Default::default();
    let mut current = Part::Nick;
    let mut start = 0;

    for (idx, c) in param.char_indices() {
        match c {
            '!' if current == Part::Nick => {
                parts[0] = param[start..idx].to_string();
                current = Part::Ident;
                start = idx + 1;
            }
            '@' if current == Part::Ident || current == Part::Nick => {
                let slot = if current == Part::Nick { 0 } else { 1 };
                parts[slot] = param[start..idx].to_string();
                current = Part::Host;
                start = idx + 1;
            }
            '#' if current != Part::Chan => {
                let slot = current as usize;
                parts[slot] = param[start..idx].to_string();
                current = Part::Chan;
                // The channel keeps its '#'
                start = idx;
            }
            _ => {}
        }
    }
    let slot = current as usize;
    if parts[slot].is_empty() {
        parts[slot] = param[start..].to_string();
    }

    let [mut nick, mut ident, host, chan] = parts;
    if !nick.is_empty() && !host.is_empty() && ident.is_empty() && !param.contains('!') {
        std::mem::swap(&mut nick, &mut ident);
    }
    let star = |s: String| if s.is_empty() { "*".to_string() } else { s };
    (
        format!("{}!{}@{}", star(nick), star(ident), star(host)),
        chan,
    )
}

/// Watcher on the channel ban mode
#[derive(Debug, Default)]
pub struct BanRedirectWatcher;

impl BanRedirectWatcher {
    fn deny(&self, ctx: &mut ModeContext<'_>, text: String) -> bool {
        let nick = ctx.source_nick();
        ctx.write_numeric(NumericReply::Custom(690).reply(&nick, vec![text]));
        false
    }
}

impl ModeWatcher for BanRedirectWatcher {
    fn mode_name(&self) -> &str {
        "ban"
    }

    fn mode_type(&self) -> ModeType {
        ModeType::Channel
    }

    fn creator(&self) -> &str {
        "banredirect"
    }

    fn before_mode(&self, ctx: &mut ModeContext<'_>, change: &mut Change) -> bool {
        let param = &change.param;
        // Extended bans and plain bans pass through
        if param.is_empty() || param.chars().nth(1) == Some(':') || !param.contains('#') {
            return true;
        }

        let (mask, target) = split_redirect_mask(param);
        if target.is_empty() {
            return true;
        }

        if change.adding && ctx.source_is_local() {
            let Some(channel_name) = ctx.channel().map(|c| c.name.clone()) else {
                return false;
            };
            let modes = ctx.modes;
            let full_at = modes
                .find_mode_by_name("ban", ModeType::Channel)
                .zip(ctx.channel())
                .and_then(|(ban, channel)| {
                    let lm = ban.is_list_mode_base()?;
                    lm.is_full(ban, channel)
                        .then(|| (lm.get_limit(&channel.name), ban.letter()))
                });
            if let Some((limit, letter)) = full_at {
                let nick = ctx.source_nick();
                ctx.write_numeric(NumericReply::ban_list_full(
                    &nick,
                    &channel_name,
                    letter,
                    format!(
                        "Channel ban list for {} is full (maximum entries for this channel is {})",
                        channel_name, limit
                    ),
                ));
                return false;
            }
            if !is_channel_name(&target) {
                let nick = ctx.source_nick();
                ctx.write_numeric(NumericReply::ErrNoSuchChannel.reply(
                    &nick,
                    vec![
                        channel_name,
                        format!("Invalid channel name in redirection ({})", target),
                    ],
                ));
                return false;
            }
            let rank = match ctx.net.find_channel(&irc_to_lower(&target)) {
                Some(redirect_to) => ctx.modes.prefix_rank(redirect_to, &ctx.source),
                None => {
                    return self.deny(
                        ctx,
                        format!("Target channel {} must exist to be set as a redirect.", target),
                    )
                }
            };
            if rank < OP_VALUE {
                return self.deny(
                    ctx,
                    format!("You must be opped on {} to set it as a redirect.", target),
                );
            }
            if irc_equals(&channel_name, &target) {
                return self.deny(
                    ctx,
                    "You cannot set a ban redirection to the channel the ban is on".to_string(),
                );
            }
        }

        let Some(channel) = ctx.channel_mut() else {
            return false;
        };
        let same = |r: &BanRedirect| irc_equals(&r.target, &target) && irc_equals(&r.mask, &mask);
        if change.adding {
            let list = channel
                .extensions
                .get_or_insert_with(EXT_KEY, Vec::<BanRedirect>::new);
            if !list.iter().any(same) {
                list.push(BanRedirect {
                    mask: mask.clone(),
                    target: target.clone(),
                });
            }
        } else if let Some(list) = channel.extensions.get_mut::<Vec<BanRedirect>>(EXT_KEY) {
            if let Some(pos) = list.iter().position(same) {
                list.remove(pos);
            }
            if list.is_empty() {
                channel.extensions.unset(EXT_KEY);
            }
        }

        change.param = format!("{}{}", mask, target);
        true
    }
}

/// Registers the ban redirect watcher
#[derive(Debug, Default)]
pub struct BanRedirectModule;

impl BanRedirectModule {
    pub fn new() -> Self {
        Self
    }
}

impl Module for BanRedirectModule {
    fn name(&self) -> &str {
        "banredirect"
    }

    fn description(&self) -> &str {
        "Allows bans to redirect matching users to another channel"
    }

    fn init(&self, server: &mut Server) -> Result<()> {
        server.modes.add_mode_watcher(Arc::new(BanRedirectWatcher));
        Ok(())
    }
}
