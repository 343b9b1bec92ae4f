//! IRC numeric replies used by the mode engine

use crate::Message;

/// IRC numeric reply codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericReply {
    RplUmodeIs,
    RplChannelModeIs,
    RplCreationTime,
    RplYoureOper,
    RplInviteList,
    RplEndOfInviteList,
    RplExceptList,
    RplEndOfExceptList,
    RplBanList,
    RplEndOfBanList,

    ErrNoSuchNick,
    ErrNoSuchChannel,
    ErrUserNotInChannel,
    ErrNotOnChannel,
    ErrUnknownCommand,
    ErrNeedMoreParams,
    ErrUnknownMode,
    ErrBanListFull,
    ErrNoPrivileges,
    ErrChanOpPrivsNeeded,
    ErrNoOperHost,
    ErrUnknownSnomask,
    ErrUsersDontMatch,
    ErrInvalidModeParam,
    ErrListModeAlreadySet,
    ErrListModeNotSet,

    /// Module-defined numeric
    Custom(u16),
}

impl NumericReply {
    /// Get the numeric code as a u16
    pub fn numeric_code(&self) -> u16 {
        match self {
            NumericReply::RplUmodeIs => 221,
            NumericReply::RplChannelModeIs => 324,
            NumericReply::RplCreationTime => 329,
            NumericReply::RplYoureOper => 381,
            NumericReply::RplInviteList => 346,
            NumericReply::RplEndOfInviteList => 347,
            NumericReply::RplExceptList => 348,
            NumericReply::RplEndOfExceptList => 349,
            NumericReply::RplBanList => 367,
            NumericReply::RplEndOfBanList => 368,
            NumericReply::ErrNoSuchNick => 401,
            NumericReply::ErrNoSuchChannel => 403,
            NumericReply::ErrUnknownCommand => 421,
            NumericReply::ErrUserNotInChannel => 441,
            NumericReply::ErrNotOnChannel => 442,
            NumericReply::ErrNeedMoreParams => 461,
            NumericReply::ErrUnknownMode => 472,
            NumericReply::ErrBanListFull => 478,
            NumericReply::ErrNoPrivileges => 481,
            NumericReply::ErrChanOpPrivsNeeded => 482,
            NumericReply::ErrNoOperHost => 491,
            NumericReply::ErrUnknownSnomask => 501,
            NumericReply::ErrUsersDontMatch => 502,
            NumericReply::ErrInvalidModeParam => 696,
            NumericReply::ErrListModeAlreadySet => 697,
            NumericReply::ErrListModeNotSet => 698,
            NumericReply::Custom(code) => *code,
        }
    }

    /// Three digit wire form of the numeric
    pub fn code(&self) -> String {
        format!("{:03}", self.numeric_code())
    }

    /// Create a numeric reply message addressed to `target`
    pub fn reply(&self, target: &str, params: Vec<String>) -> Message {
        let mut all_params = vec![target.to_string()];
        all_params.extend(params);

        Message::new(crate::MessageType::Custom(self.code()), all_params)
    }
}

/// Common numeric replies
impl NumericReply {
    /// ERR_NOSUCHNICK
    pub fn no_such_nick(nick: &str, target: &str) -> Message {
        Self::ErrNoSuchNick.reply(
            nick,
            vec![target.to_string(), "No such nick".to_string()],
        )
    }

    /// ERR_NOSUCHCHANNEL
    pub fn no_such_channel(nick: &str, channel: &str) -> Message {
        Self::ErrNoSuchChannel.reply(
            nick,
            vec![channel.to_string(), "No such channel".to_string()],
        )
    }

    /// ERR_UNKNOWNCOMMAND
    pub fn unknown_command(nick: &str, command: &str) -> Message {
        Self::ErrUnknownCommand.reply(
            nick,
            vec![command.to_string(), "Unknown command".to_string()],
        )
    }

    /// ERR_NOTONCHANNEL
    pub fn not_on_channel(nick: &str, channel: &str) -> Message {
        Self::ErrNotOnChannel.reply(
            nick,
            vec![channel.to_string(), "You're not on that channel".to_string()],
        )
    }

    /// ERR_USERNOTINCHANNEL
    pub fn user_not_in_channel(nick: &str, target: &str, channel: &str) -> Message {
        Self::ErrUserNotInChannel.reply(
            nick,
            vec![
                target.to_string(),
                channel.to_string(),
                "They are not on that channel".to_string(),
            ],
        )
    }

    /// RPL_YOUREOPER
    pub fn youre_oper(nick: &str, oper_type: &str) -> Message {
        Self::RplYoureOper.reply(
            nick,
            vec![format!("You are now an IRC operator of type {}", oper_type)],
        )
    }

    /// ERR_NOOPERHOST
    pub fn no_oper_host(nick: &str) -> Message {
        Self::ErrNoOperHost.reply(nick, vec!["Invalid oper credentials".to_string()])
    }

    /// ERR_NEEDMOREPARAMS
    pub fn need_more_params(nick: &str, command: &str) -> Message {
        Self::ErrNeedMoreParams.reply(
            nick,
            vec![command.to_string(), "Not enough parameters".to_string()],
        )
    }

    /// ERR_UNKNOWNMODE
    pub fn unknown_mode(nick: &str, letter: char) -> Message {
        Self::ErrUnknownMode.reply(
            nick,
            vec![letter.to_string(), "is not a recognised channel mode.".to_string()],
        )
    }

    /// ERR_UNKNOWNSNOMASK, sent for unknown user mode letters
    pub fn unknown_user_mode(nick: &str, letter: char) -> Message {
        Self::ErrUnknownSnomask.reply(
            nick,
            vec![letter.to_string(), "is not a recognised user mode.".to_string()],
        )
    }

    /// ERR_CHANOPRIVSNEEDED
    pub fn chan_op_privs_needed(nick: &str, channel: &str, text: String) -> Message {
        Self::ErrChanOpPrivsNeeded.reply(nick, vec![channel.to_string(), text])
    }

    /// ERR_NOPRIVILEGES
    pub fn no_privileges(nick: &str, text: String) -> Message {
        Self::ErrNoPrivileges.reply(nick, vec![text])
    }

    /// ERR_BANLISTFULL
    pub fn ban_list_full(nick: &str, channel: &str, letter: char, text: String) -> Message {
        Self::ErrBanListFull.reply(
            nick,
            vec![channel.to_string(), letter.to_string(), text],
        )
    }

    /// ERR_INVALIDMODEPARAM
    pub fn invalid_mode_param(
        nick: &str,
        target: &str,
        letter: char,
        param: &str,
        text: String,
    ) -> Message {
        Self::ErrInvalidModeParam.reply(
            nick,
            vec![target.to_string(), letter.to_string(), param.to_string(), text],
        )
    }

    /// ERR_LISTMODEALREADYSET
    pub fn list_mode_already_set(
        nick: &str,
        channel: &str,
        mask: &str,
        letter: char,
        list_name: &str,
    ) -> Message {
        Self::ErrListModeAlreadySet.reply(
            nick,
            vec![
                channel.to_string(),
                mask.to_string(),
                letter.to_string(),
                format!("Channel {} list already contains {}", list_name, mask),
            ],
        )
    }

    /// ERR_LISTMODENOTSET
    pub fn list_mode_not_set(
        nick: &str,
        channel: &str,
        mask: &str,
        letter: char,
        list_name: &str,
    ) -> Message {
        Self::ErrListModeNotSet.reply(
            nick,
            vec![
                channel.to_string(),
                mask.to_string(),
                letter.to_string(),
                format!("Channel {} list does not contain {}", list_name, mask),
            ],
        )
    }

    /// ERR_USERSDONTMATCH
    pub fn users_dont_match(nick: &str, text: &str) -> Message {
        Self::ErrUsersDontMatch.reply(nick, vec![text.to_string()])
    }

    /// RPL_CHANNELMODEIS
    pub fn channel_mode_is(nick: &str, channel: &str, modes: Vec<String>) -> Message {
        let mut params = vec![channel.to_string()];
        params.extend(modes);
        Self::RplChannelModeIs.reply(nick, params)
    }

    /// RPL_CREATIONTIME
    pub fn creation_time(nick: &str, channel: &str, ts: i64) -> Message {
        Self::RplCreationTime.reply(nick, vec![channel.to_string(), ts.to_string()])
    }

    /// RPL_UMODEIS
    pub fn umode_is(nick: &str, modes: &str) -> Message {
        Self::RplUmodeIs.reply(nick, vec![modes.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_three_digits() {
        assert_eq!(NumericReply::RplUmodeIs.code(), "221");
        assert_eq!(NumericReply::ErrInvalidModeParam.code(), "696");
        assert_eq!(NumericReply::Custom(5).code(), "005");
    }

    #[test]
    fn test_chan_op_privs_needed_layout() {
        let msg = NumericReply::chan_op_privs_needed(
            "alice",
            "#rust",
            "You must have channel op access or above to set channel mode m".to_string(),
        );
        assert_eq!(msg.params[0], "alice");
        assert_eq!(msg.params[1], "#rust");
        assert!(msg.params[2].contains("channel op access"));
    }
}
