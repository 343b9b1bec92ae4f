//! IRC message parsing and handling
//!
//! This module implements the IRC message format as defined in RFC 1459.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IRC message prefix (server or user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefix {
    /// Server name
    Server(String),
    /// User prefix (nick!user@host)
    User {
        nick: String,
        user: String,
        host: String,
    },
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => write!(f, "{}", name),
            Prefix::User { nick, user, host } => write!(f, "{}!{}@{}", nick, user, host),
        }
    }
}

/// IRC message types understood by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Oper,
    Quit,
    Join,
    Part,
    Mode,
    /// Server-to-server timestamped channel mode change
    FMode,
    Notice,
    Custom(String),
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::Oper => "OPER",
            MessageType::Quit => "QUIT",
            MessageType::Join => "JOIN",
            MessageType::Part => "PART",
            MessageType::Mode => "MODE",
            MessageType::FMode => "FMODE",
            MessageType::Notice => "NOTICE",
            MessageType::Custom(cmd) => cmd,
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "OPER" => MessageType::Oper,
            "QUIT" => MessageType::Quit,
            "JOIN" => MessageType::Join,
            "PART" => MessageType::Part,
            "MODE" => MessageType::Mode,
            "FMODE" => MessageType::FMode,
            "NOTICE" => MessageType::Notice,
            other => MessageType::Custom(other.to_string()),
        }
    }
}

/// IRC message as defined in RFC 1459
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Optional prefix (server or user)
    pub prefix: Option<Prefix>,
    /// Message command/type
    pub command: MessageType,
    /// Message parameters
    pub params: Vec<String>,
}

impl Message {
    /// Create a new message
    pub fn new(command: MessageType, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command,
            params,
        }
    }

    /// Create a new message with prefix
    pub fn with_prefix(prefix: Prefix, command: MessageType, params: Vec<String>) -> Self {
        Self {
            prefix: Some(prefix),
            command,
            params,
        }
    }

    /// Parse an IRC message from a string
    pub fn parse(input: &str) -> crate::Result<Self> {
        let mut rest = input.trim();
        if rest.is_empty() {
            return Err(crate::Error::MessageParse("Empty message".to_string()));
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix_str, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
            rest = remainder.trim_start();
            Some(Self::parse_prefix(prefix_str)?)
        } else {
            None
        };

        let (command_str, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command_str.is_empty() {
            return Err(crate::Error::MessageParse("No command found".to_string()));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                // Last parameter can contain spaces
                params.push(trailing.to_string());
                break;
            }
            let (param, remainder) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = remainder;
        }

        Ok(Message {
            prefix,
            command: MessageType::from(command_str),
            params,
        })
    }

    fn parse_prefix(prefix_str: &str) -> crate::Result<Prefix> {
        if !prefix_str.contains('!') {
            return Ok(Prefix::Server(prefix_str.to_string()));
        }

        // User prefix: nick!user@host
        let (nick, user_host) = prefix_str
            .split_once('!')
            .ok_or_else(|| crate::Error::MessageParse("Invalid user prefix format".to_string()))?;
        let (user, host) = user_host
            .split_once('@')
            .ok_or_else(|| crate::Error::MessageParse("Invalid user prefix format".to_string()))?;
        Ok(Prefix::User {
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
        })
    }

    /// Serialize message to a wire line, including the trailing CRLF
    pub fn to_line(&self) -> String {
        let mut result = String::new();

        if let Some(ref prefix) = self.prefix {
            result.push(':');
            result.push_str(&prefix.to_string());
            result.push(' ');
        }

        result.push_str(&self.command.to_string());

        for (i, param) in self.params.iter().enumerate() {
            result.push(' ');
            let last = i == self.params.len() - 1;
            if last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                result.push(':');
            }
            result.push_str(param);
        }

        result.push_str("\r\n");
        result
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_message() {
        let msg = Message::parse("MODE #rust +ov-b alice bob *!*@spam").unwrap();
        assert_eq!(msg.command, MessageType::Mode);
        assert_eq!(msg.params, vec!["#rust", "+ov-b", "alice", "bob", "*!*@spam"]);
        assert!(msg.prefix.is_none());
    }

    #[test]
    fn test_parse_message_with_prefix() {
        let msg = Message::parse(":alice!user@host QUIT :Gone fishing").unwrap();
        match msg.prefix {
            Some(Prefix::User { nick, user, host }) => {
                assert_eq!(nick, "alice");
                assert_eq!(user, "user");
                assert_eq!(host, "host");
            }
            _ => panic!("Expected user prefix"),
        }
        assert_eq!(msg.command, MessageType::Quit);
        assert_eq!(msg.params, vec!["Gone fishing"]);
    }

    #[test]
    fn test_serialize_trailing_param() {
        let msg = Message::with_prefix(
            Prefix::Server("irc.example.net".to_string()),
            MessageType::Custom("482".to_string()),
            vec!["alice".to_string(), "#rust".to_string(), "You are not an operator".to_string()],
        );
        assert_eq!(
            msg.to_string(),
            ":irc.example.net 482 alice #rust :You are not an operator"
        );
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(Message::parse("   ").is_err());
    }
}
