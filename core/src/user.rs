//! User management and tracking

use crate::config::OperatorConfig;
use crate::extensible::Extensible;
use crate::mode::{ModeBits, ModeHandler, ModeType};
use crate::Prefix;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use uuid::Uuid;

/// Network-wide user identifier
pub type UserId = Uuid;

/// Operator privileges held by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperInfo {
    /// Operator account name
    pub name: String,
    /// Operator type shown in permission errors
    pub oper_type: String,
    /// Channel mode letters this operator may change; `*` allows all
    pub chan_modes: String,
    /// User mode letters this operator may change; `*` allows all
    pub user_modes: String,
}

impl From<&OperatorConfig> for OperInfo {
    fn from(config: &OperatorConfig) -> Self {
        Self {
            name: config.name.clone(),
            oper_type: config.oper_type.clone(),
            chan_modes: config.chan_modes.clone(),
            user_modes: config.user_modes.clone(),
        }
    }
}

impl OperInfo {
    /// Whether this operator may change the given mode
    pub fn can_use_mode(&self, mode_type: ModeType, letter: char) -> bool {
        let allowed = match mode_type {
            ModeType::Channel => &self.chan_modes,
            ModeType::User => &self.user_modes,
        };
        allowed.contains('*') || allowed.contains(letter)
    }
}

/// User information and state
#[derive(Debug)]
pub struct User {
    /// Unique user ID
    pub id: UserId,
    /// Nickname
    pub nick: String,
    /// Username
    pub username: String,
    /// Real name
    pub realname: String,
    /// Hostname/IP
    pub host: String,
    /// Server the user is connected to
    pub server: String,
    /// Whether the user is connected to this server
    pub local: bool,
    /// Registration time
    pub registered_at: DateTime<Utc>,
    /// User modes
    pub modes: ModeBits,
    /// Channels user is in, by casemapped name
    pub channels: FxHashSet<String>,
    /// Operator privileges, if opered
    pub oper: Option<OperInfo>,
    /// Module data attached to the user
    pub extensions: Extensible,
}

impl User {
    /// Create a new user
    pub fn new(
        nick: String,
        username: String,
        realname: String,
        host: String,
        server: String,
        local: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            nick,
            username,
            realname,
            host,
            server,
            local,
            registered_at: Utc::now(),
            modes: ModeBits::default(),
            channels: FxHashSet::default(),
            oper: None,
            extensions: Extensible::new(),
        }
    }

    /// Get user prefix for messages
    pub fn prefix(&self) -> Prefix {
        Prefix::User {
            nick: self.nick.clone(),
            user: self.username.clone(),
            host: self.host.clone(),
        }
    }

    /// `user@host`, as matched against operator hostmasks
    pub fn userhost(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    pub fn is_mode_set(&self, mh: &ModeHandler) -> bool {
        mh.id().is_some_and(|id| self.modes.get(id))
    }

    pub fn set_mode(&mut self, mh: &ModeHandler, value: bool) {
        if let Some(id) = mh.id() {
            self.modes.set(id, value);
        }
    }

    pub fn is_oper(&self) -> bool {
        self.oper.is_some()
    }

    /// Whether the user's operator block grants the mode
    pub fn has_mode_permission(&self, mh: &ModeHandler) -> bool {
        self.oper
            .as_ref()
            .is_some_and(|oper| oper.can_use_mode(mh.mode_type(), mh.letter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_user() -> User {
        User::new(
            "alice".to_string(),
            "alice".to_string(),
            "Alice".to_string(),
            "example.com".to_string(),
            "irc.localhost".to_string(),
            true,
        )
    }

    #[test]
    fn test_prefix() {
        let user = test_user();
        assert_eq!(user.prefix().to_string(), "alice!alice@example.com");
        assert_eq!(user.userhost(), "alice@example.com");
    }

    #[test]
    fn test_mode_permission() {
        let mut user = test_user();
        let mh = Arc::new(ModeHandler::simple("t", "servprotect", 'k', ModeType::User).with_oper_only(true));
        assert!(!user.has_mode_permission(&mh));

        user.oper = Some(OperInfo {
            name: "alice".to_string(),
            oper_type: "Helper".to_string(),
            chan_modes: String::new(),
            user_modes: "k".to_string(),
        });
        assert!(user.has_mode_permission(&mh));

        let chan = ModeHandler::simple("t", "operonly", 'O', ModeType::Channel);
        assert!(!user.has_mode_permission(&chan));
    }

    #[test]
    fn test_unregistered_mode_is_never_set() {
        let mut user = test_user();
        let mh = ModeHandler::simple("t", "invisible", 'i', ModeType::User);
        user.set_mode(&mh, true);
        assert!(!user.is_mode_set(&mh));
    }
}
