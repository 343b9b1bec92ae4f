//! Channel state

use crate::extensible::Extensible;
use crate::mode::{ModeBits, ModeHandler};
use crate::user::UserId;
use crate::{Error, Result};
use rustc_hash::FxHashMap;

/// Channel member with prefix modes
#[derive(Debug, Clone)]
pub struct ChannelMember {
    pub user_id: UserId,
    modes: String,
}

impl ChannelMember {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            modes: String::new(),
        }
    }

    /// Prefix mode letters held, in the order they were granted
    pub fn modes(&self) -> &str {
        &self.modes
    }

    pub fn has_mode(&self, letter: char) -> bool {
        self.modes.contains(letter)
    }

    /// Grant or take a prefix mode; false if the member was already in that state
    pub fn set_prefix(&mut self, letter: char, adding: bool) -> bool {
        if self.has_mode(letter) == adding {
            return false;
        }
        if adding {
            self.modes.push(letter);
        } else {
            self.modes.retain(|c| c != letter);
        }
        true
    }
}

/// Channel information and state
#[derive(Debug)]
pub struct Channel {
    /// Channel name as first created
    pub name: String,
    /// Creation timestamp, compared on burst to pick the older side
    pub created_at: i64,
    /// Channel modes without list semantics
    pub modes: ModeBits,
    /// Channel members
    members: FxHashMap<UserId, ChannelMember>,
    /// Mode parameters, list entries and module data
    pub extensions: Extensible,
}

impl Channel {
    /// Create a new channel
    pub fn new(name: String, created_at: i64) -> Self {
        Self {
            name,
            created_at,
            modes: ModeBits::default(),
            members: FxHashMap::default(),
            extensions: Extensible::new(),
        }
    }

    pub fn is_mode_set(&self, mh: &ModeHandler) -> bool {
        mh.id().is_some_and(|id| self.modes.get(id))
    }

    pub fn set_mode(&mut self, mh: &ModeHandler, value: bool) {
        if let Some(id) = mh.id() {
            self.modes.set(id, value);
        }
    }

    /// Add a member to the channel
    pub fn add_member(&mut self, user_id: UserId) -> Result<&mut ChannelMember> {
        if self.members.contains_key(&user_id) {
            return Err(Error::Channel("User already in channel".to_string()));
        }
        Ok(self
            .members
            .entry(user_id)
            .or_insert_with(|| ChannelMember::new(user_id)))
    }

    /// Remove a member from the channel
    pub fn remove_member(&mut self, user_id: &UserId) -> Option<ChannelMember> {
        self.members.remove(user_id)
    }

    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.members.contains_key(user_id)
    }

    pub fn get_member(&self, user_id: &UserId) -> Option<&ChannelMember> {
        self.members.get(user_id)
    }

    pub fn member_mut(&mut self, user_id: &UserId) -> Option<&mut ChannelMember> {
        self.members.get_mut(user_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &ChannelMember> {
        self.members.values()
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut ChannelMember> {
        self.members.values_mut()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_member_prefixes() {
        let mut member = ChannelMember::new(Uuid::new_v4());
        assert!(member.set_prefix('o', true));
        assert!(!member.set_prefix('o', true));
        assert!(member.set_prefix('v', true));
        assert_eq!(member.modes(), "ov");
        assert!(member.set_prefix('o', false));
        assert!(!member.set_prefix('o', false));
        assert_eq!(member.modes(), "v");
    }

    #[test]
    fn test_add_member_twice() {
        let mut channel = Channel::new("#rust".to_string(), 1000);
        let id = Uuid::new_v4();
        assert!(channel.add_member(id).is_ok());
        assert!(channel.add_member(id).is_err());
        assert_eq!(channel.member_count(), 1);
    }
}
