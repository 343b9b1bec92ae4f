//! Network state: users, channels and outbound queues

use crate::channel::Channel;
use crate::user::{User, UserId};
use crate::utils::irc_to_lower;
use crate::{Error, Message, Prefix, Result};
use rustc_hash::FxHashMap;
use tracing::debug;
use uuid::Uuid;

/// A message queued for a local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: UserId,
    pub message: Message,
}

/// Every user and channel known to this server.
///
/// Messages are not written to sockets here; they are queued for local
/// users as [`Delivery`] values and for linked servers as plain messages,
/// and drained by whatever owns the connections.
#[derive(Debug)]
pub struct Network {
    server_name: String,
    fake_client: UserId,
    users: FxHashMap<UserId, User>,
    nicks: FxHashMap<String, UserId>,
    channels: FxHashMap<String, Channel>,
    deliveries: Vec<Delivery>,
    propagated: Vec<Message>,
}

impl Network {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
            fake_client: Uuid::new_v4(),
            users: FxHashMap::default(),
            nicks: FxHashMap::default(),
            channels: FxHashMap::default(),
            deliveries: Vec::new(),
            propagated: Vec::new(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// The id the server itself acts under, e.g. when modules clear modes
    pub fn fake_client(&self) -> UserId {
        self.fake_client
    }

    /// Add a user, failing if the nick is already in use
    pub fn add_user(&mut self, user: User) -> Result<UserId> {
        let folded = irc_to_lower(&user.nick);
        if self.nicks.contains_key(&folded) {
            return Err(Error::User(format!("Nickname {} is already in use", user.nick)));
        }
        let id = user.id;
        debug!("Adding user {} ({})", user.nick, id);
        self.nicks.insert(folded, id);
        self.users.insert(id, user);
        Ok(id)
    }

    /// Remove a user and their channel memberships
    pub fn remove_user(&mut self, id: &UserId) -> Option<User> {
        let user = self.users.remove(id)?;
        self.nicks.remove(&irc_to_lower(&user.nick));
        for key in &user.channels {
            if let Some(channel) = self.channels.get_mut(key) {
                channel.remove_member(id);
                if channel.is_empty() {
                    self.channels.remove(key);
                }
            }
        }
        Some(user)
    }

    pub fn find_user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn find_user_mut(&mut self, id: &UserId) -> Option<&mut User> {
        self.users.get_mut(id)
    }

    pub fn find_nick_id(&self, nick: &str) -> Option<UserId> {
        self.nicks.get(&irc_to_lower(nick)).copied()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn users_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.values_mut()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Nickname of a user; the server name for the fake client, `*` if unknown
    pub fn nick_of(&self, id: &UserId) -> String {
        if *id == self.fake_client {
            return self.server_name.clone();
        }
        self.users
            .get(id)
            .map_or_else(|| "*".to_string(), |user| user.nick.clone())
    }

    pub fn is_local(&self, id: &UserId) -> bool {
        self.users.get(id).is_some_and(|user| user.local)
    }

    /// Message prefix a client sees for this source
    pub fn prefix_of(&self, id: &UserId) -> Prefix {
        match self.users.get(id) {
            Some(user) => user.prefix(),
            None => Prefix::Server(self.server_name.clone()),
        }
    }

    /// Message prefix used between servers for this source
    pub fn server_prefix_of(&self, id: &UserId) -> Prefix {
        if self.users.contains_key(id) {
            Prefix::Server(id.to_string())
        } else {
            Prefix::Server(self.server_name.clone())
        }
    }

    /// Create a channel, or return the existing one
    pub fn create_channel(&mut self, name: &str, created_at: i64) -> &mut Channel {
        self.channels
            .entry(irc_to_lower(name))
            .or_insert_with(|| {
                debug!("Creating channel {}", name);
                Channel::new(name.to_string(), created_at)
            })
    }

    /// Look up a channel by casemapped name
    pub fn find_channel(&self, key: &str) -> Option<&Channel> {
        self.channels.get(key)
    }

    pub fn find_channel_mut(&mut self, key: &str) -> Option<&mut Channel> {
        self.channels.get_mut(key)
    }

    /// Look up a channel by name as typed
    pub fn find_channel_by_name(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&irc_to_lower(name))
    }

    /// Casemapped names of all channels
    pub fn channel_keys(&self) -> impl Iterator<Item = &String> {
        self.channels.keys()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Add a user to a channel, creating it if needed.
    /// Returns true if the channel was created by this join.
    pub fn join(&mut self, id: &UserId, name: &str, created_at: i64) -> Result<bool> {
        if !self.users.contains_key(id) {
            return Err(Error::User(format!("No such user {}", id)));
        }
        let key = irc_to_lower(name);
        let created = !self.channels.contains_key(&key);
        self.create_channel(name, created_at).add_member(*id)?;
        if let Some(user) = self.users.get_mut(id) {
            user.channels.insert(key);
        }
        Ok(created)
    }

    /// Remove a user from a channel; the channel goes away with its last member
    pub fn part(&mut self, id: &UserId, key: &str) -> Result<()> {
        let channel = self
            .channels
            .get_mut(key)
            .ok_or_else(|| Error::Channel(format!("No such channel {}", key)))?;
        if channel.remove_member(id).is_none() {
            return Err(Error::Channel(format!("User not in channel {}", channel.name)));
        }
        if channel.is_empty() {
            debug!("Destroying empty channel {}", channel.name);
            self.channels.remove(key);
        }
        if let Some(user) = self.users.get_mut(id) {
            user.channels.remove(key);
        }
        Ok(())
    }

    /// Queue a message for a user if they are connected here
    pub fn send_to(&mut self, id: &UserId, message: Message) {
        if self.is_local(id) {
            self.deliveries.push(Delivery { to: *id, message });
        }
    }

    /// Queue a numeric from this server
    pub fn write_numeric(&mut self, id: &UserId, mut message: Message) {
        message.prefix = Some(Prefix::Server(self.server_name.clone()));
        self.send_to(id, message);
    }

    /// Queue a message for every linked server
    pub fn propagate(&mut self, message: Message) {
        self.propagated.push(message);
    }

    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.deliveries)
    }

    pub fn take_propagated(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.propagated)
    }
}
