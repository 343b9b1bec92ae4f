//! Channel burst tests
//!
//! When servers link, the older channel's modes win and equal timestamps
//! merge both sides.

use modeircd_core::mode::{ModeContext, ParamBehavior, OP_VALUE};
use modeircd_core::*;
use std::sync::Arc;

struct AnyKey;

impl ParamBehavior for AnyKey {
    fn on_set(&self, _mh: &ModeHandler, _ctx: &mut ModeContext<'_>, _param: &mut String) -> ModeAction {
        ModeAction::Allow
    }
}

fn server() -> Server {
    let mut server = Server::new(Config::default());
    server
        .modes
        .add_mode(Arc::new(ModeHandler::prefix("burst", "op", 'o', OP_VALUE, '@')))
        .unwrap();
    server
        .modes
        .add_mode(Arc::new(ModeHandler::simple("burst", "moderated", 'm', ModeType::Channel)))
        .unwrap();
    server
        .modes
        .add_mode(Arc::new(ModeHandler::simple("burst", "secret", 's', ModeType::Channel)))
        .unwrap();
    server
        .modes
        .add_mode(Arc::new(ModeHandler::param("burst", "key", 'k', ParamSpec::Always, AnyKey)))
        .unwrap();
    server
}

fn add_user(server: &mut Server, nick: &str, local: bool) -> UserId {
    server
        .net
        .add_user(User::new(
            nick.to_string(),
            nick.to_string(),
            nick.to_string(),
            "example.com".to_string(),
            if local { "irc.localhost" } else { "irc.remote" }.to_string(),
            local,
        ))
        .unwrap()
}

/// Local channel #rust at `ts` with alice opped and `+mk ours`
fn local_channel(server: &mut Server, ts: i64) -> UserId {
    let alice = add_user(server, "alice", true);
    server.net.join(&alice, "#rust", ts).unwrap();

    let fake = server.net.fake_client();
    let mut changes = ChangeList::new();
    changes.push_add_param(&server.modes.find_mode('o', ModeType::Channel).cloned().unwrap(), "alice");
    changes.push_add(&server.modes.find_mode('m', ModeType::Channel).cloned().unwrap());
    changes.push_add_param(&server.modes.find_mode('k', ModeType::Channel).cloned().unwrap(), "ours");
    server.process_modes(&fake, &ModeTarget::channel("#rust"), &mut changes, ProcessFlags::LOCAL_ONLY);
    server.net.take_deliveries();
    alice
}

fn has(server: &Server, letter: char) -> bool {
    let mh = server.modes.find_mode(letter, ModeType::Channel).unwrap();
    server.net.find_channel("#rust").unwrap().is_mode_set(mh)
}

fn key(server: &Server) -> Option<String> {
    let mh = server.modes.find_mode('k', ModeType::Channel).unwrap();
    mh.get_parameter(server.net.find_channel("#rust").unwrap())
}

fn burst(ts: i64, modes: &[&str], members: Vec<(String, UserId)>) -> ChannelBurst {
    ChannelBurst {
        name: "#Rust".to_string(),
        created_at: ts,
        modes: modes.iter().map(|m| m.to_string()).collect(),
        members,
    }
}

#[test]
fn test_older_remote_channel_replaces_our_modes() {
    let mut server = server();
    let alice = local_channel(&mut server, 1000);
    let carol = add_user(&mut server, "carol", false);

    server
        .apply_channel_burst(&burst(500, &["+sk", "theirs"], vec![("o".to_string(), carol)]))
        .unwrap();

    let channel = server.net.find_channel("#rust").unwrap();
    assert_eq!(channel.created_at, 500);
    assert!(!channel.get_member(&alice).unwrap().has_mode('o'));
    assert!(channel.get_member(&carol).unwrap().has_mode('o'));
    assert!(!has(&server, 'm'));
    assert!(has(&server, 's'));
    assert_eq!(key(&server).as_deref(), Some("theirs"));

    // alice saw both the reset and the new modes
    let lines: Vec<Vec<String>> = server
        .net
        .take_deliveries()
        .into_iter()
        .filter(|d| d.to == alice && d.message.command == MessageType::Mode)
        .map(|d| d.message.params)
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0][1].starts_with('-'));
    assert_eq!(lines[1][1], "+sko");
    assert!(server.net.take_propagated().is_empty());
}

#[test]
fn test_equal_timestamps_merge() {
    let mut server = server();
    let alice = local_channel(&mut server, 1000);
    let carol = add_user(&mut server, "carol", false);

    server
        .apply_channel_burst(&burst(1000, &["+sk", "aaa"], vec![("o".to_string(), carol)]))
        .unwrap();

    let channel = server.net.find_channel("#rust").unwrap();
    assert!(channel.get_member(&alice).unwrap().has_mode('o'));
    assert!(channel.get_member(&carol).unwrap().has_mode('o'));
    assert!(has(&server, 'm'));
    assert!(has(&server, 's'));
    // "aaa" sorts before "ours"
    assert_eq!(key(&server).as_deref(), Some("aaa"));
}

#[test]
fn test_equal_timestamps_keep_winning_value() {
    let mut server = server();
    local_channel(&mut server, 1000);

    server
        .apply_channel_burst(&burst(1000, &["+k", "zzz"], Vec::new()))
        .unwrap();
    assert_eq!(key(&server).as_deref(), Some("ours"));
}

#[test]
fn test_newer_remote_channel_loses_modes() {
    let mut server = server();
    let alice = local_channel(&mut server, 1000);
    let carol = add_user(&mut server, "carol", false);

    server
        .apply_channel_burst(&burst(2000, &["+s"], vec![("o".to_string(), carol)]))
        .unwrap();

    let channel = server.net.find_channel("#rust").unwrap();
    assert_eq!(channel.created_at, 1000);
    assert!(channel.has_member(&carol));
    assert!(!channel.get_member(&carol).unwrap().has_mode('o'));
    assert!(channel.get_member(&alice).unwrap().has_mode('o'));
    assert!(!has(&server, 's'));
    assert_eq!(key(&server).as_deref(), Some("ours"));
}

#[test]
fn test_new_channel_from_burst() {
    let mut server = server();
    let carol = add_user(&mut server, "carol", false);

    server
        .apply_channel_burst(&burst(42, &["+m"], vec![("o".to_string(), carol)]))
        .unwrap();

    let channel = server.net.find_channel("#rust").unwrap();
    assert_eq!(channel.name, "#Rust");
    assert_eq!(channel.created_at, 42);
    assert!(channel.get_member(&carol).unwrap().has_mode('o'));
    assert!(has(&server, 'm'));
}

#[test]
fn test_burst_with_unknown_member_fails() {
    let mut server = server();
    let stranger = uuid::Uuid::new_v4();
    assert!(server
        .apply_channel_burst(&burst(42, &[], vec![(String::new(), stranger)]))
        .is_err());
}

#[test]
fn test_remote_user_mode_by_id() {
    let mut server = server();
    server
        .modes
        .add_mode(Arc::new(ModeHandler::simple("burst", "invisible", 'i', ModeType::User)))
        .unwrap();
    let carol = add_user(&mut server, "carol", false);

    let message = Message::with_prefix(
        Prefix::Server(carol.to_string()),
        MessageType::Mode,
        vec![carol.to_string(), "+i".to_string()],
    );
    server.handle_remote_mode(&message).unwrap();

    let invisible = server.modes.find_mode('i', ModeType::User).unwrap();
    assert!(server.net.find_user(&carol).unwrap().is_mode_set(invisible));
    assert!(server.net.take_propagated().is_empty());
    // carol is not ours, so nothing is delivered
    assert!(server.net.take_deliveries().is_empty());
}
