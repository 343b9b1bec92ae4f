//! Tests for the bundled mode modules running on a full server

use modeircd_core::config::{ListLimitConfig, OperatorConfig, PrefixConfig};
use modeircd_core::mode::{HALFOP_VALUE, OP_VALUE};
use modeircd_core::*;
use modeircd_modules::banredirect::{redirect_for, redirects};
use modeircd_modules::{load_configured, standard_module, PrefixModesModule};
use std::sync::Arc;

fn full_config() -> Config {
    let mut config = Config::default();
    config.modules.load.push("banredirect".to_string());
    config.modules.load.push("rmode".to_string());
    config.operators.push(OperatorConfig {
        name: "root".to_string(),
        oper_type: "NetAdmin".to_string(),
        hostmask: "*@*".to_string(),
        chan_modes: "*".to_string(),
        user_modes: "*".to_string(),
    });
    config
}

fn server_with(config: Config) -> Server {
    let mut server = Server::new(config);
    load_configured(&mut server).unwrap();
    server
}

fn add_user(server: &mut Server, nick: &str) -> UserId {
    server
        .net
        .add_user(User::new(
            nick.to_string(),
            nick.to_string(),
            nick.to_string(),
            "example.com".to_string(),
            "irc.localhost".to_string(),
            true,
        ))
        .unwrap()
}

fn send(server: &mut Server, source: UserId, line: &str) {
    let message = Message::parse(line).unwrap();
    server.handle_message(&source, &message).unwrap();
}

/// alice creates #rust, bob and carol join
fn setup(config: Config) -> (Server, UserId, UserId, UserId) {
    let mut server = server_with(config);
    let alice = add_user(&mut server, "alice");
    let bob = add_user(&mut server, "bob");
    let carol = add_user(&mut server, "carol");
    for user in [alice, bob, carol] {
        send(&mut server, user, "JOIN #rust");
    }
    server.net.take_deliveries();
    server.net.take_propagated();
    (server, alice, bob, carol)
}

/// Numeric codes and notices sent to `to`, draining the queue
fn replies_for(server: &mut Server, to: UserId) -> Vec<Message> {
    server
        .net
        .take_deliveries()
        .into_iter()
        .filter(|d| d.to == to && d.message.command != MessageType::Mode)
        .map(|d| d.message)
        .collect()
}

/// MODE lines seen by `to`, draining the queue
fn mode_lines(server: &mut Server, to: UserId) -> Vec<Vec<String>> {
    server
        .net
        .take_deliveries()
        .into_iter()
        .filter(|d| d.to == to && d.message.command == MessageType::Mode)
        .map(|d| d.message.params)
        .collect()
}

fn param(server: &Server, letter: char) -> Option<String> {
    let mh = server.modes.find_mode(letter, ModeType::Channel).unwrap();
    mh.get_parameter(server.net.find_channel("#rust").unwrap())
}

fn has(server: &Server, letter: char) -> bool {
    let mh = server.modes.find_mode(letter, ModeType::Channel).unwrap();
    server.net.find_channel("#rust").unwrap().is_mode_set(mh)
}

fn member_has(server: &Server, user: UserId, letter: char) -> bool {
    server
        .net
        .find_channel("#rust")
        .unwrap()
        .get_member(&user)
        .is_some_and(|m| m.has_mode(letter))
}

fn bans(server: &Server) -> Vec<String> {
    let mh = server.modes.find_mode('b', ModeType::Channel).unwrap();
    let channel = server.net.find_channel("#rust").unwrap();
    mh.is_list_mode_base()
        .unwrap()
        .get_list(mh, channel)
        .map(|list| list.iter().map(|e| e.mask.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn test_configured_modules_advertise_modes() {
    let server = server_with(full_config());
    let tokens = server.isupport();
    assert!(tokens.contains(&"PREFIX=(ohv)@%+".to_string()));
    assert!(tokens.contains(&"CHANMODES=Ibe,k,l,imnpst".to_string()));
    assert_eq!(server.modules.get_loaded_modules().len(), 6);
}

#[test]
fn test_unknown_module_name() {
    assert!(standard_module("nonexistent").is_none());

    let mut config = Config::default();
    config.modules.load = vec!["nonexistent".to_string()];
    let mut server = Server::new(config);
    assert!(load_configured(&mut server).is_err());
}

#[test]
fn test_channel_key() {
    let (mut server, alice, _bob, _carol) = setup(full_config());

    send(&mut server, alice, "MODE #rust +k secret");
    assert_eq!(param(&server, 'k').as_deref(), Some("secret"));

    // A key must be removed before a new one is set, with the right value
    send(&mut server, alice, "MODE #rust +k other");
    assert_eq!(param(&server, 'k').as_deref(), Some("secret"));
    send(&mut server, alice, "MODE #rust -k wrong");
    assert!(has(&server, 'k'));
    mode_lines(&mut server, alice);

    send(&mut server, alice, "MODE #rust -k secret");
    assert!(!has(&server, 'k'));
    assert_eq!(mode_lines(&mut server, alice), vec![vec!["#rust", "-k", "secret"]]);

    send(&mut server, alice, "MODE #rust +k a,b");
    assert!(!has(&server, 'k'));

    let long = "x".repeat(40);
    send(&mut server, alice, &format!("MODE #rust +k {}", long));
    assert_eq!(param(&server, 'k'), Some("x".repeat(32)));
}

#[test]
fn test_channel_limit() {
    let (mut server, alice, _bob, _carol) = setup(full_config());

    send(&mut server, alice, "MODE #rust +l 10abc");
    assert_eq!(param(&server, 'l').as_deref(), Some("10"));
    assert_eq!(mode_lines(&mut server, alice), vec![vec!["#rust", "+l", "10"]]);

    send(&mut server, alice, "MODE #rust +l 0");
    assert_eq!(param(&server, 'l').as_deref(), Some("10"));

    // On a tie between servers the smaller limit wins numerically
    let ts = server.net.find_channel("#rust").unwrap().created_at;
    let fmode = |limit: &str| {
        Message::new(
            MessageType::FMode,
            vec!["#rust".to_string(), ts.to_string(), "+l".to_string(), limit.to_string()],
        )
    };
    server.handle_remote_mode(&fmode("5")).unwrap();
    assert_eq!(param(&server, 'l').as_deref(), Some("5"));
    server.handle_remote_mode(&fmode("50")).unwrap();
    assert_eq!(param(&server, 'l').as_deref(), Some("5"));

    mode_lines(&mut server, alice);
    send(&mut server, alice, "MODE #rust -l");
    assert!(!has(&server, 'l'));
    assert_eq!(mode_lines(&mut server, alice), vec![vec!["#rust", "-l"]]);
}

#[test]
fn test_halfop_ranks() {
    let (mut server, alice, bob, carol) = setup(full_config());
    send(&mut server, alice, "MODE #rust +h bob");
    assert!(member_has(&server, bob, 'h'));
    server.net.take_deliveries();

    send(&mut server, bob, "MODE #rust +v carol");
    assert!(member_has(&server, carol, 'v'));

    send(&mut server, bob, "MODE #rust +m");
    assert!(has(&server, 'm'));
    server.net.take_deliveries();

    send(&mut server, bob, "MODE #rust +h carol");
    assert!(!member_has(&server, carol, 'h'));
    let replies = replies_for(&mut server, bob);
    assert_eq!(replies.len(), 1);
    assert_eq!(
        replies[0].params.last().unwrap(),
        "You must have channel op access or above to set channel mode h"
    );
}

#[test]
fn test_prefix_rank_override_from_config() {
    let mut config = full_config();
    config.prefixes.push(PrefixConfig {
        name: "voice".to_string(),
        rank: None,
        set_rank: Some(OP_VALUE),
        unset_rank: None,
        self_remove: None,
    });
    let (mut server, alice, bob, carol) = setup(config);
    send(&mut server, alice, "MODE #rust +h bob");
    send(&mut server, bob, "MODE #rust +v carol");
    assert!(!member_has(&server, carol, 'v'));
}

#[test]
fn test_partial_prefix_override_keeps_other_ranks() {
    let mut config = full_config();
    config.prefixes.push(PrefixConfig {
        name: "voice".to_string(),
        rank: None,
        set_rank: Some(OP_VALUE),
        unset_rank: None,
        self_remove: None,
    });
    let (mut server, alice, bob, carol) = setup(config);
    let voice = server.modes.find_mode('v', ModeType::Channel).cloned().unwrap();
    let pm = voice.is_prefix_mode().unwrap();
    assert_eq!(pm.set_rank(), OP_VALUE);
    assert_eq!(pm.unset_rank(), HALFOP_VALUE);

    // A voiced member cannot devoice others
    send(&mut server, alice, "MODE #rust +vv bob carol");
    send(&mut server, bob, "MODE #rust -v carol");
    assert!(member_has(&server, carol, 'v'));

    // Dropping the override restores the module's ranks
    let mut config = server.config().clone();
    config.prefixes.clear();
    server.rehash(config).unwrap();
    assert_eq!(pm.set_rank(), HALFOP_VALUE);
    assert_eq!(pm.unset_rank(), HALFOP_VALUE);
}

#[test]
fn test_without_halfop() {
    let mut config = Config::default();
    config.modules.load.clear();
    let mut server = Server::new(config);
    server
        .load_module(Arc::new(PrefixModesModule::without_halfop()))
        .unwrap();
    assert_eq!(server.modes.build_prefixes(), "(ov)@+");
    assert!(server.modes.find_prefix('%').is_none());
}

#[test]
fn test_oper_user_mode() {
    let (mut server, alice, _bob, _carol) = setup(full_config());
    let oper = server.modes.find_mode('o', ModeType::User).cloned().unwrap();

    // Only the server sets +o
    send(&mut server, alice, "MODE alice +o");
    assert!(!server.net.find_user(&alice).unwrap().is_mode_set(&oper));

    send(&mut server, alice, "OPER root");
    let user = server.net.find_user(&alice).unwrap();
    assert!(user.is_oper());
    assert!(user.is_mode_set(&oper));
    assert_eq!(mode_lines(&mut server, alice).last().unwrap()[1], "+o");

    send(&mut server, alice, "MODE alice +H");
    let hideoper = server.modes.find_mode('H', ModeType::User).cloned().unwrap();
    assert!(server.net.find_user(&alice).unwrap().is_mode_set(&hideoper));

    send(&mut server, alice, "MODE alice -o");
    let user = server.net.find_user(&alice).unwrap();
    assert!(!user.is_oper());
    assert!(!user.is_mode_set(&oper));
}

#[test]
fn test_failed_oper() {
    let (mut server, alice, _bob, _carol) = setup(full_config());
    send(&mut server, alice, "OPER nobody");
    let replies = replies_for(&mut server, alice);
    assert_eq!(replies[0].command.to_string(), "491");
    assert!(!server.net.find_user(&alice).unwrap().is_oper());
}

#[test]
fn test_ban_redirect() {
    let (mut server, alice, bob, _carol) = setup(full_config());
    send(&mut server, alice, "JOIN #overflow");
    send(&mut server, bob, "JOIN #other");
    send(&mut server, alice, "JOIN #other");
    server.net.take_deliveries();

    send(&mut server, alice, "MODE #rust +b *!*@spam.example#overflow");
    assert_eq!(bans(&server), vec!["*!*@spam.example#overflow"]);
    let channel = server.net.find_channel("#rust").unwrap();
    assert_eq!(redirect_for(channel, "bad!user@spam.example"), Some("#overflow"));
    assert_eq!(redirect_for(channel, "good!user@example.com"), None);
    server.net.take_deliveries();

    let rejected = [
        ("x#other", "You must be opped on #other to set it as a redirect."),
        ("x#nowhere", "Target channel #nowhere must exist to be set as a redirect."),
        ("x#RUST", "You cannot set a ban redirection to the channel the ban is on"),
    ];
    for (mask, text) in rejected {
        send(&mut server, alice, &format!("MODE #rust +b {}", mask));
        let replies = replies_for(&mut server, alice);
        assert_eq!(replies.len(), 1, "{}", mask);
        assert_eq!(replies[0].command.to_string(), "690");
        assert_eq!(replies[0].params.last().unwrap(), text);
    }
    assert_eq!(bans(&server).len(), 1);

    send(&mut server, alice, "MODE #rust -b *!*@spam.example#overflow");
    assert!(bans(&server).is_empty());
    assert!(redirects(server.net.find_channel("#rust").unwrap()).is_empty());
}

#[test]
fn test_ban_redirect_on_full_list() {
    let mut config = full_config();
    config.limits.max_list.push(ListLimitConfig {
        channel: "#rust".to_string(),
        mode: Some("ban".to_string()),
        limit: 1,
    });
    let (mut server, alice, _bob, _carol) = setup(config);
    send(&mut server, alice, "JOIN #overflow");
    send(&mut server, alice, "MODE #rust +b first");
    server.net.take_deliveries();

    send(&mut server, alice, "MODE #rust +b *!*@spam.example#overflow");
    let replies = replies_for(&mut server, alice);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].command.to_string(), "478");
    assert_eq!(
        replies[0].params[1..],
        [
            "#rust".to_string(),
            "b".to_string(),
            "Channel ban list for #rust is full (maximum entries for this channel is 1)".to_string(),
        ]
    );
    assert_eq!(bans(&server), vec!["first!*@*"]);
    assert!(redirects(server.net.find_channel("#rust").unwrap()).is_empty());
}

#[test]
fn test_rmode_list_and_prefix_modes() {
    let (mut server, alice, bob, carol) = setup(full_config());
    send(&mut server, alice, "MODE #rust +bbb alpha beta gamma");
    send(&mut server, alice, "MODE #rust +vvo bob carol bob");

    send(&mut server, alice, "RMODE #rust b a*");
    assert_eq!(bans(&server), vec!["beta!*@*", "gamma!*@*"]);
    send(&mut server, alice, "RMODE #rust b");
    assert!(bans(&server).is_empty());

    send(&mut server, alice, "RMODE #rust v c*");
    assert!(member_has(&server, bob, 'v'));
    assert!(!member_has(&server, carol, 'v'));

    // Ops keep their own status
    send(&mut server, alice, "RMODE #rust o");
    assert!(member_has(&server, alice, 'o'));
    assert!(!member_has(&server, bob, 'o'));
}

#[test]
fn test_rmode_simple_and_param_modes() {
    let (mut server, alice, _bob, _carol) = setup(full_config());
    send(&mut server, alice, "MODE #rust +mk key");

    send(&mut server, alice, "RMODE #rust k");
    assert!(!has(&server, 'k'));
    send(&mut server, alice, "RMODE #rust m");
    assert!(!has(&server, 'm'));
}

#[test]
fn test_rmode_errors() {
    let (mut server, alice, bob, _carol) = setup(full_config());
    send(&mut server, alice, "MODE #rust +m");
    server.net.take_deliveries();

    let cases = [
        (bob, "RMODE #rust m", "You do not have access to unset m on #rust."),
        (alice, "RMODE #rust Z", "Z is not a valid channel mode."),
        (alice, "RMODE #rust mn", "mn is not a valid channel mode."),
        (alice, "RMODE #nowhere m", "The channel #nowhere does not exist."),
    ];
    for (user, line, text) in cases {
        send(&mut server, user, line);
        let replies = replies_for(&mut server, user);
        assert_eq!(replies.len(), 1, "{}", line);
        assert_eq!(replies[0].command, MessageType::Notice);
        assert_eq!(replies[0].params[1], text);
    }
    assert!(has(&server, 'm'));

    send(&mut server, alice, "RMODE #rust");
    assert_eq!(replies_for(&mut server, alice)[0].command.to_string(), "461");
}

#[test]
fn test_unloaded_command_is_unknown() {
    let (mut server, alice, _bob, _carol) = setup(full_config());
    server.unload_module("rmode").unwrap();
    send(&mut server, alice, "RMODE #rust b");
    assert_eq!(replies_for(&mut server, alice)[0].command.to_string(), "421");
}

#[test]
fn test_unload_chanmodes_clears_channels() {
    let (mut server, alice, _bob, _carol) = setup(full_config());
    send(&mut server, alice, "MODE #rust +ntkl key 25");
    server.net.take_deliveries();

    server.unload_module("chanmodes").unwrap();
    assert!(server.modes.find_mode('k', ModeType::Channel).is_none());
    let channel = server.net.find_channel("#rust").unwrap();
    assert!(channel.modes.is_empty());
    assert!(!channel.extensions.contains("parammode:key"));
    assert!(!channel.extensions.contains("parammode:limit"));
    // Prefixes belong to another module and stay
    assert!(member_has(&server, alice, 'o'));
    assert!(!mode_lines(&mut server, alice).is_empty());
}
