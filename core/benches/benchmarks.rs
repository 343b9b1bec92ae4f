//! Performance benchmarks for the mode engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modeircd_core::mode::{ListModeBase, ListNumerics, OP_VALUE, VOICE_VALUE};
use modeircd_core::*;
use std::sync::Arc;

fn server() -> (Server, UserId) {
    let mut server = Server::new(Config::default());
    let modes = [
        ModeHandler::prefix("bench", "op", 'o', OP_VALUE, '@'),
        ModeHandler::prefix("bench", "voice", 'v', VOICE_VALUE, '+'),
        ModeHandler::simple("bench", "moderated", 'm', ModeType::Channel),
        ModeHandler::simple("bench", "noextmsg", 'n', ModeType::Channel),
        ModeHandler::list(
            "bench",
            "ban",
            'b',
            ListModeBase::new(
                ListNumerics {
                    entry: NumericReply::RplBanList,
                    end: NumericReply::RplEndOfBanList,
                    end_text: "End of channel ban list",
                },
                true,
            ),
        ),
    ];
    for mh in modes {
        server.modes.add_mode(Arc::new(mh)).unwrap();
    }

    let alice = server
        .net
        .add_user(User::new(
            "alice".to_string(),
            "alice".to_string(),
            "Alice".to_string(),
            "example.com".to_string(),
            "irc.localhost".to_string(),
            true,
        ))
        .unwrap();
    server
        .handle_message(&alice, &Message::parse("JOIN #bench").unwrap())
        .unwrap();
    (server, alice)
}

fn benchmark_mode_parsing(c: &mut Criterion) {
    let (mut server, alice) = server();
    let params: Vec<String> = ["+mnb-v", "*!*@spam.example", "alice"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    c.bench_function("mode_params_to_change_list", |b| {
        b.iter(|| {
            let mut changes = ChangeList::new();
            server.modes.mode_params_to_change_list(
                &mut server.net,
                &alice,
                ModeType::Channel,
                black_box(&params),
                &mut changes,
            );
            changes
        })
    });
}

fn benchmark_toggle_modes(c: &mut Criterion) {
    let (mut server, alice) = server();
    let target = ModeTarget::channel("#bench");
    let moderated = server.modes.find_mode('m', ModeType::Channel).cloned().unwrap();
    let noextmsg = server.modes.find_mode('n', ModeType::Channel).cloned().unwrap();

    c.bench_function("toggle_simple_modes", |b| {
        b.iter(|| {
            let mut changes = ChangeList::new();
            changes.push_add(&moderated);
            changes.push_add(&noextmsg);
            changes.push_remove(&moderated);
            changes.push_remove(&noextmsg);
            let batches =
                server.process_modes(&alice, &target, &mut changes, ProcessFlags::CHECK_ACCESS);
            server.net.take_deliveries();
            server.net.take_propagated();
            batches
        })
    });
}

fn benchmark_ban_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("ban_batches");

    for count in [10usize, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (mut server, alice) = server();
            let target = ModeTarget::channel("#bench");
            let ban = server.modes.find_mode('b', ModeType::Channel).cloned().unwrap();
            let masks: Vec<String> = (0..count).map(|i| format!("*!*@host{}.example", i)).collect();

            b.iter(|| {
                let mut changes = ChangeList::new();
                for mask in &masks {
                    changes.push_add_param(&ban, mask.clone());
                }
                for mask in &masks {
                    changes.push_remove_param(&ban, mask.clone());
                }
                let batches = server.process_modes(&alice, &target, &mut changes, ProcessFlags::NONE);
                server.net.take_deliveries();
                server.net.take_propagated();
                batches
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_mode_parsing,
    benchmark_toggle_modes,
    benchmark_ban_batches
);
criterion_main!(benches);
