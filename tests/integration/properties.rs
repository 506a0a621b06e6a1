//! Black-box checks for the testable properties (spec.md §8, P1-P6),
//! driven through the HTTP surface the way a real transport adapter would.

use karma_pipeline::config::{Config, RateWindow};
use karma_pipeline::db::Db;
use karma_pipeline::message_registry;
use karma_pipeline::models::{ModeratorEvent, ModeratorEventKind};

use crate::common::{post_callback, post_message, post_reaction, test_client, test_client_with_config};

/// P1: `UserKarma.karma` equals the sum of non-reverted weighted deltas.
#[test]
fn karma_equals_sum_of_weighted_events() {
    let client = test_client();
    post_message(&client, 1, 100, 42); // target T authored message 100

    let mut expected = 0.0;
    for reactor in [10, 11, 12] {
        client.set_member(1, reactor);
        let res = post_reaction(&client, 1, reactor, 100, &["👍"], &[]);
        assert_eq!(res["applied"], true);
        expected += res["delta_applied"].as_f64().unwrap();
    }
    client.set_member(1, 13);
    let res = post_reaction(&client, 1, 13, 100, &["👎"], &[]);
    assert_eq!(res["applied"], true);
    expected += res["delta_applied"].as_f64().unwrap();

    assert!((res["karma_after"].as_f64().unwrap() - expected).abs() < 1e-6);
}

/// P2: opposite-sign reactions from the same reactor on the same target net
/// to zero karma change.
#[test]
fn opposing_reactions_from_same_reactor_net_to_zero() {
    let client = test_client();
    post_message(&client, 1, 200, 42);
    client.set_member(1, 10);

    let up = post_reaction(&client, 1, 10, 200, &["👍"], &[]);
    assert_eq!(up["applied"], true);
    let karma_after_up = up["karma_after"].as_f64().unwrap();
    assert!(karma_after_up > 0.0);

    let down = post_reaction(&client, 1, 10, 200, &["👎"], &[]);
    assert_eq!(down["applied"], true);
    let karma_after_down = down["karma_after"].as_f64().unwrap();
    assert!(karma_after_down.abs() < 1e-6);
}

/// P3: applying a reaction then cancelling it restores prior karma and lifts
/// any `AUTO_MUTE` the reaction induced.
#[test]
fn cancel_restores_karma_and_lifts_restriction() {
    let client = test_client_with_config(Config::default());
    post_message(&client, 1, 300, 42);
    client.set_member(1, 50);
    client.set_member(1, 10);

    let db = client.db();
    let chat = db.get_or_create_chat(1).unwrap();
    db.set_chat_settings(
        chat.id,
        &karma_pipeline::models::ChatSettings { karma_counting: true, karmic_restrictions: true },
    )
    .unwrap();

    // First crossing (0 -> negative): notice only, no restriction yet.
    let first = post_reaction(&client, 1, 50, 300, &["👎"], &[]);
    assert_eq!(first["applied"], true);

    // Seed a prior AUTO_MUTE directly, matching this scenario's precondition
    // that the target already has one in this chat (§4.7's rule never
    // produces the first one on its own).
    db.insert_moderator_event(&ModeratorEvent {
        id: "seeded".into(),
        moderator: None,
        user_tg_id: 42,
        chat_id: 1,
        kind: ModeratorEventKind::AutoMute,
        date: chrono::Utc::now().to_rfc3339(),
        duration_secs: Some(0), // already expired, doesn't itself block reactor 10 below
        comment: String::new(),
    })
    .unwrap();

    let second = post_reaction(&client, 1, 10, 300, &["👎"], &[]);
    assert_eq!(second["applied"], true);
    let karma_after_react = second["karma_after"].as_f64().unwrap();
    assert!(karma_after_react < first["karma_after"].as_f64().unwrap());
    let token = second["cancel_token"].as_str().unwrap();

    let callback = post_callback(&client, 10, token, 1, 999);
    assert_eq!(callback["reverted"], true);
    let karma_after_undo = callback["karma_after"].as_f64().unwrap();
    assert!((karma_after_undo - first["karma_after"].as_f64().unwrap()).abs() < 1e-6);

    // The restriction created by reactor 10's reaction was lifted: a second
    // restrict_chat_member call with `until = None` was recorded.
    let restrictions = client.transport.restrictions.lock().unwrap();
    assert!(restrictions.iter().any(|(_, user, until)| *user == 42 && until.is_none()));
}

/// P4: a reactor at or above the percentile gate produces no karma event.
/// Percentile is the fraction of the chat (subject included) ranked
/// strictly above the reactor (§4.3), so a reactor sitting at the bottom of
/// the chat's karma ranking is the one that gets gated, not the top.
#[test]
fn high_percentile_reactor_is_gated() {
    let config = Config { required_percentile: 0.5, ..Config::default() };
    let client = test_client_with_config(config);
    post_message(&client, 1, 400, 42); // T, the eventual reaction target

    // Reactor 77 sits at the bottom: 4 other members all outrank it, so its
    // percentile is 4/5 = 0.8 >= required_percentile.
    let db = client.db();
    let seed = |user_to: i64, karma: f64| {
        db.apply_karma_change(&karma_pipeline::models::KarmaEvent {
            id: format!("seed-{user_to}"),
            user_from: 0,
            user_to,
            chat_id: 1,
            how_change_signed: karma,
            how_change_weighted: karma,
            date: chrono::Utc::now().to_rfc3339(),
            comment: String::new(),
            reverted: false,
        })
        .unwrap();
    };
    seed(77, 0.0);
    seed(1, 1.0);
    seed(2, 2.0);
    seed(3, 3.0);
    seed(4, 4.0);

    client.set_member(1, 77);
    let res = post_reaction(&client, 1, 77, 400, &["👍"], &[]);
    assert_eq!(res["applied"], false);
    assert!(res["karma_after"].is_null());
}

/// P5: cumulative `|delta|` within a rate window never reaches `rate *
/// power(reactor)` — three reactions at `reaction_coefficient=0.1` each
/// exhaust a `0.3` per-target budget, so the fourth is refused.
#[test]
fn rate_limited_reactor_stays_under_budget() {
    let config = Config {
        rate_limits_per_target: vec![RateWindow { rate: 0.3, window_secs: 3600 }],
        rate_limits_global: vec![],
        ..Config::default()
    };
    let client = test_client_with_config(config);
    post_message(&client, 1, 500, 42);
    client.set_member(1, 10);

    for _ in 0..3 {
        let res = post_reaction(&client, 1, 10, 500, &["👍"], &[]);
        assert_eq!(res["applied"], true);
    }
    let res = post_reaction(&client, 1, 10, 500, &["👍"], &[]);
    assert_eq!(res["applied"], false);
}

/// P6: `MessageAuthor.cleanup(r)` leaves the registry exactly equal to the
/// rows newer than `now - r`.
#[test]
fn cleanup_retains_only_rows_within_retention() {
    let db = Db::in_memory();
    let stale = (chrono::Utc::now() - chrono::Duration::hours(72)).to_rfc3339();
    db.store_message_author(1, 1, 7, &stale).unwrap();
    message_registry::record_author(&db, 1, 2, 7).unwrap();

    let deleted = message_registry::sweep_once(&db, 24).unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(message_registry::resolve_author(&db, 1, 1).unwrap(), None);
    assert_eq!(message_registry::resolve_author(&db, 1, 2).unwrap(), Some(7));
}
