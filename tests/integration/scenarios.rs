//! Black-box walk-throughs of the concrete end-to-end scenarios (spec.md §8,
//! S1-S6), driven through the HTTP surface.

use karma_pipeline::config::{Config, RateWindow};
use karma_pipeline::models::{ChatSettings, KarmaEvent, ModeratorEvent, ModeratorEventKind};

use crate::common::{post_message, post_reaction, test_client, test_client_with_config};

/// S1: T authors M, R reacts 👍. A `KarmaEvent(+0.1)` lands and a reply goes
/// out over the transport.
#[test]
fn s1_single_upvote_credits_target() {
    let client = test_client();
    post_message(&client, 1, 1000, 42);
    client.set_member(1, 7);

    let res = post_reaction(&client, 1, 7, 1000, &["👍"], &[]);
    assert_eq!(res["applied"], true);
    assert!((res["delta_applied"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    assert!((res["karma_after"].as_f64().unwrap() - 0.10).abs() < 1e-6);

    let sent = client.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to_message_id, Some(1000));
}

/// S2: same as S1, then R removes the 👍. A second, opposite `KarmaEvent`
/// brings karma back to zero.
#[test]
fn s2_removing_reaction_reverses_karma() {
    let client = test_client();
    post_message(&client, 1, 1001, 42);
    client.set_member(1, 7);

    let up = post_reaction(&client, 1, 7, 1001, &["👍"], &[]);
    assert_eq!(up["applied"], true);
    assert!((up["karma_after"].as_f64().unwrap() - 0.10).abs() < 1e-6);

    let removed = post_reaction(&client, 1, 7, 1001, &[], &["👍"]);
    assert_eq!(removed["applied"], true);
    assert!((removed["delta_applied"].as_f64().unwrap() + 0.1).abs() < 1e-6);
    assert!(removed["karma_after"].as_f64().unwrap().abs() < 1e-6);
}

/// S3: a reactor at percentile 0.6 against a required_percentile of 0.5 is
/// gated before any karma write, and a transient notice goes out instead.
/// Percentile is the fraction of the chat (subject included) ranked
/// strictly above the reactor (§4.3), confirmed against the original's
/// `is_user_in_top_percentile` (`users_with_higher_karma / total_users`).
#[test]
fn s3_high_percentile_reactor_gets_notice_not_karma() {
    let config = Config { required_percentile: 0.5, ..Config::default() };
    let client = test_client_with_config(config);
    post_message(&client, 1, 1002, 42);
    client.set_member(1, 7);

    // Seed karma rows directly so reactor 7 sits at exactly the 60th
    // percentile: 3 of the other 4 members outrank its karma of 5.0.
    let db = client.db();
    let seed = |user_to: i64, karma: f64| {
        db.apply_karma_change(&KarmaEvent {
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
    seed(7, 5.0); // subject
    seed(1, 10.0); // outranks subject
    seed(2, 10.0); // outranks subject
    seed(3, 10.0); // outranks subject
    seed(4, 1.0); // ranked below subject

    let res = post_reaction(&client, 1, 7, 1002, &["👍"], &[]);
    assert_eq!(res["applied"], false);
    assert!(res["karma_after"].is_null());
    assert!(res["reason"].as_str().unwrap().contains("percentile"));

    let sent = client.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
}

/// S4: a per-target budget of `0.3` (three `0.1` reactions) is already
/// spent; the fourth reaction is throttled instead of applied.
#[test]
fn s4_fourth_reaction_in_window_is_throttled() {
    let config = Config {
        rate_limits_per_target: vec![RateWindow { rate: 0.3, window_secs: 3600 }],
        rate_limits_global: vec![],
        ..Config::default()
    };
    let client = test_client_with_config(config);
    post_message(&client, 1, 1003, 42);
    client.set_member(1, 7);

    for _ in 0..3 {
        let res = post_reaction(&client, 1, 7, 1003, &["👍"], &[]);
        assert_eq!(res["applied"], true);
    }
    let res = post_reaction(&client, 1, 7, 1003, &["👍"], &[]);
    assert_eq!(res["applied"], false);
    assert!(res["reason"].as_str().unwrap().contains("rate limit"));

    let sent = client.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 4); // 3 replies + 1 throttle notice
}

/// S5: T is already negative with one prior `AUTO_MUTE`; a further downvote
/// escalates to a new `AUTO_MUTE` at `base * 2^1`.
#[test]
fn s5_repeat_offender_escalates_to_auto_mute() {
    let client = test_client();
    post_message(&client, 1, 1004, 42);
    client.set_member(1, 7);

    let db = client.db();
    let chat = db.get_or_create_chat(1).unwrap();
    db.set_chat_settings(
        chat.id,
        &ChatSettings { karma_counting: true, karmic_restrictions: true },
    )
    .unwrap();

    // Drive target 42 to karma -0.05 without going through a gated reactor.
    db.apply_karma_change(&KarmaEvent {
        id: "seed-karma".into(),
        user_from: 0,
        user_to: 42,
        chat_id: 1,
        how_change_signed: -0.05,
        how_change_weighted: -0.05,
        date: chrono::Utc::now().to_rfc3339(),
        comment: String::new(),
        reverted: false,
    })
    .unwrap();
    // A prior AUTO_MUTE, already expired so it doesn't itself block reactor
    // 7's reaction below (§4.6 step 5 checks active restrictions
    // unconditionally).
    db.insert_moderator_event(&ModeratorEvent {
        id: "prior-mute".into(),
        moderator: None,
        user_tg_id: 42,
        chat_id: 1,
        kind: ModeratorEventKind::AutoMute,
        date: chrono::Utc::now().to_rfc3339(),
        duration_secs: Some(0),
        comment: String::new(),
    })
    .unwrap();

    let res = post_reaction(&client, 1, 7, 1004, &["👎"], &[]);
    assert_eq!(res["applied"], true);
    assert!((res["karma_after"].as_f64().unwrap() - (-0.15)).abs() < 1e-6);

    let restrictions = client.transport.restrictions.lock().unwrap();
    assert_eq!(restrictions.len(), 1);
    assert_eq!(restrictions[0].1, 42);
    // `duration_for(1) = base * 2^1` is checked at the component level
    // (config.rs's `auto_restriction_duration_escalates`); here just confirm
    // a fresh mute with a future `until` actually fired.
    assert!(restrictions[0].2.unwrap() > chrono::Utc::now());
}

/// S6: reacting to a message whose author was never recorded (or has aged
/// out of C2's retention window) aborts silently with no database writes.
#[test]
fn s6_unknown_author_aborts_silently() {
    let client = test_client();
    client.set_member(1, 7);

    let res = post_reaction(&client, 1, 7, 9999, &["👍"], &[]);
    assert_eq!(res["applied"], false);
    assert!(res["reason"].is_null());
    assert!(res["karma_after"].is_null());

    let sent = client.transport.sent.lock().unwrap();
    assert!(sent.is_empty());
    let restrictions = client.transport.restrictions.lock().unwrap();
    assert!(restrictions.is_empty());
}
