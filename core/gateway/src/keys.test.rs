use super::*;
use bifrost_protocol::Key;

fn keys() -> Vec<Key> {
    vec![
        Key::new("k1", "sk-1").with_weight(1),
        Key::new("k2", "sk-2")
            .with_weight(3)
            .with_models(vec!["gpt-4o-mini".to_string()]),
        Key::new("k3", "sk-3").with_weight(0),
        Key::new("k4", "sk-4").disabled(),
    ]
}

#[test]
fn test_disabled_and_mismatched_keys_excluded() {
    let keys = keys();

    // k2 only serves gpt-4o-mini; k4 is disabled.
    for _ in 0..50 {
        let key = select_key(&Provider::Openai, "gpt-4o", &keys, None).expect("select");
        assert_ne!(key.id, "k2");
        assert_ne!(key.id, "k4");
    }
}

#[test]
fn test_no_eligible_key() {
    let restricted = vec![
        Key::new("k1", "sk-1").with_models(vec!["other-model".to_string()]),
        Key::new("k2", "sk-2").disabled(),
    ];
    let err = select_key(&Provider::Openai, "gpt-4o-mini", &restricted, None)
        .expect_err("nothing eligible");
    assert_eq!(err.kind, bifrost_error::ErrorKind::NoEligibleKey);

    let err = select_key(&Provider::Openai, "gpt-4o-mini", &[], None).expect_err("no keys");
    assert_eq!(err.kind, bifrost_error::ErrorKind::NoEligibleKey);
}

#[test]
fn test_allow_list_restricts_selection() {
    let keys = keys();
    let allowed = vec!["k1".to_string()];
    for _ in 0..50 {
        let key = select_key(&Provider::Openai, "gpt-4o-mini", &keys, Some(&allowed))
            .expect("select");
        assert_eq!(key.id, "k1");
    }

    let unknown = vec!["k9".to_string()];
    let err = select_key(&Provider::Openai, "gpt-4o-mini", &keys, Some(&unknown))
        .expect_err("allow-list excludes everything");
    assert_eq!(err.kind, bifrost_error::ErrorKind::NoEligibleKey);
}

#[test]
fn test_all_zero_weights_fall_back_to_uniform() {
    let keys = vec![
        Key::new("k1", "sk-1").with_weight(0),
        Key::new("k2", "sk-2").with_weight(0),
    ];
    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        let key = select_key(&Provider::Openai, "m", &keys, None).expect("select");
        seen.insert(key.id.clone());
    }
    assert_eq!(seen.len(), 2, "both zero-weight keys should be drawn");
}

#[test]
fn test_weighted_distribution() {
    // p(k) = weight(k) / total weight: with weights 1 and 3, the heavier
    // key should land near 75% of draws.
    let keys = vec![
        Key::new("light", "sk-1").with_weight(1),
        Key::new("heavy", "sk-2").with_weight(3),
    ];

    let draws = 20_000;
    let mut heavy = 0usize;
    for _ in 0..draws {
        if select_key(&Provider::Openai, "m", &keys, None)
            .expect("select")
            .id
            == "heavy"
        {
            heavy += 1;
        }
    }

    let ratio = heavy as f64 / draws as f64;
    assert!(
        (0.70..0.80).contains(&ratio),
        "expected ~0.75 heavy-key ratio, got {ratio}"
    );
}

#[test]
fn test_allowed_ids_from_context() {
    let ctx = RequestContext::new();
    assert_eq!(allowed_ids_from_context(&ctx), None);

    let ctx = ctx.with_value(KEY_ALLOW_LIST_KEY, serde_json::json!(["k1", "k2"]));
    assert_eq!(
        allowed_ids_from_context(&ctx),
        Some(vec!["k1".to_string(), "k2".to_string()])
    );
}
