//! Shared proptest generators.

use proptest::prelude::*;

/// Generate service token strings.
pub fn token_strategy() -> impl Strategy<Value = String> {
    "hvs\\.[A-Za-z0-9]{24}"
}

/// Generate token accessors.
pub fn accessor_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{24}"
}

/// Generate AppRole role ids.
pub fn role_id_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}"
}

/// Generate lease durations in seconds (1 second to 32 days).
pub fn lease_duration_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(3600u64),
        1u64..=60,
        60u64..=32 * 24 * 3600,
    ]
}

/// Generate secret endpoint paths.
pub fn secret_path_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("secret/data/app".to_string()),
        Just("database/creds/readonly".to_string()),
        prop::collection::vec("[a-z][a-z0-9-]{0,12}", 1..4)
            .prop_map(|segments| format!("secret/data/{}", segments.join("/"))),
    ]
}

/// Generate namespace names, with or without a trailing slash.
pub fn namespace_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9-]{2,20}", any::<bool>())
        .prop_map(|(ns, slash)| if slash { format!("{ns}/") } else { ns })
}

/// Generate HTTP status codes the service may return on failure.
pub fn error_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(400u16),
        Just(403u16),
        Just(404u16),
        Just(429u16),
        Just(500u16),
        Just(502u16),
        Just(503u16),
    ]
}
