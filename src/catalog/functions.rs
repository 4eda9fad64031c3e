//! Purpose: Fingerprints for individual host functions the engine binds.
//! Exports: `function_fingerprints`, signature marker constants.
//! Role: Each entry absorbs one flavor of host churn: renamed exports,
//! moved members, stripped identifiers.
//! Invariants: Probes rely only on export shape and compiled-source
//! markers, never on module identifiers.

use crate::core::fingerprint::Fingerprint;
use crate::core::value::DEFAULT_EXPORT;

/// Marker the host compiles into its contact-existence query stub. The
/// surrounding identifiers churn every release; this string does not.
pub const QUERY_EXISTS_MARKER: &str = "Should not reach queryExists";

/// Marker inside the host's message id generator.
pub const MESSAGE_ID_MARKER: &str = "serializeRandomId";

fn query_exists() -> Fingerprint {
    // Older hosts export the query under `default`, newer ones under
    // `queryExists`; newest ones drop the marker but ship the phone-number
    // variant alongside. One probe covers all three generations.
    Fingerprint::matching(|m| {
        m.signature_contains(DEFAULT_EXPORT, QUERY_EXISTS_MARKER)
            || m.signature_contains("queryExists", QUERY_EXISTS_MARKER)
            || (m.has_function("queryExists") && m.has_function("queryPhoneExists"))
    })
    .select_first_of(&["queryExists", DEFAULT_EXPORT])
}

pub fn function_fingerprints() -> Vec<(String, Fingerprint)> {
    vec![
        ("QueryExists".to_string(), query_exists()),
        // Alias kept for consumers of the pre-rename name.
        ("SendQueryExists".to_string(), query_exists()),
        (
            "FindChat".to_string(),
            Fingerprint::matching(|m| {
                m.has_function("findChat") && m.has_function("findOrCreateLatestChat")
            })
            .select_export("findChat"),
        ),
        (
            "GenerateMessageId".to_string(),
            Fingerprint::matching(|m| {
                m.signature_contains(DEFAULT_EXPORT, MESSAGE_ID_MARKER)
                    || m.signature_contains("generateId", MESSAGE_ID_MARKER)
            })
            .select_first_of(&["generateId", DEFAULT_EXPORT]),
        ),
        (
            "SendSeen".to_string(),
            Fingerprint::matching(|m| m.has_function("sendSeen") && m.has_function("markSeen"))
                .select_export("sendSeen"),
        ),
    ]
}
