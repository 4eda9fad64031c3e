//! Purpose: Fingerprints for the host's singleton store modules.
//! Exports: `STORE_NAMES`, `store_fingerprints`, `collection_class_fingerprints`.
//! Role: Mechanical table; every store binds the same way, generated from
//! the name list.
//! Invariants: A store's default export must be a live instance of its
//! collection class; the class name is derived from the store name.

use crate::core::fingerprint::Fingerprint;
use crate::core::value::DEFAULT_EXPORT;

/// Singleton stores the engine exposes. Each `FooStore` binds the module
/// whose default export is an instance of `FooCollection`.
pub const STORE_NAMES: &[&str] = &[
    "BlocklistStore",
    "CallStore",
    "ChatStore",
    "ContactStore",
    "GroupMetadataStore",
    "LabelStore",
    "MsgStore",
    "MsgInfoStore",
    "MuteStore",
    "PresenceStore",
    "ProfilePicThumbStore",
    "QuickReplyStore",
    "StarredMsgStore",
    "StatusStore",
    "StickerStore",
];

pub fn store_fingerprints() -> Vec<(String, Fingerprint)> {
    STORE_NAMES
        .iter()
        .map(|name| {
            let collection = name.replace("Store", "Collection");
            ((*name).to_string(), Fingerprint::instance_of_default(collection))
        })
        .collect()
}

/// Class bindings extracted from singleton instances. The group-metadata
/// collection is recognized behaviorally: whatever its class is called
/// this release, it is the one whose singleton handles pending invites.
pub fn collection_class_fingerprints() -> Vec<(String, Fingerprint)> {
    vec![(
        "GroupMetadataCollection".to_string(),
        Fingerprint::matching(|m| m.instance_with_method(DEFAULT_EXPORT, "handlePendingInvite"))
            .select_class_of(DEFAULT_EXPORT),
    )]
}

#[cfg(test)]
mod tests {
    use super::{STORE_NAMES, collection_class_fingerprints, store_fingerprints};
    use crate::core::instance::LiveInstance;
    use crate::core::value::{DEFAULT_EXPORT, ExportValue, ModuleExports};
    use serde_json::json;

    #[test]
    fn every_store_name_gets_a_fingerprint() {
        let fingerprints = store_fingerprints();
        assert_eq!(fingerprints.len(), STORE_NAMES.len());
    }

    #[test]
    fn store_fingerprint_matches_only_its_collection() {
        let fingerprints = store_fingerprints();
        let (_, chat) = fingerprints
            .iter()
            .find(|(name, _)| name == "ChatStore")
            .expect("ChatStore");

        let chats = LiveInstance::of("ChatCollection").identity("chats").build();
        let mutes = LiveInstance::of("MuteCollection").identity("mutes").build();
        let chat_module =
            ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Instance(chats));
        let mute_module =
            ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Instance(mutes));

        assert!(chat.matches(&chat_module));
        assert!(!chat.matches(&mute_module));
    }

    #[test]
    fn group_metadata_class_is_found_behaviorally() {
        let (_, fingerprint) = collection_class_fingerprints().remove(0);
        let groups = LiveInstance::of("GroupMetadataCollection")
            .identity("groups")
            .method("handlePendingInvite", |_, _| Ok(json!(null)))
            .build();
        let exports = ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Instance(groups));

        assert!(fingerprint.matches(&exports));
        let class = fingerprint
            .select(&exports)
            .and_then(|value| value.as_class().cloned())
            .expect("class");
        assert_eq!(class.name(), "GroupMetadataCollection");
    }
}
