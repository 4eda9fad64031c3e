//! Purpose: Proxy descriptor tables for the host's record classes.
//! Exports: One constructor per class plus `register_descriptors`.
//! Role: Declares, once per class, which properties and methods the engine
//! forwards; instances are wrapped against these tables.
//! Invariants: Stored fields pass through; derived entries recompute from
//! live state and stay read-only.

use serde_json::json;

use crate::core::error::Error;
use crate::core::proxy::{ProxyDescriptor, ProxyModel};

/// Per-conversation mute state. `expiration` is a unix timestamp, `-1`
/// for indefinite, `0` for unmuted; mutedness is derived, never stored.
pub fn mute_record() -> ProxyDescriptor {
    ProxyDescriptor::for_class("MuteRecord")
        .read_only("id")
        .field("expiration")
        .derived("isMuted", |instance| {
            Ok(json!(instance.field("expiration").as_i64().unwrap_or(0) != 0))
        })
        .methods(&["setMute", "mute", "canMute", "unmute"])
}

/// Typing/recording indicator state for one conversation.
pub fn chatstate_record() -> ProxyDescriptor {
    ProxyDescriptor::for_class("ChatstateRecord")
        .read_only("id")
        .field("type")
        .field("t")
        .field("deny")
}

/// One contact's status feed. Unread bookkeeping is derived from the raw
/// counters the host keeps on the instance.
pub fn status_record() -> ProxyDescriptor {
    ProxyDescriptor::for_class("StatusRecord")
        .read_only("id")
        .field("t")
        .field("unreadCount")
        .field("totalCount")
        .field("pic")
        .derived("hasUnread", |instance| {
            Ok(json!(instance.field("unreadCount").as_i64().unwrap_or(0) > 0))
        })
        .derived("readCount", |instance| {
            let total = instance.field("totalCount").as_i64().unwrap_or(0);
            let unread = instance.field("unreadCount").as_i64().unwrap_or(0);
            Ok(json!(total - unread))
        })
        .methods(&["loadMore", "sendReadStatus", "expireMsg"])
}

/// The group-metadata collection singleton, wrapped for its behavioral
/// surface rather than its items.
pub fn group_metadata_collection() -> ProxyDescriptor {
    ProxyDescriptor::for_class("GroupMetadataCollection")
        .methods(&["handlePendingInvite", "onResume"])
}

pub fn register_descriptors(proxies: &ProxyModel) -> Result<(), Error> {
    proxies.register_descriptor(mute_record())?;
    proxies.register_descriptor(chatstate_record())?;
    proxies.register_descriptor(status_record())?;
    proxies.register_descriptor(group_metadata_collection())?;
    Ok(())
}
