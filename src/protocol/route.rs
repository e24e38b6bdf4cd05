//! Relay routes.
//!
//! Every publish request carries a `route` tag plus route-specific fields.
//!
//! # Routes
//!
//! | Tag | Fields |
//! |-----|--------|
//! | `authenticate` | `peerId`, `id`, `userInfo` |
//! | `subscribe` | `subscriberId`, `channel` |
//! | `unsubscribe` | `subscriberId`, `channel` |
//! | `channel` | `event`, `channel` (+ `message`) |
//! | `direct` | `event`, `recipientId` (+ `message`) |
//! | `broadcast` | `event` (+ `message`) |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Route
// ============================================================================

/// Route metadata for one publish request.
///
/// Serializes to the buffered body (before `message` is added) and to the
/// streamed prelude.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "route")]
pub enum Route<'a> {
    /// Attach user info to a connected peer.
    #[serde(rename = "authenticate")]
    Authenticate {
        /// Peer (connection) id.
        #[serde(rename = "peerId")]
        peer_id: &'a str,
        /// User id.
        id: &'a str,
        /// Arbitrary user info object.
        #[serde(rename = "userInfo")]
        user_info: Value,
    },

    /// Subscribe a peer to a channel.
    #[serde(rename = "subscribe")]
    Subscribe {
        /// Subscriber id.
        #[serde(rename = "subscriberId")]
        subscriber_id: &'a str,
        /// Channel name.
        channel: &'a str,
    },

    /// Unsubscribe a peer from a channel.
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        /// Subscriber id.
        #[serde(rename = "subscriberId")]
        subscriber_id: &'a str,
        /// Channel name.
        channel: &'a str,
    },

    /// Send an event to every subscriber of a channel.
    #[serde(rename = "channel")]
    Channel {
        /// Event name.
        event: &'a str,
        /// Channel name.
        channel: &'a str,
    },

    /// Send an event to one user.
    #[serde(rename = "direct")]
    Direct {
        /// Event name.
        event: &'a str,
        /// Recipient id.
        #[serde(rename = "recipientId")]
        recipient_id: &'a str,
    },

    /// Send an event to every connected peer.
    #[serde(rename = "broadcast")]
    Broadcast {
        /// Event name.
        event: &'a str,
    },
}

impl Route<'_> {
    /// Returns the route tag.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Channel { .. } => "channel",
            Self::Direct { .. } => "direct",
            Self::Broadcast { .. } => "broadcast",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_channel_route_serialization() {
        let route = Route::Channel {
            event: "msg",
            channel: "room1",
        };
        let value = serde_json::to_value(&route).expect("serialize");
        assert_eq!(
            value,
            json!({ "route": "channel", "event": "msg", "channel": "room1" })
        );
        assert_eq!(route.tag(), "channel");
    }

    #[test]
    fn test_broadcast_prelude_bytes() {
        let route = Route::Broadcast { event: "tick" };
        let json = serde_json::to_string(&route).expect("serialize");
        assert_eq!(json, r#"{"route":"broadcast","event":"tick"}"#);
    }

    #[test]
    fn test_camel_case_fields() {
        let route = Route::Authenticate {
            peer_id: "peer-1",
            id: "user-1",
            user_info: json!({ "name": "Ada" }),
        };
        let value = serde_json::to_value(&route).expect("serialize");
        assert_eq!(
            value,
            json!({
                "route": "authenticate",
                "peerId": "peer-1",
                "id": "user-1",
                "userInfo": { "name": "Ada" }
            })
        );

        let direct = serde_json::to_value(Route::Direct {
            event: "dm",
            recipient_id: "user-2",
        })
        .expect("serialize");
        assert_eq!(direct["recipientId"], "user-2");

        let subscribe = serde_json::to_value(Route::Unsubscribe {
            subscriber_id: "peer-1",
            channel: "room1",
        })
        .expect("serialize");
        assert_eq!(subscribe["route"], "unsubscribe");
        assert_eq!(subscribe["subscriberId"], "peer-1");
    }
}
