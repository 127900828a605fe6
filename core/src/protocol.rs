//! JSON messages relayed between peers by the session service.
//!
//! The relay stamps `user_id` onto every player update before forwarding it,
//! so receivers always know the originating peer. World geometry never crosses
//! the wire: peers exchange the seed once in [`GameStart`] and afterwards only
//! compact [`PlayerUpdate`] samples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CenteredLane, LaneIndex, PeerId, SessionSeed, VehicleVariant};

/// Errors raised while encoding or decoding peer messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload was not a well-formed message.
    #[error("malformed peer message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Messages exchanged over the session transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Periodic position sample broadcast by a racing peer.
    PlayerUpdate(PlayerUpdate),
    /// A peer fired its nitro.
    Nitro(NitroTrigger),
    /// A peer left the session or lost its connection.
    PlayerDisconnected {
        /// Identifier of the departed peer.
        id: PeerId,
    },
    /// Race start announcement carrying the shared seed.
    GameStart(GameStart),
    /// Lobby roster change.
    LobbyUpdate {
        /// Players currently in the lobby.
        players: Vec<LobbyPlayer>,
    },
}

impl PeerMessage {
    /// Decodes a message from its JSON text form.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes the message into its JSON text form.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Position sample describing a single peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    /// Originating peer; filled in by the relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<PeerId>,
    /// Centred lane coordinate, fractional while a lane change is animating.
    pub lane: CenteredLane,
    /// Longitudinal distance travelled in world units.
    pub distance: f64,
    /// Vehicle the peer selected in the garage.
    pub car_index: VehicleVariant,
    /// Sender clock in milliseconds when the sample was taken.
    pub timestamp: u64,
}

/// Nitro announcement; receivers play the boost on the sender's car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NitroTrigger {
    /// Originating peer; filled in by the relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<PeerId>,
    /// Boosts fired by the sender so far; repeats of a seen value are ignored.
    pub trigger: u64,
}

/// Race start payload distributed once to every participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameStart {
    /// Authoritative session seed.
    pub seed: SessionSeed,
    /// 1-based lane assigned to each peer, keyed by the peer id in decimal.
    #[serde(default)]
    pub lane_assignments: BTreeMap<String, LaneIndex>,
    /// Server configuration overrides to merge over local defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// Race record created by the session service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_id: Option<u64>,
}

impl GameStart {
    /// Lane assigned to the provided peer, if any.
    #[must_use]
    pub fn lane_for(&self, peer: PeerId) -> Option<LaneIndex> {
        self.lane_assignments.get(&peer.get().to_string()).copied()
    }

    /// Peers named in the lane assignment table.
    pub fn roster(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.lane_assignments
            .keys()
            .filter_map(|key| key.parse().ok().map(PeerId::new))
    }
}

/// Lobby roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    /// Peer identifier.
    pub id: PeerId,
    /// Display name.
    pub username: String,
}
