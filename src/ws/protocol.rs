//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::combat::WeaponKind;
use crate::game::physics::{Rect, Vec2};
use crate::game::pickups::PowerupKind;
use crate::game::PlayerId;

/// Direction vector as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub dx: f32,
    pub dy: f32,
}

impl From<Direction> for Vec2 {
    fn from(d: Direction) -> Self {
        Vec2::new(d.dx, d.dy)
    }
}

impl From<Vec2> for Direction {
    fn from(v: Vec2) -> Self {
        Self { dx: v.x, dy: v.y }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Displacement for one client frame, already speed-scaled
    Move {
        dx: f32,
        dy: f32,
        /// Last non-zero facing
        #[serde(default)]
        look: Option<Direction>,
    },

    /// Fire the held weapon; the server normalizes the direction
    Shoot { dx: f32, dy: f32 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once after admission
    Init { id: PlayerId },

    /// Room already has two players; the socket is closed afterwards
    Full,

    /// Full world snapshot, sent every tick
    State(StateSnapshot),
}

/// World snapshot payload
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub players: Vec<PlayerEntry>,
    pub bullets: Vec<BulletEntry>,
    /// Kill count indexed by player id
    pub scores: Vec<u32>,
    pub walls: Vec<Rect>,
    pub weapons_on_map: Vec<WeaponPickupEntry>,
    pub powerups_on_map: Vec<PowerupPickupEntry>,
    pub active_powerups: Vec<ActivePowerupEntry>,
    pub player_dirs: BTreeMap<PlayerId, Direction>,
    /// Unix millis of each player's last accepted shot, 0 if none
    pub last_shot_times: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub hp: u8,
    pub weapon: WeaponKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon_expires_at: Option<u64>,
}

/// Collision shape tag for client rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeTag {
    Point,
    Rail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletEntry {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    /// Weapon that fired it; implies damage and range
    #[serde(rename = "type")]
    pub kind: WeaponKind,
    pub shape: ShapeTag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeaponPickupEntry {
    #[serde(rename = "type")]
    pub kind: WeaponKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerupPickupEntry {
    #[serde(rename = "type")]
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePowerupEntry {
    pub player_id: PlayerId,
    #[serde(rename = "type")]
    pub kind: PowerupKind,
    pub expires_at: u64,
}

/// Parse an inbound text frame; anything malformed or unknown is `None`
pub fn parse_client_msg(text: &str) -> Option<ClientMsg> {
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_move_with_look() {
        let msg = parse_client_msg(r#"{"type":"move","dx":2,"dy":0,"look":{"dx":1,"dy":0}}"#);
        match msg {
            Some(ClientMsg::Move { dx, dy, look }) => {
                assert_eq!((dx, dy), (2.0, 0.0));
                assert_eq!(look, Some(Direction { dx: 1.0, dy: 0.0 }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_move_without_look() {
        assert!(matches!(
            parse_client_msg(r#"{"type":"move","dx":0,"dy":-2}"#),
            Some(ClientMsg::Move { look: None, .. })
        ));
    }

    #[test]
    fn test_parse_shoot() {
        assert!(matches!(
            parse_client_msg(r#"{"type":"shoot","dx":0.5,"dy":-1.5}"#),
            Some(ClientMsg::Shoot { .. })
        ));
    }

    #[test]
    fn test_malformed_and_unknown_frames_are_ignored() {
        assert!(parse_client_msg("not json").is_none());
        assert!(parse_client_msg(r#"{"type":"dance"}"#).is_none());
        assert!(parse_client_msg(r#"{"type":"move","dx":"fast"}"#).is_none());
        assert!(parse_client_msg(r#"{"dx":1,"dy":1}"#).is_none());
    }

    #[test]
    fn test_init_and_full_shapes() {
        assert_eq!(
            serde_json::to_value(ServerMsg::Init { id: 1 }).unwrap(),
            json!({"type": "init", "id": 1})
        );
        assert_eq!(
            serde_json::to_value(ServerMsg::Full).unwrap(),
            json!({"type": "full"})
        );
    }

    #[test]
    fn test_state_field_names() {
        let mut snapshot = StateSnapshot {
            scores: vec![0, 2],
            last_shot_times: vec![0, 1234],
            ..Default::default()
        };
        snapshot.players.push(PlayerEntry {
            id: 0,
            x: 1.0,
            y: 2.0,
            hp: 3,
            weapon: WeaponKind::Basic,
            weapon_expires_at: None,
        });
        snapshot.bullets.push(BulletEntry {
            x: 5.0,
            y: 6.0,
            dx: 20.0,
            dy: 0.0,
            kind: WeaponKind::Sniper,
            shape: ShapeTag::Rail,
        });
        snapshot
            .player_dirs
            .insert(0, Direction { dx: 0.0, dy: -1.0 });

        let value = serde_json::to_value(ServerMsg::State(snapshot)).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["players"][0], json!({"id": 0, "x": 1.0, "y": 2.0, "hp": 3, "weapon": "basic"}));
        assert_eq!(value["bullets"][0]["type"], "sniper");
        assert_eq!(value["bullets"][0]["shape"], "rail");
        assert_eq!(value["playerDirs"]["0"], json!({"dx": 0.0, "dy": -1.0}));
        assert_eq!(value["lastShotTimes"], json!([0, 1234]));
        assert_eq!(value["scores"], json!([0, 2]));
        assert!(value["weaponsOnMap"].as_array().unwrap().is_empty());
    }
}
