use std::fmt;
use std::sync::Arc;

use rand::Rng;

/// Characters allowed in a generated room id.
const ROOM_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated room id.
pub const ROOM_ID_LEN: usize = 8;

/// A strongly typed identifier for a Room.
/// Wraps an `Arc<String>` for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(pub Arc<String>);

/// A strongly typed identifier for a Participant.
/// Wraps an `Arc<String>` for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantId(pub Arc<String>);

impl RoomId {
    /// Generates a fresh 8-character uppercase alphanumeric room id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..ROOM_ID_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..ROOM_ID_CHARSET.len());
                ROOM_ID_CHARSET[idx] as char
            })
            .collect();
        RoomId(Arc::new(id))
    }
}

impl ParticipantId {
    /// Assigns a fresh participant id (UUID v4).
    pub fn generate() -> Self {
        ParticipantId(Arc::new(uuid::Uuid::new_v4().to_string()))
    }
}

// Implement Display for easy logging
impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement conversion from String/&str
impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId(Arc::new(s))
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId(Arc::new(s.to_string()))
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        ParticipantId(Arc::new(s))
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        ParticipantId(Arc::new(s.to_string()))
    }
}

// Helper for referencing the inner string
impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_conversion() {
        let id_str = "ROOM1234";
        let id: RoomId = RoomId::from(id_str);
        assert_eq!(id.as_ref(), id_str);

        let id_string = String::from("ROOM5678");
        let id2: RoomId = RoomId::from(id_string.clone());
        assert_eq!(id2.as_ref(), "ROOM5678");
    }

    #[test]
    fn test_participant_id_conversion() {
        let id = ParticipantId::from("p-1");
        assert_eq!(id.to_string(), "p-1");
    }

    #[test]
    fn test_display_trait() {
        let id = RoomId::from("ROOMROOM");
        assert_eq!(format!("{}", id), "ROOMROOM");
    }

    #[test]
    fn test_generated_room_id_format() {
        for _ in 0..100 {
            let id = RoomId::generate();
            assert_eq!(id.as_ref().len(), ROOM_ID_LEN);
            assert!(id
                .as_ref()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generated_participant_ids_unique() {
        let a = ParticipantId::generate();
        let b = ParticipantId::generate();
        assert_ne!(a, b);
    }
}
