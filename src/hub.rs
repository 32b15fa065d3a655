use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::id_types::RoomId;
use crate::metrics::SFU_ACTIVE_ROOMS;
use crate::room::Room;

/// Process-wide registry of rooms. Rooms are created lazily on first join
/// and reaped once their last participant leaves.
pub struct Hub {
    rooms: DashMap<RoomId, Arc<Room>>,
}

impl Hub {
    pub fn new() -> Self {
        Hub {
            rooms: DashMap::new(),
        }
    }

    pub fn get_or_create_room(&self, id: RoomId) -> Arc<Room> {
        let mut created = false;
        let room = self
            .rooms
            .entry(id.clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(Room::new(id.clone()))
            })
            .value()
            .clone();

        if created {
            SFU_ACTIVE_ROOMS.inc();
            info!(room = %id, "New room created");
        }
        room
    }

    pub fn get_room(&self, id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(id).map(|r| r.value().clone())
    }

    /// Atomically deletes the room only if it has no participants left.
    /// Returns true when the room was removed.
    pub fn cleanup_empty_room(&self, id: &RoomId) -> bool {
        let removed = self.rooms.remove_if(id, |_, room| room.is_empty());
        if removed.is_some() {
            SFU_ACTIVE_ROOMS.dec();
            info!(room = %id, "Room empty, removed");
            true
        } else {
            false
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Gracefully shuts down every room: closes all peer connections.
    pub async fn shutdown(&self) {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|e| e.value().clone()).collect();
        info!(rooms = rooms.len(), "Closing active peer connections");
        for room in rooms {
            room.close_all_transports().await;
        }
        self.rooms.clear();
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
