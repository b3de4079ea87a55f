//! Registry of live connections.
//!
//! Each accepted connection owns its handle, its multiplexer state and the
//! peer address. Entries live in a slab whose keys double as multiplexer
//! tokens, so a readiness report names a slot rather than a pointer.

use crate::net::{ConnectionHandle, Endpoint};
use crate::runtime::watched::Watched;
use slab::Slab;

/// A single client connection.
#[derive(Debug)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub watched: Watched,
    pub peer: Endpoint,
}

/// Registry of active connections using slab allocation.
///
/// Provides O(1) insert, lookup, and remove operations.
pub struct ConnectionRegistry {
    connections: Slab<Connection>,
    max_connections: usize,
}

impl ConnectionRegistry {
    /// Create a new registry with specified maximum capacity.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Slab::with_capacity(max_connections.min(1024)),
            max_connections,
        }
    }

    /// Take ownership of `handle` and store it under a fresh token.
    ///
    /// Returns the handle back if the registry is full, so the caller
    /// decides when it gets closed.
    pub fn insert(
        &mut self,
        handle: ConnectionHandle,
        peer: Endpoint,
    ) -> Result<usize, ConnectionHandle> {
        if self.connections.len() >= self.max_connections {
            return Err(handle);
        }
        let entry = self.connections.vacant_entry();
        let token = entry.key();
        let watched = Watched::new(handle.raw_fd(), token);
        entry.insert(Connection {
            handle,
            watched,
            peer,
        });
        Ok(token)
    }

    pub fn get(&self, token: usize) -> Option<&Connection> {
        self.connections.get(token)
    }

    pub fn get_mut(&mut self, token: usize) -> Option<&mut Connection> {
        self.connections.get_mut(token)
    }

    /// Remove a connection, handing ownership of it to the caller.
    pub fn remove(&mut self, token: usize) -> Option<Connection> {
        self.connections.try_remove(token)
    }

    pub fn contains(&self, token: usize) -> bool {
        self.connections.contains(token)
    }

    /// Number of active connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
