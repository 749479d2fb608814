//! Client connection management and request queuing for the sabotage server
//!
//! This module handles the server-side management of connected clients, including:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Per-client FIFO request queues drained at tick boundaries
//! - Connection health monitoring and automatic cleanup
//! - Client capacity management and address tracking
//!
//! Requests are never applied on the receiver task. They wait here until the
//! tick task drains them, so every authoritative mutation happens in one place.

use log::{info, warn};
use shared::{PlayerId, Request};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a client is considered gone
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on requests buffered for one client between ticks
pub const MAX_PENDING_REQUESTS: usize = 32;

/// Represents a connected client and their queued requests
///
/// Each client maintains:
/// - Connection metadata (ID, address, last activity)
/// - Requests received since the last tick, in arrival order
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server, also the player id
    pub id: PlayerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Buffered requests tagged with their global arrival number
    pub pending_requests: VecDeque<(u64, Request)>,
}

impl Client {
    /// Creates a new client with the given ID and network address
    ///
    /// The client starts with an empty request queue and is marked as
    /// recently active.
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            pending_requests: VecDeque::new(),
        }
    }

    /// Records activity without queuing anything
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Appends a request to the back of the client's queue
    ///
    /// Returns false and drops the request if the queue is already full.
    pub fn push_request(&mut self, arrival: u64, request: Request) -> bool {
        self.touch();
        if self.pending_requests.len() >= MAX_PENDING_REQUESTS {
            return false;
        }
        self.pending_requests.push_back((arrival, request));
        true
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if no packets have been received from this client
    /// within the specified timeout duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients and their pending requests
///
/// The ClientManager provides centralized control over client connections,
/// enforces server capacity limits, and hands requests to the tick in the
/// order they arrived at the server.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<PlayerId, Client>,
    /// Next available client ID for new connections
    next_client_id: PlayerId,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    /// Monotonic counter stamped on each queued request
    next_arrival: u64,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            next_arrival: 0,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let client = Client::new(client_id, addr);
        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, client);

        Some(client_id)
    }

    /// Removes a client from the server
    ///
    /// Any requests still queued for the client are discarded. Returns true
    /// if the client was found and removed.
    pub fn remove_client(&mut self, client_id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} disconnected ({} queued requests dropped)",
                client.id,
                client.pending_requests.len()
            );
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address
    ///
    /// Used to bind incoming packets to a player. The player id in a request
    /// always comes from here, never from the packet.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, client_id: PlayerId) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    /// Marks a client as active
    pub fn touch(&mut self, client_id: PlayerId) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    /// Queues a request for the next tick
    ///
    /// Returns false if the client is unknown or its queue is full.
    pub fn queue_request(&mut self, client_id: PlayerId, request: Request) -> bool {
        let arrival = self.next_arrival;
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                if !client.push_request(arrival, request) {
                    warn!(
                        "Request queue full for client {}, dropping {:?}",
                        client_id, request
                    );
                    return false;
                }
                self.next_arrival += 1;
                true
            }
            None => false,
        }
    }

    /// Takes every queued request, oldest arrival first
    ///
    /// Each client's own requests stay in FIFO order; requests from
    /// different clients interleave by arrival at the server.
    pub fn drain_requests(&mut self) -> Vec<(PlayerId, Request)> {
        let mut all: Vec<(u64, PlayerId, Request)> = Vec::new();

        for (client_id, client) in self.clients.iter_mut() {
            all.extend(
                client
                    .pending_requests
                    .drain(..)
                    .map(|(arrival, request)| (arrival, *client_id, request)),
            );
        }

        all.sort_by_key(|(arrival, _, _)| *arrival);
        all.into_iter()
            .map(|(_, client_id, request)| (client_id, request))
            .collect()
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed clients and their last addresses so they can be
    /// told, and so the game state can drop their players and any sabotage
    /// session they held.
    pub fn check_timeouts(&mut self) -> Vec<(PlayerId, SocketAddr)> {
        let timed_out: Vec<(PlayerId, SocketAddr)> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(CLIENT_TIMEOUT))
            .map(|(id, client)| (*id, client.addr))
            .collect();

        for (client_id, _) in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Gets all client IDs and their network addresses
    ///
    /// Used for broadcasting to every connected client.
    pub fn get_client_addrs(&self) -> Vec<(PlayerId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
