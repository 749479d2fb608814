//! Server network layer handling UDP communications and tick coordination

use crate::client_manager::ClientManager;
use crate::config::GameConfig;
use crate::game::GameState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PlayerId, Position, Rejection, Request, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: PlayerId,
        addr: SocketAddr,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<PlayerId>,
    },
}

/// Main server coordinating networking and the authoritative world
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_duration: Duration,
    quiet_rejections: bool,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        config: GameConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::with_arena(&config),
            tick_duration,
            quiet_rejections: config.quiet_rejections,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for (client_id, addr) in timed_out {
                    if let Err(e) =
                        server_tx.send(ServerMessage::ClientTimeout { client_id, addr })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<PlayerId>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn client_for(&self, addr: SocketAddr) -> Option<PlayerId> {
        let clients = self.clients.read().await;
        clients.find_client_by_addr(addr)
    }

    /// Processes incoming packets. Requests are only queued here; they are
    /// applied on the next tick.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                role,
                team,
            } => {
                info!(
                    "Client connecting from {} as {} on {} (version: {})",
                    addr, role, team, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                    return;
                }

                // Remove existing connection if present
                if let Some(existing_id) = self.client_for(addr).await {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.game_state.remove_player(&existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                if let Some(client_id) = client_id {
                    self.game_state.add_player(client_id, role, team);
                    self.send_packet(&Packet::Connected { client_id }, addr)
                        .await;
                    self.send_packet(&self.game_state.snapshot(), addr).await;
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                }
            }

            Packet::Position { x, y } => {
                if let Some(client_id) = self.client_for(addr).await {
                    self.clients.write().await.touch(client_id);
                    self.game_state
                        .set_position(client_id, Position::new(x, y));
                }
            }

            Packet::Request(request) => {
                if let Some(client_id) = self.client_for(addr).await {
                    let mut clients = self.clients.write().await;
                    clients.queue_request(client_id, request);
                } else {
                    debug!("Request {:?} from unknown address {}", request, addr);
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.client_for(addr).await {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.game_state.remove_player(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }

        self.flush_broadcasts().await;
    }

    /// Tells a silent client it was dropped, then removes its player
    async fn handle_timeout(&mut self, client_id: PlayerId, addr: SocketAddr) {
        info!("Client {} at {} timed out", client_id, addr);
        let notice = Packet::Disconnected {
            reason: "Timed out".to_string(),
        };
        self.send_packet(&notice, addr).await;
        self.game_state.remove_player(&client_id);
        self.flush_broadcasts().await;
    }

    /// Sends a rejection to its requester only, unless rejections are quiet.
    async fn reply_rejection(&self, client_id: PlayerId, request: Request, reason: Rejection) {
        if self.quiet_rejections {
            return;
        }

        let addr = {
            let clients = self.clients.read().await;
            clients.addr_of(client_id)
        };

        if let Some(addr) = addr {
            self.send_packet(&Packet::Rejected { request, reason }, addr)
                .await;
        }
    }

    /// Applies queued requests in arrival order, then advances the world
    async fn process_tick(&mut self, dt: f32) {
        let requests = {
            let mut clients = self.clients.write().await;
            clients.drain_requests()
        };

        for (client_id, request) in requests {
            if let Err(reason) = self.game_state.apply_request(client_id, request) {
                self.reply_rejection(client_id, request, reason).await;
            }
        }

        self.game_state.update(dt);

        for rejection in self.game_state.drain_rejections() {
            self.reply_rejection(rejection.player_id, rejection.request, rejection.reason)
                .await;
        }

        self.flush_broadcasts().await;
    }

    /// Sends every broadcast produced since the last flush, in order
    async fn flush_broadcasts(&mut self) {
        for broadcast in self.game_state.drain_broadcasts() {
            self.broadcast_packet(&Packet::Broadcast(broadcast), None)
                .await;
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, addr }) => {
                            self.handle_timeout(client_id, addr).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.process_tick(dt).await;

                    // Periodic performance monitoring
                    if self.game_state.tick % 60 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        if client_count > 0 {
                            debug!(
                                "Tick {}: {} clients, {} phase, {} sessions, {} re-enables pending",
                                self.game_state.tick,
                                client_count,
                                self.game_state.phase(),
                                self.game_state.sabotage().active_sessions(),
                                self.game_state.targets().pending_timers()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
