use crate::interaction::{InteractionEvent, LocalInteraction};
use crate::mirror::ClientMirror;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PlayerId, Position, Request, Role, Team, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

/// Seconds between position reports. Each one also keeps the connection
/// from timing out on the server.
pub const KEEPALIVE_INTERVAL: f32 = 1.0;

/// A line typed at the console
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Ability,
    Sabotage,
    Cancel,
    Move(Position),
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let mut parts = line.split_whitespace();
        let command = match parts.next()? {
            "ability" | "a" => Command::Ability,
            "sabotage" | "s" => Command::Sabotage,
            "cancel" | "c" => Command::Cancel,
            "status" => Command::Status,
            "quit" | "q" => Command::Quit,
            "move" | "m" => {
                let x = parts.next()?.parse().ok()?;
                let y = parts.next()?.parse().ok()?;
                Command::Move(Position::new(x, y))
            }
            _ => return None,
        };
        Some(command)
    }
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<PlayerId>,
    connected: bool,

    role: Role,
    team: Team,
    position: Position,
    tick_duration: Duration,
    since_report: f32,

    mirror: ClientMirror,
    interaction: LocalInteraction,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        role: Role,
        team: Team,
        tick_duration: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        let mut interaction = LocalInteraction::new(team);
        interaction.subscribe(|event| match event {
            InteractionEvent::Candidate(Some(target_id)) => {
                info!("Target {} in reach", target_id)
            }
            InteractionEvent::Candidate(None) => debug!("No target in reach"),
            InteractionEvent::Progress(progress) => {
                debug!("Sabotage progress {:.0}%", progress * 100.0)
            }
            InteractionEvent::Result { target_id, success } => {
                info!("Sabotage of target {} succeeded: {}", target_id, success)
            }
        });

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            role,
            team,
            position: Position::default(),
            tick_duration,
            since_report: 0.0,
            mirror: ClientMirror::new(),
            interaction,
        })
    }

    pub fn mirror(&self) -> &ClientMirror {
        &self.mirror
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server as {} on {}...", self.role, self.team);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            role: self.role,
            team: self.team,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn report_position(&mut self) {
        self.since_report = 0.0;
        let packet = Packet::Position {
            x: self.position.x,
            y: self.position.y,
        };
        if let Err(e) = self.send_packet(&packet).await {
            error!("Error sending position: {}", e);
        }
    }

    async fn send_request(&self, request: Request) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.send_packet(&Packet::Request(request)).await {
            error!("Error sending request: {}", e);
        }
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::WorldSnapshot {
                phase,
                players,
                targets,
            } => {
                info!(
                    "World snapshot: {} phase, {} players, {} targets",
                    phase,
                    players.len(),
                    targets.len()
                );
                let own = players
                    .iter()
                    .find(|player| Some(player.id) == self.client_id);
                if let Some(own) = own {
                    debug!(
                        "Spawned at ({:.1}, {:.1})",
                        own.position.x, own.position.y
                    );
                    self.position = own.position;
                }
                self.mirror.apply_snapshot(phase, players, targets);
            }

            Packet::Broadcast(broadcast) => {
                if self.mirror.apply(&broadcast) {
                    debug!("Applied {:?}", broadcast);
                }
                if let Some(client_id) = self.client_id {
                    self.interaction.on_broadcast(&broadcast, client_id);
                }
            }

            Packet::Rejected { request, reason } => {
                info!("Server rejected {:?}: {}", request, reason);
                self.interaction.on_rejected(request, reason);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Returns false when the client should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Ability => self.send_request(Request::ActivateAbility).await,
            Command::Sabotage => match self.interaction.begin() {
                Some(request) => self.send_request(request).await,
                None => info!("Nothing to sabotage here"),
            },
            Command::Cancel => {
                if let Some(request) = self.interaction.cancel() {
                    self.send_request(request).await;
                }
            }
            Command::Move(position) => {
                self.position = position;
                if self.connected {
                    self.report_position().await;
                }
            }
            Command::Status => self.log_status(),
            Command::Quit => return false,
        }
        true
    }

    fn log_status(&self) {
        info!(
            "{} phase, at ({:.1}, {:.1}), sabotage progress {:.0}%",
            self.mirror.phase(),
            self.position.x,
            self.position.y,
            self.interaction.progress() * 100.0
        );
        for (id, player) in self.mirror.players() {
            info!(
                "  player {}: {} {} active={} cooldown={:.1}s",
                id, player.team, player.role, player.ability_active, player.cooldown_remaining
            );
        }
        for target in self.mirror.targets() {
            info!(
                "  target {}: {:?} of {} disabled={}",
                target.id, target.kind, target.owner, target.is_disabled
            );
        }
    }

    async fn on_tick(&mut self, dt: f32) {
        self.mirror.tick(dt);

        if self.connected {
            self.since_report += dt;
            if self.since_report >= KEEPALIVE_INTERVAL {
                self.report_position().await;
            }
        }

        if self.role == Role::Saboteur {
            self.interaction.scan(self.position, self.mirror.candidates());
            if let Some(request) = self.interaction.advance(dt) {
                self.send_request(request).await;
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet);
                            } else {
                                warn!("Failed to deserialize packet from server");
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.on_tick(dt).await;
                },

                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => match Command::parse(&line) {
                            Some(command) => {
                                if !self.handle_command(command).await {
                                    break;
                                }
                            }
                            None => warn!("Unknown command: {}", line.trim()),
                        },
                        Ok(None) => break,
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            break;
                        }
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("ability"), Some(Command::Ability));
        assert_eq!(Command::parse("  s "), Some(Command::Sabotage));
        assert_eq!(Command::parse("cancel"), Some(Command::Cancel));
        assert_eq!(
            Command::parse("move 1.5 -2"),
            Some(Command::Move(Position::new(1.5, -2.0)))
        );
        assert_eq!(Command::parse("move 1"), None);
        assert_eq!(Command::parse("dance"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn test_snapshot_and_broadcast_update_mirror() {
        let mut client = Client::new(
            "127.0.0.1:9",
            Role::Saboteur,
            Team::TeamA,
            Duration::from_millis(33),
        )
        .await
        .unwrap();

        client.handle_packet(Packet::Connected { client_id: 3 });
        client.handle_packet(Packet::WorldSnapshot {
            phase: shared::MatchPhase::Combat,
            players: vec![],
            targets: vec![shared::TargetSnapshot {
                id: 1,
                kind: shared::TargetKind::Trap,
                owner: Team::TeamB,
                position: Position::new(1.0, 0.0),
                is_disabled: false,
            }],
        });
        client.handle_packet(Packet::Broadcast(shared::Broadcast::TargetDisabled {
            target_id: 1,
        }));

        assert!(client.connected);
        assert!(client.mirror().target(1).unwrap().is_disabled);
    }

    #[tokio::test]
    async fn test_saboteur_tick_discovers_candidate() {
        let mut client = Client::new(
            "127.0.0.1:9",
            Role::Saboteur,
            Team::TeamA,
            Duration::from_millis(33),
        )
        .await
        .unwrap();

        client.handle_packet(Packet::WorldSnapshot {
            phase: shared::MatchPhase::Combat,
            players: vec![],
            targets: vec![shared::TargetSnapshot {
                id: 4,
                kind: shared::TargetKind::Structure,
                owner: Team::TeamB,
                position: Position::new(0.5, 0.5),
                is_disabled: false,
            }],
        });

        client.on_tick(0.1).await;
        assert_eq!(client.interaction.candidate(), Some(4));

        // Not connected, so nothing is sent, but local state still advances.
        assert!(client.handle_command(Command::Sabotage).await);
        assert_eq!(client.interaction.target(), Some(4));
        assert!(!client.handle_command(Command::Quit).await);
    }

    fn trap(id: u32, owner: Team, position: Position) -> shared::TargetSnapshot {
        shared::TargetSnapshot {
            id,
            kind: shared::TargetKind::Trap,
            owner,
            position,
            is_disabled: false,
        }
    }

    async fn recv_position(server: &UdpSocket) -> Option<Position> {
        let mut buffer = [0u8; 2048];
        let received =
            tokio::time::timeout(Duration::from_millis(500), server.recv_from(&mut buffer)).await;
        let (len, _) = received.ok()?.ok()?;
        match deserialize::<Packet>(&buffer[..len]).ok()? {
            Packet::Position { x, y } => Some(Position::new(x, y)),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_snapshot_seeds_spawn_position() {
        let mut client = Client::new(
            "127.0.0.1:9",
            Role::Saboteur,
            Team::TeamA,
            Duration::from_millis(33),
        )
        .await
        .unwrap();

        client.handle_packet(Packet::Connected { client_id: 3 });
        client.handle_packet(Packet::WorldSnapshot {
            phase: shared::MatchPhase::Combat,
            players: vec![shared::PlayerSnapshot {
                id: 3,
                role: Role::Saboteur,
                team: Team::TeamA,
                position: Position::new(-10.0, 2.0),
                ability_active: false,
                cooldown_remaining: 0.0,
            }],
            targets: vec![
                trap(1, Team::Neutral, Position::new(0.0, 0.0)),
                trap(2, Team::TeamB, Position::new(-9.0, 2.0)),
            ],
        });

        assert_eq!(client.position, Position::new(-10.0, 2.0));
        client.on_tick(0.1).await;
        assert_eq!(client.interaction.candidate(), Some(2));
    }

    #[tokio::test]
    async fn test_connected_client_reports_position_periodically() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap().to_string();
        let mut client = Client::new(
            &server_addr,
            Role::Builder,
            Team::TeamB,
            Duration::from_millis(33),
        )
        .await
        .unwrap();

        // Nothing goes out before the connection is accepted.
        client.on_tick(KEEPALIVE_INTERVAL * 2.0).await;
        assert_eq!(recv_position(&server).await, None);

        client.handle_packet(Packet::Connected { client_id: 1 });
        client.position = Position::new(10.0, -4.0);

        let steps = (KEEPALIVE_INTERVAL / 0.25).ceil() as usize;
        for _ in 0..steps {
            client.on_tick(0.25).await;
        }
        assert_eq!(recv_position(&server).await, Some(Position::new(10.0, -4.0)));

        for _ in 0..steps {
            client.on_tick(0.25).await;
        }
        assert_eq!(recv_position(&server).await, Some(Position::new(10.0, -4.0)));
    }
}
