//! The client side of a session: handshake, relay loop and replication
//! intake.
//!
//! `ClientSession` owns one UDP socket and runs everything on a single
//! task. Control samples go out on the best-effort lane every send
//! tick; host messages come back on both lanes and feed the
//! [`ReplicaWorld`]. Equip and move intents travel on the reliable
//! channel so the host cannot miss them.

use crate::input::InputSource;
use crate::replica::{ReplicaNotice, ReplicaWorld, SessionStatus};
use crate::view::{hud_view, HudView};
use log::{debug, error, info, warn};
use shared::{
    decode_frame, encode_frame, Frame, Level, Message, PeerId, ReliableChannel, PEER_TIMEOUT_SECS,
    PROTOCOL_VERSION, TICK_RATE,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, timeout};

/// How many hellos to send before giving up on a host.
const HELLO_ATTEMPTS: u32 = 5;
/// How long each hello waits for its welcome.
const HELLO_TIMEOUT: Duration = Duration::from_millis(500);

/// A connected peer's view of one session.
pub struct ClientSession {
    socket: UdpSocket,
    host_addr: SocketAddr,
    peer_id: PeerId,
    channel: ReliableChannel,
    replica: ReplicaWorld,
    input: Box<dyn InputSource>,
    status: SessionStatus,
    last_heard: Instant,
}

impl ClientSession {
    /// Joins the host at `host`, driving the hello handshake to
    /// completion. Returns a session that is already admitted; a refusal
    /// or an unresponsive host surfaces as an error.
    pub async fn connect(
        host: &str,
        input: Box<dyn InputSource>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let host_addr: SocketAddr = host.parse()?;
        let hello = encode_frame(&Frame::Hello {
            protocol: PROTOCOL_VERSION,
        })?;

        let mut buffer = [0u8; 2048];
        for attempt in 1..=HELLO_ATTEMPTS {
            info!("Joining {} (attempt {}/{})", host_addr, attempt, HELLO_ATTEMPTS);
            socket.send_to(&hello, host_addr).await?;

            let deadline = Instant::now() + HELLO_TIMEOUT;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                let (len, from) = match timeout(remaining, socket.recv_from(&mut buffer)).await {
                    Ok(received) => received?,
                    Err(_) => break,
                };
                if from != host_addr {
                    continue;
                }

                match decode_frame(&buffer[..len]) {
                    Ok(Frame::Welcome { peer_id }) => {
                        info!("Joined as peer {}", peer_id);
                        return Ok(ClientSession {
                            socket,
                            host_addr,
                            peer_id,
                            channel: ReliableChannel::new(),
                            replica: ReplicaWorld::new(Level::arena(), peer_id),
                            input,
                            status: SessionStatus::Connected,
                            last_heard: Instant::now(),
                        });
                    }
                    Ok(Frame::Refuse { reason }) => {
                        return Err(format!("host refused us: {}", reason).into());
                    }
                    Ok(Frame::Bye) => {
                        return Err("host closed the session".into());
                    }
                    Ok(other) => {
                        // Sync data can overtake a lost welcome. The
                        // channel resends whatever we drop here.
                        debug!("Ignoring {:?} while waiting for a welcome", other);
                    }
                    Err(e) => {
                        warn!("Discarding undecodable datagram from {}: {}", from, e);
                    }
                }
            }
        }

        Err(format!(
            "no response from {} after {} attempts",
            host_addr, HELLO_ATTEMPTS
        )
        .into())
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn replica(&self) -> &ReplicaWorld {
        &self.replica
    }

    /// Drains replica notices for the presentation layer.
    pub fn take_notices(&mut self) -> Vec<ReplicaNotice> {
        self.replica.take_notices()
    }

    /// Current HUD projection for the local player.
    pub fn hud(&self) -> HudView {
        hud_view(&self.replica, &self.status)
    }

    /// Asks the host to equip the given inventory slot. The matching
    /// `InventoryChange` broadcast is the confirmation.
    pub async fn request_equip(&mut self, slot: u8) -> Result<(), Box<dyn std::error::Error>> {
        self.send_reliable(Message::RequestEquip { slot }).await
    }

    /// Asks the host to swap two inventory slots.
    pub async fn request_move(
        &mut self,
        from: u8,
        to: u8,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.send_reliable(Message::RequestMove { from, to }).await
    }

    /// Main loop: relays controls at the send rate, applies everything
    /// the host sends, and services the reliable channel. Returns once
    /// the session leaves the `Connected` state, for any reason.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut send_interval = interval(Duration::from_secs_f32(1.0 / TICK_RATE as f32));
        let dt = 1.0 / TICK_RATE as f32;
        let mut buffer = [0u8; 2048];

        while self.status == SessionStatus::Connected {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) => {
                            if from != self.host_addr {
                                debug!("Ignoring datagram from stranger {}", from);
                                continue;
                            }
                            match decode_frame(&buffer[..len]) {
                                Ok(frame) => self.handle_frame(frame),
                                Err(e) => {
                                    warn!("Discarding undecodable datagram from {}: {}", from, e);
                                }
                            }
                        }
                        Err(e) => {
                            error!("Error receiving datagram: {}", e);
                            sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                _ = send_interval.tick() => {
                    if let Err(e) = self.relay_controls().await {
                        error!("Error relaying controls: {}", e);
                    }
                    if let Err(e) = self.service_channel().await {
                        error!("Error servicing the reliable channel: {}", e);
                    }
                    self.replica.advance(dt);
                    self.check_host_silence();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Leaving the session");
                    if let Err(e) = self.send_frame(&Frame::Bye).await {
                        error!("Error sending goodbye: {}", e);
                    }
                    self.status = SessionStatus::Disconnected("left the session".to_string());
                }
            }
        }

        if let SessionStatus::Disconnected(reason) = &self.status {
            info!("Session over: {}", reason);
        }
        Ok(())
    }

    fn handle_frame(&mut self, frame: Frame) {
        self.last_heard = Instant::now();

        match frame {
            Frame::Unreliable { message } => self.replica.apply_message(message),
            Frame::Reliable { seq, message } => {
                for released in self.channel.on_reliable(seq, message) {
                    self.replica.apply_message(released);
                }
            }
            Frame::Ack { cumulative } => self.channel.on_ack(cumulative),
            Frame::Bye => {
                self.status = SessionStatus::Disconnected("host closed the session".to_string());
            }
            Frame::Welcome { .. } => {
                // A retried hello can draw a second welcome; the first
                // one already seated us.
                debug!("Repeated welcome from host");
            }
            Frame::Hello { .. } | Frame::Refuse { .. } => {
                warn!("Unexpected frame type from host");
            }
        }
    }

    /// One beat of the owner-to-host relay: latest sample and aim point
    /// on the best-effort lane. Lost datagrams are superseded by the
    /// next beat.
    async fn relay_controls(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let input = self.input.sample();
        let aim = self.input.aim();

        self.send_frame(&Frame::Unreliable {
            message: Message::RelayInput { input },
        })
        .await?;
        self.send_frame(&Frame::Unreliable {
            message: Message::RelayAim { point: aim },
        })
        .await?;
        Ok(())
    }

    /// Flushes pending acks and resends, and gives up on a host that has
    /// stopped acking.
    async fn service_channel(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let now = Instant::now();

        if let Some(ack) = self.channel.take_ack() {
            self.send_frame(&ack).await?;
        }
        for frame in self.channel.collect_resends(now) {
            self.send_frame(&frame).await?;
        }
        if self.channel.failed(now) {
            warn!("Host stopped acking our requests, leaving");
            self.status = SessionStatus::Disconnected("host stopped responding".to_string());
        }
        Ok(())
    }

    fn check_host_silence(&mut self) {
        let silent = self.last_heard.elapsed();
        if silent >= Duration::from_secs(PEER_TIMEOUT_SECS) {
            warn!("No traffic from host for {:?}, leaving", silent);
            self.status = SessionStatus::Disconnected("host went silent".to_string());
        }
    }

    async fn send_reliable(&mut self, message: Message) -> Result<(), Box<dyn std::error::Error>> {
        let frame = self.channel.send(message, Instant::now());
        self.send_frame(&frame).await
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode_frame(frame)?;
        self.socket.send_to(&data, self.host_addr).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::IdleInput;
    use shared::Vec2;

    async fn fake_host() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    async fn host_recv(socket: &UdpSocket) -> (Frame, SocketAddr) {
        let mut buffer = [0u8; 2048];
        let (len, from) = timeout(Duration::from_secs(1), socket.recv_from(&mut buffer))
            .await
            .expect("timed out waiting for a client datagram")
            .unwrap();
        (decode_frame(&buffer[..len]).unwrap(), from)
    }

    async fn host_send(socket: &UdpSocket, frame: &Frame, to: SocketAddr) {
        socket
            .send_to(&encode_frame(frame).unwrap(), to)
            .await
            .unwrap();
    }

    /// Receives the client's hello and welcomes it as `peer_id`,
    /// returning the client's address.
    async fn admit(socket: &UdpSocket, peer_id: PeerId) -> SocketAddr {
        let (frame, client_addr) = host_recv(socket).await;
        match frame {
            Frame::Hello { protocol } => assert_eq!(protocol, PROTOCOL_VERSION),
            _ => panic!("Wrong frame type after deserialization"),
        }
        host_send(socket, &Frame::Welcome { peer_id }, client_addr).await;
        client_addr
    }

    #[tokio::test]
    async fn test_connect_succeeds_on_welcome() {
        let (host, host_addr) = fake_host().await;
        let addr = host_addr.to_string();

        let (session, _) = tokio::join!(
            ClientSession::connect(&addr, Box::new(IdleInput)),
            admit(&host, 3),
        );

        let session = session.unwrap();
        assert_eq!(session.peer_id(), 3);
        assert_eq!(*session.status(), SessionStatus::Connected);
        assert_eq!(session.replica().local_peer(), 3);
    }

    #[tokio::test]
    async fn test_connect_surfaces_refusal() {
        let (host, host_addr) = fake_host().await;
        let addr = host_addr.to_string();

        let (session, _) = tokio::join!(
            ClientSession::connect(&addr, Box::new(IdleInput)),
            async {
                let (_, client_addr) = host_recv(&host).await;
                host_send(
                    &host,
                    &Frame::Refuse {
                        reason: "session is full".to_string(),
                    },
                    client_addr,
                )
                .await;
            },
        );

        let error = session.err().expect("refusal should fail the connect");
        assert!(error.to_string().contains("session is full"));
    }

    #[tokio::test]
    async fn test_connect_skips_reliable_frames_before_welcome() {
        let (host, host_addr) = fake_host().await;
        let addr = host_addr.to_string();

        let (session, _) = tokio::join!(
            ClientSession::connect(&addr, Box::new(IdleInput)),
            async {
                let (_, client_addr) = host_recv(&host).await;
                // Sync data racing ahead of the welcome must not confuse
                // the handshake.
                host_send(
                    &host,
                    &Frame::Reliable {
                        seq: 1,
                        message: Message::SpawnPlayer {
                            peer: 1,
                            spawn: Vec2::new(960.0, 300.0),
                        },
                    },
                    client_addr,
                )
                .await;
                host_send(&host, &Frame::Welcome { peer_id: 2 }, client_addr).await;
            },
        );

        assert_eq!(session.unwrap().peer_id(), 2);
    }

    #[tokio::test]
    async fn test_requests_travel_on_the_reliable_lane() {
        let (host, host_addr) = fake_host().await;
        let addr = host_addr.to_string();

        let (session, _) = tokio::join!(
            ClientSession::connect(&addr, Box::new(IdleInput)),
            admit(&host, 2),
        );
        let mut session = session.unwrap();

        session.request_equip(1).await.unwrap();
        session.request_move(0, 4).await.unwrap();

        let (first, _) = host_recv(&host).await;
        match first {
            Frame::Reliable { seq, message } => {
                assert_eq!(seq, 1);
                assert_eq!(message, Message::RequestEquip { slot: 1 });
            }
            _ => panic!("Wrong frame type after deserialization"),
        }
        let (second, _) = host_recv(&host).await;
        match second {
            Frame::Reliable { seq, message } => {
                assert_eq!(seq, 2);
                assert_eq!(message, Message::RequestMove { from: 0, to: 4 });
            }
            _ => panic!("Wrong frame type after deserialization"),
        }
    }

    #[tokio::test]
    async fn test_run_relays_applies_and_acks_until_bye() {
        let (host, host_addr) = fake_host().await;
        let addr = host_addr.to_string();

        let (session, client_addr) = tokio::join!(
            ClientSession::connect(&addr, Box::new(IdleInput)),
            admit(&host, 2),
        );
        let mut session = session.unwrap();

        tokio::join!(
            async {
                session.run().await.unwrap();
            },
            async {
                // The relay loop is alive once input shows up.
                let mut saw_input = false;
                for _ in 0..20 {
                    let (frame, _) = host_recv(&host).await;
                    if matches!(
                        frame,
                        Frame::Unreliable {
                            message: Message::RelayInput { .. }
                        }
                    ) {
                        saw_input = true;
                        break;
                    }
                }
                assert!(saw_input);

                host_send(
                    &host,
                    &Frame::Reliable {
                        seq: 1,
                        message: Message::SpawnPlayer {
                            peer: 2,
                            spawn: Vec2::new(700.0, 300.0),
                        },
                    },
                    client_addr,
                )
                .await;

                // The delivery is acked on the next send beat.
                let mut acked = false;
                for _ in 0..50 {
                    let (frame, _) = host_recv(&host).await;
                    if let Frame::Ack { cumulative } = frame {
                        assert_eq!(cumulative, 1);
                        acked = true;
                        break;
                    }
                }
                assert!(acked);

                host_send(&host, &Frame::Bye, client_addr).await;
            },
        );

        assert_eq!(
            *session.status(),
            SessionStatus::Disconnected("host closed the session".to_string())
        );
        let player = session.replica().local_player().expect("local player spawned");
        assert_eq!(player.spawn, Vec2::new(700.0, 300.0));
        assert_eq!(
            session.take_notices(),
            vec![ReplicaNotice::LocalPlayerSpawned]
        );

        let hud = session.hud();
        assert!(matches!(hud.status, SessionStatus::Disconnected(_)));
    }
}
