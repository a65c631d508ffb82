//! Host network tasks bridging the UDP socket and the session loop

use log::{error, warn};
use shared::protocol::{decode_frame, Frame};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Events delivered from the network tasks to the session loop
#[derive(Debug)]
pub enum NetEvent {
    FrameReceived { frame: Frame, addr: SocketAddr },
    SweepTimeouts,
}

/// A ready-to-send datagram queued by the session loop
#[derive(Debug)]
pub struct NetOutbound {
    pub data: Vec<u8>,
    pub addr: SocketAddr,
}

/// Spawns the task that listens for incoming datagrams, decodes them and
/// forwards the frames to the session loop
pub fn spawn_receiver(socket: Arc<UdpSocket>, net_tx: mpsc::UnboundedSender<NetEvent>) {
    tokio::spawn(async move {
        let mut buffer = [0u8; 2048];

        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => match decode_frame(&buffer[0..len]) {
                    Ok(frame) => {
                        if net_tx
                            .send(NetEvent::FrameReceived { frame, addr })
                            .is_err()
                        {
                            error!("Session loop is gone, stopping receiver");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Discarding undecodable datagram from {}: {}", addr, e);
                    }
                },
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    });
}

/// Spawns the task that drains the outbound queue onto the socket
pub fn spawn_sender(socket: Arc<UdpSocket>, mut out_rx: mpsc::UnboundedReceiver<NetOutbound>) {
    tokio::spawn(async move {
        while let Some(outbound) = out_rx.recv().await {
            if let Err(e) = socket.send_to(&outbound.data, outbound.addr).await {
                error!("Failed to send to {}: {}", outbound.addr, e);
            }
        }
    });
}

/// Spawns the task that prompts the session to sweep for dead peers
/// once a second
pub fn spawn_timeout_sweeper(net_tx: mpsc::UnboundedSender<NetEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));

        loop {
            interval.tick().await;
            if net_tx.send(NetEvent::SweepTimeouts).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{encode_frame, Message};
    use shared::MAX_DATAGRAM;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_net_event_creation() {
        let frame = Frame::Hello { protocol: 1 };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9876);

        let event = NetEvent::FrameReceived {
            frame: frame.clone(),
            addr,
        };

        match event {
            NetEvent::FrameReceived { frame: f, addr: a } => {
                assert_eq!(a, addr);
                assert_eq!(f, frame);
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<NetEvent>();

        let frame = Frame::Ack { cumulative: 3 };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9876);

        assert!(tx.send(NetEvent::FrameReceived { frame, addr }).is_ok());
        assert!(tx.send(NetEvent::SweepTimeouts).is_ok());

        match rx.try_recv() {
            Ok(NetEvent::FrameReceived { frame, .. }) => {
                assert_eq!(frame, Frame::Ack { cumulative: 3 });
            }
            _ => panic!("Unexpected event type"),
        }
        assert!(matches!(rx.try_recv(), Ok(NetEvent::SweepTimeouts)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_outbound_fits_receive_buffer() {
        let frame = Frame::Unreliable {
            message: Message::DamageFlash { peer: 2 },
        };
        let outbound = NetOutbound {
            data: encode_frame(&frame).unwrap(),
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9876),
        };

        // The receiver's stack buffer must cover anything the encoder
        // lets through.
        assert!(outbound.data.len() <= MAX_DATAGRAM);
        assert!(MAX_DATAGRAM < 2048);
    }

    #[test]
    fn test_address_validation() {
        let valid_addrs = vec![
            "127.0.0.1:9876",
            "0.0.0.0:0",
            "192.168.1.1:9090",
            "[::1]:9876",
        ];

        for addr_str in valid_addrs {
            let result = addr_str.parse::<SocketAddr>();
            assert!(result.is_ok(), "Failed to parse address: {}", addr_str);
        }

        let invalid_addrs = vec!["invalid", "127.0.0.1:99999", "256.256.256.256:9876", ""];

        for addr_str in invalid_addrs {
            let result = addr_str.parse::<SocketAddr>();
            assert!(result.is_err(), "Should fail to parse: {}", addr_str);
        }
    }
}
