//! Background task owning the socket, the routing table and pending requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::wire::{Message, MAX_NODES_PER_PACKET, MAX_PACKET_SIZE};
use crate::domain::{DiscoveryConfig, InsertOutcome, NodeId, NodeRecord, RoutingTable};
use crate::service::LocalIdentity;

/// Requests from engine handles to the actor.
pub(super) enum Command {
    /// PING `to`; reply with the responder's record.
    Ping {
        to: SocketAddr,
        reply: oneshot::Sender<NodeRecord>,
    },
    /// FINDNODE `target` at `peer`; reply with the records it returned.
    FindNode {
        peer: NodeRecord,
        target: NodeId,
        reply: oneshot::Sender<Vec<NodeRecord>>,
    },
    /// Closest known records to `target`.
    Closest {
        target: NodeId,
        count: usize,
        reply: oneshot::Sender<Vec<NodeRecord>>,
    },
    /// Number of records in the routing table.
    TableSize { reply: oneshot::Sender<usize> },
}

enum PendingReply {
    Ping(oneshot::Sender<NodeRecord>),
    FindNode {
        peer: NodeRecord,
        reply: oneshot::Sender<Vec<NodeRecord>>,
    },
}

impl PendingReply {
    fn is_closed(&self) -> bool {
        match self {
            Self::Ping(reply) => reply.is_closed(),
            Self::FindNode { reply, .. } => reply.is_closed(),
        }
    }
}

struct Pending {
    to: SocketAddr,
    deadline: Instant,
    reply: PendingReply,
}

enum Event {
    Shutdown,
    Command(Command),
    Packet(usize, SocketAddr),
    RecvError(std::io::Error),
    Tick,
}

pub(super) struct DiscoveryActor {
    socket: Arc<UdpSocket>,
    identity: Arc<LocalIdentity>,
    config: DiscoveryConfig,
    table: RoutingTable,
    pending: HashMap<u64, Pending>,
    cmd_rx: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
}

impl DiscoveryActor {
    pub(super) fn new(
        socket: Arc<UdpSocket>,
        identity: Arc<LocalIdentity>,
        config: DiscoveryConfig,
        table: RoutingTable,
        cmd_rx: mpsc::Receiver<Command>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            socket,
            identity,
            config,
            table,
            pending: HashMap::new(),
            cmd_rx,
            shutdown,
        }
    }

    pub(super) async fn run(mut self) {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut tick = tokio::time::interval(self.config.refresh_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                _ = self.shutdown.changed() => Event::Shutdown,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => Event::Command(cmd),
                    None => Event::Shutdown,
                },
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => Event::Packet(len, from),
                    Err(err) => Event::RecvError(err),
                },
                _ = tick.tick() => Event::Tick,
            };

            match event {
                Event::Shutdown => break,
                Event::Command(cmd) => self.handle_command(cmd).await,
                Event::Packet(len, from) => self.handle_packet(&buf[..len], from).await,
                // ICMP unreachable from an earlier send surfaces here on some
                // platforms; the socket itself is still usable.
                Event::RecvError(err) => debug!(error = %err, "discovery socket receive error"),
                Event::Tick => self.on_tick(),
            }
        }

        info!(
            known_nodes = self.table.len(),
            "discovery engine stopped"
        );
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Ping { to, reply } => {
                let request_id = self.next_request_id();
                let message = Message::Ping {
                    request_id,
                    record: self.identity.current_record(),
                };
                if self.send(&message, to).await {
                    self.track(request_id, to, PendingReply::Ping(reply));
                }
            }
            Command::FindNode {
                peer,
                target,
                reply,
            } => {
                let Some(to) = peer.udp_socket_addr() else {
                    return;
                };
                let request_id = self.next_request_id();
                let message = Message::FindNode { request_id, target };
                if self.send(&message, to).await {
                    self.track(request_id, to, PendingReply::FindNode { peer, reply });
                }
            }
            Command::Closest {
                target,
                count,
                reply,
            } => {
                let _ = reply.send(self.table.closest(&target, count));
            }
            Command::TableSize { reply } => {
                let _ = reply.send(self.table.len());
            }
        }
    }

    async fn handle_packet(&mut self, bytes: &[u8], from: SocketAddr) {
        let message = match Message::decode(bytes, self.config.max_record_size) {
            Ok(message) => message,
            Err(err) => {
                debug!(%from, error = %err, "dropping invalid discovery packet");
                return;
            }
        };

        match message {
            Message::Ping { request_id, record } => {
                trace!(%from, peer = %record.node_id(), "PING");
                self.observe(record);
                let pong = Message::Pong {
                    request_id,
                    record: self.identity.current_record(),
                };
                self.send(&pong, from).await;
            }
            Message::FindNode { request_id, target } => {
                trace!(%from, %target, "FINDNODE");
                let count = self.config.k.min(MAX_NODES_PER_PACKET);
                let records = self.table.closest(&target, count);
                let nodes = Message::Nodes {
                    request_id,
                    records,
                };
                self.send(&nodes, from).await;
            }
            Message::Pong { request_id, record } => {
                if let Some(PendingReply::Ping(reply)) = self.take_pending(request_id, from) {
                    self.observe(record.clone());
                    let _ = reply.send(record);
                }
            }
            Message::Nodes {
                request_id,
                records,
            } => {
                if let Some(PendingReply::FindNode { peer, reply }) =
                    self.take_pending(request_id, from)
                {
                    self.observe(peer);
                    let _ = reply.send(records);
                }
            }
        }
    }

    fn on_tick(&mut self) {
        // A failed refresh keeps the previous record; retried next tick.
        if let Err(err) = self.identity.refresh() {
            warn!(error = %err, "failed to refresh local fork identity");
        }

        let now = Instant::now();
        self.pending
            .retain(|_, p| p.deadline > now && !p.reply.is_closed());
    }

    /// Insert a record heard from directly.
    fn observe(&mut self, record: NodeRecord) {
        let node_id = record.node_id();
        let now = self.identity.time_source().now();
        match self.table.insert(record, now) {
            InsertOutcome::Inserted => debug!(peer = %node_id, "added node to routing table"),
            InsertOutcome::BucketFull => trace!(peer = %node_id, "bucket full, node dropped"),
            InsertOutcome::Updated | InsertOutcome::Refreshed | InsertOutcome::SelfRecord => {}
        }
    }

    /// Remove and return a pending request, but only if the answer comes
    /// from the address it was sent to.
    fn take_pending(&mut self, request_id: u64, from: SocketAddr) -> Option<PendingReply> {
        match self.pending.get(&request_id) {
            Some(pending) if pending.to == from => {
                self.pending.remove(&request_id).map(|p| p.reply)
            }
            Some(_) => {
                debug!(%from, request_id, "response from unexpected address");
                None
            }
            None => {
                trace!(%from, request_id, "unsolicited response");
                None
            }
        }
    }

    fn track(&mut self, request_id: u64, to: SocketAddr, reply: PendingReply) {
        let deadline = Instant::now() + self.config.request_timeout() + Duration::from_secs(1);
        self.pending.insert(
            request_id,
            Pending {
                to,
                deadline,
                reply,
            },
        );
    }

    fn next_request_id(&self) -> u64 {
        loop {
            let id = rand::random::<u64>();
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }

    async fn send(&self, message: &Message, to: SocketAddr) -> bool {
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%to, error = %err, "failed to encode discovery message");
                return false;
            }
        };
        match self.socket.send_to(&bytes, to).await {
            Ok(_) => true,
            Err(err) => {
                debug!(%to, error = %err, "failed to send discovery message");
                false
            }
        }
    }
}
