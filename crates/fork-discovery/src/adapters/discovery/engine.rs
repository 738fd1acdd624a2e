//! Engine handle: startup, lookups and shutdown.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::actor::{Command, DiscoveryActor};
use crate::domain::{
    sort_by_distance, DiscoveryConfig, DiscoveryError, NodeId, NodeRecord, RoutingTable,
};
use crate::ports::DiscoveryEngine;
use crate::service::LocalIdentity;

const COMMAND_CHANNEL_SIZE: usize = 256;

/// Cheap clonable sender of actor requests with a per-request timeout.
#[derive(Clone)]
struct Requester {
    cmd_tx: mpsc::Sender<Command>,
    timeout: Duration,
}

impl Requester {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(make(tx)).await.ok()?;
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(value)) => Some(value),
            _ => None,
        }
    }

    async fn ping(&self, to: SocketAddr) -> Option<NodeRecord> {
        self.request(|reply| Command::Ping { to, reply }).await
    }

    async fn find_node(&self, peer: NodeRecord, target: NodeId) -> Option<Vec<NodeRecord>> {
        self.request(|reply| Command::FindNode {
            peer,
            target,
            reply,
        })
        .await
    }

    async fn closest(&self, target: NodeId, count: usize) -> Vec<NodeRecord> {
        self.request(|reply| Command::Closest {
            target,
            count,
            reply,
        })
        .await
        .unwrap_or_default()
    }
}

/// UDP discovery engine.
///
/// Dropping the handle without calling `close` also stops the background
/// task, but does not wait for it.
pub struct UdpDiscovery {
    requester: Requester,
    identity: Arc<LocalIdentity>,
    config: DiscoveryConfig,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UdpDiscovery {
    /// Bind the socket and ping the bootstrap nodes.
    ///
    /// Only bootstrap nodes that answer end up in the routing table.
    /// Unreachable ones are not an error; with none reachable the engine
    /// starts with an empty table.
    ///
    /// # Errors
    ///
    /// - `DiscoveryError::InvalidBootstrapRecord` if a bootstrap string does
    ///   not parse as a signed `enr:` record
    /// - `DiscoveryError::Bind` if the socket cannot be bound
    /// - `DiscoveryError::Identity` if the local record cannot be re-signed
    ///   with the bound endpoint
    pub async fn start(
        config: DiscoveryConfig,
        identity: Arc<LocalIdentity>,
        bootstrap: &[String],
    ) -> Result<Self, DiscoveryError> {
        let seeds = bootstrap
            .iter()
            .map(|input| {
                input
                    .parse::<NodeRecord>()
                    .map_err(|reason| DiscoveryError::InvalidBootstrapRecord {
                        input: input.clone(),
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bind_error = |e: std::io::Error| DiscoveryError::Bind {
            addr: config.listen_addr.to_string(),
            reason: e.to_string(),
        };
        let socket = UdpSocket::bind(config.listen_addr)
            .await
            .map_err(bind_error)?;
        let local_addr = socket.local_addr().map_err(bind_error)?;

        let advertised_ip = config
            .advertised_ip
            .or_else(|| (!local_addr.ip().is_unspecified()).then_some(local_addr.ip()));
        identity.set_endpoint(advertised_ip, local_addr.port(), config.tcp_port)?;
        identity.refresh()?;

        // Seeds enter the table only once they answer a PING.
        let local_id = identity.node_id();
        let table = RoutingTable::new(local_id, config.k);

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let actor = DiscoveryActor::new(
            Arc::new(socket),
            identity.clone(),
            config.clone(),
            table,
            cmd_rx,
            shutdown_rx,
        );
        let task = tokio::spawn(actor.run());

        info!(
            %local_addr,
            node_id = %local_id,
            bootstrap = seeds.len(),
            "discovery engine started"
        );

        let engine = Self {
            requester: Requester {
                cmd_tx,
                timeout: config.request_timeout(),
            },
            identity,
            config,
            local_addr,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        };
        engine.ping_seeds(&seeds).await;
        Ok(engine)
    }

    async fn ping_seeds(&self, seeds: &[NodeRecord]) {
        let mut pings = JoinSet::new();
        for seed in seeds {
            let Some(addr) = seed.udp_socket_addr() else {
                warn!(peer = %seed.node_id(), "bootstrap record has no UDP endpoint");
                continue;
            };
            let requester = self.requester.clone();
            pings.spawn(async move { (addr, requester.ping(addr).await.is_some()) });
        }

        let mut reachable = 0usize;
        while let Some(joined) = pings.join_next().await {
            match joined {
                Ok((_, true)) => reachable += 1,
                Ok((addr, false)) => debug!(%addr, "bootstrap node did not answer"),
                Err(err) => debug!(error = %err, "bootstrap ping task failed"),
            }
        }

        if !seeds.is_empty() && reachable == 0 {
            warn!(bootstrap = seeds.len(), "no bootstrap node reachable");
        }
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Engine parameters.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// PING an address and return the record it answered with.
    pub async fn ping(&self, to: SocketAddr) -> Option<NodeRecord> {
        self.requester.ping(to).await
    }

    /// Number of records in the routing table. 0 once closed.
    pub async fn known_nodes(&self) -> usize {
        self.requester
            .request(|reply| Command::TableSize { reply })
            .await
            .unwrap_or(0)
    }

    /// Iterative lookup toward `target`.
    ///
    /// Each round queries the `alpha` closest nodes not yet asked among the
    /// `k` closest seen so far. Stops once all of those have been asked or
    /// after `max_lookup_rounds`.
    pub async fn lookup(&self, target: NodeId) -> Vec<NodeRecord> {
        let local_id = self.identity.node_id();
        let mut seen: HashMap<NodeId, NodeRecord> = self
            .requester
            .closest(target, self.config.k)
            .await
            .into_iter()
            .map(|r| (r.node_id(), r))
            .collect();
        let mut queried: HashSet<NodeId> = HashSet::new();

        for round in 0..self.config.max_lookup_rounds {
            let mut closest: Vec<NodeRecord> = seen.values().cloned().collect();
            sort_by_distance(&mut closest, &target);
            let candidates: Vec<NodeRecord> = closest
                .into_iter()
                .take(self.config.k)
                .filter(|r| !queried.contains(&r.node_id()))
                .take(self.config.alpha.max(1))
                .collect();

            if candidates.is_empty() {
                break;
            }

            let mut queries = JoinSet::new();
            for peer in candidates {
                queried.insert(peer.node_id());
                let requester = self.requester.clone();
                queries.spawn(async move { requester.find_node(peer, target).await });
            }

            let mut found = 0usize;
            while let Some(joined) = queries.join_next().await {
                let Ok(Some(records)) = joined else {
                    continue;
                };
                for record in records {
                    let node_id = record.node_id();
                    if node_id == local_id {
                        continue;
                    }
                    match seen.get(&node_id) {
                        Some(known) if known.seq() >= record.seq() => {}
                        Some(_) => {
                            seen.insert(node_id, record);
                        }
                        None => {
                            found += 1;
                            seen.insert(node_id, record);
                        }
                    }
                }
            }
            debug!(round, found, known = seen.len(), "lookup round finished");
        }

        let mut records: Vec<NodeRecord> = seen.into_values().collect();
        sort_by_distance(&mut records, &target);
        records
    }

    /// The record this node currently advertises.
    pub fn local_record(&self) -> NodeRecord {
        self.identity.current_record()
    }

    /// Stop the background task and wait for it. Idempotent.
    pub async fn close(&self) {
        self.shutdown_tx.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "discovery task ended abnormally");
            }
        }
    }
}

#[async_trait]
impl DiscoveryEngine for UdpDiscovery {
    async fn lookup(&self, target: NodeId) -> Vec<NodeRecord> {
        UdpDiscovery::lookup(self, target).await
    }

    fn local_record(&self) -> NodeRecord {
        UdpDiscovery::local_record(self)
    }

    async fn close(&self) {
        UdpDiscovery::close(self).await
    }
}

impl std::fmt::Debug for UdpDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpDiscovery")
            .field("local_addr", &self.local_addr)
            .field("node_id", &self.identity.node_id())
            .finish_non_exhaustive()
    }
}
