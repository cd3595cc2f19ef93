use std::{sync::Arc, time::Duration};

use rama::{Service, error::OpaqueError, telemetry::tracing};
use tokio::sync::{Mutex, Semaphore};

use super::{Completion, EndpointError, hold, secs};
use crate::request::{RequestCost, Submission};

/// Datanode CPU time charged for every remote read or write (s).
const DN_PER_REQ_CPU_TIME: f64 = 50e-6;
/// Packet ack traffic relative to the written volume.
const ACK_SIZE_RATIO: f64 = 48. / 64e3;

#[derive(Debug, Clone)]
/// Capacities of a [`ResourceModelEndpoint`].
///
/// Bandwidths are in MB/s.
pub struct ResourceModelConfig {
    /// Region server RPC handlers processing requests concurrently.
    pub rpc_handlers: usize,
    /// Number of datanodes serving remote reads.
    pub datanodes: usize,
    /// Concurrent xceivers per datanode.
    pub datanode_xceivers: usize,
    /// Replicas written for every write-ahead log append.
    pub replication: usize,
    pub network_bandwidth: f64,
    pub local_read_bandwidth: f64,
    pub remote_read_bandwidth: f64,
    pub memtable_bandwidth: f64,
    pub log_bandwidth: f64,
}

impl Default for ResourceModelConfig {
    fn default() -> Self {
        Self {
            rpc_handlers: 30,
            datanodes: 3,
            datanode_xceivers: 8,
            replication: 3,
            network_bandwidth: 1250.,
            local_read_bandwidth: 500.,
            remote_read_bandwidth: 200.,
            memtable_bandwidth: 4000.,
            log_bandwidth: 150.,
        }
    }
}

#[derive(Debug, Clone)]
/// Coarse queuing model of an HBase region server on top of HDFS.
///
/// A request walks through its stages in order, skipping the ones it
/// has no cost for:
///
/// 1. namenode lookup, serialized by a single FIFO namespace lock;
/// 2. request transfer and rpc processing on a bounded handler pool;
/// 3. memtable update and replicated write-ahead log append;
/// 4. short-circuit read from local disk, remote read on a random datanode;
/// 5. response transfer.
///
/// Contention shows up as queuing on the lock and semaphores,
/// so the observed latency grows with the offered load.
pub struct ResourceModelEndpoint {
    cfg: Arc<ResourceModelConfig>,
    namespace_lock: Arc<Mutex<()>>,
    rpc_handlers: Arc<Semaphore>,
    datanodes: Arc<[Semaphore]>,
}

impl ResourceModelEndpoint {
    pub fn try_new(cfg: ResourceModelConfig) -> Result<Self, OpaqueError> {
        if cfg.rpc_handlers == 0 || cfg.datanodes == 0 || cfg.datanode_xceivers == 0 {
            return Err(OpaqueError::from_display(
                "rpc_handlers, datanodes and datanode_xceivers must be at least 1",
            ));
        }
        for (name, value) in [
            ("network_bandwidth", cfg.network_bandwidth),
            ("local_read_bandwidth", cfg.local_read_bandwidth),
            ("remote_read_bandwidth", cfg.remote_read_bandwidth),
            ("memtable_bandwidth", cfg.memtable_bandwidth),
            ("log_bandwidth", cfg.log_bandwidth),
        ] {
            if !value.is_finite() || value <= 0. {
                return Err(OpaqueError::from_display(format!(
                    "{name} must be a positive bandwidth, got {value}"
                )));
            }
        }

        let datanodes = (0..cfg.datanodes)
            .map(|_| Semaphore::new(cfg.datanode_xceivers))
            .collect();

        Ok(Self {
            rpc_handlers: Arc::new(Semaphore::new(cfg.rpc_handlers)),
            namespace_lock: Arc::new(Mutex::new(())),
            datanodes,
            cfg: Arc::new(cfg),
        })
    }

    fn transfer_time(&self, mb: f64) -> Duration {
        secs(mb / self.cfg.network_bandwidth)
    }

    fn write_time(&self, cost: &RequestCost) -> Duration {
        let replicas = self.cfg.replication.max(1) as f64;
        let memtable = cost.mem_write_mb / self.cfg.memtable_bandwidth;
        let log = if cost.log_write_mb > 0. {
            cost.log_write_mb / self.cfg.log_bandwidth
                + DN_PER_REQ_CPU_TIME * replicas
                + cost.log_write_mb * ACK_SIZE_RATIO * replicas / self.cfg.network_bandwidth
        } else {
            0.
        };
        secs(memtable + log)
    }

    /// Charge every stage of `cost`, returning the pure service time.
    async fn charge(&self, cost: &RequestCost) -> Result<Duration, EndpointError> {
        let mut service_time = Duration::ZERO;

        if cost.lookup_time > 0. {
            let _lock = self.namespace_lock.lock().await;
            let t = secs(cost.lookup_time);
            hold(t).await;
            service_time = service_time.saturating_add(t);
        }

        {
            let _handler = self
                .rpc_handlers
                .acquire()
                .await
                .map_err(|_| EndpointError::failure("rpc handler pool closed"))?;

            let t = self
                .transfer_time(cost.request_mb)
                .saturating_add(secs(cost.cpu_time));
            hold(t).await;
            service_time = service_time.saturating_add(t);

            if cost.mem_write_mb > 0. || cost.log_write_mb > 0. {
                let t = self.write_time(cost);
                hold(t).await;
                service_time = service_time.saturating_add(t);
            }
        }

        if cost.local_read_mb > 0. {
            let t = secs(cost.local_read_mb / self.cfg.local_read_bandwidth);
            hold(t).await;
            service_time = service_time.saturating_add(t);
        }

        if cost.remote_read_mb > 0. {
            let index = rand::random_range(0..self.datanodes.len());
            let _xceiver = self.datanodes[index]
                .acquire()
                .await
                .map_err(|_| EndpointError::failure("datanode xceiver pool closed"))?;

            let t = secs(DN_PER_REQ_CPU_TIME)
                .saturating_add(secs(cost.remote_read_mb / self.cfg.remote_read_bandwidth))
                .saturating_add(self.transfer_time(cost.remote_read_mb));
            hold(t).await;
            service_time = service_time.saturating_add(t);
        }

        let t = self.transfer_time(cost.response_mb);
        hold(t).await;
        service_time = service_time.saturating_add(t);

        Ok(service_time)
    }
}

impl Service<Submission> for ResourceModelEndpoint {
    type Output = Completion;
    type Error = EndpointError;

    async fn serve(&self, submission: Submission) -> Result<Self::Output, Self::Error> {
        let service_time = self.charge(&submission.cost).await?;
        tracing::trace!(
            client_id = %submission.client_id,
            ?service_time,
            "resource model: request served",
        );
        Ok(Completion {
            service_time: Some(service_time),
        })
    }
}
