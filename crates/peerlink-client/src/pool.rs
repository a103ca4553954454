use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use peerlink_common::protocol::error::Result;
use peerlink_common::{Address, NodeId};

use crate::call_manager::CallManager;
use crate::client::ObjectManagerClient;
use crate::stats::{PoolStats, PoolStatsSnapshot};

/// Builds a client for an address. Supplied once, when the pool is created.
pub type ClientFactoryFn<C> = Arc<dyn Fn(&Address) -> Result<Arc<C>> + Send + Sync>;

/// Returns the factory [`ClientPool::new`] installs: every client it builds
/// is an [`ObjectManagerClient`] sharing `call_manager`.
///
/// The address is validated up front; no connection is opened until the
/// client's first call.
pub fn default_client_factory(call_manager: Arc<CallManager>) -> ClientFactoryFn<ObjectManagerClient> {
    Arc::new(move |address: &Address| -> Result<Arc<ObjectManagerClient>> {
        address.validate()?;
        Ok(Arc::new(ObjectManagerClient::new(
            address.clone(),
            Arc::clone(&call_manager),
        )))
    })
}

/// Cache of client handles to peer nodes, keyed by [`NodeId`].
///
/// Handles are created lazily by the factory the pool was built with and
/// shared as `Arc`s. Removing an entry with [`disconnect`](Self::disconnect)
/// never invalidates handles already handed out: the underlying connection
/// closes once the last holder drops its handle.
///
/// # Concurrency
///
/// The registry sits behind a single mutex. A miss re-checks the registry
/// after re-acquiring the lock and runs the factory while still holding it,
/// so concurrent first-time connects to one node build exactly one client
/// and all receive it. The flip side is that a slow factory call stalls
/// every other pool operation, for any node, until it returns.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use peerlink_client::{CallManager, ClientPool};
/// use peerlink_common::{Address, NodeId};
///
/// let pool = ClientPool::new(Arc::new(CallManager::default()));
/// let node = NodeId::from_random();
/// let address = Address::new("10.0.0.9", 8076).with_node_id(node);
///
/// // Unknown ids are a miss, not an error
/// assert!(pool.get_or_connect_by_id(&node).is_none());
///
/// let client = pool.get_or_connect_by_address(&address).unwrap();
/// let again = pool.get_or_connect_by_id(&node).unwrap();
/// assert!(Arc::ptr_eq(&client, &again));
///
/// pool.disconnect(&node);
/// assert!(pool.get_or_connect_by_id(&node).is_none());
/// ```
pub struct ClientPool<C = ObjectManagerClient> {
    client_factory: ClientFactoryFn<C>,
    clients: Mutex<HashMap<NodeId, Arc<C>>>,
    stats: PoolStats,
}

impl ClientPool<ObjectManagerClient> {
    /// Creates a pool that builds [`ObjectManagerClient`]s bound to
    /// `call_manager`.
    pub fn new(call_manager: Arc<CallManager>) -> Self {
        Self::from_factory(default_client_factory(call_manager))
    }
}

impl<C> ClientPool<C> {
    /// Creates a pool around a custom client factory.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&Address) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        Self::from_factory(Arc::new(factory))
    }

    /// Creates a pool around an already shared factory, such as one from
    /// [`default_client_factory`].
    pub fn from_factory(client_factory: ClientFactoryFn<C>) -> Self {
        Self {
            client_factory,
            clients: Mutex::new(HashMap::new()),
            stats: PoolStats::new(),
        }
    }

    /// Returns the client registered for `id`, if any.
    ///
    /// This never connects: without an address there is nothing to build a
    /// client from, so an unregistered id yields `None`. Callers that know
    /// the node's address use
    /// [`get_or_connect_by_address`](Self::get_or_connect_by_address).
    pub fn get_or_connect_by_id(&self, id: &NodeId) -> Option<Arc<C>> {
        let client = self.lock_clients().get(id).cloned();
        match &client {
            Some(_) => {
                self.stats.record_hit();
                tracing::trace!(node_id = %id, "Reusing pooled client");
            }
            None => self.stats.record_id_miss(),
        }
        client
    }

    /// Returns the client registered under `address`'s key, building and
    /// registering one with the factory if there is none.
    ///
    /// The key is [`Address::pool_key`]: the address's node id, or an id
    /// derived from its endpoint.
    ///
    /// # Errors
    ///
    /// Returns the factory's error unchanged. Nothing is registered on
    /// failure, so the next call tries the factory again.
    pub fn get_or_connect_by_address(&self, address: &Address) -> Result<Arc<C>> {
        let key = address.pool_key();

        if let Some(client) = self.lock_clients().get(&key).cloned() {
            self.stats.record_hit();
            tracing::trace!(node_id = %key, "Reusing pooled client");
            return Ok(client);
        }

        let mut clients = self.lock_clients();

        // Another caller may have registered the key between the two locks
        if let Some(client) = clients.get(&key) {
            self.stats.record_hit();
            return Ok(Arc::clone(client));
        }

        let client = match (self.client_factory)(address) {
            Ok(client) => client,
            Err(e) => {
                self.stats.record_construction_failure();
                return Err(e);
            }
        };
        clients.insert(key, Arc::clone(&client));
        self.stats.record_construction();

        tracing::debug!(node_id = %key, addr = %address.endpoint(), "Connected new pooled client");

        Ok(client)
    }

    /// Removes the entry for `id`, if there is one.
    ///
    /// Handles held elsewhere stay usable; the connection closes when the
    /// last of them is dropped.
    pub fn disconnect(&self, id: &NodeId) {
        let removed = self.lock_clients().remove(id);
        if removed.is_some() {
            self.stats.record_disconnect();
            tracing::debug!(node_id = %id, "Disconnected pooled client");
        }
        // `removed` drops here, outside the lock
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.lock_clients().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock_clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_clients().is_empty()
    }

    /// Ids currently registered, in no particular order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.lock_clients().keys().copied().collect()
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        let registered = self.len();
        self.stats.snapshot(registered)
    }

    // The map is only written after the factory returns, so a guard
    // poisoned by a panicking factory still holds a consistent map.
    fn lock_clients(&self) -> MutexGuard<'_, HashMap<NodeId, Arc<C>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_common::PeerlinkError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct MockClient {
        address: Address,
        serial: usize,
    }

    /// Factory that counts its calls and stamps each client with a serial.
    fn counting_pool() -> (ClientPool<MockClient>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = ClientPool::with_factory(move |address: &Address| {
            let serial = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockClient {
                address: address.clone(),
                serial,
            }))
        });
        (pool, calls)
    }

    fn node_address(port: u16) -> (NodeId, Address) {
        let id = NodeId::from_random();
        (id, Address::new("127.0.0.1", port).with_node_id(id))
    }

    #[test]
    fn test_cache_reuse() {
        let (pool, calls) = counting_pool();
        let (_, addr) = node_address(9001);

        let first = pool.get_or_connect_by_address(&addr).unwrap();
        let second = pool.get_or_connect_by_address(&addr).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.address, addr);
    }

    #[test]
    fn test_per_key_isolation() {
        let (pool, calls) = counting_pool();
        let (id_a, addr_a) = node_address(9001);
        let (id_b, addr_b) = node_address(9002);

        let a = pool.get_or_connect_by_address(&addr_a).unwrap();
        let b = pool.get_or_connect_by_address(&addr_b).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.len(), 2);

        let mut ids = pool.node_ids();
        ids.sort();
        let mut expected = vec![id_a, id_b];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_concurrent_miss_builds_one_client() {
        const THREADS: usize = 16;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = ClientPool::with_factory(move |address: &Address| {
            let serial = counter.fetch_add(1, Ordering::SeqCst);
            // Widen the window for racers
            thread::sleep(Duration::from_millis(20));
            Ok(Arc::new(MockClient {
                address: address.clone(),
                serial,
            }))
        });
        let (_, addr) = node_address(9001);
        let barrier = Barrier::new(THREADS);

        let clients: Vec<Arc<MockClient>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        pool.get_or_connect_by_address(&addr).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1, "factory should run exactly once");
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
        assert_eq!(pool.len(), 1);

        let stats = pool.stats();
        assert_eq!(stats.constructions, 1);
        assert_eq!(stats.hits, (THREADS - 1) as u64);
    }

    #[test]
    fn test_unknown_id_is_none() {
        let (pool, calls) = counting_pool();

        assert!(pool.get_or_connect_by_id(&NodeId::from_random()).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(pool.stats().id_misses, 1);
    }

    #[test]
    fn test_by_id_after_by_address() {
        let (pool, calls) = counting_pool();
        let (id, addr) = node_address(9001);

        let by_addr = pool.get_or_connect_by_address(&addr).unwrap();
        let by_id = pool.get_or_connect_by_id(&id).unwrap();

        assert!(Arc::ptr_eq(&by_addr, &by_id));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_address_without_node_id_keyed_by_endpoint() {
        let (pool, calls) = counting_pool();
        let addr = Address::new("127.0.0.1", 9003);

        let first = pool.get_or_connect_by_address(&addr).unwrap();
        let second = pool
            .get_or_connect_by_address(&Address::new("127.0.0.1", 9003))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let key = NodeId::for_endpoint("127.0.0.1", 9003);
        assert!(pool.contains(&key));
        pool.disconnect(&key);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_disconnect_idempotent() {
        let (pool, _) = counting_pool();
        let (id, addr) = node_address(9001);

        // Absent id
        pool.disconnect(&NodeId::from_random());

        pool.get_or_connect_by_address(&addr).unwrap();
        pool.disconnect(&id);
        pool.disconnect(&id);

        assert!(pool.is_empty());
        assert_eq!(pool.stats().disconnects, 1);
    }

    #[test]
    fn test_disconnect_leaves_other_nodes() {
        let (pool, _) = counting_pool();
        let (id_a, addr_a) = node_address(9001);
        let (id_b, addr_b) = node_address(9002);

        pool.get_or_connect_by_address(&addr_a).unwrap();
        let b = pool.get_or_connect_by_address(&addr_b).unwrap();
        pool.disconnect(&id_a);

        assert!(!pool.contains(&id_a));
        assert!(Arc::ptr_eq(&pool.get_or_connect_by_id(&id_b).unwrap(), &b));
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let (pool, calls) = counting_pool();
        let (id, addr) = node_address(9001);

        let old = pool.get_or_connect_by_address(&addr).unwrap();
        pool.disconnect(&id);
        assert!(pool.get_or_connect_by_id(&id).is_none());

        let new = pool.get_or_connect_by_address(&addr).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_ne!(old.serial, new.serial);

        // The evicted handle is still ours alone
        assert_eq!(Arc::strong_count(&old), 1);
        assert_eq!(old.address, addr);
        assert_eq!(Arc::strong_count(&new), 2);
    }

    #[test]
    fn test_disconnect_racing_connect() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 2000;

        let (pool, calls) = counting_pool();
        let (id, addr) = node_address(9001);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for worker in 0..THREADS {
                let (pool, addr, barrier) = (&pool, &addr, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..ITERATIONS {
                        if (worker + i) % 2 == 0 {
                            let client = pool.get_or_connect_by_address(addr).unwrap();
                            assert_eq!(&client.address, addr);
                        } else {
                            pool.disconnect(&id);
                        }
                        assert!(pool.len() <= 1);
                    }
                });
            }
        });

        assert!(pool.len() <= 1);
        let stats = pool.stats();
        assert!(stats.constructions >= 1);
        assert_eq!(stats.constructions, calls.load(Ordering::SeqCst) as u64);
        assert_eq!(stats.constructions - stats.disconnects, pool.len() as u64);

        // Whatever the interleaving, the pool still hands out a live client
        let client = pool.get_or_connect_by_address(&addr).unwrap();
        assert_eq!(client.address, addr);
        assert!(Arc::ptr_eq(&pool.get_or_connect_by_id(&id).unwrap(), &client));
    }

    #[test]
    fn test_factory_error_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool: ClientPool<MockClient> = ClientPool::with_factory(move |address: &Address| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt == 0 {
                return Err(PeerlinkError::Connection("peer not ready".to_string()));
            }
            Ok(Arc::new(MockClient {
                address: address.clone(),
                serial: attempt,
            }))
        });
        let (id, addr) = node_address(9001);

        let err = pool.get_or_connect_by_address(&addr).unwrap_err();
        assert!(matches!(err, PeerlinkError::Connection(_)));
        assert!(pool.get_or_connect_by_id(&id).is_none());

        let client = pool.get_or_connect_by_address(&addr).unwrap();
        assert_eq!(client.serial, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stats = pool.stats();
        assert_eq!(stats.construction_failures, 1);
        assert_eq!(stats.constructions, 1);
        assert_eq!(stats.registered, 1);
    }

    #[test]
    fn test_panicking_factory_does_not_wedge_pool() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool: ClientPool<MockClient> = ClientPool::with_factory(move |address: &Address| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("factory blew up");
            }
            Ok(Arc::new(MockClient {
                address: address.clone(),
                serial: 1,
            }))
        });
        let (_, addr) = node_address(9001);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pool.get_or_connect_by_address(&addr)
        }));
        assert!(result.is_err());
        assert!(pool.is_empty());

        assert!(pool.get_or_connect_by_address(&addr).is_ok());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_pools_have_independent_factories() {
        let (pool_a, calls_a) = counting_pool();
        let (pool_b, calls_b) = counting_pool();
        let (_, addr) = node_address(9001);

        let a = pool_a.get_or_connect_by_address(&addr).unwrap();
        let b = pool_b.get_or_connect_by_address(&addr).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_factory_rejects_invalid_address() {
        let pool = ClientPool::new(Arc::new(CallManager::default()));
        let bad = Address::new("127.0.0.1", 0);

        let result = pool.get_or_connect_by_address(&bad);
        assert!(matches!(result, Err(PeerlinkError::InvalidAddress(_))));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_default_factory_builds_object_manager_client() {
        let pool = ClientPool::new(Arc::new(CallManager::default()));
        let (id, addr) = node_address(8076);

        let client = pool.get_or_connect_by_address(&addr).unwrap();
        assert_eq!(client.address(), &addr);
        assert!(pool.contains(&id));
    }
}
