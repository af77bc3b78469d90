//! Transport pool.
//!
//! One fixed-size pool per HTTP method, filled at construction. Handles are
//! taken and returned, never created or destroyed afterwards. An empty pool
//! is an error for the caller, not a reason to wait.

use crate::transport::Transport;
use padrone_core::{ClientError, ClientResult, HttpMethod};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use tracing::{trace, warn};

/// A transport checked out of the pool, tagged with the method it was taken for.
pub struct PooledHandle<T> {
    method: HttpMethod,
    transport: T,
}

impl<T> PooledHandle<T> {
    /// The method whose pool this handle belongs to.
    pub fn method(&self) -> HttpMethod {
        self.method
    }
}

impl<T> Deref for PooledHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T> DerefMut for PooledHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// A pool of reusable transports, separated by method.
///
/// Not thread safe: all access comes from the thread driving the client.
pub struct TransportPool<T> {
    capacity: usize,
    get: RefCell<VecDeque<T>>,
    post: RefCell<VecDeque<T>>,
    leases: Cell<u64>,
    exhausted: Cell<u64>,
}

impl<T: Transport> TransportPool<T> {
    /// Create a pool holding `capacity` transports per method.
    pub fn new(capacity: usize, mut factory: impl FnMut(HttpMethod) -> T) -> Self {
        let get = (0..capacity).map(|_| factory(HttpMethod::Get)).collect();
        let post = (0..capacity).map(|_| factory(HttpMethod::Post)).collect();
        Self {
            capacity,
            get: RefCell::new(get),
            post: RefCell::new(post),
            leases: Cell::new(0),
            exhausted: Cell::new(0),
        }
    }

    fn queue(&self, method: HttpMethod) -> &RefCell<VecDeque<T>> {
        match method {
            HttpMethod::Get => &self.get,
            HttpMethod::Post => &self.post,
        }
    }

    /// Take a transport for `method`.
    pub fn acquire(&self, method: HttpMethod) -> ClientResult<PooledHandle<T>> {
        let Some(transport) = self.queue(method).borrow_mut().pop_front() else {
            self.exhausted.set(self.exhausted.get() + 1);
            warn!("{} transport pool exhausted ({} in use)", method, self.capacity);
            return Err(ClientError::PoolExhausted {
                method,
                capacity: self.capacity,
            });
        };
        self.leases.set(self.leases.get() + 1);
        trace!("Acquired {} transport ({} left)", method, self.available(method));
        Ok(PooledHandle { method, transport })
    }

    /// Return a transport to the pool it was taken from.
    pub fn release(&self, handle: PooledHandle<T>) {
        let mut queue = self.queue(handle.method).borrow_mut();
        if queue.len() >= self.capacity {
            warn!("{} transport pool already full, dropping foreign handle", handle.method);
            return;
        }
        queue.push_back(handle.transport);
        trace!("Released {} transport ({} available)", handle.method, queue.len());
    }

    /// Acquire a transport that goes back to the pool when the lease is dropped.
    pub fn lease(&self, method: HttpMethod) -> ClientResult<Lease<'_, T>> {
        let handle = self.acquire(method)?;
        Ok(Lease {
            pool: self,
            handle: Some(handle),
        })
    }

    /// Number of idle transports for `method`.
    pub fn available(&self, method: HttpMethod) -> usize {
        self.queue(method).borrow().len()
    }

    /// Transports per method.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            available_get: self.available(HttpMethod::Get),
            available_post: self.available(HttpMethod::Post),
            leases: self.leases.get(),
            exhausted: self.exhausted.get(),
        }
    }
}

/// A checked-out transport that returns itself to the pool on drop.
pub struct Lease<'a, T: Transport> {
    pool: &'a TransportPool<T>,
    handle: Option<PooledHandle<T>>,
}

impl<T: Transport> Lease<'_, T> {
    pub fn method(&self) -> HttpMethod {
        self.handle().method
    }

    fn handle(&self) -> &PooledHandle<T> {
        self.handle.as_ref().expect("lease holds its handle until dropped")
    }
}

impl<T: Transport> Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.handle()
    }
}

impl<T: Transport> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.handle
            .as_mut()
            .expect("lease holds its handle until dropped")
    }
}

impl<T: Transport> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle);
        }
    }
}

/// Statistics for the transport pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Transports per method.
    pub capacity: usize,
    /// Idle GET transports.
    pub available_get: usize,
    /// Idle POST transports.
    pub available_post: usize,
    /// Successful acquisitions.
    pub leases: u64,
    /// Acquisitions refused because the pool was empty.
    pub exhausted: u64,
}

impl PoolStats {
    /// Transports currently checked out, across both methods.
    pub fn in_use(&self) -> usize {
        2 * self.capacity - self.available_get - self.available_post
    }
}
