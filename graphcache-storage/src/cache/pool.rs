//! Connection pool seam and scoped connection borrowing.
//!
//! A [`PooledConnection`] hands its connection back to the pool when dropped,
//! so every exit path of an operation (normal return, `?` propagation, panic
//! unwinding) releases exactly the connection it borrowed.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use graphcache_core::StoreResult;
pub use graphcache_core::PoolStatus;

use super::store::SortedSetStore;

/// Supplies store connections and takes them back.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    type Connection: SortedSetStore;

    /// Borrow a connection, opening one if the pool allows.
    async fn acquire(&self) -> StoreResult<Self::Connection>;

    /// Return a connection previously handed out by [`acquire`](Self::acquire).
    fn release(&self, conn: Self::Connection);

    fn status(&self) -> PoolStatus;
}

/// A borrowed connection that is released back to its pool on drop.
pub struct PooledConnection<'a, P: ConnectionPool + ?Sized> {
    pool: &'a P,
    conn: Option<P::Connection>,
}

impl<'a, P: ConnectionPool + ?Sized> PooledConnection<'a, P> {
    /// Acquire a connection from `pool`, scoped to the returned guard.
    pub async fn checkout(pool: &'a P) -> StoreResult<Self> {
        let conn = pool.acquire().await?;
        Ok(Self {
            pool,
            conn: Some(conn),
        })
    }
}

impl<P: ConnectionPool + ?Sized> Deref for PooledConnection<'_, P> {
    type Target = P::Connection;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the connection out.
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl<P: ConnectionPool + ?Sized> DerefMut for PooledConnection<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_mut() {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl<P: ConnectionPool + ?Sized> Drop for PooledConnection<'_, P> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
