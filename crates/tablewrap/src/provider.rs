//! Connection acquisition.
//!
//! A [`ConnectionProvider`] hands out connections on demand. The accessor holds one only for
//! the duration of a single call, through a [`Lease`] that gives it back on drop, so the
//! connection is returned on success, on error and on cancellation alike.

use crate::error::TableResult;
use crate::executor::Executor;
use std::future::Future;
use std::ops::Deref;

/// Source of connections for a table accessor.
pub trait ConnectionProvider: Send + Sync {
    type Connection: Executor;

    /// Obtain a connection.
    fn acquire(&self) -> impl Future<Output = TableResult<Self::Connection>> + Send;

    /// Give a connection back. The default drops it, which is how pooled clients return to
    /// their pool.
    fn release(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// A connection acquired from a provider, released when dropped.
pub struct Lease<'a, P: ConnectionProvider> {
    provider: &'a P,
    conn: Option<P::Connection>,
}

impl<'a, P: ConnectionProvider> Lease<'a, P> {
    /// Acquire a connection from `provider`.
    pub async fn acquire(provider: &'a P) -> TableResult<Self> {
        match provider.acquire().await {
            Ok(conn) => Ok(Self {
                provider,
                conn: Some(conn),
            }),
            Err(e) => {
                tracing::warn!(target: "tablewrap", error = %e, "failed to acquire connection");
                Err(e)
            }
        }
    }
}

impl<P: ConnectionProvider> Deref for Lease<'_, P> {
    type Target = P::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            // Only `drop` takes the connection out.
            None => unreachable!(),
        }
    }
}

impl<P: ConnectionProvider> Drop for Lease<'_, P> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.provider.release(conn);
        }
    }
}
