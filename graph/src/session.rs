//! Session management for the Neo4j graph store.
//!
//! A [`GraphSession`] owns the driver handle for the process. Components
//! borrow the session for the duration of a single call; none of them retain
//! the handle. The session moves between `unconnected` and `connected`
//! through [`connect`](GraphSession::connect) / [`close`](GraphSession::close),
//! and heals itself once per dead transport via
//! [`ensure_connected`](GraphSession::ensure_connected).

use std::sync::Arc;
use std::time::{Duration, Instant};

use neo4rs::{ConfigBuilder, Graph, Query, Row};
use stackshift_core::GraphConfig;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{classify_connect_error, GraphError};

/// How long a verified connection is trusted before the next liveness probe.
const VERIFY_INTERVAL: Duration = Duration::from_secs(60);

pub struct GraphSession {
    config: GraphConfig,
    graph: RwLock<Option<Arc<Graph>>>,
    last_verified: Mutex<Option<Instant>>,
}

impl GraphSession {
    /// Create an offline session; nothing is dialled until
    /// [`connect`](Self::connect).
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            graph: RwLock::new(None),
            last_verified: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Establish and verify a session with the configured credentials.
    ///
    /// The driver's connection pool is lazy, so a probe statement runs before
    /// the session is considered live; connect failures therefore surface
    /// here instead of at the first real query.
    pub async fn connect(&self) -> Result<(), GraphError> {
        let driver_config = ConfigBuilder::new()
            .uri(&self.config.uri)
            .user(&self.config.username)
            .password(&self.config.password)
            .db(self.config.database.as_str())
            .fetch_size(self.config.fetch_size)
            .build()
            .map_err(|e| GraphError::InvalidConfig(e.to_string()))?;

        let graph = Graph::connect(driver_config)
            .await
            .map_err(|e| classify_connect_error(e, &self.config))?;

        Self::probe(&graph)
            .await
            .map_err(|e| classify_connect_error(e, &self.config))?;

        *self.graph.write().await = Some(Arc::new(graph));
        *self.last_verified.lock().await = Some(Instant::now());
        info!("Connected to graph store at {}", self.config.uri);
        Ok(())
    }

    async fn probe(graph: &Graph) -> Result<(), neo4rs::Error> {
        let mut rows = graph.execute(neo4rs::query("RETURN 1 AS probe")).await?;
        while let Some(_row) = rows.next().await? {}
        Ok(())
    }

    /// Cheap liveness check. A recently verified session is trusted without a
    /// round trip; a dead transport triggers exactly one reconnect attempt
    /// with the stored credentials before this returns `false`.
    pub async fn ensure_connected(&self) -> bool {
        let handle = { self.graph.read().await.clone() };

        let graph = match handle {
            Some(graph) => graph,
            None => return self.reconnect_once().await,
        };

        {
            let last = self.last_verified.lock().await;
            if let Some(at) = *last {
                if at.elapsed() < VERIFY_INTERVAL {
                    return true;
                }
            }
        }

        match Self::probe(&graph).await {
            Ok(()) => {
                *self.last_verified.lock().await = Some(Instant::now());
                true
            }
            Err(err) => {
                warn!("Graph session lost ({err}), attempting to reconnect...");
                *self.graph.write().await = None;
                self.reconnect_once().await
            }
        }
    }

    async fn reconnect_once(&self) -> bool {
        match self.connect().await {
            Ok(()) => true,
            Err(err) => {
                error!("Reconnect to graph store failed: {err}");
                false
            }
        }
    }

    /// Whether a session handle is currently held. Does not probe.
    pub async fn is_connected(&self) -> bool {
        self.graph.read().await.is_some()
    }

    /// Release the session. Safe to call repeatedly or when never connected.
    pub async fn close(&self) {
        let mut guard = self.graph.write().await;
        if guard.take().is_some() {
            *self.last_verified.lock().await = None;
            info!("Connection to graph store closed");
        }
    }

    /// Execute one statement inside an implicit transaction and drain its
    /// rows. The store's error text is surfaced unmodified inside
    /// [`GraphError::Query`].
    pub async fn run(&self, query: Query) -> Result<Vec<Row>, GraphError> {
        let graph = { self.graph.read().await.clone() }.ok_or(GraphError::NotConnected)?;

        let mut stream = graph.execute(query).await.map_err(GraphError::query)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(GraphError::query)? {
            rows.push(row);
        }
        debug!("Query returned {} row(s)", rows.len());
        Ok(rows)
    }

    /// Convenience wrapper for parameterless statements.
    pub async fn run_statement(&self, statement: &str) -> Result<Vec<Row>, GraphError> {
        self.run(neo4rs::query(statement)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> GraphConfig {
        GraphConfig {
            // Port 9 (discard) is never running a Bolt server locally.
            uri: "bolt://127.0.0.1:9".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_session_is_unconnected() {
        let session = GraphSession::new(GraphConfig::default());
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_run_without_session_fails() {
        let session = GraphSession::new(GraphConfig::default());
        let result = session.run_statement("RETURN 1").await;
        assert!(matches!(result, Err(GraphError::NotConnected)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let session = GraphSession::new(GraphConfig::default());
        session.close().await;
        session.close().await;
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_unreachable_host() {
        let session = GraphSession::new(unreachable_config());
        let result = session.connect().await;
        assert!(result.is_err());
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_ensure_connected_unreachable_host() {
        let session = GraphSession::new(unreachable_config());
        assert!(!session.ensure_connected().await);
        assert!(!session.is_connected().await);
    }
}
