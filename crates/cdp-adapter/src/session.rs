use std::sync::Arc;

use async_trait::async_trait;

use crate::{AdapterError, PageHandle};

/// Opens isolated browsing sessions. One session backs exactly one run.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn LiveSession>, AdapterError>;
}

/// A running browser instance with its single page.
#[async_trait]
pub trait LiveSession: Send {
    fn page(&self) -> Arc<dyn PageHandle>;

    /// Tear the session down. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), AdapterError>;

    fn is_closed(&self) -> bool;
}
