use crate::{Connection, Result};
use std::{borrow::Cow, future::Future};

/// Entry point of a backend: knows how to open connections.
pub trait Driver: Send + Sync {
    type Connection: Connection + 'static;

    /// Name of the driver, also the expected scheme of its connection URLs.
    const NAME: &'static str;

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}
