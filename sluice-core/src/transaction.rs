use crate::{Connection, Driver, Result};
use std::{borrow::Cow, time::Duration};

/// Connection lifecycle of one executor.
///
/// The connection is opened on first use. Outside auto-commit mode every unit of work starts
/// with `begin` on the connection and ends with `commit` or `rollback`.
pub struct Transaction<D: Driver> {
    driver: D,
    url: Cow<'static, str>,
    connection: Option<D::Connection>,
    auto_commit: bool,
    active: bool,
    timeout: Option<Duration>,
}

impl<D: Driver> Transaction<D> {
    pub fn new(driver: D, url: impl Into<Cow<'static, str>>, auto_commit: bool) -> Self {
        Self {
            driver,
            url: url.into(),
            connection: None,
            auto_commit,
            active: false,
            timeout: None,
        }
    }

    /// Upper bound for every statement timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The connection, opened (and with a transaction started) when needed.
    pub async fn connection(&mut self) -> Result<&mut D::Connection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                log::debug!("Opening {} connection", D::NAME);
                self.driver.connect(self.url.clone()).await?
            }
        };
        let connection = self.connection.insert(connection);
        if !self.auto_commit && !self.active {
            connection.begin().await?;
            self.active = true;
        }
        Ok(connection)
    }

    pub async fn commit(&mut self) -> Result<()> {
        if self.auto_commit || !self.active {
            return Ok(());
        }
        if let Some(connection) = &mut self.connection {
            log::debug!("Committing {} connection", D::NAME);
            self.active = false;
            connection.commit().await?;
        }
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        if self.auto_commit || !self.active {
            return Ok(());
        }
        if let Some(connection) = &mut self.connection {
            log::debug!("Rolling back {} connection", D::NAME);
            self.active = false;
            connection.rollback().await?;
        }
        Ok(())
    }

    /// Close the connection if it was opened, a later use opens a new one.
    pub async fn close(&mut self) -> Result<()> {
        self.active = false;
        if let Some(mut connection) = self.connection.take() {
            log::debug!("Closing {} connection", D::NAME);
            connection.close().await?;
        }
        Ok(())
    }
}
