use crate::{MockDriver, MockStatement};
use sluice_core::{Connection, Error, Result, Statement, future::BoxFuture};

pub struct MockConnection {
    driver: MockDriver,
    transaction: bool,
}

impl MockConnection {
    pub(crate) fn new(driver: MockDriver) -> Self {
        Self {
            driver,
            transaction: false,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction
    }

    fn finish(&mut self, operation: &str) -> Result<()> {
        if !self.transaction {
            let error = Error::msg(format!("Cannot {operation}, no transaction is active"));
            log::error!("{:#}", error);
            return Err(error);
        }
        self.transaction = false;
        Ok(())
    }
}

impl Connection for MockConnection {
    fn create_statement(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        if let Some(message) = &self.driver.state().prepare_error {
            return Err(Error::msg(message.clone()));
        }
        Ok(Box::new(MockStatement::new(self.driver.clone(), sql)))
    }

    fn begin(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.transaction {
                return Err(Error::msg("A transaction is already active"));
            }
            self.driver.state().begins += 1;
            self.transaction = true;
            Ok(())
        })
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.finish("commit")?;
            self.driver.state().commits += 1;
            Ok(())
        })
    }

    fn rollback(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.finish("rollback")?;
            self.driver.state().rollbacks += 1;
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.transaction = false;
            self.driver.state().closes += 1;
            Ok(())
        })
    }
}
