mod as_value;
mod binder;
mod configuration;
mod connection;
mod data_type;
mod driver;
mod error;
mod executor;
mod interceptor;
mod key_propagator;
mod mapped;
mod metadata;
mod parameter;
mod query;
mod result_mapper;
mod row_adapter;
mod session;
mod statement;
mod statement_handler;
mod transaction;
mod type_registry;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use binder::*;
pub use configuration::*;
pub use connection::*;
pub use data_type::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use interceptor::*;
pub use key_propagator::*;
pub use mapped::*;
pub use metadata::*;
pub use parameter::*;
pub use query::*;
pub use result_mapper::*;
pub use row_adapter::*;
pub use session::*;
pub use statement::*;
pub use statement_handler::*;
pub use transaction::*;
pub use type_registry::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
