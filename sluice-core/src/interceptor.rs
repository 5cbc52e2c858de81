use crate::{ParameterBinder, ResultMapper, StatementHandler};
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// Plugin wrapped around the pipeline stages.
///
/// Each hook receives the stage built so far and returns the one to use, usually a decorator
/// delegating to it. Decorators can rewrite the bound SQL and the row bounds before `prepare`,
/// replace parameters before binding or transform the mapped stream.
pub trait Interceptor: Send + Sync {
    fn statement_handler(&self, handler: Box<dyn StatementHandler>) -> Box<dyn StatementHandler> {
        handler
    }
    fn parameter_binder(&self, binder: Box<dyn ParameterBinder>) -> Box<dyn ParameterBinder> {
        binder
    }
    fn result_mapper(&self, mapper: Box<dyn ResultMapper>) -> Box<dyn ResultMapper> {
        mapper
    }
}

/// Ordered list of interceptors, applied in installation order.
#[derive(Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn add_interceptor(&mut self, interceptor: impl Interceptor + 'static) {
        self.interceptors.push(Arc::new(interceptor));
    }
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
    pub fn wrap_statement_handler(
        &self,
        handler: Box<dyn StatementHandler>,
    ) -> Box<dyn StatementHandler> {
        self.interceptors
            .iter()
            .fold(handler, |handler, i| i.statement_handler(handler))
    }
    pub fn wrap_parameter_binder(&self, binder: Box<dyn ParameterBinder>) -> Box<dyn ParameterBinder> {
        self.interceptors
            .iter()
            .fold(binder, |binder, i| i.parameter_binder(binder))
    }
    pub fn wrap_result_mapper(&self, mapper: Box<dyn ResultMapper>) -> Box<dyn ResultMapper> {
        self.interceptors
            .iter()
            .fold(mapper, |mapper, i| i.result_mapper(mapper))
    }
}

impl Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}
