pub mod edge_interceptor;

pub use edge_interceptor::EdgeInterceptor;
