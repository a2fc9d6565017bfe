pub mod problem;

/// Sink for module OpenAPI documents, owned by the REST host.
///
/// REST modules hand over a complete `utoipa` document describing their
/// routes; the host merges paths and components into the served document.
pub trait OpenApiRegistry: Send + Sync {
    fn register_openapi(&self, doc: utoipa::openapi::OpenApi);

    /// Downcast support for accessing the concrete implementation if needed.
    fn as_any(&self) -> &dyn std::any::Any;
}
