//! Type-safe registry of in-process clients.
//!
//! Providers register an implementation once under its interface type;
//! consumers fetch it by the same type: `hub.get::<dyn my::Api>()`.
//! Re-registering overwrites the previous value; Arcs already handed out stay valid.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, sync::Arc};

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not found: {0}")]
    NotFound(&'static str),

    #[error("type mismatch in hub for {0}")]
    TypeMismatch(&'static str),
}

type Boxed = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ClientHub {
    map: RwLock<HashMap<&'static str, Boxed>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under the interface type `T` (usually `dyn Trait`).
    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map
            .write()
            .insert(std::any::type_name::<T>(), Box::new(client));
    }

    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = std::any::type_name::<T>();
        let r = self.map.read();
        let boxed = r.get(key).ok_or(ClientHubError::NotFound(key))?;
        boxed
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ClientHubError::TypeMismatch(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;
    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn register_and_get_trait_object() {
        let hub = ClientHub::new();
        assert!(matches!(
            hub.get::<dyn Greeter>(),
            Err(ClientHubError::NotFound(_))
        ));

        let api: Arc<dyn Greeter> = Arc::new(Hello);
        hub.register::<dyn Greeter>(api);
        assert_eq!(hub.get::<dyn Greeter>().unwrap().greet(), "hello");
    }
}
