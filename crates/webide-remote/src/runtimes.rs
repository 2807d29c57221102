//! Runtime descriptors and the scanner registry that produces them

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::broadcast;

use webide_core::prelude::*;
use webide_core::RuntimeType;

use crate::connection::Connection;

/// A device, simulator or local process the workstation can connect to.
pub trait Runtime: Send + Sync + fmt::Debug {
    fn runtime_type(&self) -> RuntimeType;

    /// Human-readable name, for logs and UI.
    fn name(&self) -> String;

    /// Configure `connection` for this runtime and open it.
    ///
    /// The returned future only reports failures of the attempt itself;
    /// success is signalled by the connection reaching `Connected`.
    fn connect(&self, connection: Arc<dyn Connection>) -> BoxFuture<'static, Result<()>>;
}

/// Identity comparison of runtime descriptors.
pub fn same_runtime(a: &Arc<dyn Runtime>, b: &Arc<dyn Runtime>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Aggregates runtime scanners (USB, WiFi, simulators, ...).
pub trait RuntimeRegistry: Send + Sync {
    /// All runtimes known right now.
    fn list_runtimes(&self) -> Vec<Arc<dyn Runtime>>;

    /// Fires whenever the runtime list changes.
    fn subscribe(&self) -> broadcast::Receiver<()>;

    /// Start scanning.
    fn enable(&self);

    /// Stop scanning.
    fn disable(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(RuntimeType);

    impl Runtime for Fixed {
        fn runtime_type(&self) -> RuntimeType {
            self.0
        }

        fn name(&self) -> String {
            self.0.to_string()
        }

        fn connect(&self, _connection: Arc<dyn Connection>) -> BoxFuture<'static, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_same_runtime_is_identity() {
        let a: Arc<dyn Runtime> = Arc::new(Fixed(RuntimeType::Usb));
        let b: Arc<dyn Runtime> = Arc::new(Fixed(RuntimeType::Usb));
        assert!(same_runtime(&a, &a.clone()));
        assert!(!same_runtime(&a, &b));
    }
}
