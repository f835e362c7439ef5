//! Service base
//!
//! A service is a polymorphic graph node: producer, filter, transition
//! or consumer. Every node owns a property store, an event bus, a shared
//! profile, and a validity flag fixed at construction time. Node types
//! embed `Service` by composition and expose it through the
//! `ServiceNode` trait rather than inheriting from a base class.

use crate::events::EventBus;
use reel_core::properties::Value;
use reel_core::{Profile, Properties};
use std::sync::{Arc, RwLock};

/// The four service variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Source of frames
    Producer,
    /// Transforms the frames of exactly one producer
    Filter,
    /// Combines two frame streams
    Transition,
    /// Sink that pulls frames and renders/encodes them
    Consumer,
}

/// State shared by every graph node
///
/// Property reads may happen concurrently from multiple threads; writes
/// are serialized by the interior lock (single writer at a time).
pub struct Service {
    kind: ServiceKind,
    name: String,
    profile: Arc<Profile>,
    properties: RwLock<Properties>,
    events: EventBus,
    valid: bool,
}

impl Service {
    /// Create a valid service
    pub fn new(kind: ServiceKind, name: impl Into<String>, profile: Arc<Profile>) -> Self {
        let name = name.into();
        tracing::debug!(?kind, %name, "service constructed");
        Self {
            kind,
            name,
            profile,
            properties: RwLock::new(Properties::new()),
            events: EventBus::new(),
            valid: true,
        }
    }

    /// Create a service whose backing resource acquisition failed
    ///
    /// Callers are expected to check `is_valid` before use; an invalid
    /// service is the sole error signal from construction.
    pub fn invalid(kind: ServiceKind, name: impl Into<String>, profile: Arc<Profile>) -> Self {
        let name = name.into();
        tracing::warn!(?kind, %name, "service constructed invalid");
        Self {
            kind,
            name,
            profile,
            properties: RwLock::new(Properties::new()),
            events: EventBus::new(),
            valid: false,
        }
    }

    /// Which variant this service is
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Symbolic service name (e.g. "color")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The profile all frames are normalized to
    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    /// Whether backing resource acquisition succeeded at construction
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Event bus for this service instance
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ===== Property access =====

    /// Set a property (serialized with other writers)
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.properties.write().unwrap().set(key, value);
    }

    /// Get a property value, or `None` if unset
    pub fn get(&self, key: &str) -> Option<Value> {
        self.properties.read().unwrap().get(key).cloned()
    }

    /// Get a property coerced to an integer
    pub fn get_int(&self, key: &str) -> i64 {
        self.properties.read().unwrap().get_int(key)
    }

    /// Get a property coerced to a real
    pub fn get_double(&self, key: &str) -> f64 {
        self.properties.read().unwrap().get_double(key)
    }

    /// Get a property coerced to a string
    pub fn get_string(&self, key: &str) -> String {
        self.properties.read().unwrap().get_string(key)
    }

    /// Check whether a property is set
    pub fn contains(&self, key: &str) -> bool {
        self.properties.read().unwrap().contains(key)
    }

    /// Run a closure with read access to the full property store
    pub fn with_properties<R>(&self, f: impl FnOnce(&Properties) -> R) -> R {
        f(&self.properties.read().unwrap())
    }

    /// Run a closure with write access to the full property store
    pub fn with_properties_mut<R>(&self, f: impl FnOnce(&mut Properties) -> R) -> R {
        f(&mut self.properties.write().unwrap())
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("valid", &self.valid)
            .finish()
    }
}

/// Capability shared by every graph node: access to its `Service`
pub trait ServiceNode {
    /// The embedded service state
    fn service(&self) -> &Service;

    /// Whether the node was constructed successfully
    fn is_valid(&self) -> bool {
        self.service().is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_flag_fixed_at_construction() {
        let profile = Arc::new(Profile::default());
        let good = Service::new(ServiceKind::Producer, "color", Arc::clone(&profile));
        let bad = Service::invalid(ServiceKind::Producer, "missing", profile);
        assert!(good.is_valid());
        assert!(!bad.is_valid());
    }

    #[test]
    fn property_convenience_accessors() {
        let service = Service::new(
            ServiceKind::Consumer,
            "null",
            Arc::new(Profile::default()),
        );
        service.set("real_time", 0);
        service.set("resource", "out.bin");
        assert_eq!(service.get_int("real_time"), 0);
        assert_eq!(service.get_string("resource"), "out.bin");
        assert!(!service.contains("buffer"));
    }
}
