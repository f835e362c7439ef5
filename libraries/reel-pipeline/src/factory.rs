//! Factory / registry
//!
//! Maps a service category and symbolic name to a constructor yielding
//! a validly-initialized service bound to a profile. The factory is an
//! explicitly constructed context object, not a hidden singleton, so
//! teardown order stays deterministic and testable. `init`/`close`
//! nest: only the first `init` registers the built-ins and only the
//! matching final `close` tears them down; extra calls are no-ops.
//!
//! Resolution failures never panic and never return `Err`: the caller
//! gets a service with `valid == false` and is expected to check. This
//! is the dominant error-handling idiom of the whole engine.

use crate::connector::Consumer;
use crate::sinks::{CaptureSink, NullSink};
use reel_core::Profile;
use reel_graph::producers::{ColorProducer, CountProducer, InvalidProducer, NoiseProducer};
use reel_graph::{Filter, Producer, ServiceNode, Transition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

/// Constructor for a producer service: (profile, argument) -> producer
pub type ProducerCtor = Arc<dyn Fn(&Arc<Profile>, &str) -> Arc<dyn Producer> + Send + Sync>;
/// Constructor for a filter service
pub type FilterCtor = Arc<dyn Fn(&Arc<Profile>, &str) -> Arc<Filter> + Send + Sync>;
/// Constructor for a transition service
pub type TransitionCtor = Arc<dyn Fn(&Arc<Profile>, &str) -> Arc<Transition> + Send + Sync>;
/// Constructor for a consumer service
pub type ConsumerCtor = Arc<dyn Fn(&Arc<Profile>, &str) -> Arc<Consumer> + Send + Sync>;

/// Process-wide defaults established by `Factory::init`
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Named preset for the default profile
    pub profile: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            profile: "dv_pal".to_string(),
        }
    }
}

#[derive(Default)]
struct Registry {
    producers: HashMap<String, ProducerCtor>,
    filters: HashMap<String, FilterCtor>,
    transitions: HashMap<String, TransitionCtor>,
    consumers: HashMap<String, ConsumerCtor>,
    /// File extension (lowercase, no dot) -> producer service name
    extensions: HashMap<String, String>,
}

/// Service registry and process-lifecycle context
pub struct Factory {
    registry: RwLock<Registry>,
    default_profile: RwLock<Arc<Profile>>,
    nesting: Mutex<usize>,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    /// Construct an uninitialized factory
    ///
    /// Services requested before `init` come back invalid.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            default_profile: RwLock::new(Arc::new(Profile::default())),
            nesting: Mutex::new(0),
        }
    }

    /// Initialize with default configuration
    pub fn init(&self) {
        self.init_with(FactoryConfig::default());
    }

    /// Establish process-wide state: built-in constructors and the
    /// default profile
    ///
    /// Nest-safe: a second `init` without an intervening `close` is a
    /// no-op, not an error.
    pub fn init_with(&self, config: FactoryConfig) {
        let mut nesting = self.nesting.lock().unwrap();
        *nesting += 1;
        if *nesting > 1 {
            return;
        }

        let profile = Profile::preset(&config.profile).unwrap_or_default();
        *self.default_profile.write().unwrap() = Arc::new(profile);

        let mut registry = self.registry.write().unwrap();
        register_builtins(&mut registry);
        tracing::info!(profile = %config.profile, "factory initialized");
    }

    /// Tear down the state established by `init`
    ///
    /// Idempotent: only the `close` matching the first `init` clears
    /// the registry; extra calls do nothing.
    pub fn close(&self) {
        let mut nesting = self.nesting.lock().unwrap();
        if *nesting == 0 {
            return;
        }
        *nesting -= 1;
        if *nesting > 0 {
            return;
        }

        *self.registry.write().unwrap() = Registry::default();
        *self.default_profile.write().unwrap() = Arc::new(Profile::default());
        tracing::info!("factory closed");
    }

    /// Whether `init` has been called without a matching final `close`
    pub fn is_initialized(&self) -> bool {
        *self.nesting.lock().unwrap() > 0
    }

    /// The default profile established by `init`
    pub fn default_profile(&self) -> Arc<Profile> {
        Arc::clone(&self.default_profile.read().unwrap())
    }

    /// Resolve a profile by preset name, falling back to the default
    pub fn profile(&self, name: &str) -> Arc<Profile> {
        Profile::preset(name)
            .map(Arc::new)
            .unwrap_or_else(|| self.default_profile())
    }

    // ===== Service construction =====

    /// Construct a producer from a resource locator
    ///
    /// The locator is either `"service:argument"` (explicit service
    /// name) or a bare path whose extension is looked up in the
    /// registered extension table (the file must exist). Resolution
    /// failure yields an invalid producer carrying the locator in its
    /// `resource` property; it is never an error.
    pub fn producer(&self, profile: Option<&Arc<Profile>>, locator: &str) -> Arc<dyn Producer> {
        let profile = profile.cloned().unwrap_or_else(|| self.default_profile());
        let registry = self.registry.read().unwrap();

        // Explicit "service:argument" form
        if let Some((name, argument)) = locator.split_once(':') {
            if let Some(ctor) = registry.producers.get(name) {
                return ctor(&profile, argument);
            }
        }

        // Bare service name
        if let Some(ctor) = registry.producers.get(locator) {
            return ctor(&profile, "");
        }

        // Extension inference, with an existence sniff
        if let Some(service) = locator_extension(locator)
            .and_then(|ext| registry.extensions.get(&ext))
        {
            if Path::new(locator).exists() {
                if let Some(ctor) = registry.producers.get(service) {
                    return ctor(&profile, locator);
                }
            }
        }

        tracing::warn!(locator, "no producer service resolves this locator");
        InvalidProducer::new(profile, locator)
    }

    /// Construct a consumer by name or `"name:argument"` locator
    pub fn consumer(&self, profile: Option<&Arc<Profile>>, locator: &str) -> Arc<Consumer> {
        let profile = profile.cloned().unwrap_or_else(|| self.default_profile());
        let registry = self.registry.read().unwrap();

        if let Some(ctor) = registry.consumers.get(locator) {
            return ctor(&profile, "");
        }
        if let Some((name, argument)) = locator.split_once(':') {
            if let Some(ctor) = registry.consumers.get(name) {
                return ctor(&profile, argument);
            }
        }

        tracing::warn!(locator, "no consumer service resolves this locator");
        Consumer::invalid(locator, profile)
    }

    /// Construct a filter by name
    pub fn filter(&self, profile: Option<&Arc<Profile>>, name: &str, argument: &str) -> Arc<Filter> {
        let profile = profile.cloned().unwrap_or_else(|| self.default_profile());
        let registry = self.registry.read().unwrap();
        match registry.filters.get(name) {
            Some(ctor) => ctor(&profile, argument),
            None => {
                tracing::warn!(name, "unknown filter service");
                Filter::invalid(name, profile)
            }
        }
    }

    /// Construct a transition by name
    pub fn transition(
        &self,
        profile: Option<&Arc<Profile>>,
        name: &str,
        argument: &str,
    ) -> Arc<Transition> {
        let profile = profile.cloned().unwrap_or_else(|| self.default_profile());
        let registry = self.registry.read().unwrap();
        match registry.transitions.get(name) {
            Some(ctor) => ctor(&profile, argument),
            None => {
                tracing::warn!(name, "unknown transition service");
                Transition::invalid(name, profile)
            }
        }
    }

    // ===== Registration =====

    /// Register a producer constructor under a symbolic name
    pub fn register_producer(&self, name: impl Into<String>, ctor: ProducerCtor) {
        self.registry.write().unwrap().producers.insert(name.into(), ctor);
    }

    /// Register a filter constructor
    pub fn register_filter(&self, name: impl Into<String>, ctor: FilterCtor) {
        self.registry.write().unwrap().filters.insert(name.into(), ctor);
    }

    /// Register a transition constructor
    pub fn register_transition(&self, name: impl Into<String>, ctor: TransitionCtor) {
        self.registry
            .write()
            .unwrap()
            .transitions
            .insert(name.into(), ctor);
    }

    /// Register a consumer constructor
    pub fn register_consumer(&self, name: impl Into<String>, ctor: ConsumerCtor) {
        self.registry.write().unwrap().consumers.insert(name.into(), ctor);
    }

    /// Map a file extension to a producer service for bare-path
    /// locator inference
    pub fn register_extension(&self, extension: impl Into<String>, service: impl Into<String>) {
        self.registry
            .write()
            .unwrap()
            .extensions
            .insert(extension.into().to_lowercase(), service.into());
    }
}

fn locator_extension(locator: &str) -> Option<String> {
    Path::new(locator)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

fn register_builtins(registry: &mut Registry) {
    // Producers
    let color: ProducerCtor = Arc::new(|profile, argument| {
        ColorProducer::new(Arc::clone(profile), argument) as Arc<dyn Producer>
    });
    registry.producers.insert("color".to_string(), Arc::clone(&color));
    registry.producers.insert("colour".to_string(), color);
    registry.producers.insert(
        "count".to_string(),
        Arc::new(|profile, _| CountProducer::new(Arc::clone(profile)) as Arc<dyn Producer>),
    );
    registry.producers.insert(
        "noise".to_string(),
        Arc::new(|profile, _| NoiseProducer::new(Arc::clone(profile)) as Arc<dyn Producer>),
    );

    // Filters
    registry.filters.insert(
        "brightness".to_string(),
        Arc::new(|profile, argument| {
            let filter = Filter::brightness(Arc::clone(profile));
            if !argument.is_empty() {
                filter.service().set("level", argument);
            }
            filter
        }),
    );
    registry.filters.insert(
        "rescale".to_string(),
        Arc::new(|profile, argument| {
            let filter = Filter::rescale(Arc::clone(profile));
            if !argument.is_empty() {
                filter.service().set("rescale", argument);
            }
            filter
        }),
    );

    // Transitions
    registry.transitions.insert(
        "mix".to_string(),
        Arc::new(|profile, argument| {
            let transition = Transition::mix(Arc::clone(profile));
            if !argument.is_empty() {
                transition.service().set("mix", argument);
            }
            transition
        }),
    );

    // Consumers
    registry.consumers.insert(
        "null".to_string(),
        Arc::new(|profile, argument| {
            let consumer = Consumer::new("null", Arc::clone(profile), Arc::new(NullSink));
            if !argument.is_empty() {
                consumer.service().set("resource", argument);
            }
            consumer
        }),
    );
    registry.consumers.insert(
        "capture".to_string(),
        Arc::new(|profile, argument| {
            let consumer = Consumer::new("capture", Arc::clone(profile), Arc::new(CaptureSink));
            if !argument.is_empty() {
                consumer.service().set("resource", argument);
            }
            consumer
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_graph::ServiceNode;

    #[test]
    fn init_and_close_nest() {
        let factory = Factory::new();
        assert!(!factory.is_initialized());

        factory.init();
        factory.init(); // no-op, not an error
        assert!(factory.is_initialized());

        factory.close();
        assert!(factory.is_initialized()); // still nested
        factory.close();
        assert!(!factory.is_initialized());
        factory.close(); // idempotent
        assert!(!factory.is_initialized());
    }

    #[test]
    fn uninitialized_factory_yields_invalid_services() {
        let factory = Factory::new();
        let producer = factory.producer(None, "color:red");
        assert!(!producer.is_valid());
        let consumer = factory.consumer(None, "null");
        assert!(!consumer.is_valid());
    }

    #[test]
    fn explicit_locator_form_resolves() {
        let factory = Factory::new();
        factory.init();

        let producer = factory.producer(None, "color:red");
        assert!(producer.is_valid());
        assert_eq!(producer.service().get_string("resource"), "red");

        let spelled = factory.producer(None, "colour:white");
        assert!(spelled.is_valid());
        factory.close();
    }

    #[test]
    fn unknown_service_yields_invalid_with_resource() {
        let factory = Factory::new();
        factory.init();

        let producer = factory.producer(None, "avformat:clip.mp4");
        assert!(!producer.is_valid());
        assert_eq!(
            producer.service().get_string("resource"),
            "avformat:clip.mp4"
        );
        factory.close();
    }

    #[test]
    fn default_profile_follows_config() {
        let factory = Factory::new();
        factory.init_with(FactoryConfig {
            profile: "hdv_720_25p".to_string(),
        });
        assert_eq!(factory.default_profile().width(), 1280);

        // Unknown preset names fall back to the PAL default
        assert_eq!(factory.profile("nonsense").width(), 1280);
        assert_eq!(factory.profile("quarter_pal").width(), 360);
        factory.close();
    }

    #[test]
    fn filters_and_transitions_resolve() {
        let factory = Factory::new();
        factory.init();

        let filter = factory.filter(None, "brightness", "0.5");
        assert!(filter.is_valid());
        assert_eq!(filter.service().get_double("level"), 0.5);

        let transition = factory.transition(None, "mix", "0.25");
        assert!(transition.is_valid());

        let unknown = factory.filter(None, "frei0r.glow", "");
        assert!(!unknown.is_valid());
        factory.close();
    }

    #[test]
    fn close_drops_registrations() {
        let factory = Factory::new();
        factory.init();
        assert!(factory.producer(None, "color:red").is_valid());
        factory.close();
        assert!(!factory.producer(None, "color:red").is_valid());
    }
}
