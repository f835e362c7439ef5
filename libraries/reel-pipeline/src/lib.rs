//! Reel Pipeline
//!
//! The playback side of the Reel media graph: consumers with their
//! pull-loop workers, frame sinks, and the factory/registry that
//! instantiates services by symbolic name under a profile.
//!
//! # Example
//!
//! ```rust
//! use reel_pipeline::{Factory, FactoryConfig};
//! use reel_graph::ServiceNode;
//!
//! let factory = Factory::new();
//! factory.init_with(FactoryConfig { profile: "quarter_pal".to_string() });
//!
//! let producer = factory.producer(None, "color:red");
//! assert!(producer.is_valid());
//!
//! let consumer = factory.consumer(None, "capture");
//! consumer.service().set("real_time", 0);
//! consumer.connect(producer).unwrap();
//! consumer.start().unwrap();
//!
//! let done = consumer.service().events().setup_wait_for("consumer-stopped");
//! consumer.stop();
//! done.wait();
//! assert!(consumer.is_stopped());
//!
//! factory.close();
//! ```

mod connector;
mod factory;
mod sinks;

// Public exports
pub use connector::{Consumer, ConsumerState};
pub use factory::{
    ConsumerCtor, Factory, FactoryConfig, FilterCtor, ProducerCtor, TransitionCtor,
};
pub use sinks::{CaptureSink, FrameSink, NullSink};
