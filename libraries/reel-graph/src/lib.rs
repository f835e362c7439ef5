//! Reel Graph
//!
//! The service graph model: polymorphic nodes (producers, filters,
//! transitions) backed by property stores, an event/listener bus per
//! service, and the playlist: an ordered sequence of clip entries
//! presented as one virtual producer.
//!
//! # Architecture
//!
//! Nodes embed a `Service` (properties + profile + validity + events)
//! by composition and expose it through `ServiceNode`. Everything that
//! yields frames satisfies the `Producer` capability set (length,
//! read-frame-at-position, get/set in/out) and downstream code depends
//! only on that, so a `Playlist` or a `Filter` connects wherever a
//! plain producer does.
//!
//! # Example
//!
//! ```rust
//! use reel_core::Profile;
//! use reel_graph::producers::ColorProducer;
//! use reel_graph::{Playlist, Producer};
//! use std::sync::Arc;
//!
//! let profile = Arc::new(Profile::preset("quarter_pal").unwrap());
//!
//! let clip = ColorProducer::new(Arc::clone(&profile), "red");
//! clip.set_length(100);
//!
//! let playlist = Playlist::new(profile);
//! playlist.append(clip, 0, 99).unwrap();
//! assert_eq!(playlist.length(), 100);
//! ```

mod events;
mod filter;
mod playlist;
mod producer;
pub mod producers;
mod service;
mod transition;

// Public exports
pub use events::{EventBus, EventData, Listener, WaitHandle};
pub use filter::Filter;
pub use playlist::{ClipInfo, Playlist};
pub use producer::{Producer, ProducerCore, DEFAULT_LENGTH};
pub use service::{Service, ServiceKind, ServiceNode};
pub use transition::Transition;
