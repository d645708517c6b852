//! `helm-middleware` – The Nervous System
//!
//! Moves keyed messages between the vessel core and the outside world
//! without caring what they mean.
//!
//! # Modules
//!
//! - [`bus`] – topic-based publish/subscribe event bus on Tokio broadcast
//!   channels.
//! - [`keys`] – [`KeySpace`]: outbound key builders and inbound key
//!   classification for one vessel.
//! - [`codec`] – timestamped JSON envelopes and inbound message decoding.
//! - [`adapter`] – the [`Transport`] trait the vessel core is written
//!   against.
//! - [`bus_transport`] / [`recording`] – the two [`Transport`]
//!   implementations.

pub mod adapter;
pub mod bus;
pub mod bus_transport;
pub mod codec;
pub mod keys;
pub mod recording;

pub use adapter::Transport;
pub use bus::{EventBus, KeySubscriber, Topic, TopicReceiver};
pub use bus_transport::BusTransport;
pub use codec::{InboundMessage, decode_inbound};
pub use keys::{InboundKey, KeySpace};
pub use recording::RecordingTransport;
