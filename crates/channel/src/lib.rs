//! Fincoach Channel
//!
//! Owns the one persistent, bidirectional channel between the client and
//! the coaching backend. A [`Channel`] wraps a single WebSocket
//! connection and exposes two call shapes over it:
//!
//! - **request/response**: [`Channel::request`] transmits a frame and
//!   resolves with the reply. Requests are strictly serialized: a
//!   request issued while another is awaiting its reply queues behind
//!   it, because the wire carries no correlation identifier and "next
//!   frame in" is only a valid pairing under one-at-a-time sends.
//! - **broadcast**: [`Channel::notify`] transmits without waiting;
//!   inbound frames not claimed by a pending request fan out to
//!   [`Channel::subscribe`] receivers and are retained as
//!   [`Channel::last_message`].
//!
//! A bare `Channel` never redials. [`Supervisor`] wraps channel
//! construction with exponential backoff and a `Reconnecting` state.

pub mod channel;
pub mod error;
pub mod state;
pub mod supervisor;

pub use channel::{Channel, ChannelConfig};
pub use error::ChannelError;
pub use state::ConnectionState;
pub use supervisor::{ReconnectPolicy, Supervisor};
