//! pushgate-client: pushes a fixed set of metrics to a Prometheus push gateway.
//!
//! The client owns its transport and runs one push at a time, start to
//! finish, on the caller's thread.
//!
//! # Architecture
//!
//! ```text
//! PushClient::push(host, port, job, instance)
//!   ├── refresh values (update callbacks)
//!   ├── measure body          → Content-Length, no allocation
//!   ├── Transport::connect    → ConnectFailed (-1)
//!   ├── request head + body   → Transport::write
//!   ├── poll available()      → Timeout (-2) after the deadline
//!   └── parse status line     → Status(code) | UnparseableStatus (-1)
//! ```
//!
//! The transport is stopped on every path once a connection was opened.

pub mod client;
pub mod clock;
pub mod tcp;
pub mod transport;

pub use client::{PushClient, PushOptions, PushOutcome, PushPhase};
pub use clock::{Clock, SystemClock};
pub use tcp::TcpTransport;
pub use transport::Transport;

pub use pushgate_core::{Label, LabelError, LabelSet, MetricKind};
