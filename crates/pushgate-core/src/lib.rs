//! pushgate-core: the data model and wire encoding for pushgate.
//!
//! Everything here is fixed-capacity: label tables and the metric registry
//! are sized by const generics when the client is built and never grow.
//!
//! # Architecture
//!
//! ```text
//! LabelSet<N>          common labels (one per client)
//! Registry<M, L>
//!   └── Metric<L>      name, help, kind, value, own LabelSet<L>
//!
//! exposition
//!   ├── encode_metric(metric, common, None)       → measured length
//!   ├── encode_metric(metric, common, Some(sink)) → same bytes, written
//!   └── write_url_safe()                          → job/instance path segments
//! ```

pub mod error;
pub mod exposition;
pub mod labels;
pub mod registry;

pub use error::{CapacityExceeded, LabelError};
pub use exposition::{encode_body, encode_metric, measure_body, measure_metric, url_safe, write_url_safe};
pub use labels::{Label, LabelSet};
pub use registry::{Metric, MetricKind, Registry};
