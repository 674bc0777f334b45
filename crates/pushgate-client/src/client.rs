//! Push-gateway client and protocol driver.
//!
//! One call to [`PushClient::push`] walks the whole cycle:
//!
//! ```text
//! Idle → ValuesRefreshed → Sized → Connected → HeadersSent → BodySent
//!      → AwaitingResponse → Done(status)
//!                 ↘ ConnectFailed          ↘ ResponseTimeout
//! ```
//!
//! The body is rendered twice by the same encoder: once without a sink to
//! size `Content-Length`, once straight into the transport.

use std::fmt::{self, Write};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::{debug, info, warn};

use pushgate_core::exposition::{encode_body, measure_body, write_url_safe};
use pushgate_core::{CapacityExceeded, Label, LabelSet, MetricKind, Registry};

use crate::clock::{Clock, SystemClock};
use crate::transport::Transport;

/// Response bytes kept for the diagnostic log after a non-200 status.
const DIAGNOSTIC_LIMIT: usize = 512;

/// Recomputes a metric's value from its name and own labels.
pub type UpdateCallback<'a> = Box<dyn FnMut(&str, &[Label<'a>]) -> f32 + 'a>;

/// Recomputes a common label's value from its key.
pub type CommonLabelUpdateCallback<'a> = Box<dyn FnMut(&str) -> &'a str + 'a>;

/// Tunables for the push cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOptions {
    /// How long to wait for the first response byte (default: 5000 ms).
    pub response_timeout: Duration,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(5000),
        }
    }
}

/// Progress through a push cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPhase {
    Idle,
    ValuesRefreshed,
    Sized,
    Connected,
    HeadersSent,
    BodySent,
    AwaitingResponse,
    Done,
    ConnectFailed,
    ResponseTimeout,
}

/// Result of a push.
///
/// Every failure the protocol can hit is an ordinary value here; nothing
/// panics or propagates. [`PushOutcome::code`] gives the integer contract:
/// the HTTP status, `-1` for connect failure or an unreadable status line,
/// `-2` for a response timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The gateway answered with this HTTP status.
    Status(u16),
    /// The transport refused the connection; nothing was sent.
    ConnectFailed,
    /// A response arrived but its status line could not be parsed.
    UnparseableStatus,
    /// No response byte arrived before the deadline.
    Timeout,
}

impl PushOutcome {
    pub const CONNECT_FAILED: i32 = -1;
    pub const UNPARSEABLE_STATUS: i32 = -1;
    pub const TIMEOUT: i32 = -2;

    pub fn code(self) -> i32 {
        match self {
            PushOutcome::Status(code) => i32::from(code),
            PushOutcome::ConnectFailed => Self::CONNECT_FAILED,
            PushOutcome::UnparseableStatus => Self::UNPARSEABLE_STATUS,
            PushOutcome::Timeout => Self::TIMEOUT,
        }
    }

    /// Only a literal 200 counts; other codes, 2xx included, are left to
    /// the caller.
    pub fn is_success(self) -> bool {
        self == PushOutcome::Status(200)
    }

    pub fn status(self) -> Option<u16> {
        match self {
            PushOutcome::Status(code) => Some(code),
            _ => None,
        }
    }
}

impl From<PushOutcome> for i32 {
    fn from(outcome: PushOutcome) -> Self {
        outcome.code()
    }
}

impl fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushOutcome::Status(code) => write!(f, "HTTP {code}"),
            PushOutcome::ConnectFailed => f.write_str("connection failed"),
            PushOutcome::UnparseableStatus => f.write_str("unparseable status line"),
            PushOutcome::Timeout => f.write_str("response timed out"),
        }
    }
}

/// Pushes a fixed set of metrics to a Prometheus push gateway.
///
/// Capacities are compile-time: up to `M` metrics, each with up to `L` own
/// labels, plus up to `C` common labels applied to every metric. All label
/// and name text is borrowed for `'a`.
pub struct PushClient<'a, T, const M: usize, const L: usize = 0, const C: usize = 0> {
    transport: T,
    clock: Box<dyn Clock + 'a>,
    options: PushOptions,
    common_labels: LabelSet<'a, C>,
    registry: Registry<'a, M, L>,
    on_update: Option<UpdateCallback<'a>>,
    on_common_label_update: Option<CommonLabelUpdateCallback<'a>>,
    last_phase: PushPhase,
}

impl<'a, T, const M: usize, const L: usize, const C: usize> PushClient<'a, T, M, L, C>
where
    T: Transport,
{
    /// Create a client that owns `transport` and applies `common_labels`
    /// to every metric.
    pub fn new(transport: T, common_labels: LabelSet<'a, C>) -> Self {
        Self {
            transport,
            clock: Box::new(SystemClock::new()),
            options: PushOptions::default(),
            common_labels,
            registry: Registry::new(),
            on_update: None,
            on_common_label_update: None,
            last_phase: PushPhase::Idle,
        }
    }

    /// Replace the clock that bounds the response wait.
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_options(mut self, options: PushOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a metric. Its value starts at `0.0`.
    pub fn add_metric(
        &mut self,
        name: &'a str,
        help: &'a str,
        labels: LabelSet<'a, L>,
        kind: MetricKind,
    ) -> Result<(), CapacityExceeded> {
        self.registry.add_metric(name, help, labels, kind)?;
        debug!(metric = name, %kind, count = self.registry.len(), "metric registered");
        Ok(())
    }

    /// Register a metric with no labels of its own.
    pub fn add_unlabelled(
        &mut self,
        name: &'a str,
        help: &'a str,
        kind: MetricKind,
    ) -> Result<(), CapacityExceeded> {
        self.add_metric(name, help, LabelSet::new(), kind)
    }

    /// Called once per metric, in registry order, at the start of every push.
    pub fn set_update_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&str, &[Label<'a>]) -> f32 + 'a,
    {
        self.on_update = Some(Box::new(callback));
    }

    /// Called once per common label, in table order, after the metric
    /// values are refreshed.
    pub fn set_common_label_update_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&str) -> &'a str + 'a,
    {
        self.on_common_label_update = Some(Box::new(callback));
    }

    pub fn registry(&self) -> &Registry<'a, M, L> {
        &self.registry
    }

    /// Direct access for callers that set values themselves instead of
    /// registering an update callback.
    pub fn registry_mut(&mut self) -> &mut Registry<'a, M, L> {
        &mut self.registry
    }

    pub fn common_labels(&self) -> &LabelSet<'a, C> {
        &self.common_labels
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Where the most recent push stopped.
    pub fn last_phase(&self) -> PushPhase {
        self.last_phase
    }

    /// Exact body length the next push would send with the current values.
    pub fn content_length(&self) -> usize {
        measure_body(&self.registry, &self.common_labels)
    }

    /// Render the current body into `sink`, exactly as a push would send it.
    pub fn render_body(&self, sink: &mut dyn Write) -> fmt::Result {
        encode_body(&self.registry, &self.common_labels, sink).map(|_| ())
    }

    /// Run one full push cycle against `host:port`.
    ///
    /// The request goes to `/metrics/job/<job>` or, with an instance,
    /// `/metrics/job/<job>/instance/<instance>`; both segments are made
    /// URL-safe. See [`PushOutcome`] for the result contract.
    pub fn push(&mut self, host: &str, port: u16, job: &str, instance: Option<&str>) -> PushOutcome {
        self.last_phase = PushPhase::Idle;
        debug!(%host, port, job, instance, "pushing metrics to push gateway");

        self.refresh();

        let content_length = self.content_length();
        self.last_phase = PushPhase::Sized;
        debug!(content_length, metrics = self.registry.len(), "body sized");

        if !self.transport.connect(host, port) {
            self.last_phase = PushPhase::ConnectFailed;
            warn!(%host, port, "TCP connection to push gateway failed");
            return PushOutcome::ConnectFailed;
        }

        let Self {
            transport,
            clock,
            options,
            common_labels,
            registry,
            last_phase,
            ..
        } = self;

        let mut conn = Connection::new(transport);
        *last_phase = PushPhase::Connected;

        let mut wire = Wire::new(&mut *conn);
        // The wire sink never reports errors, it only counts short writes.
        let _ = write_request_head(&mut wire, host, job, instance, content_length);
        let head_sent = wire.sent;
        *last_phase = PushPhase::HeadersSent;

        let _ = encode_body(registry, common_labels, &mut wire);
        let body_sent = wire.sent - head_sent;
        *last_phase = PushPhase::BodySent;
        if body_sent != content_length {
            warn!(content_length, body_sent, "transport accepted fewer body bytes than announced");
        }

        *last_phase = PushPhase::AwaitingResponse;
        let timeout_ms = u64::try_from(options.response_timeout.as_millis()).unwrap_or(u64::MAX);
        let started = clock.now_millis();
        while conn.available() == 0 {
            if clock.now_millis().saturating_sub(started) > timeout_ms {
                *last_phase = PushPhase::ResponseTimeout;
                warn!(%host, timeout_ms, "timed out waiting for push gateway response");
                return PushOutcome::Timeout;
            }
            clock.idle();
        }

        let status_line = conn.read_line(b'\n');
        let outcome = match parse_status_line(&status_line) {
            Some(code) => PushOutcome::Status(code),
            None => PushOutcome::UnparseableStatus,
        };

        if outcome.is_success() {
            info!(%host, job, "pushed metrics to push gateway");
        } else {
            let response = drain(&mut *conn);
            warn!(
                %host,
                code = outcome.code(),
                status_line = status_line.trim_end(),
                "push gateway did not accept metrics"
            );
            debug!(%response, "push gateway response");
        }

        *last_phase = PushPhase::Done;
        outcome
    }

    /// Run the update callbacks now, exactly as the first step of a push does.
    pub fn refresh(&mut self) {
        if let Some(update) = self.on_update.as_mut() {
            self.registry.refresh_values(|name, labels| update(name, labels));
        }
        if let Some(update) = self.on_common_label_update.as_mut() {
            self.common_labels.refresh_values(|key| update(key));
        }
        self.last_phase = PushPhase::ValuesRefreshed;
    }
}

/// An open connection that is stopped exactly once when dropped.
struct Connection<'t, T: Transport> {
    transport: &'t mut T,
}

impl<'t, T: Transport> Connection<'t, T> {
    fn new(transport: &'t mut T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> Deref for Connection<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport> DerefMut for Connection<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport> Drop for Connection<'_, T> {
    fn drop(&mut self) {
        self.transport.stop();
    }
}

/// Adapts a transport to `fmt::Write`, counting the bytes it accepted.
struct Wire<'t, T: Transport> {
    transport: &'t mut T,
    sent: usize,
}

impl<'t, T: Transport> Wire<'t, T> {
    fn new(transport: &'t mut T) -> Self {
        Self { transport, sent: 0 }
    }
}

impl<T: Transport> Write for Wire<'_, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sent += self.transport.write(s.as_bytes());
        Ok(())
    }
}

fn write_request_head(
    out: &mut dyn Write,
    host: &str,
    job: &str,
    instance: Option<&str>,
    content_length: usize,
) -> fmt::Result {
    out.write_str("POST /metrics/job/")?;
    write_url_safe(out, job)?;
    if let Some(instance) = instance {
        out.write_str("/instance/")?;
        write_url_safe(out, instance)?;
    }
    write!(
        out,
        " HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: text/plain; version=0.0.4\r\n\
         Content-Length: {content_length}\r\n\
         Connection: close\r\n\
         \r\n"
    )
}

/// Extract the code from `<version> <code> <reason>`.
fn parse_status_line(line: &str) -> Option<u16> {
    let first = line.find(' ').filter(|&i| i > 0)?;
    let rest = &line[first + 1..];
    let second = rest.find(' ')?;
    rest[..second].parse().ok()
}

/// Read everything still buffered, keeping a bounded prefix for logging.
fn drain<T: Transport>(transport: &mut T) -> String {
    let mut kept = Vec::new();
    while transport.available() > 0 {
        let Some(b) = transport.read() else {
            break;
        };
        if kept.len() < DIAGNOSTIC_LIMIT {
            kept.push(b);
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}
