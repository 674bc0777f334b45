//! Prometheus text exposition format (version 0.0.4).
//!
//! Every metric renders as:
//!
//! ```text
//! # HELP <name> <help>
//! # TYPE <name> <counter|gauge>
//! <name>{<common labels>,<own labels>} <value>
//! ```
//!
//! The label block is left out entirely when there are no labels. Values
//! always carry two decimals.
//!
//! [`encode_metric`] is the single rendering routine. Without a sink it only
//! counts bytes, which is how the push driver derives `Content-Length`
//! before any I/O; with a sink it writes the very same bytes.

use std::fmt::{self, Write};

use crate::labels::LabelSet;
use crate::registry::{Metric, Registry};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Counts every byte that passes through and forwards it to the sink, if any.
struct Tally<'s> {
    sink: Option<&'s mut dyn Write>,
    bytes: usize,
}

impl Write for Tally<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.write_str(s)?;
        }
        self.bytes += s.len();
        Ok(())
    }
}

/// Render one metric, with `common` labels merged ahead of its own.
///
/// Returns the number of bytes produced. With `sink == None` nothing is
/// written or allocated; the count equals what a sink would receive.
pub fn encode_metric<const L: usize, const C: usize>(
    metric: &Metric<'_, L>,
    common: &LabelSet<'_, C>,
    sink: Option<&mut dyn Write>,
) -> Result<usize, fmt::Error> {
    let mut out = Tally { sink, bytes: 0 };
    let name = metric.name();

    write!(
        out,
        "# HELP {name} {}\n# TYPE {name} {}\n",
        metric.help(),
        metric.kind()
    )?;
    out.write_str(name)?;

    let mut labels = common.iter().chain(metric.labels().iter()).peekable();
    if labels.peek().is_some() {
        out.write_char('{')?;
        for (i, label) in labels.enumerate() {
            if i > 0 {
                out.write_char(',')?;
            }
            write!(out, "{}=\"{}\"", label.key, label.value)?;
        }
        out.write_char('}')?;
    }

    out.write_char(' ')?;
    write_value(&mut out, metric.value())?;
    out.write_char('\n')?;

    Ok(out.bytes)
}

/// Byte length of [`encode_metric`]'s output for this metric.
pub fn measure_metric<const L: usize, const C: usize>(
    metric: &Metric<'_, L>,
    common: &LabelSet<'_, C>,
) -> usize {
    // A tally without a sink never reports an error.
    encode_metric(metric, common, None).unwrap_or_default()
}

/// Total body length for every registered metric.
pub fn measure_body<const M: usize, const L: usize, const C: usize>(
    registry: &Registry<'_, M, L>,
    common: &LabelSet<'_, C>,
) -> usize {
    registry.iter().map(|m| measure_metric(m, common)).sum()
}

/// Write every registered metric to `sink`, in registry order.
pub fn encode_body<const M: usize, const L: usize, const C: usize>(
    registry: &Registry<'_, M, L>,
    common: &LabelSet<'_, C>,
    sink: &mut dyn Write,
) -> Result<usize, fmt::Error> {
    let mut total = 0;
    for metric in registry.iter() {
        total += encode_metric(metric, common, Some(&mut *sink))?;
    }
    Ok(total)
}

fn write_value(out: &mut dyn Write, value: f32) -> fmt::Result {
    if value.is_nan() {
        out.write_str("NaN")
    } else if value.is_infinite() {
        out.write_str(if value.is_sign_positive() { "+Inf" } else { "-Inf" })
    } else {
        write!(out, "{value:.2}")
    }
}

/// Write `s` as a URL path segment.
///
/// ASCII alphanumerics and `-`, `_`, `.` pass through, a space becomes `_`,
/// and every other byte is percent-encoded with uppercase hex.
pub fn write_url_safe(sink: &mut dyn Write, s: &str) -> fmt::Result {
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            sink.write_char(b as char)?;
        } else if b == b' ' {
            sink.write_char('_')?;
        } else {
            sink.write_char('%')?;
            sink.write_char(HEX[usize::from(b >> 4)] as char)?;
            sink.write_char(HEX[usize::from(b & 0x0f)] as char)?;
        }
    }
    Ok(())
}

/// Allocating convenience over [`write_url_safe`].
pub fn url_safe(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Writing into a String cannot fail.
    let _ = write_url_safe(&mut out, s);
    out
}
