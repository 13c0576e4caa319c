//! Structured JSON logging with credential redaction.
//!
//! Grounded on `original_source/polymarket/utils/structured_logging.py`.
//! The Python original installs a logging filter that scrubs three shapes
//! before anything reaches a handler: a raw private key (`0x` + 64 hex),
//! `secret|passphrase|password|key` assignments (kept prefix, value
//! replaced), and long base64-looking runs (>= 40 chars, truncated). This
//! module ports those three patterns onto a `tracing_subscriber::Layer` so
//! every log line — not just ones a developer remembers to scrub by hand —
//! goes through the same filter.

use regex::Regex;
use std::sync::LazyLock;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static PRIVATE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[0-9a-fA-F]{64}").expect("valid regex"));

static ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(secret|passphrase|password|\w*key)("?\s*[:=]\s*"?)([^\s",}]+)"#)
        .expect("valid regex")
});

static LONG_BASE64_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/_-]{40,}={0,2}").expect("valid regex"));

/// Redact private keys, credential assignments, and long base64-looking
/// tokens from a log line before it is emitted.
pub fn redact(input: &str) -> String {
    let step1 = PRIVATE_KEY_RE.replace_all(input, "0x[REDACTED]");
    let step2 = ASSIGNMENT_RE.replace_all(&step1, "$1$2[REDACTED]");
    LONG_BASE64_RE
        .replace_all(&step2, |caps: &regex::Captures| {
            let matched = &caps[0];
            format!("{}...[TRUNCATED]", &matched[..matched.len().min(8)])
        })
        .into_owned()
}

/// A `tracing_subscriber::fmt::MakeWriter` wrapper that pipes every
/// formatted line through [`redact`] before it reaches the underlying
/// writer (stdout by default).
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let redacted = redact(&text);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[derive(Clone, Default)]
pub struct RedactingMakeWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<std::io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter { inner: std::io::stdout() }
    }
}

/// Install the crate's structured-logging subscriber as the global default.
/// Respects `RUST_LOG` for filtering, JSON-formats output, and redacts
/// secrets via [`RedactingMakeWriter`]. Call once at process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(RedactingMakeWriter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_private_key() {
        let line = format!("signer key=0x{}", "a".repeat(64));
        let redacted = redact(&line);
        assert!(!redacted.contains(&"a".repeat(64)));
        assert!(redacted.contains("[REDACTED]"));
    }

    #[test]
    fn redacts_secret_assignment() {
        let line = r#"{"secret": "abcdef0123456789"}"#;
        let redacted = redact(line);
        assert!(!redacted.contains("abcdef0123456789"));
    }

    #[test]
    fn redacts_long_base64_run() {
        let token = "A".repeat(50);
        let line = format!("token={token}");
        let redacted = redact(&line);
        assert!(!redacted.contains(&token));
        assert!(redacted.contains("TRUNCATED"));
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let line = "order 123 filled at price 0.55";
        assert_eq!(redact(line), line);
    }
}
