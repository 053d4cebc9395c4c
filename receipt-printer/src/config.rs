//! Printer configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | PRINTER_HOST | (none) | Printer host name or IP |
//! | PRINTER_PORT | 9100 | Raw printing port |
//! | PRINTER_DOT_WIDTH | 576 | Print head width in dots (576 = 80mm, 384 = 58mm) |
//! | PRINTER_CONNECT_TIMEOUT_MS | 5000 | Connect timeout |
//! | PRINTER_SEND_TIMEOUT_MS | 10000 | Per-send timeout |
//! | PRINTER_ENCODING | raster | `raster` (GS v 0) or `strip` (ESC *) |
//! | PRINTER_CUT | true | Cut the paper after the image |
//!
//! Unset or unparseable values fall back to the default.

use crate::error::ConnectionError;
use crate::job::Encoding;
use crate::session::SessionOptions;
use crate::transport::DEFAULT_PORT;
use std::time::Duration;

/// Dot width of an 80mm print head
pub const DEFAULT_DOT_WIDTH: u32 = 576;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    pub host: String,
    pub port: u16,
    /// Bitmaps are scaled to this width before encoding
    pub dot_width: u32,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub encoding: Encoding,
    /// Send a full cut after the image
    pub cut: bool,
}

impl PrinterConfig {
    /// Config for `host` with every other field at its default
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SessionOptions::default();
        Self {
            host: lookup("PRINTER_HOST").unwrap_or_default(),
            port: lookup("PRINTER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            dot_width: lookup("PRINTER_DOT_WIDTH")
                .and_then(|w| w.parse().ok())
                .unwrap_or(DEFAULT_DOT_WIDTH),
            connect_timeout: lookup("PRINTER_CONNECT_TIMEOUT_MS")
                .and_then(|t| t.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            send_timeout: lookup("PRINTER_SEND_TIMEOUT_MS")
                .and_then(|t| t.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.send_timeout),
            encoding: lookup("PRINTER_ENCODING")
                .and_then(|e| e.parse().ok())
                .unwrap_or_default(),
            cut: lookup("PRINTER_CUT")
                .and_then(|c| c.parse().ok())
                .unwrap_or(true),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_dot_width(mut self, dot_width: u32) -> Self {
        self.dot_width = dot_width;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_cut(mut self, cut: bool) -> Self {
        self.cut = cut;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, send: Duration) -> Self {
        self.connect_timeout = connect;
        self.send_timeout = send;
        self
    }

    /// `host:port` for logging
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            connect_timeout: self.connect_timeout,
            send_timeout: self.send_timeout,
        }
    }

    /// Check the fields a print job needs
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.host.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig("printer host is empty".into()));
        }
        if self.port == 0 {
            return Err(ConnectionError::InvalidConfig("printer port is 0".into()));
        }
        if self.dot_width == 0 {
            return Err(ConnectionError::InvalidConfig("dot width is 0".into()));
        }
        Ok(())
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl From<&PrinterConfig> for SessionOptions {
    fn from(config: &PrinterConfig) -> Self {
        config.session_options()
    }
}
