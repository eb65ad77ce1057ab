//! Configuration and limits for the WebSocket server layer.

/// Default value of the `Server:` handshake response header.
pub const DEFAULT_SERVER_NAME: &str = "wsdispatch";

/// Size limits applied to inbound data.
///
/// These limits prevent resource exhaustion attacks and ensure
/// bounded memory usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a single frame in bytes, header included.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of handshake data in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_handshake_size: usize) -> Self {
        Self {
            max_frame_size,
            max_handshake_size,
        }
    }

    /// Validate that frame size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`](crate::Error::FrameTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_frame_size {
            Err(crate::Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Shape of the inbound bytes handed over by the transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboundFormat {
    /// One complete RFC 6455 frame as it appeared on the wire.
    #[default]
    Wire,
    /// Already decoded by the collaborator: `[finish, opcode, payload...]`.
    Predecoded,
}

/// What happens when an application handler reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log and return [`Error::HandlerFailed`](crate::Error::HandlerFailed);
    /// the worker continues with the next event.
    #[default]
    Report,
    /// Return [`Error::Fatal`](crate::Error::Fatal) so the embedder can stop
    /// the worker.
    Escalate,
}

/// WebSocket server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value of the `Server:` header in the handshake response.
    ///
    /// Default: `"wsdispatch"`
    pub server_name: String,

    /// Resource limits.
    pub limits: Limits,

    /// Format of inbound frame bytes.
    ///
    /// Default: [`InboundFormat::Wire`]
    pub inbound: InboundFormat,

    /// Handler failure policy.
    ///
    /// Default: [`FailurePolicy::Report`]
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            limits: Limits::default(),
            inbound: InboundFormat::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server identification header value.
    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the inbound frame format.
    #[must_use]
    pub fn with_inbound(mut self, inbound: InboundFormat) -> Self {
        self.inbound = inbound;
        self
    }

    /// Set the handler failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
