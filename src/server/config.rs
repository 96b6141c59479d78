//! Server configuration.

/// 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 << 20;

/// 64 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 20;

/// Capacity of the read and write buffers of a connection.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Settings shared by every connection of a server.
///
/// Built once, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Supported sub-protocols, most preferred first.
    pub protocols: Vec<String>,
    pub max_frame_size: usize,
    pub max_message_size: usize,
    /// Answer a close frame with a close frame before closing.
    pub reply_close: bool,
    pub buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocols: Vec::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            reply_close: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Append a supported sub-protocol, after the ones added before.
    #[inline]
    pub fn protocol(mut self, name: impl Into<String>) -> Self {
        self.protocols.push(name.into());
        self
    }

    #[inline]
    pub fn protocols<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols.extend(names.into_iter().map(Into::into));
        self
    }

    #[inline]
    pub fn max_frame_size(mut self, n: usize) -> Self {
        self.max_frame_size = n;
        self
    }

    #[inline]
    pub fn max_message_size(mut self, n: usize) -> Self {
        self.max_message_size = n;
        self
    }

    #[inline]
    pub fn reply_close(mut self, yes: bool) -> Self {
        self.reply_close = yes;
        self
    }

    #[inline]
    pub fn buffer_size(mut self, n: usize) -> Self {
        self.buffer_size = n;
        self
    }
}
