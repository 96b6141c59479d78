//! User callbacks.

/// Hook called with the connection only.
pub type ConnHook<C> = Box<dyn Fn(&mut C) + Send + Sync>;

/// Hook called with the connection and a text message.
pub type TextHook<C> = Box<dyn Fn(&mut C, String) + Send + Sync>;

/// Hook called with the connection and a binary message.
pub type BinaryHook<C> = Box<dyn Fn(&mut C, Vec<u8>) + Send + Sync>;

/// Optional callbacks bound to a server. A missing one is a no-op.
///
/// `C` is the connection type handed to every hook, a hook may
/// write to it, e.g. to echo a message back.
pub struct Callbacks<C> {
    pub(crate) on_connect: Option<ConnHook<C>>,
    pub(crate) on_disconnect: Option<ConnHook<C>>,
    pub(crate) on_text_message: Option<TextHook<C>>,
    pub(crate) on_binary_message: Option<BinaryHook<C>>,
}

impl<C> Default for Callbacks<C> {
    fn default() -> Self {
        Self {
            on_connect: None,
            on_disconnect: None,
            on_text_message: None,
            on_binary_message: None,
        }
    }
}

impl<C> std::fmt::Debug for Callbacks<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_text_message", &self.on_text_message.is_some())
            .field("on_binary_message", &self.on_binary_message.is_some())
            .finish()
    }
}

impl<C> Callbacks<C> {
    #[inline]
    pub fn new() -> Self { Self::default() }

    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.on_connect = Some(Box::new(f));
        self
    }

    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Box::new(f));
        self
    }

    pub fn on_text_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, String) + Send + Sync + 'static,
    {
        self.on_text_message = Some(Box::new(f));
        self
    }

    pub fn on_binary_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, Vec<u8>) + Send + Sync + 'static,
    {
        self.on_binary_message = Some(Box::new(f));
        self
    }

    #[inline]
    pub(crate) fn connect(&self, conn: &mut C) {
        if let Some(f) = &self.on_connect {
            f(conn);
        }
    }

    #[inline]
    pub(crate) fn disconnect(&self, conn: &mut C) {
        if let Some(f) = &self.on_disconnect {
            f(conn);
        }
    }

    #[inline]
    pub(crate) fn text(&self, conn: &mut C, text: String) {
        if let Some(f) = &self.on_text_message {
            f(conn, text);
        }
    }

    #[inline]
    pub(crate) fn binary(&self, conn: &mut C, data: Vec<u8>) {
        if let Some(f) = &self.on_binary_message {
            f(conn, data);
        }
    }
}
