use crate::core::frame::MessageType;
use crate::error::constants::{ERR_DISPATCHER_READ_LOCK, ERR_DISPATCHER_WRITE_LOCK};
use crate::error::{ProtocolError, Result};
use crate::protocol::message::{Message, Payload};
use crate::utils::metrics::global_metrics;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

type Callback = dyn Fn(&Message) -> bool + Send + Sync + 'static;
type DecodeFn = fn(&[u8]) -> Result<Message>;

fn decode_as<P: Payload>(data: &[u8]) -> Result<Message> {
    P::decode(data).map(Into::into)
}

/// Decoder plus callback for one message type.
///
/// The callback returns `true` when it handled the message successfully.
pub struct Handler {
    message_type: MessageType,
    /// `None` hands the payload through as [`Message::Raw`]
    decoder: Option<DecodeFn>,
    callback: Arc<Callback>,
}

impl Handler {
    /// Handler for a built-in payload type
    pub fn new<P, F>(callback: F) -> Self
    where
        P: Payload,
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self {
            message_type: P::MESSAGE_TYPE,
            decoder: Some(decode_as::<P>),
            callback: Arc::new(callback),
        }
    }

    /// Handler for an application-defined type. The callback sees the payload
    /// bytes as a [`Message::Raw`].
    pub fn raw<F>(message_type: MessageType, callback: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self {
            message_type,
            decoder: None,
            callback: Arc::new(callback),
        }
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Message> {
        match self.decoder {
            Some(decode) => decode(payload),
            None => Ok(Message::Raw {
                message_type: self.message_type,
                payload: payload.to_vec(),
            }),
        }
    }

    /// Decode `payload` and run the callback on it
    pub fn handle(&self, payload: &[u8]) -> Result<bool> {
        let message = self.decode(payload)?;
        Ok((self.callback)(&message))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("message_type", &self.message_type)
            .field("raw", &self.decoder.is_none())
            .finish_non_exhaustive()
    }
}

/// Routes payloads to the handler registered for their message type.
///
/// Handlers are reference counted. `dispatch` takes its own handle under the read
/// lock and runs the callback after releasing it, so a handler unregistered
/// mid-dispatch stays alive until that call returns, and callbacks may register
/// or unregister handlers themselves.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<MessageType, Arc<Handler>>>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.handlers.read().map(|h| h.len()).ok();
        f.debug_struct("Dispatcher")
            .field("handler_count", &count)
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<MessageType, Arc<Handler>>>> {
        self.handlers
            .read()
            .map_err(|_| ProtocolError::LockPoisoned(ERR_DISPATCHER_READ_LOCK))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<MessageType, Arc<Handler>>>> {
        self.handlers
            .write()
            .map_err(|_| ProtocolError::LockPoisoned(ERR_DISPATCHER_WRITE_LOCK))
    }

    /// Store `handler`. An existing registration is kept and
    /// `DuplicateRegistration` returned.
    pub fn register_handler(&self, handler: Handler) -> Result<()> {
        let message_type = handler.message_type();
        let mut handlers = self.write()?;

        if handlers.contains_key(&message_type) {
            warn!(%message_type, "handler already registered");
            return Err(ProtocolError::DuplicateRegistration(message_type));
        }

        handlers.insert(message_type, Arc::new(handler));
        debug!(%message_type, "handler registered");
        Ok(())
    }

    /// Shorthand for `register_handler(Handler::new::<P>(callback))`
    pub fn register<P, F>(&self, callback: F) -> Result<()>
    where
        P: Payload,
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.register_handler(Handler::new::<P, F>(callback))
    }

    /// Remove the handler for `message_type`; `Ok(false)` if none was registered
    pub fn unregister_handler(&self, message_type: MessageType) -> Result<bool> {
        let removed = self.write()?.remove(&message_type).is_some();
        if removed {
            debug!(%message_type, "handler unregistered");
        }
        Ok(removed)
    }

    pub fn get_handler(&self, message_type: MessageType) -> Result<Option<Arc<Handler>>> {
        Ok(self.read()?.get(&message_type).cloned())
    }

    /// Decode `payload` with the handler for `message_type` and invoke its callback.
    ///
    /// Returns the callback's result. An unmapped type yields `NoHandlerRegistered`
    /// and a payload the handler cannot decode yields `MalformedPayload`; neither
    /// changes the registry.
    pub fn dispatch(&self, message_type: MessageType, payload: &[u8]) -> Result<bool> {
        let metrics = global_metrics();

        let Some(handler) = self.get_handler(message_type)? else {
            metrics.unrouted_message();
            warn!(%message_type, "no handler registered");
            return Err(ProtocolError::NoHandlerRegistered(message_type));
        };

        match handler.handle(payload) {
            Ok(handled) => {
                metrics.message_dispatched();
                if !handled {
                    metrics.dispatch_failure();
                    debug!(%message_type, "handler reported failure");
                }
                Ok(handled)
            }
            Err(e) => {
                metrics.malformed_payload();
                warn!(%message_type, error = %e, "payload rejected by handler");
                Err(e)
            }
        }
    }

    pub fn handler_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn has_handler(&self, message_type: MessageType) -> Result<bool> {
        Ok(self.read()?.contains_key(&message_type))
    }

    /// Drop every registration
    pub fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}
