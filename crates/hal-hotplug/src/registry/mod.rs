//! # Subsystem Handler Registry
//!
//! Maps a subsystem name to its `DeviceHandler`. Built once at startup and
//! handed to the engine by value; nothing mutates it afterwards.
//!
//! Lookup is a linear scan in registration order and the first match
//! wins, so `register` refuses duplicate names.

pub mod classdev;
pub mod handler;

pub use classdev::{BluetoothHandler, InputHandler, INPUT_PROBER};
pub use handler::{AddRequest, DeviceHandler, DeviceOrigin};

use crate::domain::errors::RegistryError;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn DeviceHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in class device handlers.
    pub fn with_builtin_handlers() -> Self {
        Self {
            handlers: vec![Box::new(InputHandler), Box::new(BluetoothHandler)],
        }
    }

    pub fn register(&mut self, handler: Box<dyn DeviceHandler>) -> Result<(), RegistryError> {
        if self.lookup(handler.subsystem()).is_some() {
            return Err(RegistryError::DuplicateSubsystem {
                subsystem: handler.subsystem().to_string(),
            });
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// Builder-style `register`.
    pub fn with_handler(mut self, handler: Box<dyn DeviceHandler>) -> Result<Self, RegistryError> {
        self.register(handler)?;
        Ok(self)
    }

    pub fn lookup(&self, subsystem: &str) -> Option<&dyn DeviceHandler> {
        self.handlers
            .iter()
            .find(|h| h.subsystem() == subsystem)
            .map(|h| h.as_ref())
    }

    /// Registered subsystem names, in registration order.
    pub fn subsystems(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.subsystem())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.subsystems()).finish()
    }
}
