use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::errors::DecodeError;
use crate::value::{ObjectFrame, TypePath, Value};

/// Rebuilds a live instance from a decoded state payload.
pub type Reconstructor = fn(Value, &Registry) -> Result<Box<dyn Any>, DecodeError>;

/// Decoding side of [`StateProtocol`](crate::resolver::StateProtocol).
pub trait Reconstruct: Sized + 'static {
    /// Type identity this reconstructor answers to.
    fn type_path() -> TypePath;

    /// Rebuilds an instance from its state. Nested objects inside `state` are
    /// still literal frames; use [`Registry::reconstruct`] on them.
    fn from_state(state: Value, registry: &Registry) -> Result<Self, DecodeError>;
}

fn boxed<T: Reconstruct>(state: Value, registry: &Registry) -> Result<Box<dyn Any>, DecodeError> {
    Ok(Box::new(T::from_state(state, registry)?))
}

/// Caller-supplied mapping from type path to reconstructor.
///
/// Read-only while a decode call runs. Entries are plain function pointers,
/// so a registry can be shared across threads.
#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<TypePath, Reconstructor>,
}

impl Registry {
    /// Empty registry: every `Object` frame fails with `UnknownType`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under [`Reconstruct::type_path`].
    pub fn register<T: Reconstruct>(&mut self) -> &mut Self {
        self.entries.insert(T::type_path(), boxed::<T>);
        self
    }

    /// Registers an ad-hoc reconstructor.
    pub fn register_fn(&mut self, path: TypePath, reconstructor: Reconstructor) -> &mut Self {
        self.entries.insert(path, reconstructor);
        self
    }

    /// True when `path` has a reconstructor.
    pub fn contains(&self, path: &TypePath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuilds the instance described by `frame`.
    pub fn reconstruct_frame(&self, frame: ObjectFrame) -> Result<Box<dyn Any>, DecodeError> {
        let Some(reconstructor) = self.entries.get(&frame.path) else {
            debug!(path = %frame.path, "no reconstructor registered");
            return Err(DecodeError::UnknownType(frame.path));
        };
        reconstructor(*frame.payload, self)
    }

    /// Rebuilds a nested `Object` value as a `T`.
    pub fn reconstruct<T: 'static>(&self, value: Value) -> Result<T, DecodeError> {
        let frame = match value {
            Value::Object(frame) => frame,
            other => {
                return Err(DecodeError::Extract(format!(
                    "expected object, found {}",
                    other.kind()
                )))
            }
        };
        let path = frame.path.clone();
        self.reconstruct_frame(frame)?
            .downcast::<T>()
            .map(|instance| *instance)
            .map_err(|_| DecodeError::State {
                path,
                reason: format!("reconstructor did not produce {}", std::any::type_name::<T>()),
            })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.entries.keys().map(ToString::to_string).collect();
        paths.sort();
        f.debug_struct("Registry").field("types", &paths).finish()
    }
}
