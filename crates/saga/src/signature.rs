//! Positional type signatures for step outputs and compensation parameters.
//!
//! A compensation receives, after its context, exactly the values its forward
//! function returned. The two functions are registered independently and the
//! values travel through the log as JSON, so nothing ties their types together
//! at compile time. Instead each side describes itself as a [`Signature`] and
//! the two are compared once, when the step is added to a saga.

use std::any::TypeId;

use crate::error::ConfigurationError;

/// One position in a signature.
#[derive(Debug, Clone, Copy)]
pub struct TypeSlot {
    id: TypeId,
    name: &'static str,
}

impl TypeSlot {
    /// Describes the type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type's name, for messages.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeSlot {}

/// Ordered list of the types a function returns or accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    slots: Vec<TypeSlot>,
}

impl Signature {
    /// Creates a signature from its slots, in order.
    pub fn new(slots: Vec<TypeSlot>) -> Self {
        Self { slots }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the signature has no positions.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slots, in order.
    pub fn slots(&self) -> &[TypeSlot] {
        &self.slots
    }

    /// Checks that a compensation with parameters `compensate` can be called
    /// with the values of a forward function returning `forward`.
    pub fn check_compatible(
        forward: &Signature,
        compensate: &Signature,
    ) -> Result<(), ConfigurationError> {
        if forward.len() != compensate.len() {
            return Err(ConfigurationError::ArityMismatch {
                forward: forward.clone(),
                compensate: compensate.clone(),
            });
        }

        for (i, (out, param)) in forward.slots.iter().zip(&compensate.slots).enumerate() {
            if out != param {
                return Err(ConfigurationError::ParameterMismatch {
                    position: i + 1,
                    forward: out.name(),
                    compensate: param.name(),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", slot.name())?;
        }
        write!(f, ")")
    }
}
