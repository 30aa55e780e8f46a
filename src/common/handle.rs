//! Arena Handles.
//!
//! Every clock, module, port, register and wire in a simulation lives in an
//! arena owned by the simulation root. The rest of the kernel refers to them
//! through the small `Copy` handles defined here instead of pointers, so a
//! handle can be stored in a module, passed around during wiring and
//! dereferenced later without lifetime entanglement.
//!
//! Typed handles (`Port<T>`, `Reg<T>`, `Wire<T>`) carry the value type as a
//! phantom parameter, which makes it impossible to bind a `Port<f64>` to a
//! `Wire<u32>` at compile time.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Values that can travel through ports, wires and registers.
///
/// Anything cloneable with a sensible default qualifies. The default is what
/// an unbound port reads as, and what `Register::reset` restores.
pub trait Signal: Clone + Default + fmt::Debug + 'static {}

impl<T: Clone + Default + fmt::Debug + 'static> Signal for T {}

/// Handle to a clock in the simulation's clock tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockId(pub(crate) usize);

impl ClockId {
    /// Returns the arena index of the clock.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a module slot in the netlist.
///
/// Ordered by declaration, which is also the order in which the kernel runs
/// `connect()` and `init()` hooks and walks a clock's edge registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    /// Returns the arena index of the module.
    pub fn index(self) -> usize {
        self.0
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        pub struct $name<T> {
            pub(crate) index: usize,
            _ty: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) fn new(index: usize) -> Self {
                Self {
                    index,
                    _ty: PhantomData,
                }
            }

            /// Returns the arena index behind this handle.
            pub fn index(self) -> usize {
                self.index
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.index == other.index
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.index.hash(state);
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $kind, self.index)
            }
        }
    };
}

typed_handle!(
    /// Handle to a port carrying values of type `T`.
    Port,
    "Port"
);

typed_handle!(
    /// Handle to a clocked register holding values of type `T`.
    Reg,
    "Reg"
);

typed_handle!(
    /// Handle to a plain data cell of type `T`.
    ///
    /// Wires hold combinational results and constants. They are written by
    /// their owning module's settle phase (or by external code between
    /// macro-steps) and read through ports.
    Wire,
    "Wire"
);

/// Untyped storage location a port can resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    /// A wire cell.
    Wire(usize),
    /// The committed output (`o`) of a register.
    Register(usize),
}

/// Typed data source for a port binding: a wire or a register output.
pub struct Source<T> {
    pub(crate) slot: Slot,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Source<T> {
    pub(crate) fn new(slot: Slot) -> Self {
        Self {
            slot,
            _ty: PhantomData,
        }
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Source<T> {}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({:?})", self.slot)
    }
}

impl<T> From<Wire<T>> for Source<T> {
    fn from(wire: Wire<T>) -> Self {
        Source::new(Slot::Wire(wire.index))
    }
}

impl<T> From<Reg<T>> for Source<T> {
    fn from(reg: Reg<T>) -> Self {
        Source::new(Slot::Register(reg.index))
    }
}
