//! Clocked Registers.
//!
//! A register holds two values: `i`, the input staged by its owning module
//! during the settle phase, and `o`, the output that every reader sees. The
//! kernel copies `i` into `o` exactly once per firing edge the register is
//! registered on. Until that commit, a value staged in the current
//! macro-step stays invisible to other modules.

use std::any::Any;

use crate::common::Signal;

/// Two-phase state cell.
///
/// Vectorized registers are plain `Register<[T; N]>` values; stage them in
/// place with `SettleContext::stage_with`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Register<T> {
    /// Staged input.
    pub i: T,
    /// Committed output.
    pub o: T,
}

impl<T: Signal> Register<T> {
    /// Creates a register whose input and output both hold `init`.
    pub fn new(init: T) -> Self {
        Self {
            i: init.clone(),
            o: init,
        }
    }

    /// Makes the staged input visible: `o := i`.
    pub fn commit(&mut self) {
        self.o = self.i.clone();
    }

    /// Presets both input and output to `value`.
    pub fn set(&mut self, value: T) {
        self.i = value.clone();
        self.o = value;
    }

    /// Presets both input and output to the type default.
    pub fn reset(&mut self) {
        self.set(T::default());
    }
}

/// Type-erased view used by the kernel's commit phase.
pub(crate) trait ErasedRegister {
    fn commit(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Signal> ErasedRegister for Register<T> {
    fn commit(&mut self) {
        Register::commit(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_value_is_invisible_until_commit() {
        let mut reg = Register::new(1u32);
        reg.i = 7;
        assert_eq!(reg.o, 1);
        reg.commit();
        assert_eq!(reg.o, 7);
    }

    #[test]
    fn set_and_reset_preset_both_sides() {
        let mut reg = Register::new(0i64);
        reg.set(-3);
        assert_eq!((reg.i, reg.o), (-3, -3));
        reg.reset();
        assert_eq!((reg.i, reg.o), (0, 0));
    }

    #[test]
    fn erased_commit_reaches_typed_register() {
        let mut boxed: Box<dyn ErasedRegister> = Box::new(Register::new([0u8; 4]));
        if let Some(reg) = boxed.as_any_mut().downcast_mut::<Register<[u8; 4]>>() {
            reg.i[2] = 9;
        }
        boxed.commit();
        let reg = boxed.as_any().downcast_ref::<Register<[u8; 4]>>().unwrap();
        assert_eq!(reg.o, [0, 0, 9, 0]);
    }
}
