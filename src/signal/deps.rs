//! Conversions accepted wherever "one or many" dependencies are expected.

use super::state::Signal;

/// Anything that can be observed as a [`Signal`].
pub trait AsSignal {
    /// Returns a handle sharing the underlying state.
    fn as_signal(&self) -> Signal;
}

impl AsSignal for Signal {
    fn as_signal(&self) -> Signal {
        self.clone()
    }
}

impl<T: AsSignal + ?Sized> AsSignal for &T {
    fn as_signal(&self) -> Signal {
        (**self).as_signal()
    }
}

/// One or many dependencies.
///
/// Implemented for single signal-like values (by value or reference) and for
/// `Vec`s, slices and arrays of them.
pub trait Dependencies {
    fn into_signals(self) -> Vec<Signal>;
}

impl Dependencies for Signal {
    fn into_signals(self) -> Vec<Signal> {
        vec![self]
    }
}

impl Dependencies for &Signal {
    fn into_signals(self) -> Vec<Signal> {
        vec![self.clone()]
    }
}

impl<T: AsSignal> Dependencies for Vec<T> {
    fn into_signals(self) -> Vec<Signal> {
        self.iter().map(AsSignal::as_signal).collect()
    }
}

impl<T: AsSignal> Dependencies for &[T] {
    fn into_signals(self) -> Vec<Signal> {
        self.iter().map(AsSignal::as_signal).collect()
    }
}

impl<T: AsSignal, const N: usize> Dependencies for [T; N] {
    fn into_signals(self) -> Vec<Signal> {
        self.iter().map(AsSignal::as_signal).collect()
    }
}
