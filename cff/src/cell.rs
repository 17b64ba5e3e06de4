use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// A once-set value slot shared between a producer job and its consumers.
///
/// Generated code declares one `Cell` per produced type, writes it from the
/// producing job, and reads it from consuming jobs. The scheduler's dependency
/// edges guarantee the producer finished before any consumer starts, so a
/// consumer reading an unset cell means the producer was skipped; in that case
/// the type's default value propagates, matching the behavior of a gated task
/// whose dependents still run.
#[derive(Debug, Default)]
pub struct Cell<T> {
    slot: OnceLock<T>,
}

impl<T> Cell<T> {
    pub fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Store the produced value. Generated code calls this exactly once.
    pub fn set(&self, value: T) {
        if self.slot.set(value).is_err() {
            panic!("cff: value produced twice for the same cell");
        }
    }

    /// True if a value was produced.
    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T: Clone + Default> Cell<T> {
    /// Read the produced value, or the type's default if the producer
    /// was skipped.
    pub fn get_cloned(&self) -> T {
        self.slot.get().cloned().unwrap_or_default()
    }
}

impl<T: Default> Cell<T> {
    /// Take the produced value out of the cell, or the type's default if the
    /// producer was skipped. Used for flow results assignment.
    pub fn take(&mut self) -> T {
        self.slot.take().unwrap_or_default()
    }
}

/// Atomic flag recording whether a task body actually ran.
/// Generated code uses it to report skipped tasks after the scheduler stops.
#[derive(Debug, Default)]
pub struct Flag {
    flag: AtomicBool,
}

impl Flag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, v: bool) {
        self.flag.store(v, Ordering::Release);
    }

    pub fn load(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unset_cell_propagates_default() {
        let cell: Cell<u32> = Cell::new();
        assert!(!cell.is_set());
        assert_eq!(0, cell.get_cloned());

        let mut cell: Cell<String> = Cell::new();
        assert_eq!("", cell.take());
    }

    #[test]
    fn test_set_then_read() {
        let mut cell = Cell::new();
        cell.set(7u32);
        assert!(cell.is_set());
        assert_eq!(7, cell.get_cloned());
        assert_eq!(7, cell.take());
        assert_eq!(0, cell.take());
    }

    #[test]
    #[should_panic(expected = "produced twice")]
    fn test_double_set_panics() {
        let cell = Cell::new();
        cell.set(1u8);
        cell.set(2u8);
    }
}
