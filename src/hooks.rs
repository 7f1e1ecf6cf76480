//! User-data lifecycle hooks
//!
//! A tree carries one immutable [`DataHooks`] value wired into three node
//! lifecycle events: `initial` produces the payload for every new leaf or
//! aggregate, `add` fires when a hit lands on a node that already existed
//! before the call, and `aggregate` fires when collapsed leaves fold into a
//! new aggregate. Hooks receive user data only, never the tree, so they
//! cannot mutate tree structure.

use std::fmt;

/// Produces the payload for a new leaf or aggregate
pub type InitialHook<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Fired when a hit lands on a pre-existing node
pub type AddHook<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Fired with the new aggregate's payload and the collapsed leaves' payloads
pub type AggregateHook<T> = Box<dyn Fn(&mut T, Vec<T>) + Send + Sync>;

/// Immutable set of user-data callables for one tree
///
/// All three hooks are optional. Without `initial` the tree attaches no
/// payload to its nodes and the other two hooks never fire (there is no
/// data to mutate).
///
/// ```rust
/// use nettally::DataHooks;
///
/// let hooks: DataHooks<u64> = DataHooks::new()
///     .on_initial(|| 1)
///     .on_add(|count| *count += 1);
/// ```
pub struct DataHooks<T> {
    pub(crate) initial: Option<InitialHook<T>>,
    pub(crate) add: Option<AddHook<T>>,
    pub(crate) aggregate: Option<AggregateHook<T>>,
}

impl<T> DataHooks<T> {
    /// Empty hook set: nodes carry no user data
    pub fn new() -> Self {
        Self {
            initial: None,
            add: None,
            aggregate: None,
        }
    }

    /// Set the `initial` hook
    pub fn on_initial(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.initial = Some(Box::new(f));
        self
    }

    /// Set the `add` hook
    pub fn on_add(mut self, f: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        self.add = Some(Box::new(f));
        self
    }

    /// Set the `aggregate` hook
    pub fn on_aggregate(mut self, f: impl Fn(&mut T, Vec<T>) + Send + Sync + 'static) -> Self {
        self.aggregate = Some(Box::new(f));
        self
    }

    /// Payload for a freshly created leaf or aggregate
    pub(crate) fn initial_data(&self) -> Option<T> {
        self.initial.as_ref().map(|f| f())
    }

    /// Run the `add` hook against a node's payload, if both exist
    pub(crate) fn fire_add(&self, data: &mut Option<T>) {
        if let (Some(hook), Some(data)) = (self.add.as_ref(), data.as_mut()) {
            hook(data);
        }
    }

    /// Run the `aggregate` hook against a new aggregate's payload
    pub(crate) fn fire_aggregate(&self, data: &mut Option<T>, from: Vec<T>) {
        if let (Some(hook), Some(data)) = (self.aggregate.as_ref(), data.as_mut()) {
            hook(data, from);
        }
    }
}

impl<T> Default for DataHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DataHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataHooks")
            .field("initial", &self.initial.is_some())
            .field("add", &self.add.is_some())
            .field("aggregate", &self.aggregate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_hooks_are_noops() {
        let hooks: DataHooks<u64> = DataHooks::new();
        assert_eq!(hooks.initial_data(), None);

        let mut data = None;
        hooks.fire_add(&mut data);
        hooks.fire_aggregate(&mut data, Vec::new());
        assert_eq!(data, None);
    }

    #[test]
    fn test_hooks_fire_in_order() {
        let hooks: DataHooks<u64> = DataHooks::new()
            .on_initial(|| 1)
            .on_add(|v| *v += 1)
            .on_aggregate(|into, from| *into = from.into_iter().max().unwrap_or(*into));

        let mut data = hooks.initial_data();
        assert_eq!(data, Some(1));
        hooks.fire_add(&mut data);
        assert_eq!(data, Some(2));
        hooks.fire_aggregate(&mut data, vec![7, 3]);
        assert_eq!(data, Some(7));
    }
}
