// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed publish/subscribe for lifecycle events.
//!
//! Listeners are kept per event key in subscription order. Dispatch runs
//! over a snapshot of the list taken when `emit` starts, so listeners may
//! subscribe or unsubscribe (themselves or others) while being called.

use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

type Listener<P> = Rc<dyn Fn(&P)>;

/// Identity of one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerId(u64);

struct ListenerTable<K, P> {
    next_id: u64,
    events: IndexMap<K, Vec<(ListenerId, Listener<P>)>>,
}

impl<K: Copy + Eq + Hash, P> ListenerTable<K, P> {
    fn allocate_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    fn remove(&mut self, event: K, id: ListenerId) {
        if let Some(listeners) = self.events.get_mut(&event) {
            listeners.retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

/// Remove a listener through a weak table handle; no-op once the emitter is gone
fn remove_listener<K: Copy + Eq + Hash, P>(
    table: &Weak<RefCell<ListenerTable<K, P>>>,
    event: K,
    id: ListenerId,
) {
    if let Some(table) = table.upgrade() {
        table.borrow_mut().remove(event, id);
    }
}

/// Event hub keyed by `K`, delivering `&P` to every listener
pub struct Emitter<K, P> {
    table: Rc<RefCell<ListenerTable<K, P>>>,
}

impl<K, P> Emitter<K, P>
where
    K: Copy + Eq + Hash + 'static,
    P: 'static,
{
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self {
            table: Rc::new(RefCell::new(ListenerTable {
                next_id: 0,
                events: IndexMap::new(),
            })),
        }
    }

    /// Subscribe `callback` to `event`
    pub fn on(&self, event: K, callback: impl Fn(&P) + 'static) -> Subscription {
        let listener: Listener<P> = Rc::new(callback);
        self.subscribe_with(event, move |_| listener)
    }

    /// Subscribe `callback` to the next delivery of `event` only.
    ///
    /// The listener removes itself before `callback` runs.
    pub fn once(&self, event: K, callback: impl Fn(&P) + 'static) -> Subscription {
        let table = Rc::downgrade(&self.table);
        self.subscribe_with(event, move |id| {
            let fired = Cell::new(false);
            let listener: Listener<P> = Rc::new(move |payload: &P| {
                if fired.replace(true) {
                    return;
                }
                remove_listener(&table, event, id);
                callback(payload);
            });
            listener
        })
    }

    /// Deliver `payload` to every listener of `event`, in subscription order.
    ///
    /// A panicking listener stops delivery to the listeners after it.
    pub fn emit(&self, event: K, payload: &P) {
        let snapshot: Vec<Listener<P>> = match self.table.borrow().events.get(&event) {
            Some(listeners) => listeners.iter().map(|(_, l)| Rc::clone(l)).collect(),
            None => return,
        };

        for listener in snapshot {
            listener(payload);
        }
    }

    /// Drop every subscription for every event
    pub fn clear_events(&self) {
        self.table.borrow_mut().events.clear();
    }

    /// Number of listeners currently subscribed to `event`
    pub fn listener_count(&self, event: K) -> usize {
        self.table
            .borrow()
            .events
            .get(&event)
            .map_or(0, Vec::len)
    }

    fn subscribe_with(
        &self,
        event: K,
        make: impl FnOnce(ListenerId) -> Listener<P>,
    ) -> Subscription {
        let id = self.table.borrow_mut().allocate_id();
        let listener = make(id);
        self.table
            .borrow_mut()
            .events
            .entry(event)
            .or_default()
            .push((id, listener));

        let table = Rc::downgrade(&self.table);
        Subscription {
            cancel: Rc::new(move || remove_listener(&table, event, id)),
        }
    }
}

impl<K, P> Default for Emitter<K, P>
where
    K: Copy + Eq + Hash + 'static,
    P: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, P> fmt::Debug for Emitter<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.borrow();
        f.debug_map()
            .entries(table.events.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

/// Handle returned by [`Emitter::on`] and [`Emitter::once`].
///
/// Dropping it leaves the listener registered; call [`Subscription::unsubscribe`]
/// to remove it.
#[derive(Clone)]
pub struct Subscription {
    cancel: Rc<dyn Fn()>,
}

impl Subscription {
    /// Remove the listener this subscription was created for.
    /// Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}

/// Shared lifecycle callback stored in option structs
pub struct Callback<T: ?Sized>(Rc<dyn Fn(&T)>);

impl<T: ?Sized> Callback<T> {
    /// Wrap a closure
    pub fn new(f: impl Fn(&T) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the callback
    pub fn call(&self, arg: &T) {
        (self.0)(arg);
    }
}

impl<T: ?Sized> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}
