//! Minimal observer-pattern cell used by every editable field.
//!
//! An [`Observable`] owns a value and a list of subscribers. Writes go through
//! [`Observable::set`], which consults the cell's [`Notify`] policy to decide
//! whether subscribers hear about it. Subscriptions are RAII handles: dropping
//! the [`Subscription`] detaches the callback.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`), matching the browser
//! event loop the editor runs on.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// When a write should reach subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Only when the new value differs from the stored one.
    OnChange,
    /// On every write, even if the value is identical.
    Always,
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: RefCell<T>,
    policy: Notify,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_id: Cell<u64>,
}

/// Shared, observable value cell. Cloning yields another handle to the same cell.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a cell that notifies only on actual changes.
    pub fn new(value: T) -> Self {
        Self::with_policy(value, Notify::OnChange)
    }

    pub fn with_policy(value: T, policy: Notify) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                policy,
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Current value (cloned).
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value`; returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        let changed = *self.inner.value.borrow() != value;
        *self.inner.value.borrow_mut() = value;
        if changed || self.inner.policy == Notify::Always {
            self.notify();
            true
        } else {
            false
        }
    }

    /// Notify every subscriber with the current value, regardless of policy.
    pub fn notify(&self) {
        let value = self.get();
        // Snapshot the list so callbacks may subscribe/unsubscribe re-entrantly.
        let subscribers: Vec<Callback<T>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in subscribers {
            cb(&value);
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));

        let weak: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Identity of the underlying cell, stable across clones.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

/// Handle keeping a subscription alive. Dropping it unsubscribes.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keep the callback attached for the lifetime of the cell.
    pub fn forget(mut self) {
        self.detach = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}
