//! Single-shot promise primitives handed to script code.
//!
//! A `Promise` is the observable side; its `Resolver` is move-only, so a settlement can
//! happen at most once. Dropping an unsettled resolver rejects the promise with an
//! `AbortError`, so no promise is ever left pending once its owner goes away.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ports::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromiseState<T> {
    Pending,
    Fulfilled(T),
    Rejected(PaymentError),
}

type Slot<T> = Rc<RefCell<PromiseState<T>>>;

pub struct Promise<T> {
    slot: Slot<T>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise").field(&*self.slot.borrow()).finish()
    }
}

impl<T> Promise<T> {
    pub fn new() -> (Promise<T>, Resolver<T>) {
        let slot = Rc::new(RefCell::new(PromiseState::Pending));
        (
            Promise {
                slot: Rc::clone(&slot),
            },
            Resolver { slot: Some(slot) },
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.borrow(), PromiseState::Pending)
    }

    pub fn rejected_error(&self) -> Option<PaymentError> {
        match &*self.slot.borrow() {
            PromiseState::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Promise<T> {
    pub fn state(&self) -> PromiseState<T> {
        self.slot.borrow().clone()
    }

    pub fn fulfilled(&self) -> Option<T> {
        match &*self.slot.borrow() {
            PromiseState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }
}

pub struct Resolver<T> {
    slot: Option<Slot<T>>,
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("armed", &self.slot.is_some())
            .finish()
    }
}

impl<T> Resolver<T> {
    pub fn resolve(mut self, value: T) {
        self.settle(PromiseState::Fulfilled(value));
    }

    pub fn reject(mut self, error: PaymentError) {
        self.settle(PromiseState::Rejected(error));
    }

    fn settle(&mut self, outcome: PromiseState<T>) {
        if let Some(slot) = self.slot.take() {
            let mut state = slot.borrow_mut();
            if matches!(*state, PromiseState::Pending) {
                *state = outcome;
            }
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        self.settle(PromiseState::Rejected(PaymentError::Abort(
            "the payment request was torn down".to_owned(),
        )));
    }
}
