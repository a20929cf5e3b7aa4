//! Synchronous, reentrant dispatch on the posting thread.
//!
//! A handler that posts another event while being invoked must not recurse
//! into dispatch immediately (that would deliver the nested event before
//! the current one has finished reaching all of its subscribers). Instead
//! the nested post is queued on this thread and drained breadth-first once
//! the outermost dispatch finishes, preserving the posting order a caller
//! would expect.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::event::Event;
use crate::exception::SubscriberExceptionHandler;
use crate::interceptor::InterceptorChain;
use crate::processor::process;
use crate::registry::Subscriber;

thread_local! {
    static QUEUE: RefCell<VecDeque<(Vec<Subscriber>, Arc<dyn Event>)>> = RefCell::new(VecDeque::new());
    static DISPATCHING: Cell<bool> = Cell::new(false);
}

pub(crate) fn dispatch(
    subscribers: Vec<Subscriber>,
    event: Arc<dyn Event>,
    bus_identifier: &str,
    interceptors: &InterceptorChain,
    exception_handler: &dyn SubscriberExceptionHandler,
) {
    QUEUE.with(|queue| queue.borrow_mut().push_back((subscribers, event)));

    if DISPATCHING.with(Cell::get) {
        // A dispatch further up the call stack on this thread owns the
        // drain loop; it will pick this entry up.
        return;
    }

    DISPATCHING.with(|flag| flag.set(true));
    let cancelled = AtomicBool::new(false);
    loop {
        let next = QUEUE.with(|queue| queue.borrow_mut().pop_front());
        let Some((subscribers, event)) = next else {
            break;
        };
        for subscriber in &subscribers {
            process(subscriber, &event, bus_identifier, &cancelled, interceptors, exception_handler);
        }
    }
    DISPATCHING.with(|flag| flag.set(false));
}
