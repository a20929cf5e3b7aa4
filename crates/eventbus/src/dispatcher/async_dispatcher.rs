//! Asynchronous dispatch onto the shared worker pool.
//!
//! Unless a handler group opted in with `.concurrent(true)`, its
//! invocations for a given listener run one at a time, in posting order, on
//! a "lane" — a small FIFO queue paired with a flag that keeps at most one
//! worker draining it. This gives FIFO-per-subscriber delivery without
//! blocking the pool on a slow subscriber the way a single shared queue
//! position would.

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatcher::worker_pool::WorkerPool;
use crate::event::Event;
use crate::exception::SubscriberExceptionHandler;
use crate::handler::ListenerId;
use crate::interceptor::InterceptorChain;
use crate::processor::process;
use crate::registry::Subscriber;

struct Lane {
    subscriber: Subscriber,
    queue: Mutex<VecDeque<Arc<dyn Event>>>,
    scheduled: AtomicBool,
}

impl Lane {
    fn new(subscriber: Subscriber) -> Self {
        Self {
            subscriber,
            queue: Mutex::new(VecDeque::new()),
            scheduled: AtomicBool::new(false),
        }
    }
}

pub(crate) struct AsyncDispatcher {
    pool: Arc<WorkerPool>,
    lanes: Mutex<HashMap<(ListenerId, Option<TypeId>), Arc<Lane>>>,
}

impl AsyncDispatcher {
    pub(crate) fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn dispatch(
        &self,
        subscribers: Vec<Subscriber>,
        event: Arc<dyn Event>,
        bus_identifier: Arc<str>,
        cancelled: Arc<AtomicBool>,
        interceptors: InterceptorChain,
        exception_handler: Arc<dyn SubscriberExceptionHandler>,
    ) {
        for subscriber in subscribers {
            if subscriber.group.is_concurrent_safe() {
                let event = event.clone();
                let bus_identifier = bus_identifier.clone();
                let cancelled = cancelled.clone();
                let interceptors = interceptors.clone();
                let exception_handler = exception_handler.clone();
                self.pool.submit(move || {
                    process(
                        &subscriber,
                        &event,
                        &bus_identifier,
                        &cancelled,
                        &interceptors,
                        exception_handler.as_ref(),
                    );
                });
                continue;
            }

            let key = (subscriber.listener_id.clone(), subscriber.group.event_type_id());
            let lane = {
                let mut lanes = self.lanes.lock();
                lanes
                    .entry(key)
                    .or_insert_with(|| Arc::new(Lane::new(subscriber)))
                    .clone()
            };
            lane.queue.lock().push_back(event.clone());

            if !lane.scheduled.swap(true, Ordering::SeqCst) {
                let lane = lane.clone();
                let bus_identifier = bus_identifier.clone();
                let cancelled = cancelled.clone();
                let interceptors = interceptors.clone();
                let exception_handler = exception_handler.clone();
                self.pool.submit(move || {
                    drain_lane(lane, bus_identifier, cancelled, interceptors, exception_handler)
                });
            }
        }
    }
}

fn drain_lane(
    lane: Arc<Lane>,
    bus_identifier: Arc<str>,
    cancelled: Arc<AtomicBool>,
    interceptors: InterceptorChain,
    exception_handler: Arc<dyn SubscriberExceptionHandler>,
) {
    loop {
        let next = lane.queue.lock().pop_front();
        let Some(event) = next else {
            lane.scheduled.store(false, Ordering::SeqCst);
            // Close the race where a new event was pushed between the pop
            // above observing empty and the flag clear just now.
            if lane.queue.lock().is_empty() {
                return;
            }
            if lane.scheduled.swap(true, Ordering::SeqCst) {
                // Another submission already rescheduled a drain for us.
                return;
            }
            continue;
        };
        process(
            &lane.subscriber,
            &event,
            &bus_identifier,
            &cancelled,
            &interceptors,
            exception_handler.as_ref(),
        );
    }
}
