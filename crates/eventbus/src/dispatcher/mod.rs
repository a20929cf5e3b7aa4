//! Synchronous and asynchronous dispatch strategies, plus the worker pool
//! the async strategy runs on.

pub(crate) mod async_dispatcher;
pub(crate) mod sync_dispatcher;
pub(crate) mod worker_pool;

pub(crate) use async_dispatcher::AsyncDispatcher;
pub(crate) use worker_pool::WorkerPool;
