pub mod dag;
pub mod error;
pub mod manager;
pub mod recovery;
pub mod scheduler_loop;
pub mod worker_pool;

pub use error::SchedulerError;
pub use manager::{SubmitRequest, TaskManager};
pub use worker_pool::WorkerPool;
