//! Scheduler scenario tests against in-memory adapters and virtual time.

mod helpers;

mod job_test;
mod queue_test;
mod trigger_test;
