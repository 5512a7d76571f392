//! Engine for an NFL weekly confidence pool: season schedule state, pick
//! submission, scoring, and the adaptive poll loop that keeps results fresh.

pub mod clock;
pub mod events;
pub mod poller;
pub mod pool;
pub mod scoring;
pub mod settings;
