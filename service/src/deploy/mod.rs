//! Deployment pipeline: content resolution, publishing, distribution
//! management, DNS, cache invalidation, and the orchestrating engine

pub mod content;
pub mod distribution;
pub mod dns;
pub mod engine;
pub mod fsm;
pub mod invalidation;
pub mod locks;
pub mod publisher;
pub mod template;
