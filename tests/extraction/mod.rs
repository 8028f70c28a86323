//! End-to-end extraction tests.

mod adversarial;
mod hosts;
mod pipeline;
