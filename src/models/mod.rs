mod kea;
mod workflow;

pub use kea::*;
pub use workflow::*;
