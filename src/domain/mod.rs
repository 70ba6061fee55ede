mod keys;
mod orders;
mod project;
mod settings;

pub use keys::*;
pub use orders::*;
pub use project::*;
pub use settings::*;

#[cfg(test)]
pub(crate) use settings::fixtures;
