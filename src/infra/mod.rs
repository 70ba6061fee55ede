mod logging;
mod settings_store;
mod trader;

pub use logging::*;
pub use settings_store::*;
pub use trader::*;
