pub mod mapping;
pub mod settings;
pub mod suggestion;

pub use mapping::*;
pub use settings::*;
pub use suggestion::*;
