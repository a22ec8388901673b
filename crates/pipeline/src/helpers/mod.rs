mod properties;
pub use properties::*;
