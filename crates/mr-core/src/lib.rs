pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorKind, RacerError};
pub use types::*;
pub use value::*;
