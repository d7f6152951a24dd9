pub mod errors;

pub use errors::{CoreError, CoreResult};
