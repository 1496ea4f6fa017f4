pub mod authenticator;
pub mod validator;

pub use authenticator::Authenticator;
pub use validator::{SessionValidator, ValidSession};
