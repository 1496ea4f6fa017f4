pub mod client;
pub mod login;
pub mod types;

pub use client::{ProbeStatus, SiteApi, SiteClient};
pub use login::{Cookies, FormLoginDriver, LoginDriver};
pub use types::*;
