pub mod controller;

pub use controller::{Credentials, SessionController};
