pub mod seen_code;

pub use seen_code::SeenCode;
