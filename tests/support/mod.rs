pub mod helpers;
pub mod stubs;
