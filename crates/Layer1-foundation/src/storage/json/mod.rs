mod store;

pub use store::{default_home, JsonStore};
