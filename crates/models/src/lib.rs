//! Persisted entities for the cafe menu.

pub mod errors;
pub mod drink;

pub use drink::{Drink, DrinkText};
