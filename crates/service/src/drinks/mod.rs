pub mod service;

pub use service::{CreateDrink, DrinkService, UpdateDrink};
