pub mod automation;
pub mod cost;
pub mod deck;
