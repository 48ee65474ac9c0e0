pub mod knowledge;
pub mod price;
pub mod query;
pub mod reply;
pub mod weather;
