pub mod expense;
pub mod json;
pub mod request;
pub mod result;
