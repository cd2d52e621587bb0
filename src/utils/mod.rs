pub mod decimal;
pub mod token;
