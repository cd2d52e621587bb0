pub mod chatdb;
pub mod db;
pub mod jobdb;
pub mod paymentdb;
pub mod taskdb;
pub mod userdb;
