pub mod chatmodels;
pub mod jobmodel;
pub mod paymentmodel;
pub mod taskmodel;
pub mod usermodel;
