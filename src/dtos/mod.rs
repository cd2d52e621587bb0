pub mod chatdtos;
pub mod jobdtos;
pub mod paymentdtos;
pub mod taskdtos;
pub mod userdtos;
