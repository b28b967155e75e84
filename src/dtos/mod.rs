pub mod common;
pub mod offerdtos;
pub mod orderdtos;
pub mod payoutdtos;
