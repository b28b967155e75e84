pub mod offermodel;
pub mod ordermodel;
pub mod payoutmodel;
pub mod subscriptionmodels;
pub mod transactionmodel;
pub mod usermodel;
