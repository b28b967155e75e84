pub mod cache;
pub mod db;
pub mod offerdb;
pub mod orderdb;
pub mod payoutdb;
pub mod plandb;
pub mod transactiondb;
pub mod userdb;
