pub mod background_jobs;
pub mod error;
pub mod escrow_service;
pub mod gateway;
pub mod notification_service;
pub mod order_service;
pub mod payout_service;
pub mod subscription_service;
pub mod webhook_service;
