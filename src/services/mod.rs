pub mod invoices;
pub mod notifications;
pub mod orders;
pub mod razorpay;
pub mod returns;
pub mod shiprocket;
pub mod signature;
