pub mod stripe_api;

pub use stripe_api::{CheckoutCustomer, StripeApi};
