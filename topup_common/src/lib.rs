//! Value types shared between the top-up engine and server crates.
//!
//! Nothing in here touches the network or the database directly. [`Money`] maps transparently onto an SQL integer
//! column, and [`Secret`] keeps configuration secrets out of log output.
mod helpers;
mod money;
mod secret;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, CENTS_PER_UNIT};
pub use secret::Secret;
