#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]

pub mod account;
pub mod currency;
pub mod entry;
mod id;
pub mod invoice;
pub mod primitives;
pub mod stock;
