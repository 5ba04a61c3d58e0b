#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod destination;
pub mod load_balancing;
mod namespaced_name;

pub use self::{
    destination::{DestinationHealth, DestinationState, RequestGuard},
    namespaced_name::NamespacedName,
};
