// src/lib.rs — Library root for walkly

pub mod cli;
pub mod geo;
pub mod geolocation;
pub mod infra;
pub mod route;
pub mod session;
pub mod store;
pub mod util;
