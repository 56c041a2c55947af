mod common;

mod compliance;
mod funding;
mod service;
