pub mod bootstrap;
pub mod controller;
pub mod launcher;
pub mod runtime;
pub mod schedule;
pub mod status;

#[cfg(test)]
pub mod testing;
