pub mod collector;
pub mod config;
pub mod extract;
pub mod journal;
pub mod publish;
pub mod runner;
pub mod sample;
pub mod transport;

#[cfg(test)]
pub mod test_support;
