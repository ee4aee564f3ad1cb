pub mod harness;

pub use harness::TwoHouseHarness;
