//! Test tooling: a scripted, recording raw client.

pub mod mock;
pub mod test_helpers;

pub use mock::{
    Call, MockConnection, MockDriver, MockError, MockPool, MockScript, Op, POOL_ID, RecordedCall,
};
pub use test_helpers::rows_outcome;
