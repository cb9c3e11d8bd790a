pub mod recorder;
pub(crate) mod worker;
