// Provider implementations

pub mod cloud;
pub mod openai_compat;
