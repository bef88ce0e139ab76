pub mod device_binding;
pub mod file_source;
pub mod iq_consumer;
pub mod sample_queue;
