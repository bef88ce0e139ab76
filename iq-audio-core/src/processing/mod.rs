pub mod gain;
pub mod iq_convert;
pub mod iq_fifo;
pub mod ring_buffer;
