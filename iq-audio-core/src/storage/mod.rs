pub mod wave_source;
