pub(crate) mod callbacks;
pub mod controller;
