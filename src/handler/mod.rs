pub mod affiliate;
pub mod tracking;
pub mod webhook;
