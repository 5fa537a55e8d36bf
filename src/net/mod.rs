pub mod port_allocator;
pub mod wait_for_port;

pub use port_allocator::{allocate, allocate_one, default_start, PortRangeLock};
pub use wait_for_port::{wait_for_port, Protocol};
