pub mod apps;
pub mod client;
pub mod device;
pub mod perception;

pub use client::AdbClient;
pub use device::AdbDevice;
