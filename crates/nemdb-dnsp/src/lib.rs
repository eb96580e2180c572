pub mod errors;
pub mod model;
pub mod networks;
mod registry;

pub use errors::DnspError;
pub use model::{conform_load_frame, LOAD_COLUMNS};
pub use registry::{adapters, read_all_zss, NetworkAdapter};

#[cfg(test)]
mod tests;
