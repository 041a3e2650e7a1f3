pub mod buffer_needs;
mod chunk_scan;
mod product;

pub use chunk_scan::ChunkScan;
pub use product::{MultibufferProductPlan, ProductScan};
