pub mod compression;
pub mod graph_store;
pub mod swap_path;
pub mod swap_path_set;
pub mod volatility;

pub use compression::{CodecError, CompressedPath, compress_path, compress_paths, decompress_path, decompress_paths};
pub use graph_store::GraphStore;
pub use swap_path::{PathLeg, SwapPath};
pub use swap_path_set::SwapPathSet;
pub use volatility::{Volatility, fork_by_volatility};
