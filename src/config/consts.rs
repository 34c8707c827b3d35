/// Address the TCP channel and server use when none is configured
pub const DEFAULT_ADDRESS: &str = "localhost:9090";
/// Engine selector matching any free engine
pub const ANY_ENGINE: &str = "*";
/// Environment variable holding the log filter
pub const LOG_ENV: &str = "DFE_LOG";

/// Engines offered by the simulated backend
pub const DEFAULT_ENGINES: usize = 1;
/// Host-visible buffer memory of the simulated backend (256 MiB)
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 256 * 1024 * 1024;
/// Per-engine large memory of the simulated backend (1 GiB, populated on write)
pub const DEFAULT_LMEM_BYTES: usize = 1024 * 1024 * 1024;

/// Longest request line the engine server accepts (64 MiB)
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;
