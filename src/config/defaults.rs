//! Default configuration values

/// Maximum number of attempts when querying the release API
pub const MAX_API_RETRIES: u32 = 3;

/// Default minimum release considered by `build --all` and `list`
pub const DEFAULT_MIN_VERSION: &str = "v0.0.0";

/// Default build program
pub const DEFAULT_BUILD_PROGRAM: &str = "make";

/// Default name of the built binary
pub const DEFAULT_BINARY_NAME: &str = "app";

/// Project configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "verforge.toml";

/// Number of trailing output lines kept in a build failure
pub const FAILURE_OUTPUT_LINES: usize = 20;
