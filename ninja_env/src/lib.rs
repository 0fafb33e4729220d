#![forbid(unsafe_code)]

//! Shared environment variable names for the toolchain and the Ninja
//! subprocess handoff.

/// Environment variable override for the Ninja executable path.
pub const NINJA_ENV: &str = "NINJA";

/// Environment variable naming the C++ compiler driver.
pub const CXX_ENV: &str = "CXX";

/// Environment variable naming the archiver.
pub const AR_ENV: &str = "AR";

/// Environment variable carrying extra linker flags.
pub const LDFLAGS_ENV: &str = "LDFLAGS";

/// Environment variable carrying extra compiler flags.
pub const CXXFLAGS_ENV: &str = "CXXFLAGS";
