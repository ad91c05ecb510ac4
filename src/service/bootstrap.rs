//! Launch binary bootstrap.
//!
//! The worker command expects the platform launch binary next to the bot,
//! so it is downloaded again (and made executable) before every launch.

const RELEASES_URL: &str = "https://github.com/ionet-official/io_launch_binaries/raw/main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    /// No launch binary is published; the worker command runs as is.
    Other,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            _ => Platform::Other,
        }
    }

    fn binary_name(self) -> Option<&'static str> {
        match self {
            Platform::Linux => Some("launch_binary_linux"),
            Platform::MacOs => Some("launch_binary_mac"),
            Platform::Other => None,
        }
    }

    /// Commands to run before the worker command, if any.
    pub fn bootstrap(self) -> Option<Bootstrap> {
        let binary = self.binary_name()?;
        Some(Bootstrap {
            download: format!("curl -L {RELEASES_URL}/{binary} -o {binary}"),
            grant_execute: format!("chmod +x {binary}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub download: String,
    pub grant_execute: String,
}
