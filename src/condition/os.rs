//! Operating system detection for `<os>`
//!
//! The host is described by an [`OsInfo`] value handed to the predicate, so
//! the family rules can be checked against any platform.

use crate::error::{ConditionError, ConditionResult};
use std::env::consts;
use std::fmt;
use std::fs;
use std::str::FromStr;

/// Description of the operating system a build runs on
///
/// All fields are lower-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub path_separator: char,
}

impl OsInfo {
    pub fn new(
        name: impl AsRef<str>,
        arch: impl AsRef<str>,
        version: impl AsRef<str>,
        path_separator: char,
    ) -> Self {
        OsInfo {
            name: name.as_ref().to_lowercase(),
            arch: arch.as_ref().to_lowercase(),
            version: version.as_ref().to_lowercase(),
            path_separator,
        }
    }

    /// Describe the running process's host
    pub fn current() -> Self {
        let name = match consts::OS {
            "macos" => "mac os x",
            "solaris" => "sunos",
            other => other,
        };
        let separator = if cfg!(windows) { ';' } else { ':' };
        OsInfo::new(name, consts::ARCH, kernel_release().unwrap_or_default(), separator)
    }
}

impl Default for OsInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Best-effort kernel release string
fn kernel_release() -> Option<String> {
    fs::read_to_string("/proc/sys/kernel/osrelease")
        .ok()
        .map(|release| release.trim().to_string())
        .filter(|release| !release.is_empty())
}

/// OS families understood by `<os family="...">`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Win9x,
    WinNt,
    Os2,
    NetWare,
    Dos,
    Mac,
    Tandem,
    Unix,
    ZOs,
    Os400,
    OpenVms,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Win9x => "win9x",
            OsFamily::WinNt => "winnt",
            OsFamily::Os2 => "os/2",
            OsFamily::NetWare => "netware",
            OsFamily::Dos => "dos",
            OsFamily::Mac => "mac",
            OsFamily::Tandem => "tandem",
            OsFamily::Unix => "unix",
            OsFamily::ZOs => "z/os",
            OsFamily::Os400 => "os/400",
            OsFamily::OpenVms => "openvms",
        }
    }

    /// Whether `os` belongs to this family
    pub fn matches(&self, os: &OsInfo) -> bool {
        let name = os.name.as_str();
        let windows = name.contains("windows");
        let win9x = windows
            && (name.contains("95")
                || name.contains("98")
                || name.contains("me")
                || name.contains("ce"));
        let netware = name.contains("netware");
        let mac = name.contains("mac") || name.contains("darwin");

        match self {
            OsFamily::Windows => windows,
            OsFamily::Win9x => win9x,
            OsFamily::WinNt => windows && !win9x,
            OsFamily::Os2 => name.contains("os/2"),
            OsFamily::NetWare => netware,
            OsFamily::Dos => os.path_separator == ';' && !netware && !windows,
            OsFamily::Mac => mac,
            OsFamily::Tandem => name.contains("nonstop_kernel"),
            OsFamily::Unix => {
                os.path_separator == ':'
                    && !name.contains("openvms")
                    && (!mac || name.ends_with('x') || name.contains("darwin"))
            }
            OsFamily::ZOs => name.contains("z/os") || name.contains("os/390"),
            OsFamily::Os400 => name.contains("os/400"),
            OsFamily::OpenVms => name.contains("openvms"),
        }
    }
}

impl FromStr for OsFamily {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(OsFamily::Windows),
            "win9x" => Ok(OsFamily::Win9x),
            "winnt" => Ok(OsFamily::WinNt),
            "os/2" => Ok(OsFamily::Os2),
            "netware" => Ok(OsFamily::NetWare),
            "dos" => Ok(OsFamily::Dos),
            "mac" => Ok(OsFamily::Mac),
            "tandem" => Ok(OsFamily::Tandem),
            "unix" => Ok(OsFamily::Unix),
            "z/os" => Ok(OsFamily::ZOs),
            "os/400" => Ok(OsFamily::Os400),
            "openvms" => Ok(OsFamily::OpenVms),
            _ => Err(ConditionError::config(format!(
                "Don't know how to detect os family \"{}\"",
                s
            ))),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<os>`: every attribute that is given must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Os {
    pub family: Option<OsFamily>,
    pub name: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
}

impl Os {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family(mut self, family: &str) -> ConditionResult<Self> {
        self.family = Some(family.parse()?);
        Ok(self)
    }

    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(name.as_ref().to_lowercase());
        self
    }

    pub fn with_arch(mut self, arch: impl AsRef<str>) -> Self {
        self.arch = Some(arch.as_ref().to_lowercase());
        self
    }

    pub fn with_version(mut self, version: impl AsRef<str>) -> Self {
        self.version = Some(version.as_ref().to_lowercase());
        self
    }

    pub fn evaluate(&self, os: &OsInfo) -> bool {
        let family = self.family.map_or(true, |family| family.matches(os));
        let name = self.name.as_ref().map_or(true, |name| *name == os.name);
        let arch = self.arch.as_ref().map_or(true, |arch| *arch == os.arch);
        let version = self
            .version
            .as_ref()
            .map_or(true, |version| *version == os.version);

        log::trace!(
            "os family={} name={} arch={} version={} against {:?}",
            family,
            name,
            arch,
            version,
            os
        );
        family && name && arch && version
    }
}
