//! Fixed paths, URLs and policies
//!
//! Nothing here is read from the environment or a config file. Production code
//! uses [`Settings::default`]; tests build a `Settings` whose paths point into a
//! temporary directory.

use std::path::PathBuf;
use std::time::Duration;

/// Everything a run needs to know about the host layout and its remote sources
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub paths: Paths,
    pub download: DownloadPolicy,
    pub tmpfs: TmpfsPolicy,
    pub sources: Sources,
}

/// Host filesystem locations
#[derive(Debug, Clone)]
pub struct Paths {
    /// Durable run log
    pub log_file: PathBuf,
    /// Mount table rewritten by preflight
    pub mount_table: PathBuf,
    /// Copy of the mount table taken before the first rewrite
    pub mount_table_backup: PathBuf,
    /// Live mount list used to detect active mount points
    pub live_mounts: PathBuf,
    /// Short-term scratch path that receives the canonical tmpfs entry
    pub short_term_tmp: PathBuf,
    /// Long-lived scratch path unmounted during preflight
    pub long_lived_tmp: PathBuf,
    /// Scratch workspace for downloads and extraction
    pub workspace: PathBuf,
    /// Internet Monitor runtime configuration
    pub internet_monitor_config: PathBuf,
    /// Marker created by the Supermon-NG installer
    pub supermon_marker: PathBuf,
    /// Marker created by the SkywarnPlus-NG installer
    pub skywarn_marker: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/var/log/asl-extras.log"),
            mount_table: PathBuf::from("/etc/fstab"),
            mount_table_backup: PathBuf::from("/etc/fstab.asl-extras.bak"),
            live_mounts: PathBuf::from("/proc/self/mounts"),
            short_term_tmp: PathBuf::from("/tmp"),
            long_lived_tmp: PathBuf::from("/var/tmp"),
            workspace: PathBuf::from("/var/tmp/asl-extras"),
            internet_monitor_config: PathBuf::from("/etc/default/internet-monitor"),
            supermon_marker: PathBuf::from("/var/www/html/supermon-ng"),
            skywarn_marker: PathBuf::from("/opt/skywarnplus-ng"),
        }
    }
}

impl Paths {
    /// Layout rooted at `root`, mirroring the production tree
    #[cfg(test)]
    pub fn rooted_at(root: &std::path::Path) -> Self {
        let defaults = Self::default();
        let reroot = |p: &std::path::Path| root.join(p.strip_prefix("/").unwrap_or(p));
        Self {
            log_file: reroot(&defaults.log_file),
            mount_table: reroot(&defaults.mount_table),
            mount_table_backup: reroot(&defaults.mount_table_backup),
            live_mounts: reroot(&defaults.live_mounts),
            // Mount points stay absolute: they are compared, never opened
            short_term_tmp: defaults.short_term_tmp,
            long_lived_tmp: defaults.long_lived_tmp,
            workspace: reroot(&defaults.workspace),
            internet_monitor_config: reroot(&defaults.internet_monitor_config),
            supermon_marker: reroot(&defaults.supermon_marker),
            skywarn_marker: reroot(&defaults.skywarn_marker),
        }
    }
}

/// Retry and timeout policy for downloads
#[derive(Debug, Clone)]
pub struct DownloadPolicy {
    pub max_attempts: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub backoff: Duration,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            backoff: Duration::from_secs(2),
        }
    }
}

/// Shape of the canonical tmpfs entry written by preflight
#[derive(Debug, Clone)]
pub struct TmpfsPolicy {
    pub size: String,
    pub options: Vec<String>,
}

impl Default for TmpfsPolicy {
    fn default() -> Self {
        Self {
            size: "256M".to_string(),
            options: vec![
                "nodev".to_string(),
                "nosuid".to_string(),
                "mode=1777".to_string(),
            ],
        }
    }
}

impl TmpfsPolicy {
    /// Mount option field, e.g. `defaults,size=256M,nodev,nosuid,mode=1777`
    pub fn option_field(&self) -> String {
        let mut fields = vec!["defaults".to_string(), format!("size={}", self.size)];
        fields.extend(self.options.iter().cloned());
        fields.join(",")
    }
}

/// Remote resources fetched by the install steps
#[derive(Debug, Clone)]
pub struct Sources {
    pub allscan_installer: String,
    pub dvswitch_repo_script: String,
    pub supermon_installer: String,
    pub skywarn_archive: String,
    pub saytime_deb: String,
    pub sayip_deb: String,
    pub internet_monitor_deb: String,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            allscan_installer:
                "https://raw.githubusercontent.com/davidgsd/AllScan/main/AllScanInstallUpdate.php"
                    .to_string(),
            dvswitch_repo_script: "http://dvswitch.org/bookworm".to_string(),
            supermon_installer:
                "https://raw.githubusercontent.com/hardenedpenguin/supermon-ng/main/supermon-ng-installer.sh"
                    .to_string(),
            skywarn_archive:
                "https://github.com/hardenedpenguin/SkywarnPlus-NG/releases/latest/download/skywarnplus-ng.tar.gz"
                    .to_string(),
            saytime_deb:
                "https://github.com/hardenedpenguin/saytime_weather_rs/releases/latest/download/saytime-weather-rs_all.deb"
                    .to_string(),
            sayip_deb:
                "https://github.com/hardenedpenguin/sayip-node-utils/releases/latest/download/sayip-node-utils_all.deb"
                    .to_string(),
            internet_monitor_deb:
                "https://github.com/hardenedpenguin/internet-monitor/releases/latest/download/internet-monitor_all.deb"
                    .to_string(),
        }
    }
}
