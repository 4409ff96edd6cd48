//! fstab-format mount tables
//!
//! Lines that are not structured records (comments, blanks, malformed lines)
//! are kept verbatim. Structured records keep their original text so that
//! untouched entries render exactly as they were read.

use std::path::Path;

use crate::settings::TmpfsPolicy;

/// One structured mount record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: String,
    pub dump_freq: Option<String>,
    pub pass_no: Option<String>,
    raw: String,
}

impl MountEntry {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let device = fields.next()?.to_string();
        let mount_point = fields.next()?.to_string();
        let fs_type = fields.next()?.to_string();
        let options = fields.next()?.to_string();
        Some(Self {
            device,
            mount_point,
            fs_type,
            options,
            dump_freq: fields.next().map(str::to_string),
            pass_no: fields.next().map(str::to_string),
            raw: line.to_string(),
        })
    }

    pub fn is_tmpfs(&self) -> bool {
        self.fs_type == "tmpfs"
    }

    pub fn targets(&self, path: &Path) -> bool {
        Path::new(&self.mount_point) == path
    }
}

/// A line of a mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountLine {
    /// Comment, blank or unparseable line
    Opaque(String),
    Entry(MountEntry),
}

impl MountLine {
    fn text(&self) -> &str {
        match self {
            MountLine::Opaque(text) => text,
            MountLine::Entry(entry) => &entry.raw,
        }
    }
}

/// An ordered mount table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MountTable {
    pub lines: Vec<MountLine>,
}

impl MountTable {
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return MountLine::Opaque(line.to_string());
                }
                MountEntry::parse(line)
                    .map(MountLine::Entry)
                    .unwrap_or_else(|| MountLine::Opaque(line.to_string()))
            })
            .collect();
        Self { lines }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.text());
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> impl Iterator<Item = &MountEntry> {
        self.lines.iter().filter_map(|line| match line {
            MountLine::Entry(entry) => Some(entry),
            MountLine::Opaque(_) => None,
        })
    }

    /// Whether an active record mounts something at `path`
    pub fn has_mount_point(&self, path: &Path) -> bool {
        self.entries().any(|entry| entry.targets(path))
    }

    /// Rewrite so that `target` has the single canonical tmpfs record
    ///
    /// Any other active tmpfs record is commented out, never removed. The
    /// canonical record is appended when no tmpfs record targeted `target`.
    pub fn with_canonical_tmpfs(&self, target: &Path, policy: &TmpfsPolicy) -> Self {
        let canonical = canonical_tmpfs_line(target, policy);
        let mut emitted = false;
        let mut lines = Vec::with_capacity(self.lines.len() + 1);

        for line in &self.lines {
            match line {
                MountLine::Entry(entry) if entry.is_tmpfs() => {
                    if entry.targets(target) && !emitted {
                        lines.push(
                            MountEntry::parse(&canonical)
                                .map(MountLine::Entry)
                                .unwrap_or_else(|| MountLine::Opaque(canonical.clone())),
                        );
                        emitted = true;
                    } else {
                        lines.push(MountLine::Opaque(format!("#{}", entry.raw)));
                    }
                }
                other => lines.push(other.clone()),
            }
        }

        if !emitted {
            lines.push(
                MountEntry::parse(&canonical)
                    .map(MountLine::Entry)
                    .unwrap_or(MountLine::Opaque(canonical)),
            );
        }

        Self { lines }
    }
}

/// e.g. `tmpfs /tmp tmpfs defaults,size=256M,nodev,nosuid,mode=1777 0 0`
pub fn canonical_tmpfs_line(target: &Path, policy: &TmpfsPolicy) -> String {
    format!(
        "tmpfs {} tmpfs {} 0 0",
        target.display(),
        policy.option_field()
    )
}
