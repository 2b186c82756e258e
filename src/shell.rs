//! Line-oriented command shell over a [`Navigator`].

use std::fs::File;
use std::io::{BufRead, BufWriter, Read, Seek, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::ShellConfig;
use crate::fs::{ChangeDirectory, DirectoryEntry, Navigator, ReadOutcome};
use crate::partition::format_size;

const HELP: &str = "\
commands:
  dir                     list the current directory
  chdir <name>, cd <name> change directory (.. goes up)
  read <name>             print a file
  save <name> [path]      write a file to the host
  tree                    list every directory below the current one
  info                    partition table and volume geometry
  help                    this text
  exit                    leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dir,
    Chdir(String),
    Read(String),
    Save { name: String, target: Option<PathBuf> },
    Tree,
    Info,
    Help,
    Exit,
    Empty,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Command::Empty;
        };
        let arg = words.next().map(str::to_string);
        let extra = words.next().map(PathBuf::from);

        match (verb, arg) {
            ("dir" | "ls", None) => Command::Dir,
            ("chdir" | "cd", Some(name)) => Command::Chdir(name),
            ("read" | "cat", Some(name)) => Command::Read(name),
            ("save", Some(name)) => Command::Save {
                name,
                target: extra,
            },
            ("tree", None) => Command::Tree,
            ("info", None) => Command::Info,
            ("help" | "?", None) => Command::Help,
            ("exit" | "quit", None) => Command::Exit,
            ("chdir" | "cd" | "read" | "cat" | "save", None) => {
                Command::Invalid(format!("{verb}: missing file name"))
            }
            ("dir" | "ls" | "tree" | "info" | "help" | "?" | "exit" | "quit", Some(arg)) => {
                Command::Invalid(format!("{verb}: unexpected argument '{arg}'"))
            }
            (verb, _) => Command::Invalid(format!("unknown command '{verb}', try 'help'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<R, W> {
    nav: Navigator<R>,
    out: W,
    config: ShellConfig,
}

impl<R: Read + Seek, W: Write> Shell<R, W> {
    pub fn new(nav: Navigator<R>, out: W, config: ShellConfig) -> Self {
        Self { nav, out, config }
    }

    pub fn navigator(&self) -> &Navigator<R> {
        &self.nav
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Read commands until `exit` or end of input. Failed commands are
    /// reported and the session continues.
    pub fn run(&mut self, input: impl BufRead, interactive: bool) -> Result<()> {
        let mut lines = input.lines();
        loop {
            if interactive {
                write!(self.out, "{}> ", self.nav.path())?;
                self.out.flush()?;
            }
            let Some(line) = lines.next() else {
                break;
            };
            let command = Command::parse(&line?);
            match self.execute(&command) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(self.out, "error: {e:#}")?,
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, command: &Command) -> Result<Flow> {
        match command {
            Command::Dir => self.dir()?,
            Command::Chdir(name) => self.chdir(name)?,
            Command::Read(name) => self.read(name)?,
            Command::Save { name, target } => self.save(name, target.clone())?,
            Command::Tree => self.tree()?,
            Command::Info => self.info()?,
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Exit => return Ok(Flow::Exit),
            Command::Empty => {}
            Command::Invalid(msg) => writeln!(self.out, "{msg}")?,
        }
        Ok(Flow::Continue)
    }

    fn dir(&mut self) -> Result<()> {
        let summary = self.nav.list();
        writeln!(self.out, "Directory of {}", self.nav.path())?;
        if let Some(label) = &summary.volume_label {
            writeln!(self.out, "Volume {label}")?;
        }
        for entry in summary.directories.iter().chain(summary.files.iter()) {
            writeln!(self.out, "{}", format_entry_line(entry))?;
        }
        writeln!(
            self.out,
            "FILEs {}, Size {}B\nDIRs {}",
            summary.file_count, summary.total_file_bytes, summary.directory_count
        )?;
        Ok(())
    }

    fn chdir(&mut self, name: &str) -> Result<()> {
        match self
            .nav
            .change_directory(name)
            .with_context(|| format!("chdir {name}"))?
        {
            ChangeDirectory::Changed => {}
            ChangeDirectory::NotFound => writeln!(self.out, "{name}: directory not found")?,
            ChangeDirectory::NotADirectory => writeln!(self.out, "{name}: not a directory")?,
        }
        Ok(())
    }

    fn read(&mut self, name: &str) -> Result<()> {
        let outcome = self
            .nav
            .read_file(name, &mut self.out)
            .with_context(|| format!("read {name}"))?;
        if matches!(outcome, ReadOutcome::Complete { .. } | ReadOutcome::Truncated { .. }) {
            writeln!(self.out)?;
        }
        self.report(name, outcome)
    }

    fn save(&mut self, name: &str, target: Option<PathBuf>) -> Result<()> {
        let is_directory = self
            .nav
            .current()
            .find_by_name(name)
            .map(|e| e.is_directory() || e.is_volume_label());
        match is_directory {
            None => return self.report(name, ReadOutcome::NotFound),
            Some(true) => return self.report(name, ReadOutcome::IsDirectory),
            Some(false) => {}
        }

        let path = target.unwrap_or_else(|| self.config.save_target(name));
        let file = File::create(&path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        let mut sink = BufWriter::new(file);
        let written = self
            .nav
            .read_file(name, &mut sink)
            .map_err(anyhow::Error::from)
            .and_then(|outcome| {
                sink.flush()?;
                Ok(outcome)
            });
        let outcome = match written {
            Ok(outcome) => outcome,
            Err(e) => {
                drop(sink);
                if let Err(rm) = std::fs::remove_file(&path) {
                    warn!("cannot remove partial file {}: {rm}", path.display());
                }
                return Err(e.context(format!("save {name}")));
            }
        };

        if let ReadOutcome::Complete { bytes } | ReadOutcome::Truncated { delivered: bytes, .. } =
            outcome
        {
            info!("saved {name} to {} ({bytes} bytes)", path.display());
            writeln!(self.out, "{name} -> {} ({bytes} B)", path.display())?;
        }
        self.report(name, outcome)
    }

    fn report(&mut self, name: &str, outcome: ReadOutcome) -> Result<()> {
        match outcome {
            ReadOutcome::Complete { .. } => {}
            ReadOutcome::Truncated {
                delivered,
                declared,
            } => writeln!(
                self.out,
                "{name}: truncated, cluster chain ended after {delivered} of {declared} bytes"
            )?,
            ReadOutcome::NotFound => writeln!(self.out, "{name}: file not found")?,
            ReadOutcome::IsDirectory => writeln!(self.out, "{name}: is a directory")?,
        }
        Ok(())
    }

    fn tree(&mut self) -> Result<()> {
        let mut lines = Vec::new();
        self.nav.recursive_walk(|path, listing| {
            let summary = listing.summary();
            lines.push(format!(
                "{path}  ({} files, {} B)",
                summary.file_count, summary.total_file_bytes
            ));
            for file in &summary.files {
                lines.push(format!("    {:<12} {:>10}", file.name(), file.file_size));
            }
        })?;
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn info(&mut self) -> Result<()> {
        let volume = self.nav.volume();
        writeln!(self.out, "Partition table\n-----------------------")?;
        for (i, entry) in volume.mbr().entries.iter().enumerate() {
            writeln!(
                self.out,
                "Partition {i}, type {:02X} ({}), start sector {:8}, length {:8} sectors",
                entry.partition_type,
                entry.partition_type_name(),
                entry.start_sector,
                entry.length_sectors
            )?;
        }

        let bs = volume.boot_sector();
        let layout = volume.layout();
        let free = volume.fat().free_clusters() as u64;
        writeln!(self.out, "\nMounted partition {}", volume.partition_index())?;
        writeln!(
            self.out,
            "Volume label {}, OEM {}, {} bytes/sector, {} sectors/cluster",
            bs.volume_label.as_deref().unwrap_or("(none)"),
            bs.oem_name,
            bs.sector_size,
            bs.sectors_per_cluster
        )?;
        writeln!(
            self.out,
            "FATs {} x {} sectors, root entries {}, clusters {}",
            bs.number_of_fats,
            bs.fat_size_sectors,
            bs.root_dir_entries,
            layout.cluster_count()
        )?;
        writeln!(
            self.out,
            "FAT at {:#X}, root at {:#X}, data at {:#X}",
            layout.fat_region_offset, layout.root_dir_offset, layout.data_region_offset
        )?;
        let free_clusters = free.min(layout.cluster_count());
        writeln!(
            self.out,
            "Free {} of {}",
            format_size(free_clusters * layout.cluster_size()),
            format_size(layout.cluster_count() * layout.cluster_size())
        )?;
        Ok(())
    }
}

/// One `dir` line: date, time, name, `<DIR>` marker, HSRM flags, start
/// cluster and size.
pub fn format_entry_line(entry: &DirectoryEntry) -> String {
    let stamp = entry
        .modified()
        .to_datetime()
        .map(|dt| dt.format("%d.%m.%Y %H:%M.%S").to_string())
        .unwrap_or_else(|| "--.--.---- --:--.--".to_string());
    let flags: String = [
        (entry.is_hidden(), 'H'),
        (entry.is_system(), 'S'),
        (entry.is_read_only(), 'R'),
        (entry.is_archive(), 'M'),
    ]
    .iter()
    .map(|&(set, c)| if set { c } else { '-' })
    .collect();

    format!(
        "{stamp} {:<12} {:<5} {flags} start {:8} size {:8} B",
        entry.name(),
        if entry.is_directory() { "<DIR>" } else { "" },
        entry.starting_cluster,
        entry.file_size
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::dir_entry::{FatTimestamp, ATTR_ARCHIVE, ATTR_DIRECTORY, ATTR_HIDDEN};

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("dir"), Command::Dir);
        assert_eq!(Command::parse("  chdir ADR1 "), Command::Chdir("ADR1".into()));
        assert_eq!(Command::parse("cd .."), Command::Chdir("..".into()));
        assert_eq!(Command::parse("read TEST.TXT"), Command::Read("TEST.TXT".into()));
        assert_eq!(
            Command::parse("save TEST.TXT"),
            Command::Save {
                name: "TEST.TXT".into(),
                target: None
            }
        );
        assert_eq!(
            Command::parse("save TEST.TXT /tmp/t.txt"),
            Command::Save {
                name: "TEST.TXT".into(),
                target: Some(PathBuf::from("/tmp/t.txt"))
            }
        );
        assert_eq!(Command::parse("tree"), Command::Tree);
        assert_eq!(Command::parse("exit"), Command::Exit);
        assert_eq!(Command::parse(""), Command::Empty);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(Command::parse("read"), Command::Invalid(m) if m.contains("missing")));
        assert!(matches!(Command::parse("format C:"), Command::Invalid(m) if m.contains("unknown")));
        assert_eq!(
            Command::parse("dir foo"),
            Command::Invalid("dir: unexpected argument 'foo'".into())
        );
        assert!(matches!(Command::parse("exit now"), Command::Invalid(m) if m.contains("unexpected")));
    }

    #[test]
    fn test_format_entry_line() {
        let ts = FatTimestamp::pack(2019, 4, 7, 9, 5, 30).unwrap();
        let file = DirectoryEntry {
            filename: *b"TEST    ",
            extension: *b"TXT",
            attributes: ATTR_ARCHIVE | ATTR_HIDDEN,
            modify_time: ts.time,
            modify_date: ts.date,
            starting_cluster: 3,
            file_size: 1234,
        };
        assert_eq!(
            format_entry_line(&file),
            "07.04.2019 09:05.30 TEST.TXT           H--M start        3 size     1234 B"
        );

        let dir = DirectoryEntry {
            filename: *b"ADR1    ",
            extension: *b"   ",
            attributes: ATTR_DIRECTORY,
            modify_time: 0,
            modify_date: 0,
            starting_cluster: 5,
            file_size: 0,
        };
        assert!(format_entry_line(&dir).starts_with("--.--.---- --:--.-- ADR1         <DIR> ----"));
    }
}
