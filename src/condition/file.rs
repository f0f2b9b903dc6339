//! Filesystem predicates
//!
//! `<available>`, `<filesmatch>`, `<islastmodified>` and `<uptodate>`. Paths
//! are resolved against the project base directory when the node is built.

use crate::error::{ConditionError, ConditionResult};
use chrono::{Local, NaiveDateTime, TimeZone};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default `<islastmodified>` pattern, as chrono format specifiers
pub const DEFAULT_DATETIME_PATTERN: &str = "%m/%d/%Y %I:%M %p";

/// Last modification time in milliseconds since the epoch, 0 when unknown
pub fn last_modified(path: &Path) -> i64 {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(system_time_millis)
        .unwrap_or(0)
}

fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// `type` attribute of `<available>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Dir,
}

impl FileType {
    fn accepts(&self, path: &Path) -> bool {
        match self {
            FileType::File => path.is_file(),
            FileType::Dir => path.is_dir(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Dir => "dir",
        }
    }
}

impl FromStr for FileType {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(FileType::File),
            "dir" => Ok(FileType::Dir),
            _ => Err(ConditionError::config(format!(
                "{} is not a legal value for this attribute",
                s
            ))),
        }
    }
}

/// `<available file="...">`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Available {
    /// The name as written in the build file
    pub file_name: String,
    /// The name resolved against the base directory
    pub file: PathBuf,
    pub file_type: Option<FileType>,
    pub filepath: Vec<PathBuf>,
    pub search_parents: bool,
}

impl Available {
    pub fn new(file_name: impl Into<String>, basedir: &Path) -> Self {
        let file_name = file_name.into();
        Available {
            file: basedir.join(&file_name),
            file_name,
            file_type: None,
            filepath: Vec::new(),
            search_parents: false,
        }
    }

    pub fn with_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn with_filepath(mut self, filepath: Vec<PathBuf>) -> Self {
        self.filepath = filepath;
        self
    }

    pub fn with_search_parents(mut self, search_parents: bool) -> Self {
        self.search_parents = search_parents;
        self
    }

    pub fn evaluate(&self) -> bool {
        let found = if self.filepath.is_empty() {
            self.check(&self.file, &self.file_name)
        } else {
            self.search()
        };

        if !found {
            match self.file_type {
                Some(file_type) => {
                    log::debug!("Unable to find {} {}", file_type.as_str(), self.file_name)
                }
                None => log::debug!("Unable to find {}", self.file_name),
            }
        }
        found
    }

    /// Walk the search path the way Ant does
    fn search(&self) -> bool {
        let name = OsStr::new(&self.file_name);

        for path in &self.filepath {
            log::debug!("Searching {}", path.display());

            // the entry itself is the file we are looking for
            if path.exists() && (path.as_os_str() == name || path.file_name() == Some(name)) {
                return self.file_type.map_or(true, |t| t.accepts(path));
            }

            // the entry lives inside the directory we are looking for
            let parent = path.parent();
            if let Some(parent) = parent {
                if parent.exists() && parent.as_os_str() == name {
                    return self.file_type != Some(FileType::File);
                }
            }

            if path.is_dir() && self.check(&path.join(&self.file_name), &self.file_name) {
                return true;
            }

            let mut parent = parent;
            while self.search_parents {
                let Some(dir) = parent.filter(|dir| dir.exists()) else {
                    break;
                };
                if self.check(&dir.join(&self.file_name), &self.file_name) {
                    return true;
                }
                parent = dir.parent();
            }
        }

        false
    }

    fn check(&self, path: &Path, text: &str) -> bool {
        let found = match self.file_type {
            Some(file_type) => file_type.accepts(path),
            None => path.exists(),
        };
        if found {
            log::debug!("Found: {} ({})", text, path.display());
        }
        found
    }
}

/// `<filesmatch>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesMatch {
    pub file1: PathBuf,
    pub file2: PathBuf,
    pub text_file: bool,
}

impl FilesMatch {
    pub fn new(file1: PathBuf, file2: PathBuf) -> Self {
        FilesMatch {
            file1,
            file2,
            text_file: false,
        }
    }

    pub fn with_text_file(mut self, text_file: bool) -> Self {
        self.text_file = text_file;
        self
    }

    pub fn evaluate(&self) -> ConditionResult<bool> {
        self.content_equals()
            .map_err(|e| ConditionError::evaluation(format!("when comparing files: {}", e)))
    }

    fn content_equals(&self) -> io::Result<bool> {
        let (exists1, exists2) = (self.file1.exists(), self.file2.exists());
        if exists1 != exists2 {
            return Ok(false);
        }
        if !exists1 {
            // two missing files are considered identical
            return Ok(true);
        }
        if self.file1.is_dir() || self.file2.is_dir() {
            return Ok(false);
        }
        if fs::canonicalize(&self.file1)? == fs::canonicalize(&self.file2)? {
            return Ok(true);
        }

        if self.text_file {
            text_equals(&self.file1, &self.file2)
        } else {
            binary_equals(&self.file1, &self.file2)
        }
    }
}

fn binary_equals(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let read = reader_a.read(&mut buf_a)?;
        if read == 0 {
            return Ok(true);
        }
        reader_b.read_exact(&mut buf_b[..read])?;
        if buf_a[..read] != buf_b[..read] {
            return Ok(false);
        }
    }
}

/// Compare line by line so that `\n` and `\r\n` endings are equivalent
fn text_equals(a: &Path, b: &Path) -> io::Result<bool> {
    let mut lines_a = BufReader::new(File::open(a)?).split(b'\n');
    let mut lines_b = BufReader::new(File::open(b)?).split(b'\n');

    loop {
        match (lines_a.next().transpose()?, lines_b.next().transpose()?) {
            (None, None) => return Ok(true),
            (Some(line_a), Some(line_b)) => {
                if trim_cr(&line_a) != trim_cr(&line_b) {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// `mode` attribute of `<islastmodified>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    #[default]
    Equals,
    Before,
    After,
    NotBefore,
    NotAfter,
}

impl CompareMode {
    fn holds(&self, actual: i64, expected: i64) -> bool {
        match self {
            CompareMode::Equals => actual == expected,
            CompareMode::Before => actual < expected,
            CompareMode::After => actual > expected,
            CompareMode::NotBefore => actual >= expected,
            CompareMode::NotAfter => actual <= expected,
        }
    }
}

impl FromStr for CompareMode {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equals" => Ok(CompareMode::Equals),
            "before" => Ok(CompareMode::Before),
            "after" => Ok(CompareMode::After),
            "not-before" => Ok(CompareMode::NotBefore),
            "not-after" => Ok(CompareMode::NotAfter),
            _ => Err(ConditionError::config(format!(
                "{} is not a legal value for this attribute",
                s
            ))),
        }
    }
}

/// Reference point of `<islastmodified>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Milliseconds since the epoch
    Millis(i64),
    /// The time of evaluation
    Now,
}

impl Timestamp {
    /// Parse a local date/time with a chrono pattern, `now` is special
    pub fn parse(datetime: &str, pattern: &str) -> ConditionResult<Self> {
        if datetime == "now" {
            return Ok(Timestamp::Now);
        }

        let naive = NaiveDateTime::parse_from_str(datetime, pattern).map_err(|e| {
            ConditionError::config(format!(
                "Failed to parse {} using pattern {}: {}",
                datetime, pattern, e
            ))
        })?;
        let local = Local.from_local_datetime(&naive).earliest().ok_or_else(|| {
            ConditionError::config(format!("{} does not exist in the local time zone", datetime))
        })?;

        Ok(Timestamp::Millis(local.timestamp_millis()))
    }

    fn millis(&self) -> i64 {
        match self {
            Timestamp::Millis(millis) => *millis,
            Timestamp::Now => system_time_millis(SystemTime::now()),
        }
    }
}

/// `<islastmodified>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsLastModified {
    pub file: PathBuf,
    pub expected: Timestamp,
    pub mode: CompareMode,
}

impl IsLastModified {
    pub fn new(file: PathBuf, expected: Timestamp) -> Self {
        IsLastModified {
            file,
            expected,
            mode: CompareMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn evaluate(&self) -> bool {
        let expected = self.expected.millis();
        let actual = last_modified(&self.file);
        log::debug!(
            "expected timestamp: {}, actual timestamp: {} ({:?})",
            expected,
            actual,
            self.mode
        );
        self.mode.holds(actual, expected)
    }
}

/// `<uptodate>`: true when no source is newer than the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpToDate {
    pub target: PathBuf,
    pub sources: Vec<PathBuf>,
    /// Absolute glob pattern selecting more sources
    pub pattern: Option<String>,
}

impl UpToDate {
    pub fn new(target: PathBuf) -> Self {
        UpToDate {
            target,
            sources: Vec::new(),
            pattern: None,
        }
    }

    pub fn with_source(mut self, source: PathBuf) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a glob pattern relative to `basedir`
    pub fn with_pattern(mut self, pattern: &str, basedir: &Path) -> ConditionResult<Self> {
        let full = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            format!(
                "{}/{}",
                glob::Pattern::escape(&basedir.to_string_lossy()),
                pattern
            )
        };
        glob::Pattern::new(&full).map_err(|e| {
            ConditionError::config(format!("Invalid srcfiles pattern '{}': {}", pattern, e))
        })?;
        self.pattern = Some(full);
        Ok(self)
    }

    pub fn evaluate(&self) -> ConditionResult<bool> {
        if !self.target.exists() {
            log::debug!("The targetfile {} does not exist.", self.target.display());
            return Ok(false);
        }
        let target_time = last_modified(&self.target);

        for source in &self.sources {
            if !source.exists() {
                return Err(ConditionError::evaluation(format!(
                    "srcfile {} not found.",
                    source.display()
                )));
            }
            if last_modified(source) > target_time {
                log::debug!("{} is newer than {}", source.display(), self.target.display());
                return Ok(false);
            }
        }

        if let Some(pattern) = &self.pattern {
            let entries = glob::glob(pattern)
                .map_err(|e| ConditionError::evaluation(e.to_string()))?;
            for entry in entries {
                let source = entry.map_err(|e| ConditionError::evaluation(e.to_string()))?;
                if source == self.target || !source.is_file() {
                    continue;
                }
                if last_modified(&source) > target_time {
                    log::debug!("{} is newer than {}", source.display(), self.target.display());
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &str, millis: u64) {
        fs::write(path, contents).unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_millis(millis))
            .unwrap();
    }

    #[test]
    fn test_available_relative_to_basedir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("present.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();

        assert!(Available::new("present.txt", dir.path()).evaluate());
        assert!(!Available::new("absent.txt", dir.path()).evaluate());
        assert!(Available::new("lib", dir.path())
            .with_type(FileType::Dir)
            .evaluate());
        assert!(!Available::new("lib", dir.path())
            .with_type(FileType::File)
            .evaluate());
    }

    #[test]
    fn test_available_filepath_search() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(b.join("tool.cfg"), "x").unwrap();

        let available = Available::new("tool.cfg", dir.path()).with_filepath(vec![a.clone(), b]);
        assert!(available.evaluate());

        let available = Available::new("tool.cfg", dir.path()).with_filepath(vec![a]);
        assert!(!available.evaluate());
    }

    #[test]
    fn test_available_filepath_entry_is_the_file() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("dep.jar");
        fs::write(&jar, "x").unwrap();

        let available =
            Available::new("dep.jar", Path::new("/elsewhere")).with_filepath(vec![jar.clone()]);
        assert!(available.evaluate());

        let as_dir = Available::new("dep.jar", Path::new("/elsewhere"))
            .with_type(FileType::Dir)
            .with_filepath(vec![jar]);
        assert!(!as_dir.evaluate());
    }

    #[test]
    fn test_available_search_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x").join("y");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("marker"), "x").unwrap();

        let entry = nested.join("missing.jar");
        let plain =
            Available::new("marker", Path::new("/elsewhere")).with_filepath(vec![entry.clone()]);
        assert!(!plain.evaluate());

        let searching = plain.clone().with_search_parents(true);
        assert!(searching.evaluate());
    }

    #[test]
    fn test_file_type_parse() {
        assert_eq!("DIR".parse::<FileType>().unwrap(), FileType::Dir);
        assert!("socket".parse::<FileType>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_filesmatch_binary() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let c = dir.path().join("c.bin");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        fs::write(&c, b"other byte").unwrap();

        assert!(FilesMatch::new(a.clone(), b).evaluate().unwrap());
        assert!(!FilesMatch::new(a.clone(), c).evaluate().unwrap());
        assert!(FilesMatch::new(a.clone(), a).evaluate().unwrap());
    }

    #[test]
    fn test_filesmatch_missing_files() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present");
        fs::write(&present, "x").unwrap();

        let missing1 = dir.path().join("missing1");
        let missing2 = dir.path().join("missing2");
        assert!(FilesMatch::new(missing1.clone(), missing2).evaluate().unwrap());
        assert!(!FilesMatch::new(present, missing1).evaluate().unwrap());
    }

    #[test]
    fn test_filesmatch_directories_never_match() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        assert!(!FilesMatch::new(sub.clone(), sub).evaluate().unwrap());
    }

    #[test]
    fn test_filesmatch_text_mode_ignores_line_endings() {
        let dir = TempDir::new().unwrap();
        let unix = dir.path().join("unix.txt");
        let dos = dir.path().join("dos.txt");
        fs::write(&unix, "one\ntwo\n").unwrap();
        fs::write(&dos, "one\r\ntwo\r\n").unwrap();

        assert!(!FilesMatch::new(unix.clone(), dos.clone()).evaluate().unwrap());
        assert!(FilesMatch::new(unix.clone(), dos.clone())
            .with_text_file(true)
            .evaluate()
            .unwrap());

        let longer = dir.path().join("longer.txt");
        fs::write(&longer, "one\ntwo\nthree\n").unwrap();
        assert!(!FilesMatch::new(unix, longer)
            .with_text_file(true)
            .evaluate()
            .unwrap());
    }

    #[test]
    fn test_islastmodified_modes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("stamp");
        touch(&file, "x", 1_000_000);

        let at = |mode| {
            IsLastModified::new(file.clone(), Timestamp::Millis(1_000_000)).with_mode(mode)
        };
        assert!(at(CompareMode::Equals).evaluate());
        assert!(!at(CompareMode::Before).evaluate());
        assert!(!at(CompareMode::After).evaluate());
        assert!(at(CompareMode::NotBefore).evaluate());
        assert!(at(CompareMode::NotAfter).evaluate());

        let later = IsLastModified::new(file.clone(), Timestamp::Millis(2_000_000))
            .with_mode(CompareMode::Before);
        assert!(later.evaluate());

        let now = IsLastModified::new(file, Timestamp::Now).with_mode(CompareMode::Before);
        assert!(now.evaluate());
    }

    #[test]
    fn test_islastmodified_missing_file_is_epoch() {
        let dir = TempDir::new().unwrap();
        let missing = IsLastModified::new(dir.path().join("missing"), Timestamp::Millis(0));
        assert!(missing.evaluate());
    }

    #[test]
    fn test_timestamp_parse() {
        assert_eq!(
            Timestamp::parse("now", DEFAULT_DATETIME_PATTERN).unwrap(),
            Timestamp::Now
        );
        assert!(matches!(
            Timestamp::parse("01/15/2020 10:30 AM", DEFAULT_DATETIME_PATTERN).unwrap(),
            Timestamp::Millis(_)
        ));
        assert!(Timestamp::parse("yesterday", DEFAULT_DATETIME_PATTERN)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_compare_mode_parse() {
        assert_eq!("not-before".parse::<CompareMode>().unwrap(), CompareMode::NotBefore);
        assert!("sometime".parse::<CompareMode>().is_err());
    }

    #[test]
    fn test_uptodate_single_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("Main.src");
        let out = dir.path().join("Main.out");
        touch(&src, "src", 1_000_000);
        touch(&out, "out", 2_000_000);

        let check = UpToDate::new(out.clone()).with_source(src.clone());
        assert!(check.evaluate().unwrap());

        touch(&src, "changed", 3_000_000);
        assert!(!check.evaluate().unwrap());
    }

    #[test]
    fn test_uptodate_missing_target_or_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.src");
        touch(&src, "src", 1_000_000);

        let no_target = UpToDate::new(dir.path().join("none")).with_source(src);
        assert!(!no_target.evaluate().unwrap());

        let out = dir.path().join("a.out");
        touch(&out, "out", 1_000_000);
        let no_source = UpToDate::new(out).with_source(dir.path().join("gone.src"));
        let err = no_source.evaluate().unwrap_err();
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_uptodate_glob_sources() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        touch(&dir.path().join("src").join("a.txt"), "a", 1_000_000);
        touch(&dir.path().join("src").join("b.txt"), "b", 1_500_000);
        let out = dir.path().join("bundle.out");
        touch(&out, "out", 2_000_000);

        let check = UpToDate::new(out.clone())
            .with_pattern("src/*.txt", dir.path())
            .unwrap();
        assert!(check.evaluate().unwrap());

        touch(&dir.path().join("src").join("b.txt"), "b2", 2_500_000);
        assert!(!check.evaluate().unwrap());
    }

    #[test]
    fn test_uptodate_glob_skips_directories() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        touch(&src.join("a.txt"), "a", 1_000_000);
        let out = dir.path().join("out.bin");
        touch(&out, "out", 2_000_000);
        // created after the target, so its mtime is newer than everything
        fs::create_dir(src.join("sub")).unwrap();

        let check = UpToDate::new(out).with_pattern("src/*", dir.path()).unwrap();
        assert!(check.evaluate().unwrap());
    }

    #[test]
    fn test_uptodate_bad_pattern() {
        let err = UpToDate::new(PathBuf::from("/tmp/out"))
            .with_pattern("src/[*.txt", Path::new("/tmp"))
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
