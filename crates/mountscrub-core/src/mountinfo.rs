//! Mount table reader for `/proc/<pid>/mountinfo`.
//!
//! Each line of the table has the shape described in `proc_pid_mountinfo(5)`:
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! (1)(2) (3)   (4)   (5)      (6)      (7)  (8) (9)    (10)        (11)
//! ```
//!
//! Fields are located by position: the six leading fields are mandatory,
//! then any number of optional fields run up to a lone `-` token, then the
//! filesystem type and the mount source follow. A `-` appearing inside the
//! fixed prefix is therefore never mistaken for the terminator.
//!
//! Reading is fail-open. A missing or unreadable table yields no records, and
//! a line that does not match the grammar is skipped without affecting the
//! rest of the table.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use mountscrub_common::config::ScrubConfig;
use mountscrub_common::constants::{
    MAX_FIELD_LEN, MOUNTINFO_FILE, OPTIONAL_FIELDS_TERMINATOR, SELF_DIR,
};
use mountscrub_common::types::MountRecord;
use nix::unistd::Pid;
use nom::{
    IResult, Parser,
    bytes::complete::take_till1,
    character::complete::{i32 as signed_int, space0, space1},
    combinator::verify,
    multi::many0_count,
    sequence::preceded,
};

/// Process whose mount namespace is inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessTarget {
    /// The calling process, read through `/proc/self`.
    SelfProcess,
    /// Another process, read through `/proc/<pid>`.
    Pid(Pid),
}

impl From<Pid> for ProcessTarget {
    fn from(pid: Pid) -> Self {
        Self::Pid(pid)
    }
}

impl fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfProcess => f.write_str(SELF_DIR),
            Self::Pid(pid) => write!(f, "{pid}"),
        }
    }
}

/// Options controlling how individual fields are post-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Decode `\ooo` octal escapes in `root`, `target` and `source`.
    pub decode_escapes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            decode_escapes: true,
        }
    }
}

impl From<&ScrubConfig> for ParseOptions {
    fn from(config: &ScrubConfig) -> Self {
        Self {
            decode_escapes: config.decode_escapes,
        }
    }
}

/// Returns the path of the mount table for `target` under `proc_root`.
#[must_use]
pub fn mountinfo_path(proc_root: &Path, target: ProcessTarget) -> PathBuf {
    proc_root.join(target.to_string()).join(MOUNTINFO_FILE)
}

/// Reads the mount table of `target` from `/proc`.
///
/// Returns an empty vector when the table cannot be read, which means
/// "no information", not "no mounts".
#[must_use]
pub fn read_mountinfo(target: ProcessTarget) -> Vec<MountRecord> {
    read_mountinfo_with(&ScrubConfig::default(), target)
}

/// Reads the mount table of `target` from `config.proc_root`.
///
/// Same fail-open contract as [`read_mountinfo`]. The file handle is closed
/// before this function returns.
#[must_use]
pub fn read_mountinfo_with(config: &ScrubConfig, target: ProcessTarget) -> Vec<MountRecord> {
    let path = mountinfo_path(&config.proc_root, target);
    let content = match std::fs::read(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "mount table unavailable");
            return Vec::new();
        }
    };

    let text = String::from_utf8_lossy(&content);
    let mounts = parse_mountinfo(&text, ParseOptions::from(config));
    tracing::debug!(path = %path.display(), count = mounts.len(), "mount table read");
    mounts
}

/// Parses a whole mount table, keeping file order and skipping bad lines.
#[must_use]
pub fn parse_mountinfo(text: &str, options: ParseOptions) -> Vec<MountRecord> {
    text.split('\n')
        .filter_map(|line| parse_line(line, options))
        .collect()
}

/// Parses a single mountinfo line.
///
/// Returns `None` if the line lacks the optional-fields terminator, has too
/// few fields on either side of it, or does not start with a numeric id.
#[must_use]
pub fn parse_line(line: &str, options: ParseOptions) -> Option<MountRecord> {
    match mountinfo_line(line) {
        Ok((_, raw)) => Some(raw.into_record(options)),
        Err(e) => {
            tracing::trace!(line, error = %e, "skipping malformed mountinfo line");
            None
        }
    }
}

/// Borrowed view of the fields of one line, before post-processing.
struct RawMount<'a> {
    id: i32,
    root: &'a str,
    target: &'a str,
    source: &'a str,
}

impl RawMount<'_> {
    fn into_record(self, options: ParseOptions) -> MountRecord {
        MountRecord {
            id: self.id,
            root: clean_field(self.root, options),
            target: clean_field(self.target, options),
            source: clean_field(self.source, options),
        }
    }
}

/// A run of characters up to the next space or tab.
///
/// Only space, tab, newline and backslash are escaped by the kernel, so
/// other control characters such as `\r` or `\x0c` belong to the field.
fn token(input: &str) -> IResult<&str, &str> {
    take_till1(is_separator).parse(input)
}

const fn is_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// A token preceded by its separating whitespace.
fn field(input: &str) -> IResult<&str, &str> {
    preceded(space1, token).parse(input)
}

/// Field (1), the mount id.
fn mount_id(input: &str) -> IResult<&str, i32> {
    preceded(space0, signed_int).parse(input)
}

/// Fields (1) to (6); yields the id, root and mount point.
fn prefix(input: &str) -> IResult<&str, (i32, &str, &str)> {
    let (input, id) = mount_id(input)?;
    let (input, _parent_id) = field(input)?;
    let (input, _device) = field(input)?;
    let (input, root) = field(input)?;
    let (input, target) = field(input)?;
    let (input, _mount_options) = field(input)?;
    Ok((input, (id, root, target)))
}

/// Field (7) repeated, then the terminator (8).
fn optional_fields(input: &str) -> IResult<&str, usize> {
    let (input, count) =
        many0_count(verify(field, |t: &str| t != OPTIONAL_FIELDS_TERMINATOR)).parse(input)?;
    let (input, _) = verify(field, |t: &str| t == OPTIONAL_FIELDS_TERMINATOR).parse(input)?;
    Ok((input, count))
}

/// Fields (9) and (10); yields the mount source.
fn suffix(input: &str) -> IResult<&str, &str> {
    let (input, _fs_type) = field(input)?;
    let (input, source) = field(input)?;
    Ok((input, source))
}

fn mountinfo_line(input: &str) -> IResult<&str, RawMount<'_>> {
    let (input, (id, root, target)) = prefix(input)?;
    let (input, _) = optional_fields(input)?;
    let (input, source) = suffix(input)?;
    Ok((
        input,
        RawMount {
            id,
            root,
            target,
            source,
        },
    ))
}

fn clean_field(raw: &str, options: ParseOptions) -> String {
    let bounded = truncate_field(raw);
    if options.decode_escapes {
        decode_octal_escapes(bounded).into_owned()
    } else {
        bounded.to_owned()
    }
}

/// Cuts `raw` to at most [`MAX_FIELD_LEN`] bytes on a character boundary.
fn truncate_field(raw: &str) -> &str {
    if raw.len() <= MAX_FIELD_LEN {
        return raw;
    }
    let mut end = MAX_FIELD_LEN;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Decodes the `\ooo` escapes the kernel uses for space, tab, newline and
/// backslash. Sequences that are not three octal digits below `\400` are
/// left as they are.
fn decode_octal_escapes(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Some(value) = bytes.get(i + 1..i + 4).and_then(octal_byte) {
                decoded.push(value);
                i += 4;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    Cow::Owned(String::from_utf8_lossy(&decoded).into_owned())
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    let value = digits.iter().try_fold(0_u16, |acc, &d| {
        d.is_ascii_digit()
            .then_some(d)
            .filter(|d| *d < b'8')
            .map(|d| acc * 8 + u16::from(d - b'0'))
    })?;
    u8::try_from(value).ok()
}
