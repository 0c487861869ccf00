//! AML name segments, name strings and absolute paths.
//!
//! ACPI names are composed of 4-byte segments. A [`NameString`] is what the
//! bytecode spells (an optional `\` or `^` prefix plus segments); an
//! [`AmlPath`] is a fully resolved position in the namespace, stored inline
//! with a fixed depth so it can be copied around as a lookup key.

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::error::AmlError;
use crate::opcode::{
    DUAL_NAME_PREFIX, MULTI_NAME_PREFIX, NULL_NAME, PARENT_PREFIX_CHAR, ROOT_CHAR,
    is_lead_name_char, is_name_char,
};
use crate::stream::AmlStream;

/// A 4-byte AML name segment (e.g., `_SB_`, `PCI0`, `_HID`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameSeg(pub [u8; 4]);

impl NameSeg {
    /// Creates a `NameSeg` from a short ASCII name, padding with `_`.
    ///
    /// Panics at compile time (in const contexts) if `name` is longer than
    /// four bytes; intended for well-known names such as `"_STA"`.
    #[must_use]
    pub const fn from_str(name: &str) -> Self {
        let bytes = name.as_bytes();
        assert!(!bytes.is_empty() && bytes.len() <= 4, "NameSeg must be 1-4 chars");
        let mut seg = [b'_'; 4];
        let mut i = 0;
        while i < bytes.len() {
            seg[i] = bytes[i];
            i += 1;
        }
        Self(seg)
    }

    /// Validates raw bytes as a NameSeg.
    pub fn new(bytes: [u8; 4]) -> Result<Self, AmlError> {
        let valid = is_lead_name_char(bytes[0]) && bytes[1..].iter().all(|&b| is_name_char(b));
        if valid {
            Ok(Self(bytes))
        } else {
            Err(AmlError::InvalidNameSeg(bytes))
        }
    }

    /// Decodes a NameSeg at the cursor.
    pub fn parse(stream: &mut AmlStream<'_>) -> Result<Self, AmlError> {
        let mut cursor = stream.clone();
        let seg = Self::new(cursor.read_array()?)?;
        *stream = cursor;
        Ok(seg)
    }

    /// Returns the full four-character name (ACPI names are always ASCII).
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("")
    }

    /// Returns the name with trailing `_` padding removed (`_SB_` → `_SB`).
    ///
    /// The first character is always kept, so `____` displays as `_`.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        let s = self.as_str();
        let trimmed = s.trim_end_matches('_');
        if trimmed.is_empty() { &s[..1.min(s.len())] } else { trimmed }
    }
}

impl core::fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NameSeg(\"{}\")", self.as_str())
    }
}

impl core::fmt::Display for NameSeg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.trimmed())
    }
}

/// Maximum number of segments in an inline AML path.
const MAX_PATH_DEPTH: usize = 16;

/// A fixed-capacity, absolute AML namespace path.
///
/// Stores up to [`MAX_PATH_DEPTH`] (16) segments inline, which is sufficient
/// for all practical ACPI namespace depths.
#[derive(Clone, Copy)]
pub struct AmlPath {
    segments: [NameSeg; MAX_PATH_DEPTH],
    len: u8,
}

impl AmlPath {
    /// The root path (`\`).
    pub const ROOT: Self = Self {
        segments: [NameSeg(*b"____"); MAX_PATH_DEPTH],
        len: 0,
    };

    /// Creates the root path.
    #[must_use]
    pub const fn new() -> Self {
        Self::ROOT
    }

    /// Builds a path from segments.
    pub fn from_segments(segments: &[NameSeg]) -> Result<Self, AmlError> {
        let mut path = Self::ROOT;
        for &seg in segments {
            path.push(seg)?;
        }
        Ok(path)
    }

    /// Parses a dotted ASL-style path such as `\_SB.PCI0._STA`.
    ///
    /// The leading `\` is optional; segments shorter than four characters
    /// are padded with `_`.
    pub fn parse_str(path: &str) -> Result<Self, AmlError> {
        let body = path.strip_prefix('\\').unwrap_or(path);
        let mut out = Self::ROOT;
        if body.is_empty() {
            return Ok(out);
        }
        for part in body.split('.') {
            let bytes = part.as_bytes();
            if bytes.is_empty() || bytes.len() > 4 {
                return Err(AmlError::ObjectNotFound(String::from(path)));
            }
            let mut raw = [b'_'; 4];
            raw[..bytes.len()].copy_from_slice(bytes);
            out.push(NameSeg::new(raw)?)?;
        }
        Ok(out)
    }

    /// Appends a name segment to the path.
    pub fn push(&mut self, seg: NameSeg) -> Result<(), AmlError> {
        if (self.len as usize) >= MAX_PATH_DEPTH {
            return Err(AmlError::PathOverflow);
        }
        self.segments[self.len as usize] = seg;
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last name segment from the path.
    pub fn pop(&mut self) -> Option<NameSeg> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.segments[self.len as usize])
    }

    /// Returns a copy of this path with `seg` appended.
    pub fn join(&self, seg: NameSeg) -> Result<Self, AmlError> {
        let mut out = *self;
        out.push(seg)?;
        Ok(out)
    }

    /// Returns the enclosing scope, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let mut out = *self;
        out.pop().map(|_| out)
    }

    /// Returns the last segment, or `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<NameSeg> {
        self.segments().last().copied()
    }

    /// Returns the segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[NameSeg] {
        &self.segments[..self.len as usize]
    }

    /// Returns the number of segments (depth) in this path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` for `\`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `self` is `scope` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, scope: &AmlPath) -> bool {
        self.segments().starts_with(scope.segments())
    }
}

impl Default for AmlPath {
    fn default() -> Self {
        Self::ROOT
    }
}

impl PartialEq for AmlPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments() == other.segments()
    }
}

impl Eq for AmlPath {}

impl PartialOrd for AmlPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AmlPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(other.segments())
    }
}

impl core::hash::Hash for AmlPath {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.segments().hash(state);
    }
}

impl core::fmt::Debug for AmlPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AmlPath({self})")
    }
}

impl core::fmt::Display for AmlPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "\\")?;
        for (i, seg) in self.segments().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

/// Where a [`NameString`] is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePrefix {
    /// No prefix: relative to the current scope (and searched upwards if it
    /// is a single segment).
    None,
    /// `\`: absolute from the root.
    Root,
    /// A run of `^`: start this many scopes above the current one.
    Parent(u8),
}

/// A NameString as encoded in AML bytecode.
#[derive(Clone, PartialEq, Eq)]
pub struct NameString {
    /// The anchor of the name.
    pub prefix: NamePrefix,
    /// Zero or more segments following the prefix.
    pub segments: Vec<NameSeg>,
}

impl NameString {
    /// The `NullName` sentinel: no prefix, no segments.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            prefix: NamePrefix::None,
            segments: Vec::new(),
        }
    }

    /// A relative single-segment name.
    #[must_use]
    pub fn from_seg(seg: NameSeg) -> Self {
        Self {
            prefix: NamePrefix::None,
            segments: alloc::vec![seg],
        }
    }

    /// An absolute name for `path`.
    #[must_use]
    pub fn absolute(path: &AmlPath) -> Self {
        Self {
            prefix: NamePrefix::Root,
            segments: path.segments().to_vec(),
        }
    }

    /// Parses the ASL text form of a name (`\_SB.PCI0`, `^^FOO`, `BAR`).
    pub fn parse_str(name: &str) -> Result<Self, AmlError> {
        let (prefix, body) = if let Some(rest) = name.strip_prefix('\\') {
            (NamePrefix::Root, rest)
        } else {
            let carets = name.bytes().take_while(|&b| b == PARENT_PREFIX_CHAR).count();
            let count = u8::try_from(carets).map_err(|_| AmlError::PathOverflow)?;
            let prefix = if count == 0 {
                NamePrefix::None
            } else {
                NamePrefix::Parent(count)
            };
            (prefix, &name[carets..])
        };
        let segments = if body.is_empty() {
            Vec::new()
        } else {
            AmlPath::parse_str(body)?.segments().to_vec()
        };
        Ok(Self { prefix, segments })
    }

    /// Returns `true` if this is the `NullName` sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.prefix == NamePrefix::None && self.segments.is_empty()
    }

    /// Returns `true` if name resolution should search enclosing scopes.
    ///
    /// Only prefix-less single-segment names are searched; everything else
    /// names exactly one location.
    #[must_use]
    pub fn is_search_candidate(&self) -> bool {
        self.prefix == NamePrefix::None && self.segments.len() == 1
    }

    /// Returns `true` if `byte` can begin a NameString (including `NullName`).
    #[must_use]
    pub const fn can_parse(byte: u8) -> bool {
        byte == NULL_NAME || crate::opcode::is_name_string_lead(byte)
    }

    /// Decodes a NameString at the cursor.
    ///
    /// On failure (including a truncated segment list) the cursor does not
    /// move.
    pub fn parse(stream: &mut AmlStream<'_>) -> Result<Self, AmlError> {
        let mut cursor = stream.clone();

        let prefix = match cursor.peek()? {
            ROOT_CHAR => {
                cursor.skip(1)?;
                NamePrefix::Root
            }
            PARENT_PREFIX_CHAR => {
                let mut count = 0u8;
                while cursor.peek()? == PARENT_PREFIX_CHAR {
                    cursor.skip(1)?;
                    count = count.checked_add(1).ok_or(AmlError::PathOverflow)?;
                }
                NamePrefix::Parent(count)
            }
            _ => NamePrefix::None,
        };

        let seg_count = match cursor.peek()? {
            NULL_NAME => {
                cursor.skip(1)?;
                0
            }
            DUAL_NAME_PREFIX => {
                cursor.skip(1)?;
                2
            }
            MULTI_NAME_PREFIX => {
                cursor.skip(1)?;
                usize::from(cursor.read_u8()?)
            }
            b if is_lead_name_char(b) => 1,
            b => {
                return Err(AmlError::InvalidOpcode {
                    opcode: b,
                    extended: false,
                });
            }
        };

        let mut segments = Vec::with_capacity(seg_count);
        for _ in 0..seg_count {
            segments.push(NameSeg::parse(&mut cursor)?);
        }

        *stream = cursor;
        Ok(Self { prefix, segments })
    }

    /// Encodes this name back into AML bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.segments.len() * 4);
        match self.prefix {
            NamePrefix::None => {}
            NamePrefix::Root => out.push(ROOT_CHAR),
            NamePrefix::Parent(n) => out.extend(core::iter::repeat_n(PARENT_PREFIX_CHAR, n.into())),
        }
        match self.segments.len() {
            0 => out.push(NULL_NAME),
            1 => {}
            2 => out.push(DUAL_NAME_PREFIX),
            n => {
                out.push(MULTI_NAME_PREFIX);
                out.push(n as u8);
            }
        }
        for seg in &self.segments {
            out.extend_from_slice(&seg.0);
        }
        out
    }

    /// Resolves this name against `scope` without searching.
    ///
    /// Returns the absolute path the name denotes.
    pub fn resolve(&self, scope: &AmlPath) -> Result<AmlPath, AmlError> {
        let mut base = match self.prefix {
            NamePrefix::Root => AmlPath::ROOT,
            NamePrefix::None => *scope,
            NamePrefix::Parent(n) => {
                let mut base = *scope;
                for _ in 0..n {
                    base.pop()
                        .ok_or_else(|| AmlError::InvalidScope(alloc::format!("{self}")))?;
                }
                base
            }
        };
        for &seg in &self.segments {
            base.push(seg)?;
        }
        Ok(base)
    }
}

impl core::fmt::Debug for NameString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NameString({self})")
    }
}

impl core::fmt::Display for NameString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.prefix {
            NamePrefix::None => {}
            NamePrefix::Root => f.write_str("\\")?,
            NamePrefix::Parent(n) => {
                for _ in 0..n {
                    f.write_str("^")?;
                }
            }
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(s: &str) -> NameSeg {
        NameSeg::from_str(s)
    }

    #[test]
    fn display_strips_padding() {
        assert_eq!(alloc::format!("{}", seg("_SB")), "_SB");
        assert_eq!(alloc::format!("{}", NameSeg(*b"____")), "_");
        assert_eq!(seg("_SB").as_str(), "_SB_");
    }

    #[test]
    fn rejects_bad_lead_char() {
        assert!(NameSeg::new(*b"1ABC").is_err());
        assert!(NameSeg::new(*b"A1B_").is_ok());
    }

    #[test]
    fn parse_single_segment() {
        let mut s = AmlStream::new(b"FOO_\x01");
        let name = NameString::parse(&mut s).unwrap();
        assert_eq!(name.prefix, NamePrefix::None);
        assert_eq!(name.segments, [seg("FOO")]);
        assert_eq!(s.position(), 4);
    }

    #[test]
    fn parse_prefixes_and_multi() {
        let mut s = AmlStream::new(b"\\/\x03_SB_PCI0LPCB");
        let name = NameString::parse(&mut s).unwrap();
        assert_eq!(name.prefix, NamePrefix::Root);
        assert_eq!(name.segments.len(), 3);
        assert_eq!(alloc::format!("{name}"), "\\_SB.PCI0.LPCB");

        let mut s = AmlStream::new(b"^^.AAAABBBB");
        let name = NameString::parse(&mut s).unwrap();
        assert_eq!(name.prefix, NamePrefix::Parent(2));
        assert_eq!(name.segments, [seg("AAAA"), seg("BBBB")]);
    }

    #[test]
    fn null_name() {
        let mut s = AmlStream::new(&[0x00]);
        assert!(NameString::parse(&mut s).unwrap().is_null());
    }

    #[test]
    fn truncated_is_failure() {
        let mut s = AmlStream::new(b"\\.AAAABB");
        assert_eq!(NameString::parse(&mut s), Err(AmlError::UnexpectedEnd));
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn encode_round_trip() {
        let names = [
            NameString::from_seg(seg("X")),
            NameString { prefix: NamePrefix::Root, segments: alloc::vec![] },
            NameString { prefix: NamePrefix::Parent(3), segments: alloc::vec![seg("A"), seg("B")] },
            NameString {
                prefix: NamePrefix::Root,
                segments: alloc::vec![seg("_SB"), seg("PCI0"), seg("GFX0"), seg("_DOS")],
            },
        ];
        for name in names {
            let bytes = name.encode();
            let mut s = AmlStream::new(&bytes);
            assert_eq!(NameString::parse(&mut s).unwrap(), name);
            assert!(s.is_empty());
        }
    }

    #[test]
    fn resolve_parent_prefix() {
        let scope = AmlPath::parse_str("\\_SB.PCI0.LPCB").unwrap();
        let name = NameString { prefix: NamePrefix::Parent(1), segments: alloc::vec![seg("EC0")] };
        assert_eq!(name.resolve(&scope).unwrap(), AmlPath::parse_str("\\_SB.PCI0.EC0").unwrap());

        let too_far = NameString { prefix: NamePrefix::Parent(4), segments: alloc::vec![] };
        assert!(matches!(too_far.resolve(&scope), Err(AmlError::InvalidScope(_))));
    }

    #[test]
    fn path_equality_ignores_popped_segments() {
        let mut a = AmlPath::parse_str("\\A.B").unwrap();
        a.pop();
        assert_eq!(a, AmlPath::parse_str("\\A").unwrap());
        assert_eq!(alloc::format!("{a}"), "\\A");
    }

    #[test]
    fn parse_text_names() {
        let name = NameString::parse_str("^^FOO.BAR").unwrap();
        assert_eq!(name.prefix, NamePrefix::Parent(2));
        assert_eq!(name.segments, [seg("FOO"), seg("BAR")]);
        assert!(NameString::parse_str("\\_SB").unwrap().prefix == NamePrefix::Root);
        assert!(NameString::parse_str("TOOLONG").is_err());
    }
}
