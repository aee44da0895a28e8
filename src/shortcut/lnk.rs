//! Shell Link (`.lnk`) encoding and decoding
//!
//! Implements the subset of the MS-SHLLINK format that a Startup shortcut
//! needs: the fixed header, a `LinkInfo` block locating the target by local
//! path, and Unicode string data for the description, working directory and
//! arguments. No `LinkTargetIDList` is written; the shell resolves the target
//! from `LinkInfo`.
//!
//! # Layout written
//!
//! ```text
//! ShellLinkHeader   76 bytes
//! LinkInfo          header (0x24) | VolumeID | ANSI path | suffix | UTF-16 path | suffix
//! StringData        NAME? WORKING_DIR? ARGUMENTS?   (u16 count + UTF-16LE)
//! ExtraData         terminal block (u32 0)
//! ```

use crate::error::{InstallError, InstallResult};

const HEADER_SIZE: u32 = 0x4C;

/// {00021401-0000-0000-C000-000000000046} in on-disk byte order
const LINK_CLSID: [u8; 16] = [
    0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46,
];

// LinkFlags
const HAS_LINK_TARGET_ID_LIST: u32 = 0x0000_0001;
const HAS_LINK_INFO: u32 = 0x0000_0002;
const HAS_NAME: u32 = 0x0000_0004;
const HAS_RELATIVE_PATH: u32 = 0x0000_0008;
const HAS_WORKING_DIR: u32 = 0x0000_0010;
const HAS_ARGUMENTS: u32 = 0x0000_0020;
const HAS_ICON_LOCATION: u32 = 0x0000_0040;
const IS_UNICODE: u32 = 0x0000_0080;

const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;

// LinkInfo
const LINK_INFO_HEADER_SIZE: u32 = 0x24;
const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x1;
const VOLUME_ID_SIZE: u32 = 0x11;
const DRIVE_FIXED: u32 = 3;

/// Decoded or to-be-encoded shortcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLink {
    /// Absolute drive-letter path of the target, e.g. `D:\dev\snap_tools\run.bat`
    pub target:       String,
    /// Start-in directory
    pub working_dir:  Option<String>,
    /// Command-line arguments
    pub arguments:    Option<String>,
    /// Comment shown as the shortcut tooltip
    pub description:  Option<String>,
    /// Win32 `SW_*` show command
    pub show_command: u32,
}

/// `C:\...` with an ASCII drive letter
pub fn is_drive_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

impl ShellLink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target:       target.into(),
            working_dir:  None,
            arguments:    None,
            description:  None,
            show_command: 1,
        }
    }

    /// Serializes the link
    ///
    /// Only drive-letter targets are supported; UNC targets would need a
    /// `CommonNetworkRelativeLink` block.
    pub fn to_bytes(&self) -> InstallResult<Vec<u8>> {
        if !is_drive_absolute(&self.target) {
            return Err(InstallError::InvalidParameter {
                parameter: "target".to_string(),
                reason:    format!("'{}' is not an absolute drive-letter path", self.target),
            });
        }

        let strings = [
            (HAS_NAME, self.description.as_deref()),
            (HAS_WORKING_DIR, self.working_dir.as_deref()),
            (HAS_ARGUMENTS, self.arguments.as_deref()),
        ];

        let mut flags = HAS_LINK_INFO | IS_UNICODE;
        for (flag, value) in &strings {
            if let Some(value) = value {
                check_string_len(value)?;
                flags |= flag;
            }
        }

        let mut out = Vec::with_capacity(256);
        write_header(&mut out, flags, self.show_command);
        write_link_info(&mut out, &self.target);
        for (_, value) in strings {
            if let Some(value) = value {
                write_counted_utf16(&mut out, value);
            }
        }
        // TerminalBlock
        out.extend_from_slice(&0u32.to_le_bytes());
        Ok(out)
    }

    /// Parses a link produced by this module or by the Windows shell
    pub fn from_bytes(data: &[u8]) -> InstallResult<Self> {
        let mut reader = Reader::new(data);

        if reader.u32()? != HEADER_SIZE {
            return Err(malformed("unexpected header size"));
        }
        if reader.take(16)? != LINK_CLSID {
            return Err(malformed("not a Shell Link (CLSID mismatch)"));
        }
        let flags = reader.u32()?;
        reader.skip(4 + 8 * 3 + 4 + 4)?; // attributes, times, file size, icon index
        let show_command = reader.u32()?;
        reader.skip(2 + 2 + 4 + 4)?; // hotkey, reserved

        if flags & HAS_LINK_TARGET_ID_LIST != 0 {
            let size = reader.u16()? as usize;
            reader.skip(size)?;
        }

        let mut target = None;
        if flags & HAS_LINK_INFO != 0 {
            target = read_link_info(&mut reader)?;
        }

        let unicode = flags & IS_UNICODE != 0;
        let next_string = |flag: u32, reader: &mut Reader<'_>| -> InstallResult<Option<String>> {
            if flags & flag != 0 {
                reader.counted_string(unicode).map(Some)
            } else {
                Ok(None)
            }
        };
        let description = next_string(HAS_NAME, &mut reader)?;
        let relative_path = next_string(HAS_RELATIVE_PATH, &mut reader)?;
        let working_dir = next_string(HAS_WORKING_DIR, &mut reader)?;
        let arguments = next_string(HAS_ARGUMENTS, &mut reader)?;
        next_string(HAS_ICON_LOCATION, &mut reader)?;

        let target = target
            .or(relative_path)
            .ok_or_else(|| malformed("link has neither a local base path nor a relative path"))?;

        Ok(Self {
            target,
            working_dir,
            arguments,
            description,
            show_command,
        })
    }
}

fn malformed(reason: impl Into<String>) -> InstallError {
    InstallError::MalformedShortcut {
        reason: reason.into(),
    }
}

fn check_string_len(value: &str) -> InstallResult<()> {
    if value.encode_utf16().count() > u16::MAX as usize {
        return Err(InstallError::InvalidParameter {
            parameter: "shortcut string".to_string(),
            reason:    "longer than 65535 UTF-16 units".to_string(),
        });
    }
    Ok(())
}

fn write_header(out: &mut Vec<u8>, flags: u32, show_command: u32) {
    out.extend_from_slice(&HEADER_SIZE.to_le_bytes());
    out.extend_from_slice(&LINK_CLSID);
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&FILE_ATTRIBUTE_ARCHIVE.to_le_bytes());
    out.extend_from_slice(&[0u8; 24]); // creation, access, write times
    out.extend_from_slice(&0u32.to_le_bytes()); // file size
    out.extend_from_slice(&0i32.to_le_bytes()); // icon index
    out.extend_from_slice(&show_command.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // hotkey
    out.extend_from_slice(&[0u8; 10]); // reserved 1..3
}

/// Non-ASCII characters have no portable ANSI form; the shell prefers the
/// Unicode path whenever the header advertises it.
fn ansi_lossy(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

fn write_link_info(out: &mut Vec<u8>, target: &str) {
    let ansi_path = ansi_lossy(target);
    let unicode_path: Vec<u16> = target.encode_utf16().collect();

    let volume_id_offset = LINK_INFO_HEADER_SIZE;
    let local_base_path_offset = volume_id_offset + VOLUME_ID_SIZE;
    let common_suffix_offset = local_base_path_offset + ansi_path.len() as u32 + 1;
    let local_base_path_unicode_offset = common_suffix_offset + 1;
    let common_suffix_unicode_offset =
        local_base_path_unicode_offset + (unicode_path.len() as u32 + 1) * 2;
    let link_info_size = common_suffix_unicode_offset + 2;

    for value in [
        link_info_size,
        LINK_INFO_HEADER_SIZE,
        VOLUME_ID_AND_LOCAL_BASE_PATH,
        volume_id_offset,
        local_base_path_offset,
        0, // CommonNetworkRelativeLinkOffset
        common_suffix_offset,
        local_base_path_unicode_offset,
        common_suffix_unicode_offset,
    ] {
        out.extend_from_slice(&value.to_le_bytes());
    }

    // VolumeID with an empty label
    out.extend_from_slice(&VOLUME_ID_SIZE.to_le_bytes());
    out.extend_from_slice(&DRIVE_FIXED.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // serial number
    out.extend_from_slice(&0x10u32.to_le_bytes()); // label offset
    out.push(0);

    out.extend_from_slice(&ansi_path);
    out.push(0);
    out.push(0); // empty CommonPathSuffix

    for unit in unicode_path {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&[0, 0]); // empty CommonPathSuffixUnicode
}

fn read_link_info(reader: &mut Reader<'_>) -> InstallResult<Option<String>> {
    let start = reader.pos;
    let size = reader.u32()? as usize;
    let block = reader
        .data
        .get(start..start + size)
        .ok_or_else(|| malformed("LinkInfo extends past end of file"))?;
    let field = |offset: usize| -> InstallResult<u32> {
        block
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| malformed("truncated LinkInfo header"))
    };

    let header_size = field(4)?;
    let flags = field(8)?;
    reader.pos = start + size;

    if flags & VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
        return Ok(None);
    }

    let (base, suffix) = if header_size >= LINK_INFO_HEADER_SIZE {
        let base = field(0x1C)? as usize;
        let suffix = field(0x20)? as usize;
        (utf16_z(block, base)?, utf16_z(block, suffix)?)
    } else {
        let base = field(0x10)? as usize;
        let suffix = field(0x18)? as usize;
        (ansi_z(block, base)?, ansi_z(block, suffix)?)
    };

    Ok(Some(base + &suffix))
}

fn ansi_z(block: &[u8], offset: usize) -> InstallResult<String> {
    let tail = block
        .get(offset..)
        .ok_or_else(|| malformed("string offset out of range"))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| malformed("unterminated ANSI string"))?;
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

fn utf16_z(block: &[u8], offset: usize) -> InstallResult<String> {
    let tail = block
        .get(offset..)
        .ok_or_else(|| malformed("string offset out of range"))?;
    let units: Vec<u16> = tail
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let end = units
        .iter()
        .position(|&unit| unit == 0)
        .ok_or_else(|| malformed("unterminated Unicode string"))?;
    String::from_utf16(&units[..end]).map_err(|_| malformed("invalid UTF-16 in LinkInfo"))
}

fn write_counted_utf16(out: &mut Vec<u8>, value: &str) {
    let units: Vec<u16> = value.encode_utf16().collect();
    out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

/// Little-endian cursor with bounds checks
struct Reader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> InstallResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| malformed("unexpected end of file"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> InstallResult<()> {
        self.take(len).map(|_| ())
    }

    fn u16(&mut self) -> InstallResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> InstallResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn counted_string(&mut self, unicode: bool) -> InstallResult<String> {
        let count = self.u16()? as usize;
        if unicode {
            let bytes = self.take(count * 2)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| malformed("invalid UTF-16 in StringData"))
        } else {
            let bytes = self.take(count)?;
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
