use std::io::{self, Read, Write};

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};

/// Gzip'd tar builder with no time, host or owner information in its headers.
pub(crate) fn create_deterministic_tar<W: Write>(writer: W, level: u32) -> Builder<GzEncoder<W>> {
    let encoder = GzBuilder::new()
        .mtime(0)
        .operating_system(255)
        .write(writer, Compression::new(level.min(9)));

    let mut tar = Builder::new(encoder);
    tar.mode(tar::HeaderMode::Deterministic);
    tar
}

fn deterministic_header(size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
}

pub(crate) fn write_entry<T: Write>(tar: &mut Builder<T>, path: &str, data: &[u8]) -> io::Result<()> {
    write_entry_from(tar, path, data.len() as u64, data)
}

/// Append `size` bytes from `data`; long paths get a GNU long-name record.
pub(crate) fn write_entry_from<T: Write, R: Read>(
    tar: &mut Builder<T>,
    path: &str,
    size: u64,
    data: R,
) -> io::Result<()> {
    let mut header = deterministic_header(size);
    tar.append_data(&mut header, path, data)
}

/// Copy an entry read from another archive, keeping its header fields,
/// PAX extensions and payload bytes. Long paths and long link targets get
/// fresh GNU long-name records.
pub(crate) fn copy_entry<T: Write, R: Read>(
    tar: &mut Builder<T>,
    entry: &mut tar::Entry<'_, R>,
) -> io::Result<()> {
    let path = entry.path()?.into_owned();
    let link = match entry.header().entry_type() {
        EntryType::Symlink | EntryType::Link => entry.link_name()?.map(|l| l.into_owned()),
        _ => None,
    };

    let mut pax = Vec::new();
    if let Some(extensions) = entry.pax_extensions()? {
        for ext in extensions {
            let ext = ext?;
            let key = ext.key().map_err(io::Error::other)?;
            // Re-derived from the header and the long-name records below.
            if key == "path" || key == "size" || key == "linkpath" {
                continue;
            }
            pax.push((key.to_owned(), ext.value_bytes().to_vec()));
        }
    }
    if !pax.is_empty() {
        tar.append_pax_extensions(pax.iter().map(|(k, v)| (k.as_str(), v.as_slice())))?;
    }

    let mut header = entry.header().clone();
    if let Some(link) = link {
        header.set_size(0);
        return tar.append_link(&mut header, &path, &link);
    }
    header.set_size(entry.size());
    tar.append_data(&mut header, &path, entry)
}
