//! Text rendering of an encoded file's header and code table.

use std::fmt;
use std::path::Path;

use huffpack_core::table::CodeEntry;
use huffpack_core::FileDetail;

/// Render `detail` for the `inspect` command.
///
/// Rows follow the order of the table records. Printable ASCII bytes are
/// shown as-is, everything else as `0x..`. Codes are printed bit by bit in
/// the order they appear in the payload, least significant bit first.
pub fn render(path: &Path, detail: &FileDetail) -> String {
    DetailView { path, detail }.to_string()
}

struct DetailView<'a> {
    path: &'a Path,
    detail: &'a FileDetail,
}

impl fmt::Display for DetailView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.detail.header;
        writeln!(f, "Filename:   {}", self.path.display())?;
        writeln!(f, "SHA256:     {}", hex::encode(header.digest))?;
        writeln!(
            f,
            "Table:      {} bytes, {} symbols",
            header.table_len,
            self.detail.table.len()
        )?;
        writeln!(f, "Final bits: {}", header.final_bits)?;
        writeln!(f)?;
        writeln!(f, "{:<10} {}", "Character", "Encode")?;

        for (byte, entry) in self.detail.table.iter() {
            writeln!(f, "{:<10} {}", render_byte(byte), render_code(entry))?;
        }
        Ok(())
    }
}

fn render_byte(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        (byte as char).to_string()
    } else {
        format!("0x{byte:02x}")
    }
}

fn render_code(entry: CodeEntry) -> String {
    (0..entry.bit_length)
        .map(|i| if (entry.code >> i) & 1 == 1 { '1' } else { '0' })
        .collect()
}
