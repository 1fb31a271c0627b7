//! The resumable, overwrite-aware transfer engine: spec.md §4.6's
//! `Source` (upload) and `Sink` (download) algorithms.

pub mod batch;
pub mod download;
pub mod recursion;
pub mod upload;

pub use batch::{copy_to_local, copy_to_remote, stat_all, Finish};
pub use download::download_file;
pub use recursion::{download_directory, upload_directory};
pub use upload::upload_file;

use crate::progress::EolStyle;

/// Converts `data`'s line endings from `from` to `to`, the per-block
/// rewrite an ASCII transfer applies on both upload and download. A no-op
/// when the styles match.
pub(crate) fn convert_eol(data: &[u8], from: EolStyle, to: EolStyle) -> Vec<u8> {
    if from == to {
        return data.to_vec();
    }

    match (from, to) {
        (EolStyle::CrLf, EolStyle::Lf) => {
            let mut out = Vec::with_capacity(data.len());
            let mut i = 0;
            while i < data.len() {
                if data[i] == b'\r' && data.get(i + 1) == Some(&b'\n') {
                    out.push(b'\n');
                    i += 2;
                } else {
                    out.push(data[i]);
                    i += 1;
                }
            }
            out
        }
        (EolStyle::Lf, EolStyle::CrLf) => {
            let mut out = Vec::with_capacity(data.len());
            for &b in data {
                if b == b'\n' {
                    out.push(b'\r');
                }
                out.push(b);
            }
            out
        }
        _ => data.to_vec(),
    }
}

/// The destination-side name for an in-progress transfer:
/// `<dest><partial_ext>`.
pub(crate) fn partial_name(dest: &str, partial_ext: &str) -> String {
    format!("{dest}{partial_ext}")
}

/// A per-transfer line-ending converter that carries a trailing `\r` across
/// blocks, so a CRLF pair split across two reads (the `\r` ending one
/// block, the `\n` starting the next) is still recognized as a single line
/// ending instead of passing the `\r` through unconverted. The transfer
/// loops construct one of these per file and feed it every block, rather
/// than calling the stateless [`convert_eol`] per block.
///
/// Only `CrLf -> Lf` ever has bytes to carry; `Lf -> CrLf` and the no-op
/// case only ever inspect the current byte.
pub(crate) struct EolConverter {
    from: EolStyle,
    to: EolStyle,
    pending_cr: bool,
}

impl EolConverter {
    pub(crate) fn new(from: EolStyle, to: EolStyle) -> Self {
        EolConverter {
            from,
            to,
            pending_cr: false,
        }
    }

    pub(crate) fn convert(&mut self, data: &[u8]) -> Vec<u8> {
        if self.from == self.to {
            return data.to_vec();
        }
        if self.from == EolStyle::Lf {
            return convert_eol(data, self.from, self.to);
        }

        let mut out = Vec::with_capacity(data.len() + 1);
        let mut i = 0;

        if self.pending_cr {
            self.pending_cr = false;
            if data.first() == Some(&b'\n') {
                out.push(b'\n');
                i = 1;
            } else {
                out.push(b'\r');
            }
        }

        while i < data.len() {
            if data[i] == b'\r' {
                match data.get(i + 1) {
                    Some(b'\n') => {
                        out.push(b'\n');
                        i += 2;
                    }
                    Some(_) => {
                        out.push(b'\r');
                        i += 1;
                    }
                    None => {
                        // `\r` is the block's last byte: whether it's half
                        // of a CRLF pair is only known once the next block
                        // (or `finish`) arrives.
                        self.pending_cr = true;
                        i += 1;
                    }
                }
            } else {
                out.push(data[i]);
                i += 1;
            }
        }

        out
    }

    /// Flushes a trailing `\r` left over from the final block, which never
    /// got to see a following byte.
    pub(crate) fn finish(self) -> Vec<u8> {
        if self.pending_cr {
            vec![b'\r']
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_lf_to_crlf_and_back() {
        let lf = b"a\nb\nc";
        let crlf = convert_eol(lf, EolStyle::Lf, EolStyle::CrLf);
        assert_eq!(crlf, b"a\r\nb\r\nc");
        let back = convert_eol(&crlf, EolStyle::CrLf, EolStyle::Lf);
        assert_eq!(back, lf);
    }

    #[test]
    fn crlf_converter_reassembles_a_pair_split_across_blocks() {
        let mut conv = EolConverter::new(EolStyle::CrLf, EolStyle::Lf);
        let mut out = conv.convert(b"a\r");
        out.extend(conv.convert(b"\nb"));
        out.extend(conv.finish());
        assert_eq!(out, b"a\nb");
    }

    #[test]
    fn crlf_converter_flushes_a_genuinely_trailing_cr() {
        let mut conv = EolConverter::new(EolStyle::CrLf, EolStyle::Lf);
        let mut out = conv.convert(b"a\r");
        out.extend(conv.finish());
        assert_eq!(out, b"a\r");
    }

    #[test]
    fn eol_converter_matches_stateless_helper_for_lf_to_crlf() {
        let mut conv = EolConverter::new(EolStyle::Lf, EolStyle::CrLf);
        let out = conv.convert(b"a\nb\nc");
        assert_eq!(out, convert_eol(b"a\nb\nc", EolStyle::Lf, EolStyle::CrLf));
    }

    #[test]
    fn same_style_is_a_no_op() {
        let data = b"a\r\nb";
        assert_eq!(convert_eol(data, EolStyle::CrLf, EolStyle::CrLf), data);
    }
}
