use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

use crate::error::{Error, Result};

static DECLARED_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("encoding declaration pattern is valid")
});

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a raw document with the encoding named in its XML declaration.
/// Documents without one (or declaring UTF-8) must be valid UTF-8.
pub fn decode_document(data: &[u8]) -> Result<String> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let label = DECLARED_ENCODING
        .captures(data)
        .and_then(|c| c.get(1))
        .map(|m| m.as_bytes());
    let encoding = match label {
        Some(label) => Encoding::for_label(label)
            .ok_or_else(|| Error::UnknownEncoding(String::from_utf8_lossy(label).into_owned()))?,
        None => UTF_8,
    };
    if encoding == UTF_8 {
        return String::from_utf8(data.to_vec()).map_err(|_| Error::NonUtf8);
    }
    let (text, had_errors) = encoding.decode_without_bom_handling(data);
    if had_errors {
        return Err(Error::Malformed(encoding.name()));
    }
    tracing::debug!(encoding = encoding.name(), "decoded XML document");
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_latin1_is_decoded() {
        let mut data = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<a>caf".to_vec();
        data.extend_from_slice(&[0xE9, b'<', b'/', b'a', b'>']);
        let text = decode_document(&data).unwrap();
        assert!(text.ends_with("<a>caf\u{e9}</a>"));
    }

    #[test]
    fn utf8_is_the_default() {
        assert_eq!(decode_document(b"\xEF\xBB\xBF<a/>").unwrap(), "<a/>");
        assert_eq!(
            decode_document(b"<?xml version='1.0' encoding='utf-8'?><a/>").unwrap(),
            "<?xml version='1.0' encoding='utf-8'?><a/>"
        );
        assert!(matches!(decode_document(b"<a>\xff</a>"), Err(Error::NonUtf8)));
        assert!(matches!(
            decode_document(b"<?xml version=\"1.0\" encoding=\"klingon\"?><a/>"),
            Err(Error::UnknownEncoding(_))
        ));
    }
}
