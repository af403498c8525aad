use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use grabber_logging::grabber_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding_label: String,
}

/// Decode a fetched page into UTF-8: BOM -> Content-Type charset -> chardetng guess.
///
/// Malformed sequences are replaced rather than rejected; a page with one bad
/// byte still carries a usable build table or versions list.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> DecodedPage {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        grabber_warn!(
            "Page bytes were not valid {}; replaced malformed sequences",
            encoding.name()
        );
    }
    DecodedPage {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    }
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
    })
}
