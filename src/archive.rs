use crate::types::{CaptureRecord, ImportError, RecordKind, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use warc::{Record, RecordType, StreamingBody, WarcHeader, WarcReader};

/// One open archive file, yielding capture records in file order.
///
/// The stream is finite and forward-only: records come out once, in the
/// order the archive stores them, and re-reading requires reopening the
/// file. `.gz` archives are decompressed on the fly; WARC gzip members are
/// concatenated, which is what the multi-member decoder handles.
pub struct ArchiveFile {
    reader: Reader,
}

enum Reader {
    Plain(WarcReader<BufReader<File>>),
    Gzip(WarcReader<BufReader<MultiGzDecoder<File>>>),
}

impl ArchiveFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);
        let reader = if gzip {
            Reader::Gzip(WarcReader::new(BufReader::new(MultiGzDecoder::new(file))))
        } else {
            Reader::Plain(WarcReader::new(BufReader::new(file)))
        };
        Ok(Self { reader })
    }

    /// Lazy iterator over the file's records. A decode error ends the
    /// stream for this file; the caller decides what that means for the run.
    pub fn records(&mut self) -> Box<dyn Iterator<Item = Result<CaptureRecord>> + '_> {
        match &mut self.reader {
            Reader::Plain(reader) => stream_records(reader),
            Reader::Gzip(reader) => stream_records(reader),
        }
    }
}

/// Adapt warc's by-reference streaming iterator into the boxed record
/// iterator, buffering each record's body as it is yielded.
fn stream_records<'r, R: std::io::BufRead + 'r>(
    reader: &'r mut WarcReader<R>,
) -> Box<dyn Iterator<Item = Result<CaptureRecord>> + 'r> {
    let mut iter = reader.stream_records();
    Box::new(std::iter::from_fn(move || Some(convert_record(iter.next_item()?))))
}

fn convert_record<R: std::io::Read>(
    item: std::result::Result<Record<StreamingBody<'_, R>>, warc::Error>,
) -> Result<CaptureRecord> {
    let record = item.map_err(ImportError::MalformedArchive)?;
    let record = record.into_buffered()?;

    let kind = match record.warc_type() {
        RecordType::Response => RecordKind::Response,
        RecordType::Request => RecordKind::Request,
        RecordType::Metadata => RecordKind::Metadata,
        _ => RecordKind::Other,
    };

    // Older archives wrap the target URI in angle brackets.
    let target_uri = record.header(WarcHeader::TargetURI).map(|uri| {
        uri.trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string()
    });

    let (content_type, payload) = if kind == RecordKind::Response {
        parse_http_response(record.body())
    } else {
        (None, Vec::new())
    };

    Ok(CaptureRecord {
        kind,
        target_uri,
        content_type,
        payload,
    })
}

/// Parse the HTTP response head embedded in a WARC response block and
/// return the declared content type plus the decoded body bytes.
///
/// A block that does not parse as an HTTP response (truncated head,
/// non-HTTP capture) yields no content type and an empty payload, which the
/// classifier then rejects. The same goes for bodies whose declared
/// transfer or content encoding cannot be undone.
fn parse_http_response(block: &[u8]) -> (Option<String>, Vec<u8>) {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut response = httparse::Response::new(&mut headers);
    let head_len = match response.parse(block) {
        Ok(httparse::Status::Complete(len)) => len,
        _ => return (None, Vec::new()),
    };

    let header = |name: &str| -> Option<String> {
        response
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .and_then(|h| std::str::from_utf8(h.value).ok())
            .map(|v| v.trim().to_string())
    };

    let content_type = header("content-type");
    let transfer_encoding = header("transfer-encoding");
    let content_encoding = header("content-encoding");

    let mut body = block[head_len..].to_vec();

    if let Some(te) = transfer_encoding {
        if te.eq_ignore_ascii_case("chunked") {
            match dechunk(&body) {
                Some(decoded) => body = decoded,
                None => return (content_type, Vec::new()),
            }
        }
    }

    if let Some(ce) = content_encoding {
        if ce.eq_ignore_ascii_case("gzip") || ce.eq_ignore_ascii_case("x-gzip") {
            match gunzip(&body) {
                Some(decoded) => body = decoded,
                None => return (content_type, Vec::new()),
            }
        } else if !ce.eq_ignore_ascii_case("identity") {
            // Encoding we do not undo (br, deflate, ...): nothing usable.
            return (content_type, Vec::new());
        }
    }

    (content_type, body)
}

/// Undo HTTP chunked transfer encoding. Returns `None` when the framing is
/// inconsistent with the declared sizes.
fn dechunk(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut rest = body;
    loop {
        let line_end = rest.windows(2).position(|w| w == b"\r\n")?;
        let size_line = std::str::from_utf8(&rest[..line_end]).ok()?;
        let size_hex = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            return Some(out);
        }
        if rest.len() < size + 2 {
            return None;
        }
        out.extend_from_slice(&rest[..size]);
        rest = &rest[size..];
        if !rest.starts_with(b"\r\n") {
            return None;
        }
        rest = &rest[2..];
    }
}

fn gunzip(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    MultiGzDecoder::new(body).read_to_end(&mut out).ok()?;
    Some(out)
}
