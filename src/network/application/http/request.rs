//! Request construction.
//!
//! Every builder turns the client's [`UriKey`] and the caller's arguments into a
//! [`PendingRequest`]: an ordered list of [`RequestPart`]s that the writer drains
//! onto the socket. Header text is rendered into owned fixed-capacity buffers;
//! caller data (POST bodies, multipart chunk data, raw requests) is borrowed and
//! never copied.

use core::fmt::Write as _;

use heapless::String;

use super::{
    ClientOptions, HttpError, MULTIPART_BOUNDARY, PART_CAPACITY, PendingRequest, UriKey,
};

/// Value of the `Connection` header of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Ask the server to close the connection after the response.
    Close,
    /// Ask the server to keep the connection open.
    KeepAlive,
}

impl ConnectionMode {
    /// Token used by GET and DELETE requests.
    fn token(self) -> &'static str {
        match self {
            ConnectionMode::Close => "close",
            ConnectionMode::KeepAlive => "Keep-Alive",
        }
    }

    /// Token used by POST requests.
    fn post_token(self) -> &'static str {
        match self {
            ConnectionMode::Close => "Close",
            ConnectionMode::KeepAlive => "Keep-Alive",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnectionMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConnectionMode::Close => defmt::write!(f, "Close"),
            ConnectionMode::KeepAlive => defmt::write!(f, "KeepAlive"),
        }
    }
}

/// Who owns the bytes of a [`RequestPart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Rendered by the library; released when the part is dropped.
    HeapCopy,
    /// Borrowed from the caller; never released by the library.
    CallerOwned,
}

#[derive(Debug)]
enum PartBuf<'a> {
    Owned(String<PART_CAPACITY>),
    Borrowed(&'a [u8]),
}

/// One contiguous buffer of a request, with its own write cursor.
#[derive(Debug)]
pub struct RequestPart<'a> {
    buf: PartBuf<'a>,
    written: usize,
}

impl<'a> RequestPart<'a> {
    /// A part holding library-rendered text.
    pub fn owned(text: String<PART_CAPACITY>) -> Self {
        Self {
            buf: PartBuf::Owned(text),
            written: 0,
        }
    }

    /// A part aliasing caller memory.
    pub fn borrowed(data: &'a [u8]) -> Self {
        Self {
            buf: PartBuf::Borrowed(data),
            written: 0,
        }
    }

    /// All bytes of the part.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buf {
            PartBuf::Owned(text) => text.as_bytes(),
            PartBuf::Borrowed(data) => data,
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` for a zero-length part.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes already accepted by the socket.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Bytes still to be written.
    pub fn remaining(&self) -> &[u8] {
        &self.as_bytes()[self.written..]
    }

    /// Moves the write cursor forward, never past the end.
    pub fn advance(&mut self, n: usize) {
        self.written = (self.written + n).min(self.len());
    }

    /// Returns `true` once every byte has been written.
    pub fn is_done(&self) -> bool {
        self.written == self.len()
    }

    /// Who owns the bytes.
    pub fn ownership(&self) -> Ownership {
        match self.buf {
            PartBuf::Owned(_) => Ownership::HeapCopy,
            PartBuf::Borrowed(_) => Ownership::CallerOwned,
        }
    }
}

/// One part of a multipart POST body.
///
/// ```
/// use libiot_http::network::application::http::MultipartChunk;
///
/// let chunk = MultipartChunk::new(b"\x01\x02\x03")
///     .with_content_disposition("form-data")
///     .with_name("blob")
///     .with_content_type("application/octet-stream");
/// assert_eq!(chunk.data.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartChunk<'a> {
    /// Payload, sent as is. Chunks with empty data are skipped.
    pub data: &'a [u8],
    /// `name` parameter of the `Content-Disposition` header.
    pub name: Option<&'a str>,
    /// `filename` parameter of the `Content-Disposition` header.
    pub filename: Option<&'a str>,
    /// `Content-Disposition` value; `name` and `filename` are only sent with it.
    pub content_disposition: Option<&'a str>,
    /// `Content-type` of the chunk.
    pub content_type: Option<&'a str>,
}

impl<'a> MultipartChunk<'a> {
    /// A chunk carrying `data` and no headers.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            name: None,
            filename: None,
            content_disposition: None,
            content_type: None,
        }
    }

    /// Sets the `name` parameter.
    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the `filename` parameter.
    pub fn with_filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }

    /// Sets the `Content-Disposition` value.
    pub fn with_content_disposition(mut self, disposition: &'a str) -> Self {
        self.content_disposition = Some(disposition);
        self
    }

    /// Sets the chunk's content type.
    pub fn with_content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    fn is_emitted(&self) -> bool {
        !self.data.is_empty()
    }

    /// Bytes this chunk adds to the body: boundary line, headers, blank line, data
    /// and the CRLF that precedes whatever follows it.
    fn wire_len(&self) -> usize {
        let mut len = 2 + MULTIPART_BOUNDARY.len() + 2;
        if let Some(disposition) = self.content_disposition {
            len += "Content-Disposition: ".len() + disposition.len();
            if let Some(name) = self.name {
                len += "; name=\"".len() + name.len() + 1;
            }
            if let Some(filename) = self.filename {
                len += "; filename=\"".len() + filename.len() + 1;
            }
        }
        if let Some(content_type) = self.content_type {
            len += 2 + "Content-type: ".len() + content_type.len();
        }
        len + 4 + self.data.len() + 2
    }
}

/// `Content-Length` of a multipart body built from `chunks`.
///
/// Equals the byte count of every part following the request header.
pub fn multipart_content_length(chunks: &[MultipartChunk<'_>]) -> usize {
    let body: usize = chunks
        .iter()
        .filter(|c| c.is_emitted())
        .map(MultipartChunk::wire_len)
        .sum();
    body + 2 + MULTIPART_BOUNDARY.len() + 4
}

fn check_target(uri: &UriKey) -> Result<(), HttpError> {
    if uri.host.is_empty() || uri.resource.is_empty() || uri.port == 0 {
        return Err(HttpError::InvalidArgument);
    }
    Ok(())
}

fn render(args: core::fmt::Arguments<'_>) -> Result<String<PART_CAPACITY>, HttpError> {
    let mut text = String::new();
    text.write_fmt(args).map_err(|_| HttpError::OutOfMemory)?;
    Ok(text)
}

fn single<'a>(part: RequestPart<'a>) -> Result<PendingRequest<'a>, HttpError> {
    let mut request = PendingRequest::new();
    request.push(part)?;
    Ok(request)
}

/// Renders the header of a GET request.
pub fn get_header(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
) -> Result<String<PART_CAPACITY>, HttpError> {
    check_target(uri)?;
    render(format_args!(
        "GET {} HTTP/1.1\r\nHost: {}:{}\r\nUser-Agent: {}\r\nConnection: {}\r\n\r\n",
        uri.resource,
        uri.host,
        uri.port,
        opts.user_agent,
        mode.token()
    ))
}

/// Renders the header of a DELETE request.
pub fn delete_header(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
) -> Result<String<PART_CAPACITY>, HttpError> {
    check_target(uri)?;
    render(format_args!(
        "DELETE {} HTTP/1.1\r\nUser-Agent: {}\r\nAccept: */*\r\nHost: {}:{}\r\nConnection: {}\r\n\r\n",
        uri.resource,
        opts.user_agent,
        uri.host,
        uri.port,
        mode.token()
    ))
}

/// Renders the header of a form POST carrying `body_len` bytes.
///
/// `content_type` and `cache_control` override the configured defaults.
pub fn post_header(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
    body_len: usize,
    content_type: Option<&str>,
    cache_control: Option<&str>,
) -> Result<String<PART_CAPACITY>, HttpError> {
    check_target(uri)?;
    render(format_args!(
        "POST {} HTTP/1.1\r\nUser-Agent: {}\r\nAccept: */*\r\nHost: {}:{}\r\nConnection: {}\r\n\
         Content-Type: {}\r\nCache-Control: {}\r\nContent-Length: {}\r\n\r\n",
        uri.resource,
        opts.user_agent,
        uri.host,
        uri.port,
        mode.post_token(),
        content_type.unwrap_or(opts.post_content_type.as_str()),
        cache_control.unwrap_or(opts.post_cache_control.as_str()),
        body_len
    ))
}

/// Renders the header of a multipart POST with a body of `content_length` bytes.
pub fn multipart_header(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
    content_length: usize,
) -> Result<String<PART_CAPACITY>, HttpError> {
    check_target(uri)?;
    render(format_args!(
        "POST {} HTTP/1.1\r\nUser-Agent: {}\r\nAccept: */*\r\nHost: {}:{}\r\nConnection: {}\r\n\
         Content-Length: {}\r\nContent-Type: multipart/mixed; boundary={}\r\n\r\n",
        uri.resource,
        opts.user_agent,
        uri.host,
        uri.port,
        mode.post_token(),
        content_length,
        MULTIPART_BOUNDARY
    ))
}

/// Builds a GET request.
pub fn get<'a>(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
) -> Result<PendingRequest<'a>, HttpError> {
    single(RequestPart::owned(get_header(uri, opts, mode)?))
}

/// Builds a DELETE request.
pub fn delete<'a>(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
) -> Result<PendingRequest<'a>, HttpError> {
    single(RequestPart::owned(delete_header(uri, opts, mode)?))
}

/// Builds a form POST: the rendered header followed by the borrowed body.
pub fn post<'a>(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
    body: &'a [u8],
    content_type: Option<&str>,
    cache_control: Option<&str>,
) -> Result<PendingRequest<'a>, HttpError> {
    if body.is_empty() {
        return Err(HttpError::InvalidArgument);
    }
    let header = post_header(uri, opts, mode, body.len(), content_type, cache_control)?;
    let mut request = PendingRequest::new();
    request.push(RequestPart::owned(header))?;
    request.push(RequestPart::borrowed(body))?;
    Ok(request)
}

/// Builds a multipart POST.
///
/// Produces the header, then per chunk with data a rendered boundary/headers
/// part and a borrowed data part, then the closing boundary.
pub fn post_multipart<'a>(
    uri: &UriKey,
    opts: &ClientOptions,
    mode: ConnectionMode,
    chunks: &[MultipartChunk<'a>],
) -> Result<PendingRequest<'a>, HttpError> {
    let content_length = multipart_content_length(chunks);
    let mut request = PendingRequest::new();
    request.push(RequestPart::owned(multipart_header(
        uri,
        opts,
        mode,
        content_length,
    )?))?;

    let mut first = true;
    for chunk in chunks.iter().filter(|c| c.is_emitted()) {
        let mut text: String<PART_CAPACITY> = String::new();
        if !first {
            push(&mut text, "\r\n")?;
        }
        first = false;
        push(&mut text, "--")?;
        push(&mut text, MULTIPART_BOUNDARY)?;
        push(&mut text, "\r\n")?;
        if let Some(disposition) = chunk.content_disposition {
            push(&mut text, "Content-Disposition: ")?;
            push(&mut text, disposition)?;
            if let Some(name) = chunk.name {
                push(&mut text, "; name=\"")?;
                push(&mut text, name)?;
                push(&mut text, "\"")?;
            }
            if let Some(filename) = chunk.filename {
                push(&mut text, "; filename=\"")?;
                push(&mut text, filename)?;
                push(&mut text, "\"")?;
            }
        }
        if let Some(content_type) = chunk.content_type {
            push(&mut text, "\r\nContent-type: ")?;
            push(&mut text, content_type)?;
        }
        push(&mut text, "\r\n\r\n")?;
        request.push(RequestPart::owned(text))?;
        request.push(RequestPart::borrowed(chunk.data))?;
    }

    let closing = if first {
        render(format_args!("--{}--\r\n", MULTIPART_BOUNDARY))?
    } else {
        render(format_args!("\r\n--{}--\r\n", MULTIPART_BOUNDARY))?
    };
    request.push(RequestPart::owned(closing))?;
    Ok(request)
}

/// Wraps a caller-built request. The bytes are sent verbatim.
pub fn raw(request: &[u8]) -> Result<PendingRequest<'_>, HttpError> {
    if request.is_empty() {
        return Err(HttpError::InvalidArgument);
    }
    single(RequestPart::borrowed(request))
}

fn push(text: &mut String<PART_CAPACITY>, s: &str) -> Result<(), HttpError> {
    text.push_str(s).map_err(|_| HttpError::OutOfMemory)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::format;
    use std::vec::Vec;

    fn uri(s: &str) -> UriKey {
        UriKey::parse(s).unwrap()
    }

    fn wire(request: &PendingRequest<'_>) -> Vec<u8> {
        request
            .parts()
            .iter()
            .flat_map(|p| p.as_bytes().iter().copied())
            .collect()
    }

    fn body_len(request: &PendingRequest<'_>) -> usize {
        request.parts().iter().skip(1).map(RequestPart::len).sum()
    }

    #[test]
    fn get_wire_format() {
        let req = get(&uri("example.com:8080/x?y=1"), &ClientOptions::default(), ConnectionMode::Close)
            .unwrap();
        assert_eq!(req.parts().len(), 1);
        assert_eq!(
            wire(&req),
            b"GET /x?y=1 HTTP/1.1\r\nHost: example.com:8080\r\nUser-Agent: libiot\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn delete_wire_format() {
        let req = delete(&uri("example.com/item/3"), &ClientOptions::default(), ConnectionMode::KeepAlive)
            .unwrap();
        assert_eq!(
            wire(&req),
            b"DELETE /item/3 HTTP/1.1\r\nUser-Agent: libiot\r\nAccept: */*\r\nHost: example.com:80\r\nConnection: Keep-Alive\r\n\r\n"
        );
    }

    #[test]
    fn post_borrows_body() {
        let body = b"a=1&b=2";
        let req = post(
            &uri("example.com/form"),
            &ClientOptions::default(),
            ConnectionMode::Close,
            body,
            None,
            None,
        )
        .unwrap();
        let parts = req.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].ownership(), Ownership::HeapCopy);
        assert_eq!(parts[1].ownership(), Ownership::CallerOwned);
        assert!(core::ptr::eq(parts[1].as_bytes(), &body[..]));
        assert_eq!(
            parts[0].as_bytes(),
            b"POST /form HTTP/1.1\r\nUser-Agent: libiot\r\nAccept: */*\r\nHost: example.com:80\r\n\
              Connection: Close\r\nContent-Type: application/x-www-form-urlencoded\r\n\
              Cache-Control: private, max-age=0, no-cache\r\nContent-Length: 7\r\n\r\n"
        );
    }

    #[test]
    fn post_overrides_and_empty_body() {
        let opts = ClientOptions::default();
        let req = post(
            &uri("h/p"),
            &opts,
            ConnectionMode::KeepAlive,
            b"{}",
            Some("application/json"),
            Some("no-store"),
        )
        .unwrap();
        let header = std::str::from_utf8(req.parts()[0].as_bytes()).unwrap();
        assert!(header.contains("Connection: Keep-Alive\r\n"));
        assert!(header.contains("Content-Type: application/json\r\n"));
        assert!(header.contains("Cache-Control: no-store\r\n"));

        assert_eq!(
            post(&uri("h/p"), &opts, ConnectionMode::Close, b"", None, None).unwrap_err(),
            HttpError::InvalidArgument
        );
    }

    #[test]
    fn multipart_golden_length() {
        let a = [b'a'; 10];
        let b = [b'b'; 20];
        let chunks = [MultipartChunk::new(&a), MultipartChunk::new(&b)];
        assert_eq!(multipart_content_length(&chunks), 182);

        let req = post_multipart(&uri("h/up"), &ClientOptions::default(), ConnectionMode::Close, &chunks)
            .unwrap();
        assert_eq!(req.parts().len(), 6);
        assert_eq!(body_len(&req), 182);
        let header = std::str::from_utf8(req.parts()[0].as_bytes()).unwrap();
        assert!(header.contains("Content-Length: 182\r\n"));
        assert!(header.ends_with(&format!(
            "Content-Type: multipart/mixed; boundary={MULTIPART_BOUNDARY}\r\n\r\n"
        )));
    }

    #[test]
    fn multipart_parts_layout() {
        let data = b"hello";
        let chunks = [
            MultipartChunk::new(b""),
            MultipartChunk::new(data)
                .with_content_disposition("form-data")
                .with_name("field")
                .with_filename("f.txt")
                .with_content_type("text/plain"),
            MultipartChunk::new(b"xy").with_name("ignored-without-disposition"),
        ];
        let req = post_multipart(&uri("h/up"), &ClientOptions::default(), ConnectionMode::KeepAlive, &chunks)
            .unwrap();
        let parts = req.parts();
        let b = MULTIPART_BOUNDARY;
        assert_eq!(parts.len(), 6);
        assert_eq!(
            parts[1].as_bytes(),
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"field\"; filename=\"f.txt\"\r\n\
                 Content-type: text/plain\r\n\r\n"
            )
            .as_bytes()
        );
        assert_eq!(parts[2].as_bytes(), data);
        assert_eq!(parts[3].as_bytes(), format!("\r\n--{b}\r\n\r\n\r\n").as_bytes());
        assert_eq!(parts[4].as_bytes(), b"xy");
        assert_eq!(parts[5].as_bytes(), format!("\r\n--{b}--\r\n").as_bytes());
        assert_eq!(body_len(&req), multipart_content_length(&chunks));
    }

    #[test]
    fn multipart_without_data_only_closes() {
        let req = post_multipart(&uri("h/up"), &ClientOptions::default(), ConnectionMode::Close, &[])
            .unwrap();
        assert_eq!(req.parts().len(), 2);
        assert_eq!(
            req.parts()[1].as_bytes(),
            format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes()
        );
        assert_eq!(body_len(&req), multipart_content_length(&[]));
    }

    #[test]
    fn too_many_chunks_is_out_of_memory() {
        let chunks = [MultipartChunk::new(b"z"); crate::network::application::http::MAX_MULTIPART_CHUNKS + 1];
        assert_eq!(
            post_multipart(&uri("h/up"), &ClientOptions::default(), ConnectionMode::Close, &chunks)
                .unwrap_err(),
            HttpError::OutOfMemory
        );
    }

    #[test]
    fn unusable_target_is_invalid_argument() {
        let mut key = uri("h/x");
        key.port = 0;
        assert_eq!(
            get(&key, &ClientOptions::default(), ConnectionMode::Close).unwrap_err(),
            HttpError::InvalidArgument
        );
        assert_eq!(raw(b"").unwrap_err(), HttpError::InvalidArgument);
    }

    #[test]
    fn oversized_resource_is_out_of_memory() {
        let mut key = uri("h/x");
        key.resource.clear();
        for _ in 0..250 {
            key.resource.push('r').unwrap();
        }
        key.host.clear();
        for _ in 0..60 {
            key.host.push('h').unwrap();
        }
        let opts = ClientOptions::default()
            .with_user_agent("an-agent-name-of-thirty-two-byte")
            .unwrap();
        let opts = opts
            .with_post_content_type("application/x-www-form-urlencoded; charset=utf-8")
            .unwrap();
        assert_eq!(
            post_header(&key, &opts, ConnectionMode::KeepAlive, 1, None, None).unwrap_err(),
            HttpError::OutOfMemory
        );
    }

    #[test]
    fn part_cursor() {
        let mut part = RequestPart::borrowed(b"abcdef");
        part.advance(4);
        assert_eq!(part.written(), 4);
        assert_eq!(part.remaining(), b"ef");
        part.advance(10);
        assert!(part.is_done());
        assert!(part.remaining().is_empty());
    }
}
