use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::Method;
use tokio_util::codec::Decoder;
use tracing::{debug, error, trace, warn};

use crate::codec::{LineDecoder, PayloadDecoder};
use crate::config::Config;
use crate::connection::Transactions;
use crate::hook::Milestone;
use crate::personality::HeadersTerminatorFn;
use crate::personality::generic::raise_once;
use crate::personality::path::split_path;
use crate::protocol::{
    Flags, Headers, HtpError, HtpStatus, ParseError, PayloadItem, PayloadSize, RequestProgress, ResponseProgress,
    Transaction,
};
use crate::utils::{chomp, is_line_empty, is_line_folded, parse_content_length, trim_lws};

/// Parses both directions of one HTTP connection.
///
/// Request and response bytes are fed separately, in whatever slices the
/// capture delivers them. The parser frames them into transactions, applies the
/// strategies of the configured personality and fires the configured hooks at
/// every [`Milestone`]. A failure stops the direction it happened on: later data
/// for that direction is answered with [`HtpStatus::Error`].
pub struct ConnectionParser {
    config: Arc<Config>,
    transactions: Transactions,
    request: Stream,
    response: Stream,
    last_error: Option<HtpError>,
}

/// Where a direction is in its current message. The index names the transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Line(usize),
    Headers(usize),
    Body(usize),
}

impl Phase {
    fn tx(self) -> Option<usize> {
        match self {
            Phase::Idle => None,
            Phase::Line(index) | Phase::Headers(index) | Phase::Body(index) => Some(index),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Side {
    Request,
    Response,
}

/// Parsing state of one direction.
struct Stream {
    phase: Phase,
    buffer: BytesMut,
    lines: LineDecoder,
    /// Header line still collecting its continuation lines
    header: Option<Vec<u8>>,
    body: PayloadDecoder,
    stopped: bool,
}

impl Stream {
    fn new(field_limit: usize) -> Self {
        Self {
            phase: Phase::Idle,
            buffer: BytesMut::new(),
            lines: LineDecoder::new(field_limit),
            header: None,
            body: PayloadDecoder::empty(),
            stopped: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<Bytes>, ParseError> {
        self.lines.decode(&mut self.buffer)
    }

    fn next_body_item(&mut self) -> Result<Option<PayloadItem>, ParseError> {
        self.body.decode(&mut self.buffer)
    }

    fn finish_message(&mut self) {
        self.phase = Phase::Idle;
        self.header = None;
        self.body = PayloadDecoder::empty();
    }
}

/// What one line of a header block produced.
struct HeaderLine {
    /// A header whose continuation lines have all arrived
    complete: Option<Vec<u8>>,
    end_of_headers: bool,
}

impl ConnectionParser {
    pub fn new(config: Arc<Config>) -> Self {
        let field_limit = config.field_limit();
        debug!(personality = %config.server_personality(), field_limit, "connection parser created");
        Self {
            config,
            transactions: Transactions::new(),
            request: Stream::new(field_limit),
            response: Stream::new(field_limit),
            last_error: None,
        }
    }

    /// Feeds request bytes.
    ///
    /// Returns [`HtpStatus::Data`] once everything was consumed and
    /// [`HtpStatus::Error`] when the current transaction failed; see
    /// [`ConnectionParser::last_error`] for the cause.
    pub fn request_data(&mut self, data: &[u8]) -> HtpStatus {
        if self.request.stopped {
            return self.reject(Side::Request);
        }

        self.request.buffer.extend_from_slice(data);
        match self.parse_request() {
            Ok(status) => status,
            Err(e) => self.fail(Side::Request, e),
        }
    }

    /// Feeds response bytes.
    ///
    /// Returns [`HtpStatus::DataOther`] when the response belongs to a request
    /// whose line has not been parsed yet. The bytes stay buffered; call again,
    /// possibly with an empty slice, after feeding more request data.
    pub fn response_data(&mut self, data: &[u8]) -> HtpStatus {
        if self.response.stopped {
            return self.reject(Side::Response);
        }

        self.response.buffer.extend_from_slice(data);
        match self.parse_response() {
            Ok(status) => status,
            Err(e) => self.fail(Side::Response, e),
        }
    }

    /// Signals that the connection closed, completing a response body
    /// delimited by the close.
    pub fn close(&mut self) -> HtpStatus {
        if self.response.stopped {
            return self.reject(Side::Response);
        }

        match self.finish_response_at_close() {
            Ok(()) => HtpStatus::Ok,
            Err(e) => self.fail(Side::Response, e),
        }
    }

    /// The error behind the last [`HtpStatus::Error`].
    pub fn last_error(&self) -> Option<&HtpError> {
        self.last_error.as_ref()
    }

    /// The transactions of this connection that are still stored, oldest
    /// first. Completed ones are gone when
    /// [`Config::set_tx_auto_destroy`] is enabled.
    pub fn transactions(&self) -> &Transactions {
        &self.transactions
    }

    pub fn transaction(&self, index: usize) -> Option<&Transaction> {
        self.transactions.get(index)
    }

    pub fn transaction_mut(&mut self, index: usize) -> Option<&mut Transaction> {
        self.transactions.get_mut(index)
    }

    /// Removes a transaction both directions are done with and hands it over.
    ///
    /// Returns `None` for an unknown index and for a transaction that a
    /// direction may still update; see [`Transaction::is_finished`].
    pub fn take_transaction(&mut self, index: usize) -> Option<Transaction> {
        if !self.transactions.get(index)?.is_finished() {
            return None;
        }
        debug!(tx = index, "transaction taken");
        self.transactions.remove(index)
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn parse_request(&mut self) -> Result<HtpStatus, HtpError> {
        loop {
            match self.request.phase {
                Phase::Idle => {
                    if self.request.buffer.is_empty() {
                        return Ok(HtpStatus::Data);
                    }

                    let index = self.transactions.start();
                    self.request.phase = Phase::Line(index);
                    debug!(tx = index, "transaction started");
                    self.run_hook(Milestone::TransactionStart, index)?;
                }
                Phase::Line(index) => {
                    let Some(line) = self.request.next_line()? else {
                        return Ok(HtpStatus::Data);
                    };
                    self.flag_long_line(index, &line);
                    self.request_line(index, &line)?;
                }
                Phase::Headers(index) => {
                    let Some(line) = self.request.next_line()? else {
                        return Ok(HtpStatus::Data);
                    };
                    self.flag_long_line(index, &line);
                    self.request_header_line(index, &line)?;
                }
                Phase::Body(index) => {
                    let Some(item) = self.request.next_body_item()? else {
                        return Ok(HtpStatus::Data);
                    };
                    self.request_body(index, item)?;
                }
            }
        }
    }

    fn request_line(&mut self, index: usize, line: &[u8]) -> Result<(), HtpError> {
        let strategies = *self.config.strategies();
        let tx = &mut self.transactions[index];

        if (strategies.headers_terminator())(line) {
            tx.request_ignored_lines += 1;
            trace!(tx = index, "line before the request line ignored");
            return Ok(());
        }

        let line = chomp(line);
        tx.request_line = Some(line.to_vec());
        (strategies.parse_request_line())(tx, line)?;

        if !tx.is_protocol_0_9() && !is_strict_request_line(line) {
            raise_once(&mut tx.flags, Flags::REQUEST_LINE_INVALID, "request line rejected by a strict parser");
        }

        if let Some(uri) = tx.request_uri.as_deref() {
            let path = (strategies.normalize_path())(split_path(uri), &mut tx.flags, &mut tx.response_status_expected);
            tx.normalized_path = Some(path);
        }

        tx.request_progress = RequestProgress::Line;
        let http_0_9 = tx.is_protocol_0_9();
        self.request.phase = Phase::Headers(index);
        self.run_hook(Milestone::RequestLine, index)?;

        if http_0_9 {
            debug!(tx = index, "HTTP/0.9 request has no headers");
            self.complete_request(index)?;
        }
        Ok(())
    }

    fn request_header_line(&mut self, index: usize, line: &[u8]) -> Result<(), HtpError> {
        let strategies = *self.config.strategies();
        let tx = &mut self.transactions[index];

        let header_line = fold_header(&mut self.request.header, &mut tx.flags, strategies.headers_terminator(), line);
        if let Some(header) = header_line.complete {
            (strategies.process_request_header())(tx, &header)?;
            self.run_hook(Milestone::RequestHeader, index)?;
        }

        if !header_line.end_of_headers {
            return Ok(());
        }

        self.transactions[index].request_progress = RequestProgress::Headers;
        self.run_hook(Milestone::RequestHeaders, index)?;

        let size = request_payload_size(&mut self.transactions[index])?;
        if size.is_empty() {
            return self.complete_request(index);
        }

        trace!(tx = index, ?size, "request body follows");
        self.transactions[index].request_progress = RequestProgress::Body;
        self.request.body = PayloadDecoder::with_field_limit(size, self.config.field_limit());
        self.request.phase = Phase::Body(index);
        Ok(())
    }

    fn request_body(&mut self, index: usize, item: PayloadItem) -> Result<(), HtpError> {
        match item {
            PayloadItem::Chunk(bytes) => {
                let tx = &mut self.transactions[index];
                tx.request_body_len += bytes.len() as u64;
                tx.body_chunk = Some(bytes);

                let result = self.run_hook(Milestone::RequestBodyData, index);
                self.transactions[index].body_chunk = None;
                result
            }
            PayloadItem::Trailer(line) => self.trailer_line(Side::Request, index, &line),
            PayloadItem::Eof => {
                self.run_hook(Milestone::RequestBodyData, index)?;
                if self.request.body.is_chunked() {
                    self.end_trailers(Side::Request, index)?;
                }
                self.complete_request(index)
            }
        }
    }

    /// The stream still names the transaction while the completion hooks run,
    /// so a veto there fails it.
    fn complete_request(&mut self, index: usize) -> Result<(), HtpError> {
        self.transactions[index].request_progress = RequestProgress::Complete;
        self.run_hook(Milestone::RequestComplete, index)?;
        self.complete_transaction(index)?;
        self.request.finish_message();
        Ok(())
    }

    fn parse_response(&mut self) -> Result<HtpStatus, HtpError> {
        loop {
            match self.response.phase {
                Phase::Idle => {
                    if self.response.buffer.is_empty() {
                        return Ok(HtpStatus::Data);
                    }

                    let Some(index) = self
                        .transactions
                        .iter()
                        .find(|tx| tx.response_progress == ResponseProgress::NotStarted)
                        .map(|tx| tx.index)
                    else {
                        return Err(ParseError::UnexpectedResponse.into());
                    };

                    if self.transactions[index].request_progress == RequestProgress::NotStarted {
                        trace!(tx = index, "response waits for its request line");
                        return Ok(HtpStatus::DataOther);
                    }

                    self.response.phase = Phase::Line(index);
                    self.run_hook(Milestone::ResponseStart, index)?;

                    if self.transactions[index].is_protocol_0_9() {
                        debug!(tx = index, "HTTP/0.9 response has no status line");
                        self.transactions[index].response_progress = ResponseProgress::Body;
                        self.response.body = PayloadDecoder::until_close();
                        self.response.phase = Phase::Body(index);
                    }
                }
                Phase::Line(index) => {
                    let Some(line) = self.response.next_line()? else {
                        return Ok(HtpStatus::Data);
                    };
                    self.flag_long_line(index, &line);
                    self.response_line(index, &line)?;
                }
                Phase::Headers(index) => {
                    let Some(line) = self.response.next_line()? else {
                        return Ok(HtpStatus::Data);
                    };
                    self.flag_long_line(index, &line);
                    self.response_header_line(index, &line)?;
                }
                Phase::Body(index) => {
                    let Some(item) = self.response.next_body_item()? else {
                        return Ok(HtpStatus::Data);
                    };
                    self.response_body(index, item)?;
                }
            }
        }
    }

    fn response_line(&mut self, index: usize, line: &[u8]) -> Result<(), HtpError> {
        if is_line_empty(line) {
            trace!(tx = index, "empty line before the response line ignored");
            return Ok(());
        }

        let strategies = *self.config.strategies();
        let tx = &mut self.transactions[index];

        let line = chomp(line);
        tx.response_line = Some(line.to_vec());
        (strategies.parse_response_line())(tx, line)?;
        tx.response_progress = ResponseProgress::Line;

        self.response.phase = Phase::Headers(index);
        self.run_hook(Milestone::ResponseLine, index)
    }

    fn response_header_line(&mut self, index: usize, line: &[u8]) -> Result<(), HtpError> {
        let strategies = *self.config.strategies();
        let tx = &mut self.transactions[index];

        let header_line = fold_header(&mut self.response.header, &mut tx.flags, strategies.headers_terminator(), line);
        if let Some(header) = header_line.complete {
            (strategies.process_response_header())(tx, &header)?;
            self.run_hook(Milestone::ResponseHeader, index)?;
        }

        if !header_line.end_of_headers {
            return Ok(());
        }

        self.transactions[index].response_progress = ResponseProgress::Headers;
        self.run_hook(Milestone::ResponseHeaders, index)?;

        let tx = &mut self.transactions[index];
        if tx.response_status_number == Some(100) {
            debug!(tx = index, "interim response, the final one follows");
            tx.response_headers = Headers::new();
            self.response.phase = Phase::Line(index);
            return Ok(());
        }

        let size = response_payload_size(tx)?;
        if size.is_empty() {
            return self.complete_response(index);
        }

        trace!(tx = index, ?size, "response body follows");
        tx.response_progress = ResponseProgress::Body;
        self.response.body = PayloadDecoder::with_field_limit(size, self.config.field_limit());
        self.response.phase = Phase::Body(index);
        Ok(())
    }

    fn response_body(&mut self, index: usize, item: PayloadItem) -> Result<(), HtpError> {
        match item {
            PayloadItem::Chunk(bytes) => {
                let tx = &mut self.transactions[index];
                tx.response_body_len += bytes.len() as u64;
                tx.body_chunk = Some(bytes);

                let result = self.run_hook(Milestone::ResponseBodyData, index);
                self.transactions[index].body_chunk = None;
                result
            }
            PayloadItem::Trailer(line) => self.trailer_line(Side::Response, index, &line),
            PayloadItem::Eof => {
                self.run_hook(Milestone::ResponseBodyData, index)?;
                if self.response.body.is_chunked() {
                    self.end_trailers(Side::Response, index)?;
                }
                self.complete_response(index)
            }
        }
    }

    fn complete_response(&mut self, index: usize) -> Result<(), HtpError> {
        self.transactions[index].response_progress = ResponseProgress::Complete;
        self.run_hook(Milestone::ResponseComplete, index)?;
        self.complete_transaction(index)?;
        self.response.finish_message();
        Ok(())
    }

    /// Stores trailer fields with the headers of their side, folding
    /// continuation lines the way header lines are folded.
    fn trailer_line(&mut self, side: Side, index: usize, line: &[u8]) -> Result<(), HtpError> {
        self.flag_long_line(index, line);

        let strategies = *self.config.strategies();
        let (pending, process_header) = match side {
            Side::Request => (&mut self.request.header, strategies.process_request_header()),
            Side::Response => (&mut self.response.header, strategies.process_response_header()),
        };
        let tx = &mut self.transactions[index];

        if let Some(header) = fold_header(pending, &mut tx.flags, |_| false, line).complete {
            process_header(tx, &header)?;
        }
        Ok(())
    }

    fn end_trailers(&mut self, side: Side, index: usize) -> Result<(), HtpError> {
        let strategies = *self.config.strategies();
        let (pending, process_header, milestone) = match side {
            Side::Request => (&mut self.request.header, strategies.process_request_header(), Milestone::RequestTrailer),
            Side::Response => {
                (&mut self.response.header, strategies.process_response_header(), Milestone::ResponseTrailer)
            }
        };

        if let Some(header) = pending.take() {
            process_header(&mut self.transactions[index], &header)?;
        }
        self.run_hook(milestone, index)
    }

    fn finish_response_at_close(&mut self) -> Result<(), HtpError> {
        while let Phase::Body(index) = self.response.phase {
            match self.response.body.decode_eof(&mut self.response.buffer)? {
                Some(item) => self.response_body(index, item)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Fires once both sides completed. A side that failed keeps the
    /// transaction from ever completing.
    fn complete_transaction(&mut self, index: usize) -> Result<(), HtpError> {
        if !self.transactions[index].is_complete() {
            return Ok(());
        }

        debug!(tx = index, "transaction complete");
        self.run_hook(Milestone::TransactionComplete, index)?;

        if self.config.tx_auto_destroy() {
            self.transactions.remove(index);
            trace!(tx = index, "transaction destroyed");
        }
        Ok(())
    }

    fn flag_long_line(&mut self, index: usize, line: &[u8]) {
        if line.len() > self.config.field_limit_soft() {
            let tx = &mut self.transactions[index];
            raise_once(&mut tx.flags, Flags::FIELD_LONG, "line exceeds the soft field limit");
        }
    }

    fn run_hook(&mut self, milestone: Milestone, index: usize) -> Result<(), HtpError> {
        let status = self.config.hooks().run_all(milestone, &mut self.transactions[index]);
        trace!(tx = index, %milestone, ?status, "hook ran");

        match HtpStatus::from_hook(status) {
            HtpStatus::Error => Err(HtpError::veto(milestone)),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, side: Side, e: HtpError) -> HtpStatus {
        let stream = match side {
            Side::Request => &mut self.request,
            Side::Response => &mut self.response,
        };
        stream.stopped = true;

        let index = stream.phase.tx();
        if let Some(tx) = index.and_then(|index| self.transactions.get_mut(index)) {
            match side {
                Side::Request => tx.request_progress = RequestProgress::Failed,
                Side::Response => tx.response_progress = ResponseProgress::Failed,
            }
        }

        if e.is_veto() {
            warn!(?side, tx = ?index, error = %e, "transaction vetoed");
        } else {
            error!(?side, tx = ?index, error = %e, "failed to parse traffic");
        }
        self.last_error = Some(e);
        HtpStatus::Error
    }

    fn reject(&mut self, side: Side) -> HtpStatus {
        debug!(?side, "data after a failure ignored");
        self.last_error = Some(HtpError::Stopped);
        HtpStatus::Error
    }
}

impl std::fmt::Debug for ConnectionParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParser")
            .field("personality", &self.config.server_personality())
            .field("transactions", &self.transactions.len())
            .field("request_phase", &self.request.phase)
            .field("response_phase", &self.response.phase)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Joins continuation lines onto the pending header and reports the headers
/// that are now complete.
fn fold_header(
    pending: &mut Option<Vec<u8>>,
    tx_flags: &mut Flags,
    is_terminator: HeadersTerminatorFn,
    line: &[u8],
) -> HeaderLine {
    if is_terminator(line) {
        if !is_line_empty(line) {
            raise_once(tx_flags, Flags::HEADERS_WHITESPACE_TERMINATED, "header block ended by a whitespace line");
        }
        return HeaderLine { complete: pending.take(), end_of_headers: true };
    }

    if is_line_folded(line) {
        let continuation = trim_lws(chomp(line));
        match pending {
            Some(header) => {
                header.push(b' ');
                header.extend_from_slice(continuation);
                raise_once(tx_flags, Flags::FIELD_FOLDED, "header field folded");
            }
            None => {
                raise_once(tx_flags, Flags::INVALID_FOLDING, "continuation line without a header");
                *pending = Some(continuation.to_vec());
            }
        }
        return HeaderLine { complete: None, end_of_headers: false };
    }

    HeaderLine { complete: pending.replace(chomp(line).to_vec()), end_of_headers: false }
}

fn request_payload_size(tx: &mut Transaction) -> Result<PayloadSize, ParseError> {
    let chunked = tx.request_headers.value("transfer-encoding").is_some_and(is_chunked);
    let length = tx.request_headers.value("content-length");

    if chunked {
        if length.is_some() {
            raise_once(&mut tx.flags, Flags::REQUEST_SMUGGLING, "request has both transfer-encoding and content-length");
        }
        return Ok(PayloadSize::Chunked);
    }

    match length {
        Some(value) => content_length(value),
        None => Ok(PayloadSize::Empty),
    }
}

fn response_payload_size(tx: &Transaction) -> Result<PayloadSize, ParseError> {
    let no_body = tx.request_method_number == Some(Method::HEAD)
        || matches!(tx.response_status_number, Some(100..=199 | 204 | 304));
    if no_body {
        return Ok(PayloadSize::Empty);
    }

    if tx.response_headers.value("transfer-encoding").is_some_and(is_chunked) {
        return Ok(PayloadSize::Chunked);
    }

    match tx.response_headers.value("content-length") {
        Some(value) => content_length(value),
        None => Ok(PayloadSize::UntilClose),
    }
}

fn content_length(value: &[u8]) -> Result<PayloadSize, ParseError> {
    parse_content_length(value).map(PayloadSize::Length).ok_or_else(|| {
        ParseError::invalid_content_length(format!("value {} is not u64", String::from_utf8_lossy(value)))
    })
}

/// Whether the last transfer coding is `chunked`.
fn is_chunked(transfer_encoding: &[u8]) -> bool {
    transfer_encoding
        .rsplit(|b| *b == b',')
        .next()
        .is_some_and(|coding| trim_lws(coding).eq_ignore_ascii_case(b"chunked"))
}

/// Whether a strict parser accepts the request line.
fn is_strict_request_line(line: &[u8]) -> bool {
    let mut buf = Vec::with_capacity(line.len() + 2);
    buf.extend_from_slice(line);
    buf.extend_from_slice(b"\r\n");

    let mut headers = [httparse::EMPTY_HEADER; 0];
    httparse::Request::new(&mut headers).parse(&buf).is_ok()
}
