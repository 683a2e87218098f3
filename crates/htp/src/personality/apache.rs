//! Apache httpd 2.x quirks.

use http::Method;
use tracing::debug;

use crate::personality::generic::{self, RequestLineRules};
use crate::protocol::{Flags, ParseError, Transaction};

const BAD_REQUEST: u16 = 400;

/// Apache stops reading the request line at a NUL byte, answers 400 to a line
/// starting with whitespace, and serves unknown methods like GET.
pub fn parse_request_line(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError> {
    let rules = RequestLineRules { nul_terminates: true, leading_whitespace_status: Some(BAD_REQUEST) };
    generic::parse_request_line_with(tx, line, rules)?;

    if tx.request_method_number.is_none() {
        debug!("unknown method handled as GET");
        tx.request_method_number = Some(Method::GET);
    }
    Ok(())
}

/// Apache answers 400 to a header line without a colon.
pub fn process_request_header(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError> {
    let header = generic::parse_header(&mut tx.flags, line);
    if header.flags.contains(Flags::FIELD_UNPARSEABLE) {
        tx.response_status_expected = Some(BAD_REQUEST);
    }
    generic::store_header(&mut tx.request_headers, &mut tx.flags, header);
    Ok(())
}
