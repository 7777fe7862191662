//! Scripted transport for unit tests.

use super::types::{TileRequest, TileResponse, TransportError};
use super::Transport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Cursor, Read};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with status, headers and body
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    /// Deliver the body prefix, then fail the read
    BrokenBody { prefix: Vec<u8> },
    /// Fail before any response
    Fail(TransportError),
}

impl MockReply {
    /// 200 with the given body.
    pub fn ok(body: Vec<u8>) -> Self {
        MockReply::Respond {
            status: 200,
            headers: Vec::new(),
            body,
        }
    }

    /// 200 with the given headers and body.
    pub fn ok_with_headers(headers: &[(&str, &str)], body: Vec<u8>) -> Self {
        MockReply::Respond {
            status: 200,
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            body,
        }
    }

    /// A connection failure.
    pub fn connect_error() -> Self {
        MockReply::Fail(TransportError::Connect {
            url: "mock".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// Transport that replays scripted replies and records every request.
///
/// When the script runs out the last reply is repeated.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    last: Mutex<Option<MockReply>>,
    requests: Mutex<Vec<TileRequest>>,
}

impl MockTransport {
    pub fn new(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<TileRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let mut last = self.last.lock();
        if let Some(reply) = self.replies.lock().pop_front() {
            *last = Some(reply);
        }
        last.clone()
    }
}

impl Transport for MockTransport {
    fn get(&self, request: &TileRequest) -> Result<TileResponse, TransportError> {
        self.requests.lock().push(request.clone());

        match self.next_reply() {
            Some(MockReply::Respond {
                status,
                headers,
                body,
            }) => {
                let mut response = TileResponse::new(status, Cursor::new(body));
                for (name, value) in headers {
                    response = response.with_header(&name, value);
                }
                Ok(response)
            }
            Some(MockReply::BrokenBody { prefix }) => {
                Ok(TileResponse::new(200, Cursor::new(prefix).chain(FailingReader)))
            }
            Some(MockReply::Fail(error)) => Err(error),
            None => Err(TransportError::Request {
                url: request.url.clone(),
                message: "no scripted reply".to_string(),
            }),
        }
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
    }
}
