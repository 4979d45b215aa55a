//! Line protocol messages
//!
//! Every message is one line. Client to relay:
//!
//! ```text
//! PUB <topic> <json-record>
//! SUB <filter>
//! UNSUB <filter>
//! PING
//! ```
//!
//! Relay to client:
//!
//! ```text
//! +OK
//! -ERR <reason>
//! PONG
//! MSG <topic> <json-record>
//! ```
//!
//! Verbs are case-insensitive. The record is everything after the second
//! space, so it may itself contain spaces.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::router::{Topic, TopicFilter};

/// Command sent by a client
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Publish a raw record on a topic
    Publish { topic: Topic, payload: Bytes },
    /// Start receiving records matching a filter
    Subscribe(TopicFilter),
    /// Stop receiving records for a filter
    Unsubscribe(TopicFilter),
    /// Liveness check
    Ping,
}

/// Reply or push from the relay
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Command accepted
    Ok,
    /// Command rejected; the session stays open
    Err(String),
    /// Answer to `PING`
    Pong,
    /// A delivered record
    Message { topic: Topic, payload: Bytes },
}

impl Command {
    /// Parse a single line (without the trailing newline)
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_start();
        let (verb, rest) = split_word(line);

        match verb.to_ascii_uppercase().as_str() {
            "PUB" => {
                let (topic, payload) = split_word(rest);
                if topic.is_empty() {
                    return Err(ProtocolError::MissingArgument("topic"));
                }
                if payload.is_empty() {
                    return Err(ProtocolError::MissingArgument("payload"));
                }
                Ok(Command::Publish {
                    topic: Topic::new(topic)?,
                    payload: Bytes::copy_from_slice(payload.as_bytes()),
                })
            }
            "SUB" => Ok(Command::Subscribe(parse_filter(rest)?)),
            "UNSUB" => Ok(Command::Unsubscribe(parse_filter(rest)?)),
            "PING" => Ok(Command::Ping),
            _ => Err(ProtocolError::UnknownCommand(verb.to_owned())),
        }
    }

    /// Append the wire form (including newline) to `dst`
    pub fn write_to(&self, dst: &mut BytesMut) {
        match self {
            Command::Publish { topic, payload } => {
                put_line(dst, &[b"PUB", topic.as_str().as_bytes(), &payload[..]]);
            }
            Command::Subscribe(filter) => put_line(dst, &[b"SUB", filter.as_str().as_bytes()]),
            Command::Unsubscribe(filter) => {
                put_line(dst, &[b"UNSUB", filter.as_str().as_bytes()]);
            }
            Command::Ping => put_line(dst, &[b"PING"]),
        }
    }
}

impl Reply {
    /// Parse a single line (without the trailing newline)
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let (verb, rest) = split_word(line);

        match verb {
            "+OK" => Ok(Reply::Ok),
            "-ERR" => Ok(Reply::Err(rest.to_owned())),
            "PONG" => Ok(Reply::Pong),
            "MSG" => {
                let (topic, payload) = split_word(rest);
                if payload.is_empty() {
                    return Err(ProtocolError::MissingArgument("payload"));
                }
                Ok(Reply::Message {
                    topic: Topic::new(topic)?,
                    payload: Bytes::copy_from_slice(payload.as_bytes()),
                })
            }
            _ => Err(ProtocolError::UnknownCommand(verb.to_owned())),
        }
    }

    /// Append the wire form (including newline) to `dst`
    pub fn write_to(&self, dst: &mut BytesMut) {
        match self {
            Reply::Ok => put_line(dst, &[b"+OK"]),
            Reply::Err(reason) => {
                // A reason spanning lines would desync the peer
                let reason = reason.replace(|c: char| c == '\r' || c == '\n', " ");
                put_line(dst, &[b"-ERR", reason.as_bytes()]);
            }
            Reply::Pong => put_line(dst, &[b"PONG"]),
            Reply::Message { topic, payload } => {
                put_line(dst, &[b"MSG", topic.as_str().as_bytes(), &payload[..]]);
            }
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((word, rest)) => (word, rest.trim_start_matches(' ')),
        None => (s, ""),
    }
}

fn parse_filter(rest: &str) -> Result<TopicFilter, ProtocolError> {
    let filter = rest.trim();
    if filter.is_empty() {
        return Err(ProtocolError::MissingArgument("filter"));
    }
    TopicFilter::new(filter)
}

fn put_line(dst: &mut BytesMut, parts: &[&[u8]]) {
    let len = parts.iter().map(|p| p.len() + 1).sum();
    dst.reserve(len);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            dst.put_u8(b' ');
        }
        dst.put_slice(part);
    }
    dst.put_u8(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish() {
        let cmd = Command::parse(r#"PUB drone/position {"ts": 1, "uuid": "u"}"#).unwrap();
        match cmd {
            Command::Publish { topic, payload } => {
                assert_eq!(topic.as_str(), "drone/position");
                assert_eq!(&payload[..], br#"{"ts": 1, "uuid": "u"}"#);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Command::parse("ping").unwrap(), Command::Ping);
        assert_eq!(
            Command::parse("sub drone/#").unwrap(),
            Command::Subscribe(TopicFilter::new("drone/#").unwrap())
        );
    }

    #[test]
    fn test_parse_unsubscribe() {
        assert_eq!(
            Command::parse("UNSUB drone/position").unwrap(),
            Command::Unsubscribe(TopicFilter::new("drone/position").unwrap())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse("FLY away"),
            Err(ProtocolError::UnknownCommand("FLY".into()))
        );
        assert_eq!(Command::parse("PUB"), Err(ProtocolError::MissingArgument("topic")));
        assert_eq!(
            Command::parse("PUB drone/position"),
            Err(ProtocolError::MissingArgument("payload"))
        );
        assert_eq!(Command::parse("SUB"), Err(ProtocolError::MissingArgument("filter")));
        assert!(matches!(
            Command::parse("SUB a/#/b"),
            Err(ProtocolError::InvalidFilter(_))
        ));
        assert!(matches!(
            Command::parse("PUB a/# {}"),
            Err(ProtocolError::InvalidTopic(_))
        ));
    }

    #[test]
    fn test_write_command() {
        let mut buf = BytesMut::new();
        Command::Publish {
            topic: Topic::new("drone/position").unwrap(),
            payload: Bytes::from_static(b"{}"),
        }
        .write_to(&mut buf);
        Command::Ping.write_to(&mut buf);

        assert_eq!(&buf[..], b"PUB drone/position {}\nPING\n");
    }

    #[test]
    fn test_write_reply() {
        let mut buf = BytesMut::new();
        Reply::Ok.write_to(&mut buf);
        Reply::Err("invalid field:\nlatitude".into()).write_to(&mut buf);
        Reply::Message {
            topic: Topic::new("drone/position").unwrap(),
            payload: Bytes::from_static(b"{\"ts\":1}"),
        }
        .write_to(&mut buf);

        assert_eq!(
            &buf[..],
            b"+OK\n-ERR invalid field: latitude\nMSG drone/position {\"ts\":1}\n"
        );
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(Reply::parse("+OK").unwrap(), Reply::Ok);
        assert_eq!(Reply::parse("PONG").unwrap(), Reply::Pong);
        assert_eq!(
            Reply::parse("-ERR invalid field: uuid").unwrap(),
            Reply::Err("invalid field: uuid".into())
        );
        assert_eq!(
            Reply::parse("MSG drone/position {\"a\": 1}").unwrap(),
            Reply::Message {
                topic: Topic::new("drone/position").unwrap(),
                payload: Bytes::from_static(b"{\"a\": 1}"),
            }
        );
    }
}
