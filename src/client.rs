use bufstream::BufStream;
use imap_proto::{Response, Status};
use std::io::{BufRead, Read, Write};

use super::error::{Error, ParseError, Result, ValidateError};
use super::parse::{
    parse_expunge, parse_ids, parse_list_entries, parse_mailbox, parse_noop, parse_store,
};
use super::types::*;

static TAG_PREFIX: &str = "a";
const INITIAL_TAG: u32 = 0;
const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

/// Quote `value` as an IMAP string, rejecting characters that cannot appear in one.
fn validate_str(command_synopsis: &str, argument: &str, value: &str) -> Result<String> {
    match value.chars().find(|&c| c == '\r' || c == '\n') {
        Some(offending_char) => Err(Error::Validate(ValidateError {
            command_synopsis: command_synopsis.to_string(),
            argument: argument.to_string(),
            offending_char,
        })),
        None => Ok(quote!(value)),
    }
}

/// Unquoted command arguments (sequence sets, search criteria, store items) may not break the
/// command line either.
fn validate_raw<'a>(command_synopsis: &str, argument: &str, value: &'a str) -> Result<&'a str> {
    match value.chars().find(|&c| c == '\r' || c == '\n') {
        Some(offending_char) => Err(Error::Validate(ValidateError {
            command_synopsis: command_synopsis.to_string(),
            argument: argument.to_string(),
            offending_char,
        })),
        None => Ok(value),
    }
}

/// A blocking IMAP client over a single `Read + Write` stream.
///
/// Commands are tagged `a1`, `a2`, ... and each call blocks until the server's tagged completion
/// response arrives; the protocol never has more than one command outstanding.
#[derive(Debug)]
pub struct Client<T: Read + Write> {
    pub(crate) stream: BufStream<T>,
    tag: u32,
}

impl<T: Read + Write> Client<T> {
    /// Creates a new client over the given stream.
    ///
    /// The server greeting is *not* consumed; [`ClientBuilder`](crate::ClientBuilder) does that
    /// after the transport is set up.
    pub fn new(stream: T) -> Client<T> {
        Client {
            stream: BufStream::new(stream),
            tag: INITIAL_TAG,
        }
    }

    /// Log in to the IMAP server.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let synopsis = "LOGIN";
        let command = format!(
            "LOGIN {} {}",
            validate_str(synopsis, "username", username)?,
            validate_str(synopsis, "password", password)?
        );
        self.run_command_and_read_response(&command)
            .and_then(|lines| parse_noop(&lines))
    }

    /// The [`LIST` command](https://tools.ietf.org/html/rfc3501#section-6.3.8) returns the names
    /// matching `mailbox_pattern` under `reference_name`, as raw listing entries.
    pub fn list(&mut self, reference_name: &str, mailbox_pattern: &str) -> Result<Vec<String>> {
        let synopsis = "LIST";
        let command = format!(
            "LIST {} {}",
            validate_str(synopsis, "reference", reference_name)?,
            validate_str(synopsis, "pattern", mailbox_pattern)?
        );
        self.run_command_and_read_response(&command)
            .and_then(|lines| parse_list_entries(&lines))
    }

    /// Selects a mailbox for read/write access.
    ///
    /// The access the server granted comes back in [`Mailbox::read_only`].
    pub fn select(&mut self, mailbox_name: &str) -> Result<Mailbox> {
        let command = format!("SELECT {}", validate_str("SELECT", "mailbox", mailbox_name)?);
        self.run_command(&command)?;

        // the tagged OK carries the [READ-ONLY] or [READ-WRITE] code
        let mut lines = Vec::new();
        let completion = self.read_response_onto(&mut lines)?;
        lines.extend_from_slice(&completion);
        parse_mailbox(&lines)
    }

    /// Searches the selected mailbox, returning matching sequence numbers in ascending order.
    pub fn search(&mut self, query: &str) -> Result<Vec<Seq>> {
        let command = format!("SEARCH {}", validate_raw("SEARCH", "query", query)?);
        self.run_command_and_read_response(&command)
            .and_then(|lines| parse_ids(&lines))
    }

    /// Copies the given messages to the end of the destination mailbox.
    pub fn copy(&mut self, sequence_set: &str, mailbox_name: &str) -> Result<()> {
        let synopsis = "COPY";
        let command = format!(
            "COPY {} {}",
            validate_raw(synopsis, "sequence_set", sequence_set)?,
            validate_str(synopsis, "mailbox", mailbox_name)?
        );
        self.run_command_and_read_response(&command)
            .and_then(|lines| parse_noop(&lines))
    }

    /// Alters the flags of the given messages, returning how many `FETCH` echoes came back.
    pub fn store(&mut self, sequence_set: &str, query: &str) -> Result<usize> {
        let synopsis = "STORE";
        let command = format!(
            "STORE {} {}",
            validate_raw(synopsis, "sequence_set", sequence_set)?,
            validate_raw(synopsis, "query", query)?
        );
        self.run_command_and_read_response(&command)
            .and_then(|lines| parse_store(&lines))
    }

    /// Permanently removes all messages that have the `\Deleted` flag set from the currently
    /// selected mailbox, returning the sequence numbers the server reported as expunged.
    pub fn expunge(&mut self) -> Result<Vec<Seq>> {
        self.run_command_and_read_response("EXPUNGE")
            .and_then(|lines| parse_expunge(&lines))
    }

    /// Informs the server that the client is done with the connection.
    pub fn logout(&mut self) -> Result<()> {
        // the untagged BYE that precedes the tagged OK is expected here
        self.run_command_and_read_response("LOGOUT").map(|_| ())
    }

    /// Runs a command and returns the untagged data the server sent before completing it.
    pub fn run_command_and_read_response(&mut self, untagged_command: &str) -> Result<Vec<u8>> {
        self.run_command(untagged_command)?;
        self.read_response()
    }

    /// Runs any command passed to it.
    pub fn run_command(&mut self, untagged_command: &str) -> Result<()> {
        let command = self.create_command(untagged_command);
        self.write_line(command.as_bytes())
    }

    pub(crate) fn read_greeting(&mut self) -> Result<()> {
        let mut v = Vec::new();
        self.readline(&mut v)?;
        match imap_proto::parser::parse_response(&v) {
            Ok((
                _,
                resp @ Response::Data {
                    status: Status::Bye,
                    ..
                },
            )) => Err(resp.into()),
            _ => Ok(()),
        }
    }

    fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut v = Vec::new();
        self.read_response_onto(&mut v)?;
        Ok(v)
    }

    /// Read untagged data onto `data` until the completion for the current tag arrives, and
    /// return that completion line.
    fn read_response_onto(&mut self, data: &mut Vec<u8>) -> Result<Vec<u8>> {
        let mut continue_from = None;
        let match_tag = format!("{}{}", TAG_PREFIX, self.tag);
        loop {
            let start_new = data.len();
            self.readline(data)?;
            let line_start = continue_from.take().unwrap_or(start_new);

            let break_with = {
                let line = &data[line_start..];

                match imap_proto::parser::parse_response(line) {
                    Ok((
                        _,
                        Response::Done {
                            tag,
                            status,
                            information,
                            ..
                        },
                    )) => {
                        if tag.as_bytes() != match_tag.as_bytes() {
                            Some(Err(Error::Parse(ParseError::Unexpected(format!(
                                "completion for tag {:?} while waiting for {}",
                                tag, match_tag
                            )))))
                        } else {
                            let expl = information
                                .map(|s| s.into_owned())
                                .unwrap_or_else(|| "no explanation given".to_string());
                            Some(match status {
                                Status::Ok => Ok(()),
                                Status::Bad => Err(Error::Bad(expl)),
                                Status::No => Err(Error::No(expl)),
                                _ => Err(Error::Parse(ParseError::Invalid(line.to_vec()))),
                            })
                        }
                    }
                    Ok(..) => None,
                    Err(nom::Err::Incomplete(..)) => {
                        continue_from = Some(line_start);
                        None
                    }
                    _ => Some(Err(Error::Parse(ParseError::Invalid(line.to_vec())))),
                }
            };

            match break_with {
                Some(Ok(())) => break Ok(data.split_off(line_start)),
                Some(Err(e)) => break Err(e),
                None => {}
            }
        }
    }

    fn readline(&mut self, into: &mut Vec<u8>) -> Result<usize> {
        let read = self.stream.read_until(LF, into)?;
        if read == 0 {
            return Err(Error::ConnectionLost);
        }

        let line = &into[into.len() - read..];
        tracing::trace!(
            "S: {}",
            String::from_utf8_lossy(line).trim_end_matches(['\r', '\n'])
        );

        Ok(read)
    }

    fn create_command(&mut self, command: &str) -> String {
        self.tag += 1;
        format!("{}{} {}", TAG_PREFIX, self.tag, command)
    }

    fn write_line(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf)?;
        self.stream.write_all(&[CR, LF])?;
        self.stream.flush()?;

        let line = String::from_utf8_lossy(buf);
        match line.split_once(" LOGIN ") {
            Some((tag, _)) => tracing::trace!("C: {} LOGIN <redacted>", tag),
            None => tracing::trace!("C: {}", line),
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::super::mock_stream::MockStream;
    use super::*;

    #[test]
    fn read_response() {
        let response = "a0 OK Logged in.\r\n";
        let mock_stream = MockStream::new(response.as_bytes().to_vec());
        let mut client = Client::new(mock_stream);
        let actual_response = client.read_response().unwrap();
        assert_eq!(Vec::<u8>::new(), actual_response);
    }

    #[test]
    fn read_response_keeps_untagged_data() {
        let response = "* SEARCH 1 2\r\na0 OK SEARCH completed\r\n";
        let mock_stream = MockStream::new(response.as_bytes().to_vec());
        let mut client = Client::new(mock_stream);
        let actual_response = client.read_response().unwrap();
        assert_eq!(b"* SEARCH 1 2\r\n".to_vec(), actual_response);
    }

    #[test]
    fn read_response_literal() {
        let response = "* LIST () \"/\" {7}\r\nArchive\r\na0 OK LIST completed\r\n";
        let mock_stream = MockStream::new(response.as_bytes().to_vec());
        let mut client = Client::new(mock_stream);
        let actual_response = client.read_response().unwrap();
        assert_eq!(
            b"* LIST () \"/\" {7}\r\nArchive\r\n".to_vec(),
            actual_response
        );
    }

    #[test]
    fn read_greeting() {
        let greeting = "* OK Dovecot ready.\r\n";
        let mock_stream = MockStream::new(greeting.as_bytes().to_vec());
        let mut client = Client::new(mock_stream);
        client.read_greeting().unwrap();
    }

    #[test]
    fn read_greeting_bye() {
        let greeting = "* BYE Too many connections\r\n";
        let mock_stream = MockStream::new(greeting.as_bytes().to_vec());
        let mut client = Client::new(mock_stream);
        match client.read_greeting() {
            Err(Error::Bye(info)) => assert_eq!(info, "Too many connections"),
            r => panic!("Wrong result: {:?}", r),
        }
    }

    #[test]
    fn readline_delay_read() {
        let greeting = "* OK Dovecot ready.\r\n";
        let expected_response: String = greeting.to_string();
        let mock_stream = MockStream::default()
            .with_buf(greeting.as_bytes().to_vec())
            .with_delay();
        let mut client = Client::new(mock_stream);
        let mut v = Vec::new();
        client.readline(&mut v).unwrap();
        let actual_response = String::from_utf8(v).unwrap();
        assert_eq!(expected_response, actual_response);
    }

    #[test]
    fn readline_eof() {
        let mock_stream = MockStream::default().with_eof();
        let mut client = Client::new(mock_stream);
        let mut v = Vec::new();
        if let Err(Error::ConnectionLost) = client.readline(&mut v) {
        } else {
            unreachable!("EOF read did not return connection lost");
        }
    }

    #[test]
    fn readline_err() {
        let mock_stream = MockStream::default().with_err();
        let mut client = Client::new(mock_stream);
        let mut v = Vec::new();
        match client.readline(&mut v) {
            Err(Error::Io(_)) => {}
            r => panic!("Wrong result: {:?}", r),
        }
    }

    #[test]
    fn create_command() {
        let base_command = "CHECK";
        let mock_stream = MockStream::default();
        let mut imap_stream = Client::new(mock_stream);

        let expected_command = format!("a1 {}", base_command);
        let command = imap_stream.create_command(base_command);
        assert!(
            command == expected_command,
            "expected command doesn't equal actual command"
        );

        let expected_command2 = format!("a2 {}", base_command);
        let command2 = imap_stream.create_command(base_command);
        assert!(
            command2 == expected_command2,
            "expected command doesn't equal actual command"
        );
    }

    #[test]
    fn login() {
        let response = b"a1 OK Logged in\r\n".to_vec();
        let username = "username";
        let password = "password";
        let command = format!("a1 LOGIN {} {}\r\n", quote!(username), quote!(password));
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        client.login(username, password).unwrap();
        assert!(
            client.stream.get_ref().written_buf == command.as_bytes().to_vec(),
            "Invalid login command"
        );
    }

    #[test]
    fn login_rejected() {
        let response = b"a1 NO Authentication failed.\r\n".to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        match client.login("username", "wrong") {
            Err(Error::No(info)) => assert_eq!(info, "Authentication failed."),
            r => panic!("Wrong result: {:?}", r),
        }
    }

    #[test]
    fn logout() {
        let response = b"* BYE Logging out\r\na1 OK Logout completed.\r\n".to_vec();
        let command = "a1 LOGOUT\r\n";
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        client.logout().unwrap();
        assert!(
            client.stream.get_ref().written_buf == command.as_bytes().to_vec(),
            "Invalid logout command"
        );
    }

    #[test]
    fn list() {
        let response = b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n\
            * LIST (\\HasNoChildren) \"/\" \"Archive\"\r\n\
            a1 OK List completed.\r\n"
            .to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        let entries = client.list("", "%").unwrap();
        assert!(
            client.stream.get_ref().written_buf == b"a1 LIST \"\" \"%\"\r\n".to_vec(),
            "Invalid list command"
        );
        assert_eq!(
            entries,
            vec![
                "(\\HasNoChildren) \"/\" \"INBOX\"".to_string(),
                "(\\HasNoChildren) \"/\" \"Archive\"".to_string(),
            ]
        );
    }

    #[test]
    fn list_literal_name() {
        let response = b"* LIST () \"/\" {7}\r\nArchive\r\n\
            a1 OK List completed.\r\n"
            .to_vec();
        let mut client = Client::new(MockStream::new(response));
        let entries = client.list("", "%").unwrap();
        assert_eq!(entries, vec!["() \"/\" \"Archive\"".to_string()]);
    }

    #[test]
    fn select() {
        let response = b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
            * OK [PERMANENTFLAGS (\\* \\Answered \\Flagged \\Deleted \\Draft \\Seen)] \
              Limited\r\n\
            * 1 EXISTS\r\n\
            * 1 RECENT\r\n\
            * OK [UNSEEN 1] First unseen.\r\n\
            * OK [UIDVALIDITY 1257842737] UIDs valid\r\n\
            * OK [UIDNEXT 2] Predicted next UID\r\n\
            a1 OK [READ-WRITE] Select completed.\r\n"
            .to_vec();
        let mailbox_name = "INBOX";
        let command = format!("a1 SELECT {}\r\n", quote!(mailbox_name));
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        let mailbox = client.select(mailbox_name).unwrap();
        assert!(
            client.stream.get_ref().written_buf == command.as_bytes().to_vec(),
            "Invalid select command"
        );
        assert_eq!(
            mailbox.flags,
            vec![
                Flag::Answered,
                Flag::Flagged,
                Flag::Deleted,
                Flag::Seen,
                Flag::Draft,
            ]
        );
        assert_eq!(mailbox.exists, 1);
        assert_eq!(mailbox.recent, 1);
        assert_eq!(mailbox.unseen, Some(1));
        assert_eq!(mailbox.uid_next, Some(2));
        assert_eq!(mailbox.uid_validity, Some(1257842737));
        assert_eq!(mailbox.permanent_flags.len(), 6);
    }

    #[test]
    fn select_read_only() {
        let response = b"* 1 EXISTS\r\na1 OK [READ-ONLY] Select completed.\r\n".to_vec();
        let mut client = Client::new(MockStream::new(response));
        let mailbox = client.select("INBOX").unwrap();
        assert!(mailbox.read_only);
        assert_eq!(mailbox.exists, 1);
    }

    #[test]
    fn select_read_write() {
        let response = b"* 1 EXISTS\r\na1 OK [READ-WRITE] Select completed.\r\n".to_vec();
        let mut client = Client::new(MockStream::new(response));
        assert!(!client.select("INBOX").unwrap().read_only);
    }

    #[test]
    fn search() {
        let response = b"* SEARCH 105 101 102 103\r\na1 OK Search completed.\r\n".to_vec();
        let query = "(BEFORE \"11-Oct-2026\" UNFLAGGED)";
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        let ids = client.search(query).unwrap();
        assert!(
            client.stream.get_ref().written_buf
                == format!("a1 SEARCH {}\r\n", query).as_bytes().to_vec(),
            "Invalid search command"
        );
        assert_eq!(ids, vec![101, 102, 103, 105]);
    }

    #[test]
    fn copy() {
        let response = b"a1 OK COPY completed\r\n".to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        client.copy("2:4,7", "Archive").unwrap();
        assert!(
            client.stream.get_ref().written_buf == b"a1 COPY 2:4,7 \"Archive\"\r\n".to_vec(),
            "Invalid copy command"
        );
    }

    #[test]
    fn copy_no_response() {
        let response = b"a1 NO Mailbox doesn't exist: Archive\r\n".to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        match client.copy("1", "Archive") {
            Err(Error::No(info)) => assert_eq!(info, "Mailbox doesn't exist: Archive"),
            r => panic!("Wrong result: {:?}", r),
        }
    }

    #[test]
    fn store() {
        let response = b"* 2 FETCH (FLAGS (\\Deleted \\Seen))\r\n\
                   * 3 FETCH (FLAGS (\\Deleted))\r\n\
                   * 4 FETCH (FLAGS (\\Deleted \\Flagged \\Seen))\r\n\
                   a1 OK STORE completed\r\n"
            .to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        let touched = client.store("2:4", "+FLAGS (\\Deleted)").unwrap();
        assert!(
            client.stream.get_ref().written_buf == b"a1 STORE 2:4 +FLAGS (\\Deleted)\r\n".to_vec(),
            "Invalid store command"
        );
        assert_eq!(touched, 3);
    }

    #[test]
    fn expunge() {
        let response = b"* 3 EXPUNGE\r\n* 3 EXPUNGE\r\n* 5 EXPUNGE\r\n* 8 EXPUNGE\r\n\
                         a1 OK EXPUNGE completed\r\n"
            .to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        let expunged = client.expunge().unwrap();
        assert!(
            client.stream.get_ref().written_buf == b"a1 EXPUNGE\r\n".to_vec(),
            "Invalid expunge command"
        );
        assert_eq!(expunged, vec![3, 3, 5, 8]);
    }

    #[test]
    fn bad_response() {
        let response = b"a1 BAD Unknown command\r\n".to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        match client.expunge() {
            Err(Error::Bad(info)) => assert_eq!(info, "Unknown command"),
            r => panic!("Wrong result: {:?}", r),
        }
    }

    #[test]
    fn mismatched_tag() {
        let response = b"a7 OK EXPUNGE completed\r\n".to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        match client.expunge() {
            Err(Error::Parse(ParseError::Unexpected(_))) => {}
            r => panic!("Wrong result: {:?}", r),
        }
    }

    #[test]
    fn connection_lost_mid_response() {
        let response = b"* 3 EXPUNGE\r\n".to_vec();
        let mock_stream = MockStream::new(response);
        let mut client = Client::new(mock_stream);
        assert!(client.expunge().is_err());
    }

    #[test]
    fn quote_backslash() {
        assert_eq!("\"test\\\\text\"", quote!(r"test\text"));
    }

    #[test]
    fn quote_dquote() {
        assert_eq!("\"test\\\"text\"", quote!("test\"text"));
    }

    #[test]
    fn validate_random() {
        assert_eq!(
            "\"~iCQ_k;>[&\\\"sVCvUW`e<<P!wJ\"",
            &validate_str("COMMAND", "arg1", "~iCQ_k;>[&\"sVCvUW`e<<P!wJ").unwrap()
        );
    }

    #[test]
    fn validate_newline() {
        if let Err(ref e) = validate_str("COMMAND", "arg1", "test\nstring") {
            if let Error::Validate(ref ve) = e {
                if ve.offending_char == '\n' {
                    return;
                }
            }
            panic!("Wrong error: {:?}", e);
        }
        panic!("No error");
    }

    #[test]
    fn validate_carriage_return() {
        if let Err(ref e) = validate_str("COMMAND", "arg1", "test\rstring") {
            if let Error::Validate(ref ve) = e {
                if ve.offending_char == '\r' {
                    return;
                }
            }
            panic!("Wrong error: {:?}", e);
        }
        panic!("No error");
    }

    #[test]
    fn search_rejects_line_breaks() {
        let mut client = Client::new(MockStream::default());
        match client.search("ALL\r\na2 LOGOUT") {
            Err(Error::Validate(ve)) => assert_eq!(ve.offending_char, '\r'),
            r => panic!("Wrong result: {:?}", r),
        }
        assert!(client.stream.get_ref().written_buf.is_empty());
    }
}
