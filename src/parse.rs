use imap_proto::{
    MailboxDatum, NameAttribute as ImapNameAttribute, Response, ResponseCode, Status,
};
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, none_of, one_of},
    combinator::{all_consuming, map, opt, recognize, verify},
    multi::{fold_many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::error::{Error, ParseError, Result};
use super::types::*;

pub(crate) enum MapOrNot<'a, T> {
    Map(T),
    Not(Response<'a>),
}

/// Walk every response in `input`, handing each one (and the raw bytes it was parsed from) to
/// `map`. Responses `map` declines are checked for being unilateral server data; anything else
/// is an error.
pub(crate) fn parse_many_into<'input, T, F>(
    input: &'input [u8],
    into: &mut Vec<T>,
    mut map: F,
) -> Result<()>
where
    F: FnMut(&'input [u8], Response<'input>) -> Result<MapOrNot<'input, T>>,
{
    let mut lines = input;
    loop {
        if lines.is_empty() {
            break Ok(());
        }

        match imap_proto::parser::parse_response(lines) {
            Ok((rest, resp)) => {
                let raw = &lines[..lines.len() - rest.len()];
                lines = rest;

                match map(raw, resp)? {
                    MapOrNot::Map(t) => into.push(t),
                    MapOrNot::Not(resp) => {
                        if let Some(resp) = handle_unilateral(resp) {
                            break Err(resp.into());
                        }
                    }
                }
            }
            _ => {
                break Err(Error::Parse(ParseError::Invalid(lines.to_vec())));
            }
        }
    }
}

/// Render every `LIST` response as a listing entry of the form `(<flags>) "<delimiter>" "<name>"`.
///
/// Names are always quoted, so a name the server sent as a literal or an atom reads the same as
/// a quoted one. A `NIL` delimiter is kept as `NIL`.
pub fn parse_list_entries(lines: &[u8]) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    parse_many_into(lines, &mut entries, |raw, resp| match resp {
        Response::MailboxData(MailboxDatum::List {
            name_attributes,
            delimiter,
            name,
        }) => {
            let attributes: Vec<&str> = name_attributes
                .iter()
                .filter_map(name_attribute_text)
                .collect();
            // quoted strings come back from imap-proto with their escapes intact
            let delimiter = match delimiter {
                Some(delimiter) => format!("\"{}\"", delimiter),
                None => "NIL".to_string(),
            };
            Ok(MapOrNot::Map(format!(
                "({}) {} {}",
                attributes.join(" "),
                delimiter,
                quote_listed_name(raw, &name)
            )))
        }
        resp => Ok(MapOrNot::Not(resp)),
    })?;
    Ok(entries)
}

/// Quote the trailing name of a raw `LIST` line. A quoted name is still escaped and is wrapped
/// as-is; literal and atom names are quoted afresh.
fn quote_listed_name(raw: &[u8], name: &str) -> String {
    let mut body = raw;
    while let [rest @ .., b'\r' | b'\n'] = body {
        body = rest;
    }
    let literal = body.ends_with(name.as_bytes())
        && body[..body.len() - name.len()].ends_with(b"}\r\n");
    if !literal && body.ends_with(b"\"") {
        format!("\"{}\"", name)
    } else {
        quote!(name)
    }
}

fn name_attribute_text<'a>(attribute: &'a ImapNameAttribute<'_>) -> Option<&'a str> {
    let text: &str = match attribute {
        ImapNameAttribute::NoInferiors => "\\Noinferiors",
        ImapNameAttribute::NoSelect => "\\Noselect",
        ImapNameAttribute::Marked => "\\Marked",
        ImapNameAttribute::Unmarked => "\\Unmarked",
        ImapNameAttribute::All => "\\All",
        ImapNameAttribute::Archive => "\\Archive",
        ImapNameAttribute::Drafts => "\\Drafts",
        ImapNameAttribute::Flagged => "\\Flagged",
        ImapNameAttribute::Junk => "\\Junk",
        ImapNameAttribute::Sent => "\\Sent",
        ImapNameAttribute::Trash => "\\Trash",
        ImapNameAttribute::Extension(s) => &**s,
        _ => return None,
    };
    Some(text)
}

/// Collect the identifiers of every `SEARCH` response, sorted ascending and deduplicated.
pub fn parse_ids(lines: &[u8]) -> Result<Vec<Seq>> {
    let mut batches = Vec::new();
    parse_many_into(lines, &mut batches, |_, resp| match resp {
        Response::MailboxData(MailboxDatum::Search(ids)) => Ok(MapOrNot::Map(ids)),
        resp => Ok(MapOrNot::Not(resp)),
    })?;
    let mut ids: Vec<Seq> = batches.into_iter().flatten().collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Collect the sequence numbers reported by untagged `EXPUNGE` responses, in arrival order.
pub fn parse_expunge(lines: &[u8]) -> Result<Vec<Seq>> {
    let mut expunged = Vec::new();
    parse_many_into(lines, &mut expunged, |_, resp| match resp {
        Response::Expunge(seq) => Ok(MapOrNot::Map(seq)),
        resp => Ok(MapOrNot::Not(resp)),
    })?;
    Ok(expunged)
}

/// Consume the untagged `FETCH` echoes of a `STORE`.
pub fn parse_store(lines: &[u8]) -> Result<usize> {
    let mut touched = Vec::new();
    parse_many_into(lines, &mut touched, |_, resp| match resp {
        Response::Fetch(seq, _) => Ok(MapOrNot::Map(seq)),
        resp => Ok(MapOrNot::Not(resp)),
    })?;
    Ok(touched.len())
}

/// Consume any untagged data that accompanies an otherwise data-less command.
pub fn parse_noop(lines: &[u8]) -> Result<()> {
    let mut nothing: Vec<()> = Vec::new();
    parse_many_into(lines, &mut nothing, |_, resp| Ok(MapOrNot::Not(resp)))
}

pub fn parse_mailbox(mut lines: &[u8]) -> Result<Mailbox> {
    let mut mailbox = Mailbox::default();

    loop {
        if lines.is_empty() {
            break Ok(mailbox);
        }

        match imap_proto::parser::parse_response(lines) {
            Ok((
                rest,
                Response::Data {
                    status: Status::Ok,
                    code,
                    ..
                },
            )) => {
                lines = rest;

                match code {
                    Some(ResponseCode::UidValidity(uid)) => {
                        mailbox.uid_validity = Some(uid);
                    }
                    Some(ResponseCode::UidNext(unext)) => {
                        mailbox.uid_next = Some(unext);
                    }
                    Some(ResponseCode::Unseen(n)) => {
                        mailbox.unseen = Some(n);
                    }
                    Some(ResponseCode::PermanentFlags(flags)) => {
                        mailbox
                            .permanent_flags
                            .extend(flags.iter().map(|f| Flag::from(&**f)));
                    }
                    Some(ResponseCode::ReadOnly) => mailbox.read_only = true,
                    Some(ResponseCode::ReadWrite) => mailbox.read_only = false,
                    _ => {}
                }
            }
            // the tagged completion of SELECT, if the caller kept it
            Ok((
                rest,
                Response::Done {
                    status: Status::Ok,
                    code,
                    ..
                },
            )) => {
                lines = rest;

                match code {
                    Some(ResponseCode::ReadOnly) => mailbox.read_only = true,
                    Some(ResponseCode::ReadWrite) => mailbox.read_only = false,
                    _ => {}
                }
            }
            Ok((rest, Response::MailboxData(m))) => {
                lines = rest;

                match m {
                    MailboxDatum::Exists(e) => {
                        mailbox.exists = e;
                    }
                    MailboxDatum::Recent(r) => {
                        mailbox.recent = r;
                    }
                    MailboxDatum::Flags(flags) => {
                        mailbox.flags.extend(flags.iter().map(|f| Flag::from(&**f)));
                    }
                    m => {
                        tracing::debug!("ignoring mailbox data during SELECT: {:?}", m);
                    }
                }
            }
            Ok((rest, resp)) => {
                lines = rest;
                if let Some(resp) = handle_unilateral(resp) {
                    break Err(resp.into());
                }
            }
            _ => {
                break Err(Error::Parse(ParseError::Invalid(lines.to_vec())));
            }
        }
    }
}

// check if this is simply a unilateral server response
// (see Section 7 of RFC 3501):
fn handle_unilateral(res: Response<'_>) -> Option<Response<'_>> {
    match res {
        Response::MailboxData(MailboxDatum::Status { mailbox, status }) => {
            tracing::debug!("unsolicited STATUS for {}: {:?}", mailbox, status);
        }
        Response::MailboxData(MailboxDatum::Recent(n)) => {
            tracing::debug!("unsolicited {} RECENT", n);
        }
        Response::MailboxData(MailboxDatum::Exists(n)) => {
            tracing::debug!("unsolicited {} EXISTS", n);
        }
        Response::Expunge(n) => {
            tracing::debug!("unsolicited {} EXPUNGE", n);
        }
        Response::Fetch(n, _) => {
            tracing::debug!("unsolicited FETCH for message {}", n);
        }
        Response::Data {
            status: Status::Ok,
            information,
            ..
        } => {
            tracing::debug!("unsolicited OK: {}", information.as_deref().unwrap_or(""));
        }
        res => {
            return Some(res);
        }
    }
    None
}

fn is_atom_char(c: char) -> bool {
    c.is_ascii_graphic() && !"(){%*\"\\]".contains(c)
}

fn is_astring_char(c: char) -> bool {
    is_atom_char(c) || c == ']' || c == '%' || c == '*'
}

fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((none_of("\\\""), preceded(char('\\'), one_of("\\\"")))),
            String::new,
            |mut s, c| {
                s.push(c);
                s
            },
        ),
        char('"'),
    )(input)
}

fn name_attribute(input: &str) -> IResult<&str, NameAttribute> {
    map(
        recognize(pair(opt(char('\\')), take_while1(is_atom_char))),
        NameAttribute::from,
    )(input)
}

fn name_attributes(input: &str) -> IResult<&str, Vec<NameAttribute>> {
    delimited(
        char('('),
        separated_list0(char(' '), name_attribute),
        char(')'),
    )(input)
}

fn delimiter(input: &str) -> IResult<&str, String> {
    verify(quoted, |d: &str| d.chars().count() == 1)(input)
}

fn mailbox_name(input: &str) -> IResult<&str, String> {
    alt((quoted, map(take_while1(is_astring_char), String::from)))(input)
}

/// Tokenize a raw `LIST` entry: a parenthesised attribute list, a quoted single-character
/// hierarchy delimiter and a quoted (or atom) mailbox name.
pub(crate) fn list_entry(entry: &str) -> Option<Name> {
    let entry = entry.trim_end_matches(['\r', '\n']);
    let parsed = all_consuming(tuple((
        name_attributes,
        char(' '),
        delimiter,
        char(' '),
        mailbox_name,
    )))(entry);

    match parsed {
        Ok((_, (attributes, _, delimiter, _, name))) => Some(Name {
            attributes,
            delimiter,
            name,
        }),
        Err(_) => None,
    }
}
