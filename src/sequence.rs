//! Compact [sequence-set](https://tools.ietf.org/html/rfc3501#section-9) notation for batches
//! of message sequence numbers.
//!
//! `COPY`, `STORE` and friends accept a sequence set such as `1:3,5,9:10`. Sending one set per
//! batch instead of one number per message keeps the command line short no matter how many
//! messages a search turns up.
//!
//! ```
//! use imap_archiver::sequence::compress;
//!
//! assert_eq!(compress(&[1, 2, 3, 5, 6, 7, 9, 10]), "1:3,5:7,9:10");
//! assert_eq!(compress(&[2, 3, 5, 7, 11]), "2:3,5,7,11");
//! assert_eq!(compress(&[]), "");
//! ```

use nom::{
    character::complete::{char, u32 as seq},
    combinator::{all_consuming, map, opt, verify},
    multi::separated_list0,
    sequence::{pair, preceded},
    IResult,
};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ParseError};
use crate::types::Seq;
use crate::utils::iter_join_onto;

/// A contiguous, inclusive run of message sequence numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRange {
    start: Seq,
    end: Seq,
}

impl MessageRange {
    /// A run covering `start..=end`. Returns `None` if `start > end`.
    pub fn new(start: Seq, end: Seq) -> Option<MessageRange> {
        if start <= end {
            Some(MessageRange { start, end })
        } else {
            None
        }
    }

    /// First sequence number in the run.
    pub fn start(&self) -> Seq {
        self.start
    }

    /// Last sequence number in the run.
    pub fn end(&self) -> Seq {
        self.end
    }

    /// Number of messages covered.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// A range always covers at least one message.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for MessageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// An ordered list of [`MessageRange`]s, rendered as a comma-separated sequence set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageSet {
    ranges: Vec<MessageRange>,
}

impl MessageSet {
    /// Group ascending sequence numbers into maximal contiguous runs.
    ///
    /// `ids` must be sorted ascending; duplicates are not merged.
    pub fn from_sorted(ids: &[Seq]) -> MessageSet {
        let mut ranges = Vec::new();
        let mut ids = ids.iter().copied();

        if let Some(first) = ids.next() {
            let mut current = MessageRange {
                start: first,
                end: first,
            };
            for n in ids {
                if Some(n) == current.end.checked_add(1) {
                    current.end = n;
                } else {
                    ranges.push(current);
                    current = MessageRange { start: n, end: n };
                }
            }
            ranges.push(current);
        }

        MessageSet { ranges }
    }

    /// The runs making up this set, in order.
    pub fn ranges(&self) -> &[MessageRange] {
        &self.ranges
    }

    /// Total number of messages covered.
    pub fn len(&self) -> usize {
        self.ranges.iter().map(MessageRange::len).sum()
    }

    /// Return true if the set selects no messages.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Expand back into individual sequence numbers.
    pub fn iter(&self) -> impl Iterator<Item = Seq> + '_ {
        self.ranges.iter().flat_map(|r| r.start..=r.end)
    }
}

impl fmt::Display for MessageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        iter_join_onto(f, &self.ranges, ",")
    }
}

fn range(input: &str) -> IResult<&str, MessageRange> {
    map(
        verify(
            pair(seq, opt(preceded(char(':'), seq))),
            |&(start, end): &(Seq, Option<Seq>)| start > 0 && end.map_or(true, |end| start <= end),
        ),
        |(start, end)| MessageRange {
            start,
            end: end.unwrap_or(start),
        },
    )(input)
}

impl FromStr for MessageSet {
    type Err = Error;

    /// Parse a sequence set produced by [`MessageSet`]'s `Display`, e.g. `1:3,5,9:10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(separated_list0(char(','), range))(s)
            .map(|(_, ranges)| MessageSet { ranges })
            .map_err(|_| Error::Parse(ParseError::SequenceSet(s.to_string())))
    }
}

/// Render sorted sequence numbers as a compact sequence set; empty input yields `""`.
pub fn compress(ids: &[Seq]) -> String {
    MessageSet::from_sorted(ids).to_string()
}
