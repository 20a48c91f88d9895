//! Task line parser.
//!
//! Users paste lines out of spreadsheets and chats, so the delimiter varies.
//! [`parse_line`] tries an ordered list of grammars and returns the first hit:
//!
//! 1. five or more fields split on one of `|`, `,`, `;`, double space:
//!    `link | order | created | deadline hour | deadline date`
//! 2. exactly four fields split on one of the same separators:
//!    `link | order | created | deadline`
//! 3. whitespace tokens: the trailing tokens are fixed fields and any
//!    leading tokens form the link.
//!
//! For the five-field layouts the deadline text is synthesized as
//! `"<hour> <date>"`.

use crate::tasks::model::TaskFields;

/// Field separators, in priority order.
pub const SEPARATORS: [&str; 4] = ["|", ",", ";", "  "];

/// One grammar: a pure function from a trimmed line to fields.
pub type Grammar = fn(&str) -> Option<TaskFields>;

/// Grammars in the order [`parse_line`] tries them.
pub const GRAMMARS: [(&str, Grammar); 3] = [
    ("separated-5", separated_five_fields),
    ("separated-4", separated_four_fields),
    ("whitespace", whitespace_fields),
];

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line is empty")]
    Empty,
    #[error("expected 4 or 5 columns, found {tokens} word(s)")]
    TooFewFields { tokens: usize },
}

/// Parse one raw line into task fields.
///
/// The line is trimmed first and kept verbatim as `raw_line`, so re-parsing
/// a persisted line reproduces the same fields.
pub fn parse_line(line: &str) -> Result<TaskFields, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    GRAMMARS
        .iter()
        .find_map(|(_, grammar)| grammar(line))
        .ok_or(ParseError::TooFewFields {
            tokens: line.split_whitespace().count(),
        })
}

/// First separator that yields five or more fields; extra fields are ignored.
pub fn separated_five_fields(line: &str) -> Option<TaskFields> {
    SEPARATORS.iter().find_map(|sep| {
        let parts: Vec<&str> = line.split(sep).collect();
        (parts.len() >= 5)
            .then(|| five_fields(line, parts[0], parts[1], parts[2], parts[3], parts[4]))
    })
}

/// First separator that yields exactly four fields.
pub fn separated_four_fields(line: &str) -> Option<TaskFields> {
    SEPARATORS.iter().find_map(|sep| {
        let parts: Vec<&str> = line.split(sep).collect();
        (parts.len() == 4).then(|| four_fields(line, parts[0], parts[1], parts[2], parts[3]))
    })
}

/// Whitespace layout, anchored on the trailing tokens.
pub fn whitespace_fields(line: &str) -> Option<TaskFields> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.len() {
        n if n >= 5 => {
            let link = tokens[..n - 4].join(" ");
            Some(five_fields(
                line,
                &link,
                tokens[n - 4],
                tokens[n - 3],
                tokens[n - 2],
                tokens[n - 1],
            ))
        }
        4 => Some(four_fields(line, tokens[0], tokens[1], tokens[2], tokens[3])),
        _ => None,
    }
}

fn five_fields(
    line: &str,
    link: &str,
    order_id: &str,
    created_date: &str,
    deadline_hour: &str,
    deadline_date: &str,
) -> TaskFields {
    TaskFields {
        link: link.trim().to_owned(),
        order_id: order_id.trim().to_owned(),
        created_date: created_date.trim().to_owned(),
        deadline_text: format!("{} {}", deadline_hour.trim(), deadline_date.trim()),
        raw_line: line.to_owned(),
    }
}

fn four_fields(
    line: &str,
    link: &str,
    order_id: &str,
    created_date: &str,
    deadline_text: &str,
) -> TaskFields {
    TaskFields {
        link: link.trim().to_owned(),
        order_id: order_id.trim().to_owned(),
        created_date: created_date.trim().to_owned(),
        deadline_text: deadline_text.trim().to_owned(),
        raw_line: line.to_owned(),
    }
}
