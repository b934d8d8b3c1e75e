//! Pattern parser using winnow.
//!
//! Parses regex-shaped templates into an AST. Handles:
//! - Literal characters and `\` escapes (`\n`, `\t`, `\r` and escaped metacharacters)
//! - Character classes: `[...]`, `.`, `\d \D \w \W \s \S`
//! - Anchors: `^`, `$`, `\b`, `\B`
//! - Groups: `(...)`, `(?<name>...)`, `(?P<name>...)`, `(?:...)`
//! - Placeholders: `{name}`
//! - Quantifiers: `?`, `*`, `+`, `{n}`, `{n,}`, `{n,m}`, each optionally lazy
//! - Alternation with `|`

use super::ast::*;
use super::error::ParseError;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, none_of, take_while};

/// Parse a pattern into an AST with numbered groups.
///
/// Capturing groups and placeholders are numbered from 1 in order of their
/// opening position.
///
/// # Example
///
/// ```
/// use dynser::parser::parse_pattern;
///
/// let pattern = parse_pattern(r"(\d+)-{name}").unwrap();
/// let groups = pattern.groups();
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[1].index, 2);
/// assert_eq!(groups[1].name.as_deref(), Some("name"));
/// ```
pub fn parse_pattern(input: &str) -> Result<Pattern, ParseError> {
    let mut remaining = input;
    match alternation(&mut remaining) {
        Ok(mut pattern) => {
            if remaining.is_empty() {
                number_groups(&mut pattern, &mut 0);
                Ok(pattern)
            } else {
                Err(ParseError::Syntax {
                    column: column_of(input, remaining),
                    message: describe_leftover(remaining),
                })
            }
        }
        Err(ErrMode::Cut(_)) => Err(ParseError::Syntax {
            column: column_of(input, remaining),
            message: format!("repetition count exceeds {}", Quantifier::MAX_COUNT),
        }),
        Err(e) => Err(ParseError::Syntax {
            column: column_of(input, remaining),
            message: format!("parse error: {}", e),
        }),
    }
}

/// 1-based character column of the first unconsumed character.
fn column_of(original: &str, remaining: &str) -> usize {
    let consumed = original.len() - remaining.len();
    original[..consumed].chars().count() + 1
}

fn describe_leftover(remaining: &str) -> String {
    match remaining.chars().next() {
        Some('(') => "unclosed group".to_string(),
        Some(')') => "unmatched ')'".to_string(),
        Some('[') => "unclosed character class".to_string(),
        Some('\\') => "trailing backslash".to_string(),
        Some(c @ ('*' | '+' | '?')) => format!("quantifier '{c}' has nothing to repeat"),
        Some(c) => format!("unexpected character: '{c}'"),
        None => "unexpected end of input".to_string(),
    }
}

/// Number capturing groups and placeholders in pre-order.
fn number_groups(pattern: &mut Pattern, next: &mut usize) {
    for item in pattern
        .branches
        .iter_mut()
        .flat_map(|branch| branch.items.iter_mut())
    {
        match &mut item.atom {
            Atom::Group(group) => {
                if let Some(index) = group.index.as_mut() {
                    *next += 1;
                    *index = *next;
                }
                number_groups(&mut group.body, next);
            }
            Atom::Placeholder(placeholder) => {
                *next += 1;
                placeholder.index = *next;
            }
            Atom::Literal(_) | Atom::Class(_) | Atom::Anchor(_) => {}
        }
    }
}

/// Parse alternatives separated by `|`.
fn alternation(input: &mut &str) -> ModalResult<Pattern> {
    let branches: Vec<Sequence> = separated(1.., sequence, '|').parse_next(input)?;
    Ok(Pattern { branches })
}

/// Parse a (possibly empty) run of items.
fn sequence(input: &mut &str) -> ModalResult<Sequence> {
    let items: Vec<Item> = repeat(0.., item).parse_next(input)?;
    Ok(Sequence { items })
}

/// Parse an atom and its optional quantifier.
fn item(input: &mut &str) -> ModalResult<Item> {
    let atom = atom(input)?;
    let quantifier = opt(quantifier).parse_next(input)?;
    Ok(Item { atom, quantifier })
}

fn atom(input: &mut &str) -> ModalResult<Atom> {
    alt((placeholder, group, bracket_class, escape, special, literal)).parse_next(input)
}

/// Parse a placeholder: {name}
fn placeholder(input: &mut &str) -> ModalResult<Atom> {
    delimited('{', identifier, '}')
        .map(|name: &str| {
            Atom::Placeholder(Placeholder {
                index: 0,
                name: name.to_string(),
            })
        })
        .parse_next(input)
}

#[derive(Clone)]
enum GroupHeader {
    NonCapturing,
    Named(String),
}

/// Parse a group: ( header? alternation )
fn group(input: &mut &str) -> ModalResult<Atom> {
    '('.parse_next(input)?;
    let header = opt(group_header).parse_next(input)?;
    let body = alternation(input)?;
    ')'.parse_next(input)?;

    let (index, name) = match header {
        Some(GroupHeader::NonCapturing) => (None, None),
        Some(GroupHeader::Named(name)) => (Some(0), Some(name)),
        None => (Some(0), None),
    };
    Ok(Atom::Group(Group { index, name, body }))
}

/// Parse a group header: ?: or ?<name> or ?P<name>
fn group_header(input: &mut &str) -> ModalResult<GroupHeader> {
    preceded(
        '?',
        alt((
            ':'.value(GroupHeader::NonCapturing),
            delimited(alt(("P<", "<")), identifier, '>')
                .map(|name: &str| GroupHeader::Named(name.to_string())),
        )),
    )
    .parse_next(input)
}

/// Parse a bracketed character class, keeping its source text.
fn bracket_class(input: &mut &str) -> ModalResult<Atom> {
    ('[', class_body, ']')
        .take()
        .map(|source: &str| Atom::Class(source.to_string()))
        .parse_next(input)
}

fn class_body(input: &mut &str) -> ModalResult<()> {
    let _: Vec<()> = repeat(
        1..,
        alt((preceded('\\', any).void(), none_of([']', '\\']).void())),
    )
    .parse_next(input)?;
    Ok(())
}

/// Parse an escape sequence: \ followed by any character.
fn escape(input: &mut &str) -> ModalResult<Atom> {
    preceded('\\', any).map(escaped_atom).parse_next(input)
}

fn escaped_atom(c: char) -> Atom {
    match c {
        'd' | 'D' | 'w' | 'W' | 's' | 'S' => Atom::Class(format!("\\{c}")),
        'b' | 'B' => Atom::Anchor(format!("\\{c}")),
        'n' => Atom::Literal('\n'),
        't' => Atom::Literal('\t'),
        'r' => Atom::Literal('\r'),
        other => Atom::Literal(other),
    }
}

/// Parse `.`, `^` and `$`.
fn special(input: &mut &str) -> ModalResult<Atom> {
    alt((
        '.'.value(Atom::Class(".".to_string())),
        '^'.value(Atom::Anchor("^".to_string())),
        '$'.value(Atom::Anchor("$".to_string())),
    ))
    .parse_next(input)
}

/// Parse a single literal character.
///
/// Braces are literal when they do not form a placeholder or quantifier.
fn literal(input: &mut &str) -> ModalResult<Atom> {
    none_of(['(', ')', '|', '*', '+', '?', '[', '\\', '.', '^', '$'])
        .map(Atom::Literal)
        .parse_next(input)
}

/// Parse a quantifier with an optional lazy marker.
fn quantifier(input: &mut &str) -> ModalResult<Quantifier> {
    let quantifier = alt((
        '?'.value(Quantifier::OPTIONAL),
        '*'.value(Quantifier::ANY),
        '+'.value(Quantifier::AT_LEAST_ONE),
        counted,
    ))
    .parse_next(input)?;
    // Laziness only affects matching.
    let _: Option<char> = opt('?').parse_next(input)?;
    Ok(quantifier)
}

/// Parse a counted quantifier: {n} or {n,} or {n,m}
///
/// Counts above [`Quantifier::MAX_COUNT`] fail without backtracking, leaving
/// the input at the opening brace.
fn counted(input: &mut &str) -> ModalResult<Quantifier> {
    let start = *input;
    '{'.parse_next(input)?;
    let min = number(input)?;
    let max = match opt(preceded(',', opt(number))).parse_next(input)? {
        None => Some(min),
        Some(upper) => upper,
    };
    '}'.parse_next(input)?;

    if max.is_some_and(|max| max < min) {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    if min > Quantifier::MAX_COUNT || max.is_some_and(|max| max > Quantifier::MAX_COUNT) {
        *input = start;
        return Err(ErrMode::Cut(ContextError::new()));
    }
    Ok(Quantifier { min, max })
}

fn number(input: &mut &str) -> ModalResult<u32> {
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    digits
        .parse()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// Parse an identifier that does not start with a digit.
fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
        .verify(|s: &&str| s.chars().next().is_some_and(|c| !c.is_ascii_digit()))
        .parse_next(input)
}
