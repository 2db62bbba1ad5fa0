//! Minimal XML reader producing an attribute tree.
//!
//! Covers what model descriptions use: elements, attributes, self-closing
//! tags, comments, processing instructions, a DOCTYPE line and the predefined
//! entities. Character data between elements is skipped; descriptions carry
//! everything in attributes.

use crate::error::ParseError;
use lib_types::Properties;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, preceded, tuple},
    IResult,
};

/// Deepest element nesting accepted, counting the root as depth 1.
pub const MAX_ELEMENT_DEPTH: usize = 64;

/// Parse a complete XML document into its root element.
pub fn parse_document(content: &str) -> Result<Properties, ParseError> {
    let source = content.strip_prefix('\u{feff}').unwrap_or(content);

    let (rest, _) = misc(source).map_err(|e| locate(source, e))?;
    if rest.trim().is_empty() {
        return Err(ParseError::missing_element("root element"));
    }

    let (rest, root) = element(rest).map_err(|e| locate(source, e))?;
    let (rest, _) = misc(rest).map_err(|e| locate(source, e))?;

    if !rest.trim().is_empty() {
        return Err(ParseError::at(source, rest, "content after root element"));
    }

    Ok(root)
}

fn locate(source: &str, err: nom::Err<Error<&str>>) -> ParseError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) if e.code == ErrorKind::TooLarge => ParseError::at(
            source,
            e.input,
            format!("elements nested deeper than {MAX_ELEMENT_DEPTH}"),
        ),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            ParseError::at(source, e.input, format!("unexpected input ({:?})", e.code))
        }
        other => ParseError::from(other),
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// Whitespace, comments, processing instructions and DOCTYPE outside the root.
fn misc(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            comment,
            processing_instruction,
            doctype,
        ))),
    )(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
    value((), delimited(tag("<!--"), take_until("-->"), tag("-->")))(input)
}

fn processing_instruction(input: &str) -> IResult<&str, ()> {
    value((), delimited(tag("<?"), take_until("?>"), tag("?>")))(input)
}

fn doctype(input: &str) -> IResult<&str, ()> {
    value((), delimited(tag("<!DOCTYPE"), take_until(">"), char('>')))(input)
}

fn xml_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
    map(
        tuple((
            preceded(multispace1, xml_name),
            preceded(multispace0, char('=')),
            preceded(multispace0, quoted),
        )),
        |(name, _, raw)| (name.to_string(), decode_entities(raw)),
    )(input)
}

fn element(input: &str) -> IResult<&str, Properties> {
    element_at(input, 1)
}

fn element_at(input: &str, depth: usize) -> IResult<&str, Properties> {
    let start = input;
    let (input, _) = char('<')(input)?;
    let (input, name) = xml_name(input)?;
    if depth > MAX_ELEMENT_DEPTH {
        return Err(nom::Err::Failure(Error::new(start, ErrorKind::TooLarge)));
    }
    let (input, attributes) = many0(attribute)(input)?;
    let (input, _) = multispace0(input)?;

    let mut node = Properties::new(name);
    node.attributes.extend(attributes);

    if let Ok((input, _)) = tag::<_, _, Error<&str>>("/>")(input) {
        return Ok((input, node));
    }

    let (input, _) = char('>')(input)?;
    let (input, children) = many0(|i| content(i, depth))(input)?;
    node.children = children.into_iter().flatten().collect();

    let (input, _) = tag("</")(input)?;
    let (after_name, closing) = xml_name(input)?;
    if closing != name {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag)));
    }
    let (input, _) = multispace0(after_name)?;
    let (input, _) = char('>')(input)?;

    Ok((input, node))
}

/// One item of the content of an element at `depth`; only child elements are kept.
fn content(input: &str, depth: usize) -> IResult<&str, Option<Properties>> {
    alt((
        map(comment, |_| None),
        map(processing_instruction, |_| None),
        map(|i| element_at(i, depth + 1), Some),
        map(take_while1(|c: char| c != '<'), |_| None),
    ))(input)
}

/// Replace predefined and numeric character references.
///
/// Unknown entities are kept verbatim.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        match decode_entity(entity) {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)
        }
    }
}
