//! Entity instance parser
//!
//! Turns `#123=IFCTYPE(attr,...)` statements into attribute values with nom.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, digit0, digit1, multispace0, one_of},
    combinator::{map, map_res, opt, recognize, value},
    error::{Error as ParseError, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, preceded},
};

use crate::scanner::decode_step_string;

/// Attribute value of a decoded entity, with string escapes resolved
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    EntityRef(u32),
    String(String),
    Integer(i64),
    Float(f64),
    /// `.NAME.` without the dots
    Enum(String),
    List(Vec<AttributeValue>),
    /// Upper-case type name and its arguments, e.g. `IFCLABEL('x')`
    TypedValue(String, Vec<AttributeValue>),
    /// `$`
    Null,
    /// `*`
    Derived,
}

impl AttributeValue {
    pub fn as_entity_ref(&self) -> Option<u32> {
        if let AttributeValue::EntityRef(id) = self {
            Some(*id)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(text) = self {
            Some(text)
        } else {
            None
        }
    }

    /// Entity references held by a list attribute (non-references are skipped).
    pub fn entity_refs(&self) -> Vec<u32> {
        match self {
            AttributeValue::List(items) => items.iter().filter_map(Self::as_entity_ref).collect(),
            AttributeValue::EntityRef(id) => vec![*id],
            _ => Vec::new(),
        }
    }
}

/// A parsed entity instance
#[derive(Clone, Debug, PartialEq)]
pub struct RawEntity {
    pub id: u32,
    /// Upper-case type name, e.g. `IFCWALL`
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl RawEntity {
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(AttributeValue::as_str)
    }

    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(AttributeValue::as_entity_ref)
    }

    pub fn get_refs(&self, index: usize) -> Vec<u32> {
        self.get(index)
            .map(AttributeValue::entity_refs)
            .unwrap_or_default()
    }
}

type Parsed<'a, T> = IResult<&'a str, T>;

fn blank(input: &str) -> Parsed<'_, ()> {
    value((), multispace0).parse(input)
}

fn keyword(input: &str) -> Parsed<'_, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)
}

fn reference(input: &str) -> Parsed<'_, u32> {
    map_res(preceded(char('#'), digit1), str::parse::<u32>).parse(input)
}

/// Quoted text; a doubled quote stands for one quote character.
fn quoted(input: &str) -> Parsed<'_, String> {
    let body = recognize(many0(alt((tag("''"), is_not("'")))));
    map(delimited(char('\''), body, char('\'')), decode_step_string).parse(input)
}

fn numeric(input: &str) -> Parsed<'_, AttributeValue> {
    let (rest, text) = recognize((
        opt(one_of("+-")),
        digit1,
        opt((char('.'), digit0)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;

    let parsed = if text.contains(['.', 'e', 'E']) {
        text.parse().ok().map(AttributeValue::Float)
    } else {
        text.parse().ok().map(AttributeValue::Integer)
    };
    parsed
        .map(|number| (rest, number))
        .ok_or_else(|| nom::Err::Error(ParseError::new(input, ErrorKind::Float)))
}

/// `( attribute, ... )`
fn parameters(input: &str) -> Parsed<'_, Vec<AttributeValue>> {
    delimited(
        (char('('), blank),
        separated_list0((blank, char(','), blank), attribute),
        (blank, char(')')),
    )
    .parse(input)
}

fn attribute(input: &str) -> Parsed<'_, AttributeValue> {
    alt((
        map(reference, AttributeValue::EntityRef),
        map(quoted, AttributeValue::String),
        value(AttributeValue::Null, char('$')),
        value(AttributeValue::Derived, char('*')),
        map(delimited(char('.'), keyword, char('.')), |name: &str| {
            AttributeValue::Enum(name.to_string())
        }),
        numeric,
        map(parameters, AttributeValue::List),
        map((keyword, blank, parameters), |(name, (), args)| {
            AttributeValue::TypedValue(name.to_ascii_uppercase(), args)
        }),
    ))
    .parse(input)
}

/// Parse one entity instance such as `#123=IFCWALL(attr1,attr2,...)`, with or
/// without the trailing `;`.
pub fn parse_entity(statement: &str) -> Result<RawEntity, String> {
    let (input, id) = preceded(blank, reference)
        .parse(statement)
        .map_err(|_| "expected '#<id>' at start of entity".to_string())?;
    let (input, type_name) = delimited((blank, char('='), blank), keyword, blank)
        .parse(input)
        .map_err(|_| format!("expected '=' and a type name after #{id}"))?;
    let (rest, attributes) =
        parameters(input).map_err(|e| format!("failed to parse attributes of #{id}: {e}"))?;

    let rest = rest.trim();
    if !rest.is_empty() && rest != ";" {
        return Err(format!("unexpected trailing input after #{id}: '{rest}'"));
    }

    Ok(RawEntity {
        id,
        type_name: type_name.to_ascii_uppercase(),
        attributes,
    })
}
