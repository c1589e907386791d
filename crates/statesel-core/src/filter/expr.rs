//! Filter expression parser.
//!
//! This module implements a small textual language for filters, convenient
//! on the command line. Expressions combine atoms with boolean operators
//! (`and`, `or`, `not`) and support parentheses for grouping.
//!
//! ## Grammar
//!
//! ```text
//! <expr>   := <and> ("or" <and>)*
//! <and>    := <term> ("and" <term>)*
//! <term>   := "not" <term> | <factor>
//! <factor> := "(" <expr> ")" | <atom>
//! <atom>   := "tag:" value | "type:" name | "path:" value
//!           | "everything" | "nothing" | "true" | "false" | "..."
//! ```
//!
//! Values are bare words or quoted with `"` or `'`. A quoted value must be
//! closed.
//!
//! ## Examples
//!
//! ```text
//! tag:params                         # Tag
//! type:Param and not path:bias       # Conjunction with negation
//! type:BatchStat or type:Cache       # Disjunction
//! path:0                             # Index element
//! path:'0'                           # Name element
//! (type:Param or tag:lora) and path:dense
//! ```
//!
//! Parsing produces a [`FilterExpr`] tree; [`FilterExpr::resolve`] turns it
//! into a [`Predicate`] once type names can be looked up.

use thiserror::Error;
use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, separated, terminated};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use super::json::WILDCARD;
use super::literal::{to_predicate, Filter, FilterError};
use super::predicate::Predicate;
use crate::node::TypeRegistry;
use crate::path::PathKey;

/// Error type for expression parsing and resolution.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Invalid expression syntax.
    #[error("invalid expression '{input}': {message}")]
    InvalidExpression { input: String, message: String },

    /// Expression references something the registry cannot resolve.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// A parsed filter expression with unresolved type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// Conjunction of expressions (all must match).
    And(Vec<FilterExpr>),
    /// Disjunction of expressions (any must match).
    Or(Vec<FilterExpr>),
    /// Negation of an expression.
    Not(Box<FilterExpr>),
    /// A single atom.
    Atom(Atom),
}

/// A leaf of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// `tag:<value>`
    Tag(String),
    /// `type:<name>`
    Type(String),
    /// `path:<key>`
    Path(PathKey),
    /// `everything`, `true` or `...`
    Everything,
    /// `nothing` or `false`
    Nothing,
}

impl FilterExpr {
    /// Resolve type names and build the predicate.
    pub fn resolve(&self, registry: &TypeRegistry) -> Result<Predicate, FilterError> {
        match self {
            FilterExpr::And(exprs) => Ok(Predicate::all(resolve_all(exprs, registry)?)),
            FilterExpr::Or(exprs) => Ok(Predicate::any(resolve_all(exprs, registry)?)),
            FilterExpr::Not(expr) => Ok(Predicate::not(expr.resolve(registry)?)),
            FilterExpr::Atom(atom) => atom.resolve(registry),
        }
    }
}

fn resolve_all(exprs: &[FilterExpr], registry: &TypeRegistry) -> Result<Vec<Predicate>, FilterError> {
    exprs.iter().map(|e| e.resolve(registry)).collect()
}

impl Atom {
    fn resolve(&self, registry: &TypeRegistry) -> Result<Predicate, FilterError> {
        let filter = match self {
            Atom::Tag(tag) => Filter::Tag(tag.clone()),
            Atom::Type(name) => Filter::Type(registry.resolve(name)?),
            Atom::Path(key) => Filter::Predicate(Predicate::PathContains(key.clone())),
            Atom::Everything => Filter::Wildcard,
            Atom::Nothing => Filter::Null,
        };
        Ok(to_predicate(filter))
    }
}

/// Parse a filter expression from a string.
///
/// # Examples
///
/// ```
/// use statesel_core::filter::parse_filter_expr_tree;
///
/// // Simple atom
/// let expr = parse_filter_expr_tree("tag:params").unwrap();
///
/// // Compound expression
/// let expr = parse_filter_expr_tree("type:Param and not path:bias").unwrap();
///
/// // Grouping
/// let expr = parse_filter_expr_tree("(type:Param or tag:lora) and path:dense").unwrap();
/// ```
pub fn parse_filter_expr_tree(input: &str) -> Result<FilterExpr, ExprError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ExprError::InvalidExpression {
            input: input.to_string(),
            message: "empty expression".to_string(),
        });
    }

    parse_expr
        .parse(input)
        .map_err(|e| ExprError::InvalidExpression {
            input: input.to_string(),
            message: format!("unexpected input at offset {}", e.offset()),
        })
}

/// Parse a filter expression and resolve it into a predicate.
///
/// ```
/// use statesel_core::filter::parse_filter_expr;
/// use statesel_core::node::TypeRegistry;
///
/// let registry = TypeRegistry::with_builtins();
/// let pred = parse_filter_expr("type:Param and not path:bias", &registry).unwrap();
/// assert_eq!(pred.to_string(), "All(OfType(Param), Not(PathContains('bias')))");
/// ```
pub fn parse_filter_expr(input: &str, registry: &TypeRegistry) -> Result<Predicate, ExprError> {
    let expr = parse_filter_expr_tree(input)?;
    Ok(expr.resolve(registry)?)
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

fn parse_expr(input: &mut &str) -> ModalResult<FilterExpr> {
    chain("or", parse_conjunction, FilterExpr::Or).parse_next(input)
}

fn parse_conjunction(input: &mut &str) -> ModalResult<FilterExpr> {
    chain("and", parse_term, FilterExpr::And).parse_next(input)
}

/// Operands joined by a binary keyword. A lone operand is returned unwrapped.
fn chain(
    operator: &'static str,
    operand: fn(&mut &str) -> ModalResult<FilterExpr>,
    combine: fn(Vec<FilterExpr>) -> FilterExpr,
) -> impl FnMut(&mut &str) -> ModalResult<FilterExpr> {
    move |input: &mut &str| {
        let mut operands: Vec<FilterExpr> =
            separated(1.., operand, (multispace0, keyword(operator), multispace0))
                .parse_next(input)?;
        if operands.len() > 1 {
            Ok(combine(operands))
        } else {
            operands.pop().ok_or_else(|| ErrMode::from_input(input))
        }
    }
}

fn parse_term(input: &mut &str) -> ModalResult<FilterExpr> {
    let negated = preceded(multispace0, opt(terminated(keyword("not"), multispace0)))
        .parse_next(input)?
        .is_some();
    if negated {
        Ok(FilterExpr::Not(Box::new(parse_term(input)?)))
    } else {
        parse_factor(input)
    }
}

fn parse_factor(input: &mut &str) -> ModalResult<FilterExpr> {
    preceded(
        multispace0,
        alt((
            delimited(('(', multispace0), parse_expr, (multispace0, ')')),
            parse_atom.map(FilterExpr::Atom),
        )),
    )
    .parse_next(input)
}

fn parse_atom(input: &mut &str) -> ModalResult<Atom> {
    alt((
        WILDCARD.value(Atom::Everything),
        parse_keyed_atom,
        alt((keyword("everything"), keyword("true"))).value(Atom::Everything),
        alt((keyword("nothing"), keyword("false"))).value(Atom::Nothing),
    ))
    .parse_next(input)
}

/// `tag:value`, `type:name` or `path:key`; the key is case-insensitive.
fn parse_keyed_atom(input: &mut &str) -> ModalResult<Atom> {
    let key: &str = terminated(take_while(1.., |c: char| c.is_alphanumeric() || c == '_'), ':')
        .parse_next(input)?;
    let build: fn(String, bool) -> Atom = match key.to_ascii_lowercase().as_str() {
        "tag" => |value: String, _: bool| Atom::Tag(value),
        "type" => |value: String, _: bool| Atom::Type(value),
        "path" => |value: String, quoted: bool| Atom::Path(path_key(value, quoted)),
        _ => return Err(ErrMode::from_input(input)),
    };
    let (value, quoted) = parse_value(input)?;
    Ok(build(value, quoted))
}

/// Unquoted all-digit path values are indices; everything else is a name.
fn path_key(value: String, quoted: bool) -> PathKey {
    if !quoted && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = value.parse::<usize>() {
            return PathKey::Index(index);
        }
    }
    PathKey::Name(value)
}

/// A value and whether it was quoted.
///
/// Quoted values run to the matching quote, which must be present. Bare
/// values stop at whitespace or a parenthesis.
fn parse_value(input: &mut &str) -> ModalResult<(String, bool)> {
    let Some(quote) = input.chars().next().filter(|c| matches!(*c, '"' | '\'')) else {
        let bare: &str =
            take_while(1.., |c: char| !c.is_whitespace() && c != '(' && c != ')').parse_next(input)?;
        return Ok((bare.to_string(), false));
    };
    let body: &str = delimited(quote, take_till(0.., quote), cut_err(quote)).parse_next(input)?;
    Ok((body.to_string(), true))
}

/// A whole word matched case-insensitively, not followed by `:` or more
/// word characters.
fn keyword(word: &'static str) -> impl FnMut(&mut &str) -> ModalResult<()> {
    move |input: &mut &str| {
        let checkpoint = *input;
        let found: &str = take_while(1.., |c: char| c.is_alphabetic()).parse_next(input)?;
        let bounded = !input.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == ':');
        if bounded && found.eq_ignore_ascii_case(word) {
            Ok(())
        } else {
            *input = checkpoint;
            Err(ErrMode::from_input(input))
        }
    }
}
