//! Text syntax for constraints.
//!
//! Dependency overrides in configuration files are written in a compact
//! call-like syntax:
//!
//! ```text
//! chain(logged_in_user(username=username), authenticated_admin_password(username=username))
//! gate(not internal_is_loyalty_member(guest_name=guest_name), vip)
//! and(sufficient_account_balance(username=username, amount=amount), accepted_unit(unit=unit))
//! within_limit(count=3, label="daily", strict=true)
//! ```
//!
//! Grammar (informal):
//! ```text
//! expr   = comb "(" [expr ("," expr)*] ")" | leaf
//! comb   = "and" | "or" | "chain" | "gate"
//! leaf   = ["not"] IDENT ["(" [param ("," param)*] ")"]
//! param  = IDENT "=" (IDENT | NUMBER | STRING | "true" | "false")
//! ```
//!
//! A bare identifier on the right of `=` names an action input; anything else
//! is a literal. `name(a, b)` with an unknown head is read as a misspelled
//! combinator and rejected as an invalid constraint option.

use std::sync::LazyLock;

use actguard_core::ConstraintError;
use regex_lite::Regex;
use serde_json::Value;

use crate::model::{Constraint, Leaf};

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").expect("valid regex"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+([eE][+-]?\d+)?$").expect("valid regex"));

/// Parse a constraint expression.
///
/// Returns `Ok(None)` for empty input.
pub fn parse_constraint(input: &str) -> Result<Option<Constraint>, ConstraintError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let tokens = tokenize(input)?;
    let (constraint, rest) = parse_expr(&tokens)?;
    if !rest.is_empty() {
        return Err(ConstraintError::Parse(format!(
            "unexpected tokens after expression: {rest:?}"
        )));
    }
    Ok(Some(constraint))
}

/// Parse a single literal: a number, a quoted string, or a boolean.
///
/// `True`/`False` are accepted alongside `true`/`false`.
pub fn parse_literal(input: &str) -> Result<Value, ConstraintError> {
    let tokens = tokenize(input.trim())?;
    match tokens.as_slice() {
        [token] => literal_value(token)
            .ok_or_else(|| ConstraintError::Parse(format!("not a literal: {input}"))),
        _ => Err(ConstraintError::Parse(format!("not a literal: {input}"))),
    }
}

/// Token types for the constraint syntax.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(Value),
    LParen,
    RParen,
    Comma,
    Eq,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ConstraintError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => {
                            if let Some(escaped) = chars.next() {
                                s.push(escaped);
                            }
                        }
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => return Err(ConstraintError::Parse("unterminated string literal".into())),
                    }
                }
                tokens.push(Token::Str(s));
            }
            _ if c.is_ascii_digit() || c == '-' => {
                let mut num_str = String::new();
                num_str.push(c);
                chars.next();
                while let Some(&nc) = chars.peek() {
                    if nc.is_ascii_alphanumeric() || nc == '.' || nc == '+' || nc == '-' {
                        num_str.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(number(&num_str)?));
            }
            _ if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&wc) = chars.peek() {
                    if wc.is_alphanumeric() || wc == '_' || wc == '.' {
                        word.push(wc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(word));
            }
            _ => return Err(ConstraintError::Parse(format!("unexpected character: {c}"))),
        }
    }

    Ok(tokens)
}

fn number(text: &str) -> Result<Value, ConstraintError> {
    let invalid = || ConstraintError::Parse(format!("invalid number: {text}"));
    if INTEGER.is_match(text) {
        text.parse::<i64>().map(Value::from).map_err(|_| invalid())
    } else if DECIMAL.is_match(text) {
        let parsed = text.parse::<f64>().map_err(|_| invalid())?;
        serde_json::Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(invalid)
    } else {
        Err(invalid())
    }
}

fn literal_value(token: &Token) -> Option<Value> {
    match token {
        Token::Str(s) => Some(Value::String(s.clone())),
        Token::Num(n) => Some(n.clone()),
        Token::Ident(word) => match word.as_str() {
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn combinator(word: &str) -> Option<fn(Vec<Constraint>) -> Constraint> {
    match word {
        "and" => Some(Constraint::And),
        "or" => Some(Constraint::Or),
        "chain" => Some(Constraint::Chain),
        "gate" => Some(Constraint::Gate),
        _ => None,
    }
}

fn parse_expr(tokens: &[Token]) -> Result<(Constraint, &[Token]), ConstraintError> {
    match tokens {
        [Token::Ident(word), Token::LParen, rest @ ..] => {
            if let Some(build) = combinator(word) {
                let (children, rest) = parse_children(rest)?;
                return Ok((build(children), rest));
            }
            parse_leaf(tokens)
        }
        [Token::Ident(_), ..] => parse_leaf(tokens),
        _ => Err(ConstraintError::Parse(format!(
            "expected a predicate or combinator, got {:?}",
            tokens.first()
        ))),
    }
}

/// Children of a combinator, up to and including the closing parenthesis.
fn parse_children(mut tokens: &[Token]) -> Result<(Vec<Constraint>, &[Token]), ConstraintError> {
    let mut children = Vec::new();
    if let [Token::RParen, rest @ ..] = tokens {
        return Ok((children, rest));
    }
    loop {
        let (child, rest) = parse_expr(tokens)?;
        children.push(child);
        match rest {
            [Token::Comma, rest @ ..] => tokens = rest,
            [Token::RParen, rest @ ..] => return Ok((children, rest)),
            _ => {
                return Err(ConstraintError::Parse(format!(
                    "expected ',' or ')' after child, got {:?}",
                    rest.first()
                )));
            }
        }
    }
}

fn parse_leaf(tokens: &[Token]) -> Result<(Constraint, &[Token]), ConstraintError> {
    // `not` is a prefix only when another identifier follows.
    let (name, rest) = match tokens {
        [Token::Ident(not), Token::Ident(name), rest @ ..] if not == "not" => {
            (format!("not {name}"), rest)
        }
        [Token::Ident(name), rest @ ..] => (name.clone(), rest),
        _ => unreachable!("parse_expr only dispatches identifiers"),
    };
    let mut leaf = Leaf::new(&name);

    let mut rest = match rest {
        [Token::LParen, rest @ ..] => rest,
        _ => return Ok((Constraint::Single(leaf), rest)),
    };
    if let [Token::RParen, after @ ..] = rest {
        return Ok((Constraint::Single(leaf), after));
    }

    loop {
        let (formal, after_formal) = match rest {
            [Token::Ident(formal), Token::Eq, after @ ..] => (formal.clone(), after),
            // Looks like `head(child, ...)`: a combinator we do not know.
            [Token::Ident(_), ..] if !leaf.negated => {
                return Err(ConstraintError::InvalidOption(leaf.predicate));
            }
            _ => {
                return Err(ConstraintError::Parse(format!(
                    "expected 'name=source' in parameters of '{name}', got {:?}",
                    rest.first()
                )));
            }
        };

        let after_value = match after_formal {
            [token, after @ ..] => {
                leaf = match (token, literal_value(token)) {
                    (_, Some(value)) => leaf.literal(formal, value),
                    (Token::Ident(source), None) => leaf.input(formal, source.clone()),
                    _ => {
                        return Err(ConstraintError::Parse(format!(
                            "expected a source for parameter '{formal}', got {token:?}"
                        )));
                    }
                };
                after
            }
            [] => {
                return Err(ConstraintError::Parse(format!(
                    "missing source for parameter '{formal}'"
                )));
            }
        };

        match after_value {
            [Token::Comma, after @ ..] => rest = after,
            [Token::RParen, after @ ..] => return Ok((Constraint::Single(leaf), after)),
            _ => {
                return Err(ConstraintError::Parse(format!(
                    "expected ',' or ')' in parameters of '{name}', got {:?}",
                    after_value.first()
                )));
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamSource;
    use serde_json::json;

    fn parse(input: &str) -> Constraint {
        parse_constraint(input).unwrap().unwrap()
    }

    #[test]
    fn parse_bare_leaf() {
        let c = parse("logged_in_user");
        assert_eq!(c, Constraint::single("logged_in_user", &[]));
    }

    #[test]
    fn parse_leaf_with_inputs() {
        let c = parse("sufficient_account_balance(username=username, amount=amount)");
        assert_eq!(
            c,
            Constraint::single(
                "sufficient_account_balance",
                &[("username", "username"), ("amount", "amount")]
            )
        );
    }

    #[test]
    fn parse_negated_leaf_with_renamed_input() {
        let c = parse("not internal_check_username_exist(username=destination_username)");
        let Constraint::Single(leaf) = c else {
            panic!("expected a leaf");
        };
        assert!(leaf.negated);
        assert_eq!(leaf.predicate, "internal_check_username_exist");
        assert_eq!(
            leaf.params["username"],
            ParamSource::Input("destination_username".into())
        );
    }

    #[test]
    fn parse_literals() {
        let c = parse(r#"p(count=3, ratio=0.5, label="daily", flag=true, off=False, neg=-2)"#);
        let Constraint::Single(leaf) = c else {
            panic!("expected a leaf");
        };
        assert_eq!(leaf.params["count"], ParamSource::Literal(json!(3)));
        assert_eq!(leaf.params["ratio"], ParamSource::Literal(json!(0.5)));
        assert_eq!(leaf.params["label"], ParamSource::Literal(json!("daily")));
        assert_eq!(leaf.params["flag"], ParamSource::Literal(json!(true)));
        assert_eq!(leaf.params["off"], ParamSource::Literal(json!(false)));
        assert_eq!(leaf.params["neg"], ParamSource::Literal(json!(-2)));
    }

    #[test]
    fn parse_nested_combinators() {
        let c = parse("chain(a, gate(b(x=x), not c), and(), or(d))");
        assert_eq!(
            c,
            Constraint::chain([
                Constraint::single("a", &[]),
                Constraint::gate([
                    Constraint::single("b", &[("x", "x")]),
                    Constraint::single("not c", &[]),
                ]),
                Constraint::and([]),
                Constraint::or([Constraint::single("d", &[])]),
            ])
        );
    }

    #[test]
    fn display_output_parses_back() {
        let original = parse(r#"gate(not p(x=y, n=2), and(q, r(s="t")))"#);
        assert_eq!(parse(&original.to_string()), original);
    }

    #[test]
    fn empty_input_is_no_constraint() {
        assert_eq!(parse_constraint("   ").unwrap(), None);
    }

    #[test]
    fn unknown_combinator_is_invalid_option() {
        assert_eq!(
            parse_constraint("xor(a, b)").unwrap_err(),
            ConstraintError::InvalidOption("xor".into())
        );
    }

    #[test]
    fn malformed_input_rejects() {
        assert!(matches!(parse_constraint("and(a,"), Err(ConstraintError::Parse(_))));
        assert!(matches!(parse_constraint("p(x=)"), Err(ConstraintError::Parse(_))));
        assert!(matches!(parse_constraint("a b"), Err(ConstraintError::Parse(_))));
        assert!(matches!(parse_constraint("p(x=\"open"), Err(ConstraintError::Parse(_))));
    }

    #[test]
    fn literal_parsing() {
        assert_eq!(parse_literal("5").unwrap(), json!(5));
        assert_eq!(parse_literal("2.25").unwrap(), json!(2.25));
        assert_eq!(parse_literal("'dollars'").unwrap(), json!("dollars"));
        assert_eq!(parse_literal("\"a b\"").unwrap(), json!("a b"));
        assert_eq!(parse_literal("True").unwrap(), json!(true));
        assert!(parse_literal("username").is_err());
        assert!(parse_literal("1 2").is_err());
        assert!(parse_literal("1.2.3").is_err());
    }
}
