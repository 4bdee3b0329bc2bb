//! `{math:...}` evaluation: ranges and floating point arithmetic.
//!
//! Two forms are accepted:
//!
//! * `a..b` produces the inclusive integer sequence `a,a+1,...,b` (or counting
//!   down when `a > b`); both ends are full expressions truncated to integers.
//! * Arithmetic over `+ - * / % ^` with parentheses, unary minus and the
//!   functions `sqrt`, `int` and `round`.
//!
//! Function calls are substituted innermost-first by a regex before the
//! remaining text is tokenized with nom and converted to postfix
//! (shunting-yard, left associative at every precedence level).
//!
//! [`evaluate_expression`] never fails; errors render as `ERROR: <message>`
//! so that a bad expression shows up in the resulting command text.

use lazy_static::lazy_static;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, one_of},
    combinator::map,
    error::{VerboseError, context},
};
use regex::Regex;
use thiserror::Error;

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const MAX_RANGE_LEN: u64 = 100_000;

lazy_static! {
    static ref FUNCTION_CALL: Regex =
        Regex::new(r"(sqrt|int|round)\s*\(([^()]+)\)").expect("function call pattern");
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Empty expression")]
    Empty,
    #[error("Invalid expression")]
    Invalid,
    #[error("Invalid range expression")]
    InvalidRange,
    #[error("Range too large: {0} elements")]
    RangeTooLarge(u64),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char),
    #[error("Mismatched parenthesis")]
    MismatchedParenthesis,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo by zero")]
    ModuloByZero,
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Evaluates `expr`, rendering failures as `ERROR: <message>`.
pub fn evaluate_expression(expr: &str) -> String {
    try_evaluate(expr).unwrap_or_else(|e| format!("ERROR: {}", e))
}

pub fn try_evaluate(expr: &str) -> ExpressionResult<String> {
    let expr = expr.trim();
    if expr.contains("..") {
        return evaluate_range(expr);
    }
    evaluate_number(expr).map(format_number)
}

fn evaluate_range(expr: &str) -> ExpressionResult<String> {
    let parts: Vec<&str> = expr.split("..").collect();
    let [start, end] = parts.as_slice() else {
        return Err(ExpressionError::InvalidRange);
    };
    let start = evaluate_number(start)?.trunc() as i64;
    let end = evaluate_number(end)?.trunc() as i64;

    let len = end.abs_diff(start).saturating_add(1);
    if len > MAX_RANGE_LEN {
        return Err(ExpressionError::RangeTooLarge(len));
    }
    let numbers: Vec<String> = if start <= end {
        (start..=end).map(|n| n.to_string()).collect()
    } else {
        (end..=start).rev().map(|n| n.to_string()).collect()
    };
    Ok(numbers.join(","))
}

fn evaluate_number(expr: &str) -> ExpressionResult<f64> {
    let expr = replace_functions(expr)?;
    evaluate_arithmetic(&expr)
}

/// Replaces every innermost `fn(args)` with its numeric value until none remain.
fn replace_functions(expr: &str) -> ExpressionResult<String> {
    let mut expr = expr.to_string();
    while let Some(caps) = FUNCTION_CALL.captures(&expr) {
        let (Some(whole), Some(function), Some(args)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            break;
        };
        let value = evaluate_arithmetic(args.as_str())?;
        let result = match function.as_str() {
            "sqrt" => value.sqrt(),
            "int" => value.trunc(),
            // half-up rounding: round(-2.5) is -2
            "round" => (value + 0.5).floor(),
            other => return Err(ExpressionError::UnknownFunction(other.to_string())),
        };
        let range = whole.range();
        expr.replace_range(range, &format_number(result));
    }
    Ok(expr)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Operator(char),
    /// Unary minus applied to the next operand.
    Negate,
    LeftParen,
    RightParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RawToken<'a> {
    Number(&'a str),
    Operator(char),
    LeftParen,
    RightParen,
}

fn parse_number_literal(input: &str) -> ParserResult<RawToken> {
    context(
        "number literal",
        map(
            take_while1(|c: char| c.is_ascii_digit() || c == '.'),
            RawToken::Number,
        ),
    )(input)
}

fn parse_operator(input: &str) -> ParserResult<RawToken> {
    context("operator", map(one_of("+-*/%^"), RawToken::Operator))(input)
}

fn parse_paren(input: &str) -> ParserResult<RawToken> {
    context(
        "parenthesis",
        alt((
            map(char('('), |_| RawToken::LeftParen),
            map(char(')'), |_| RawToken::RightParen),
        )),
    )(input)
}

fn parse_raw_token(input: &str) -> ParserResult<RawToken> {
    alt((parse_number_literal, parse_operator, parse_paren))(input)
}

fn parse_literal_value(literal: &str) -> ExpressionResult<f64> {
    literal
        .parse::<f64>()
        .map_err(|_| ExpressionError::InvalidNumber(literal.to_string()))
}

/// Tokenizes whitespace-free input, folding unary minus into the following operand.
fn tokenize(input: &str) -> ExpressionResult<Vec<Token>> {
    let mut raw = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        match parse_raw_token(rest) {
            Ok((remaining, token)) => {
                raw.push(token);
                rest = remaining;
            }
            Err(_) => {
                let c = rest.chars().next().unwrap_or_default();
                return Err(ExpressionError::UnexpectedCharacter(c));
            }
        }
    }

    let mut tokens: Vec<Token> = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();
    while let Some(token) = iter.next() {
        match token {
            RawToken::Number(literal) => tokens.push(Token::Number(parse_literal_value(literal)?)),
            RawToken::Operator('-')
                if matches!(
                    tokens.last(),
                    None | Some(Token::Operator(_)) | Some(Token::Negate) | Some(Token::LeftParen)
                ) =>
            {
                if let Some(RawToken::Number(literal)) = iter.peek().copied() {
                    iter.next();
                    tokens.push(Token::Number(-parse_literal_value(literal)?));
                } else {
                    tokens.push(Token::Negate);
                }
            }
            RawToken::Operator(op) => tokens.push(Token::Operator(op)),
            RawToken::LeftParen => tokens.push(Token::LeftParen),
            RawToken::RightParen => tokens.push(Token::RightParen),
        }
    }
    Ok(tokens)
}

fn precedence(op: char) -> u8 {
    match op {
        '+' | '-' => 1,
        '*' | '/' | '%' => 2,
        '^' => 3,
        _ => 0,
    }
}

fn to_postfix(tokens: Vec<Token>) -> ExpressionResult<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) => output.push(token),
            Token::LeftParen | Token::Negate => operators.push(token),
            Token::RightParen => loop {
                match operators.pop() {
                    Some(Token::LeftParen) => break,
                    Some(op) => output.push(op),
                    None => return Err(ExpressionError::MismatchedParenthesis),
                }
            },
            Token::Operator(op) => {
                // a pending negation binds tighter than any binary operator
                while let Some(&top) = operators.last() {
                    match top {
                        Token::Negate => {}
                        Token::Operator(t) if precedence(t) >= precedence(op) => {}
                        _ => break,
                    }
                    output.push(top);
                    operators.pop();
                }
                operators.push(token);
            }
        }
    }

    while let Some(op) = operators.pop() {
        if op == Token::LeftParen {
            return Err(ExpressionError::MismatchedParenthesis);
        }
        output.push(op);
    }
    Ok(output)
}

fn evaluate_postfix(postfix: &[Token]) -> ExpressionResult<f64> {
    let mut stack: Vec<f64> = Vec::new();
    for token in postfix {
        match token {
            Token::Number(n) => stack.push(*n),
            Token::Negate => {
                let Some(a) = stack.pop() else {
                    return Err(ExpressionError::Invalid);
                };
                stack.push(-a);
            }
            Token::Operator(op) => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return Err(ExpressionError::Invalid);
                };
                let result = match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' if b == 0.0 => return Err(ExpressionError::DivisionByZero),
                    '/' => a / b,
                    '%' if b == 0.0 => return Err(ExpressionError::ModuloByZero),
                    '%' => a % b,
                    '^' => a.powf(b),
                    _ => return Err(ExpressionError::Invalid),
                };
                stack.push(result);
            }
            Token::LeftParen | Token::RightParen => return Err(ExpressionError::MismatchedParenthesis),
        }
    }
    match stack.as_slice() {
        [value] => Ok(*value),
        _ => Err(ExpressionError::Invalid),
    }
}

fn evaluate_arithmetic(expr: &str) -> ExpressionResult<f64> {
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let tokens = tokenize(&compact)?;
    let postfix = to_postfix(tokens)?;
    evaluate_postfix(&postfix)
}

/// 2^63, the first magnitude an `i64` cast would saturate.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Whole numbers render without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.is_finite() && value.fract() == 0.0 {
        if value.abs() >= I64_LIMIT {
            return format!("{:.0}", value);
        }
        return format!("{}", value as i64);
    }
    value.to_string()
}
