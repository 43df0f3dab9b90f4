//! ACTIONX condition trees: parsing and evaluation.
//!
//! Conditions are comparisons between summary quantities and numbers,
//! combined with AND/OR. Well-indexed quantities make the comparison
//! per-well, and the satisfying wells flow into the replay phase via
//! [`ActionResult`](crate::action::value::ActionResult).

use chrono::{Datelike, Duration, Utc};

use crate::action::value::{ActionResult, ActionValue, Comparator};
use crate::error::{SchedResult, StructuralError};
use crate::name_match::{MatchResult, NameMatcher};
use crate::summary::SummaryState;
use crate::wlist::WListManager;

/// Read-only inputs for one condition evaluation.
pub struct ActionContext<'a> {
    /// Live summary values.
    pub summary: &'a SummaryState,
    /// Well lists for leading-`*` selectors.
    pub wlists: Option<&'a WListManager>,
    /// Wells defined at the evaluation step, in insertion order.
    pub wells: &'a [String],
    /// Groups defined at the evaluation step, in insertion order.
    pub groups: &'a [String],
}

impl ActionContext<'_> {
    /// Value of a calendar quantity at the current simulated time.
    fn calendar(&self, var: &str) -> Option<f64> {
        let now = self.summary.sim_start()
            + Duration::seconds(self.summary.elapsed().round() as i64);
        let now = now.with_timezone(&Utc);
        match var {
            "DAY" => Some(f64::from(now.day())),
            "MNTH" => Some(f64::from(now.month())),
            "YEAR" => Some(f64::from(now.year())),
            _ => None,
        }
    }
}

/// One node of a parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionExpr {
    /// Comparison between two operands.
    Cmp {
        /// The comparator.
        cmp: Comparator,
        /// Left operand.
        left: ActionOperand,
        /// Right operand.
        right: ActionOperand,
    },
    /// Conjunction.
    And(Box<ActionExpr>, Box<ActionExpr>),
    /// Disjunction.
    Or(Box<ActionExpr>, Box<ActionExpr>),
}

/// A comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOperand {
    /// Number literal.
    Number(f64),
    /// Summary quantity, optionally restricted by a quoted selector.
    Quantity {
        /// Vector name, e.g. `WWCT`, `FOPR`, `MNTH`.
        var: String,
        /// Selector pattern from the quoted argument.
        selector: Option<String>,
    },
}

impl ActionOperand {
    fn eval(&self, ctx: &ActionContext<'_>) -> ActionValue {
        match self {
            Self::Number(value) => ActionValue::scalar(*value),
            Self::Quantity { var, selector } => eval_quantity(var, selector.as_deref(), ctx),
        }
    }
}

fn eval_quantity(var: &str, selector: Option<&str>, ctx: &ActionContext<'_>) -> ActionValue {
    if let Some(value) = ctx.calendar(var) {
        return ActionValue::scalar(value);
    }
    match var.as_bytes().first() {
        Some(b'W') => {
            let names = match selector {
                Some(pattern) => {
                    let mut matcher = NameMatcher::new(ctx.wells);
                    if let Some(wlists) = ctx.wlists {
                        matcher = matcher.with_wlists(wlists);
                    }
                    match matcher.resolve(pattern) {
                        MatchResult::Matched(matched) => matched,
                        MatchResult::Empty | MatchResult::UndefinedList(_) => Vec::new(),
                    }
                }
                None => ctx.wells.to_vec(),
            };
            let mut value = ActionValue::well_indexed();
            for name in names {
                if let Some(v) = ctx.summary.get_well_var(&name, var) {
                    value.add_well(name, v);
                }
            }
            value
        }
        Some(b'G') => {
            // Group quantities compare as scalars; a selector names the
            // group, otherwise the bare field-wide key is used.
            let value = match selector {
                Some(group) => ctx.summary.get_group_var(group, var).unwrap_or(0.0),
                None => ctx.summary.get_or(var, 0.0),
            };
            ActionValue::scalar(value)
        }
        _ => ActionValue::scalar(ctx.summary.get_or(var, 0.0)),
    }
}

impl ActionExpr {
    /// Parses the condition of an ACTIONX block. `name` is the action
    /// name and only appears in error messages. The input is the
    /// condition records joined into one string, as captured from the
    /// deck.
    ///
    /// # Errors
    ///
    /// [`StructuralError::MalformedExpression`] on any syntax error.
    pub fn parse(name: &str, input: &str) -> SchedResult<Self> {
        let tokens = tokenize(name, input)?;
        let mut parser = Parser {
            name,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.or_expr()?;
        if parser.pos != tokens.len() {
            return Err(malformed(name, "trailing tokens after condition"));
        }
        Ok(expr)
    }

    /// Evaluates the condition, producing the truth flag and matched
    /// well set.
    #[must_use]
    pub fn eval(&self, ctx: &ActionContext<'_>) -> ActionResult {
        match self {
            Self::Cmp { cmp, left, right } => left.eval(ctx).eval_cmp(*cmp, &right.eval(ctx)),
            Self::And(left, right) => left.eval(ctx).and(right.eval(ctx)),
            Self::Or(left, right) => left.eval(ctx).or(right.eval(ctx)),
        }
    }
}

fn malformed(name: &str, reason: &str) -> crate::error::SchedError {
    StructuralError::MalformedExpression {
        keyword: "ACTIONX".to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Quoted(String),
    Cmp(Comparator),
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(name: &str, input: &str) -> SchedResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
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
            '<' | '>' | '=' | '!' => {
                let mut op = String::new();
                op.push(ch);
                chars.next();
                if chars.peek() == Some(&'=') {
                    op.push('=');
                    chars.next();
                }
                let cmp = Comparator::from_token(&op)
                    .ok_or_else(|| malformed(name, &format!("bad comparator '{op}'")))?;
                tokens.push(Token::Cmp(cmp));
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => text.push(c),
                        None => return Err(malformed(name, "unterminated quoted selector")),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' || c == 'E' || c == 'e' {
                        text.push(c);
                        chars.next();
                        if (text.ends_with('E') || text.ends_with('e'))
                            && matches!(chars.peek(), Some('+' | '-'))
                        {
                            if let Some(sign) = chars.next() {
                                text.push(sign);
                            }
                        }
                    } else {
                        break;
                    }
                }
                let value: f64 = text
                    .parse()
                    .map_err(|_| malformed(name, "bad number literal"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '*' || c == '?' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '*' || c == '?'
                        || c == '-'
                    {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match text.as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    _ => tokens.push(Token::Ident(text)),
                }
            }
            other => {
                return Err(malformed(name, &format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    name: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or_expr(&mut self) -> SchedResult<ActionExpr> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = ActionExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> SchedResult<ActionExpr> {
        let mut left = self.comparison()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.comparison()?;
            left = ActionExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> SchedResult<ActionExpr> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let expr = self.or_expr()?;
            if self.peek() != Some(&Token::RParen) {
                return Err(malformed(self.name, "missing closing parenthesis"));
            }
            self.pos += 1;
            return Ok(expr);
        }
        let left = self.operand()?;
        let cmp = match self.peek() {
            Some(Token::Cmp(cmp)) => *cmp,
            _ => return Err(malformed(self.name, "expected a comparator")),
        };
        self.pos += 1;
        let right = self.operand()?;
        Ok(ActionExpr::Cmp { cmp, left, right })
    }

    fn operand(&mut self) -> SchedResult<ActionOperand> {
        match self.peek().cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(ActionOperand::Number(value))
            }
            Some(Token::Ident(ident)) => {
                self.pos += 1;
                let selector = match self.peek() {
                    Some(Token::Quoted(text)) => {
                        let text = text.clone();
                        self.pos += 1;
                        Some(text)
                    }
                    _ => None,
                };
                Ok(ActionOperand::Quantity {
                    var: ident,
                    selector,
                })
            }
            _ => Err(malformed(self.name, "expected an operand")),
        }
    }
}
