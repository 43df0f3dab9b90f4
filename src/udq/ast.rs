//! UDQ expression trees: parsing and evaluation.
//!
//! DEFINE bodies are infix expressions over summary vectors, numbers,
//! unary functions and aggregations. Evaluation produces a [`UdqSet`]
//! of the requested target type; boolean operators evaluate both
//! branches so well-indexed conditions keep per-member results.

use crate::error::{SchedResult, StructuralError};
use crate::name_match::{MatchResult, NameMatcher};
use crate::summary::SummaryState;
use crate::udq::functions;
use crate::udq::set::{UdqSet, UdqVarType};
use crate::wlist::WListManager;

/// Read-only inputs for one evaluation pass.
pub struct UdqContext<'a> {
    /// Live summary values.
    pub summary: &'a SummaryState,
    /// Well lists for leading-`*` selectors.
    pub wlists: Option<&'a WListManager>,
    /// Wells defined at the evaluation step, in insertion order.
    pub wells: &'a [String],
    /// Groups defined at the evaluation step, in insertion order.
    pub groups: &'a [String],
}

/// Binary operators, loosest-binding first.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdqBinaryOp {
    Or,
    And,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl UdqBinaryOp {
    /// Applies the operator to two defined operands. Division by zero
    /// is undefined, not a fault.
    #[must_use]
    pub fn apply(self, a: f64, b: f64) -> Option<f64> {
        match self {
            Self::Add => Some(a + b),
            Self::Sub => Some(a - b),
            Self::Mul => Some(a * b),
            Self::Div => {
                if b == 0.0 {
                    None
                } else {
                    Some(a / b)
                }
            }
            Self::Pow => Some(a.powf(b)),
            Self::Lt => Some(f64::from(a < b)),
            Self::Le => Some(f64::from(a <= b)),
            Self::Gt => Some(f64::from(a > b)),
            Self::Ge => Some(f64::from(a >= b)),
            Self::Eq => Some(f64::from(a == b)),
            Self::Ne => Some(f64::from(a != b)),
            Self::And => Some(f64::from(a != 0.0 && b != 0.0)),
            Self::Or => Some(f64::from(a != 0.0 || b != 0.0)),
        }
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div => 5,
            Self::Pow => 6,
        }
    }
}

/// One node of a parsed DEFINE body.
#[derive(Debug, Clone, PartialEq)]
pub enum UdqExpr {
    /// A number literal; broadcasts to the requested target type.
    Number(f64),
    /// A summary-vector reference, optionally restricted by a quoted
    /// well/group selector pattern.
    EclExpr {
        /// Vector name, e.g. `WOPR` or a stored UDQ name.
        var: String,
        /// Selector pattern from the quoted argument.
        selector: Option<String>,
    },
    /// Elementwise unary function application.
    Unary {
        /// Function name from the function table.
        func: String,
        /// Argument expression.
        arg: Box<UdqExpr>,
    },
    /// Aggregation of an indexed set down to a field value.
    Aggregate {
        /// Aggregation name from the function table.
        func: String,
        /// Argument expression.
        arg: Box<UdqExpr>,
    },
    /// Binary operator application with broadcast.
    Binary {
        /// The operator.
        op: UdqBinaryOp,
        /// Left operand.
        left: Box<UdqExpr>,
        /// Right operand.
        right: Box<UdqExpr>,
    },
}

impl UdqExpr {
    /// Parses an infix DEFINE body. `name` is the quantity being
    /// defined and only appears in error messages.
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
        let expr = parser.expression(0)?;
        if parser.pos != tokens.len() {
            return Err(malformed(name, "trailing tokens after expression"));
        }
        Ok(expr)
    }

    /// Evaluates the tree and casts the result to `target`.
    ///
    /// # Errors
    ///
    /// Fails on indexed-set size mismatches, which indicate an
    /// inconsistent context rather than bad deck input.
    pub fn eval(&self, target: UdqVarType, ctx: &UdqContext<'_>) -> SchedResult<UdqSet> {
        let result = self.eval_node(ctx)?;
        let members = match target {
            UdqVarType::Well => ctx.wells,
            UdqVarType::Group => ctx.groups,
            UdqVarType::Field | UdqVarType::Scalar => &[],
        };
        Ok(result.cast(target, members))
    }

    fn eval_node(&self, ctx: &UdqContext<'_>) -> SchedResult<UdqSet> {
        match self {
            Self::Number(value) => Ok(UdqSet::scalar(format!("{value}"), *value)),
            Self::EclExpr { var, selector } => Ok(eval_ecl_expr(var, selector.as_deref(), ctx)),
            Self::Unary { func, arg } => {
                let set = arg.eval_node(ctx)?;
                let f = functions::unary(func)
                    .ok_or_else(|| malformed(func, "unknown function"))?;
                Ok(set.map(f))
            }
            Self::Aggregate { func, arg } => {
                let set = arg.eval_node(ctx)?;
                let value = functions::aggregate(func, &set)
                    .ok_or_else(|| malformed(func, "unknown aggregation"))?;
                Ok(UdqSet::field(format!("{func}({})", set.name()), value))
            }
            Self::Binary { op, left, right } => {
                // Both branches always evaluate; AND/OR combine
                // per-member definedness rather than short-circuiting.
                let lhs = left.eval_node(ctx)?;
                let rhs = right.eval_node(ctx)?;
                lhs.zip_with(&rhs, |a, b| op.apply(a, b))
            }
        }
    }
}

fn eval_ecl_expr(var: &str, selector: Option<&str>, ctx: &UdqContext<'_>) -> UdqSet {
    match UdqVarType::from_name(var) {
        UdqVarType::Well => {
            let mut set = UdqSet::wells(var, ctx.wells);
            let selected = select_names(ctx.wells, selector, ctx.wlists);
            for name in selected {
                set.assign(&name, ctx.summary.get_well_var(&name, var));
            }
            set
        }
        UdqVarType::Group => {
            let mut set = UdqSet::groups(var, ctx.groups);
            let selected = select_names(ctx.groups, selector, ctx.wlists);
            for name in selected {
                set.assign(&name, ctx.summary.get_group_var(&name, var));
            }
            set
        }
        UdqVarType::Field | UdqVarType::Scalar => UdqSet::field(var, ctx.summary.get(var)),
    }
}

fn select_names(
    names: &[String],
    selector: Option<&str>,
    wlists: Option<&WListManager>,
) -> Vec<String> {
    let Some(pattern) = selector else {
        return names.to_vec();
    };
    let mut matcher = NameMatcher::new(names);
    if let Some(wlists) = wlists {
        matcher = matcher.with_wlists(wlists);
    }
    match matcher.resolve(pattern) {
        MatchResult::Matched(matched) => matched,
        MatchResult::Empty | MatchResult::UndefinedList(_) => Vec::new(),
    }
}

fn malformed(name: &str, reason: &str) -> crate::error::SchedError {
    StructuralError::MalformedExpression {
        keyword: "UDQ".to_string(),
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
    Op(UdqBinaryOp),
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
            '+' => {
                chars.next();
                tokens.push(Token::Op(UdqBinaryOp::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Op(UdqBinaryOp::Sub));
            }
            '^' => {
                chars.next();
                tokens.push(Token::Op(UdqBinaryOp::Pow));
            }
            '/' => {
                chars.next();
                tokens.push(Token::Op(UdqBinaryOp::Div));
            }
            '*' => {
                chars.next();
                tokens.push(Token::Op(UdqBinaryOp::Mul));
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(UdqBinaryOp::Le));
                } else {
                    tokens.push(Token::Op(UdqBinaryOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(UdqBinaryOp::Ge));
                } else {
                    tokens.push(Token::Op(UdqBinaryOp::Gt));
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Op(UdqBinaryOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(malformed(name, "lone '!' in expression"));
                }
                tokens.push(Token::Op(UdqBinaryOp::Ne));
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
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' || c == 'E' || c == 'e' {
                        text.push(c);
                        chars.next();
                        if (text.ends_with('E') || text.ends_with('e'))
                            && matches!(chars.peek(), Some('+' | '-'))
                        {
                            text.push(chars.next().unwrap_or('+'));
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
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match text.as_str() {
                    "AND" => tokens.push(Token::Op(UdqBinaryOp::And)),
                    "OR" => tokens.push(Token::Op(UdqBinaryOp::Or)),
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

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self, min_prec: u8) -> SchedResult<UdqExpr> {
        let mut left = self.primary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if op.precedence() < min_prec {
                break;
            }
            self.pos += 1;
            // Power is right-associative, the rest left.
            let next_min = if op == UdqBinaryOp::Pow {
                op.precedence()
            } else {
                op.precedence() + 1
            };
            let right = self.expression(next_min)?;
            left = UdqExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn primary(&mut self) -> SchedResult<UdqExpr> {
        match self.next() {
            Some(Token::Number(value)) => Ok(UdqExpr::Number(*value)),
            Some(Token::LParen) => {
                let expr = self.expression(0)?;
                match self.next() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(malformed(self.name, "missing closing parenthesis")),
                }
            }
            Some(Token::Op(UdqBinaryOp::Sub)) => {
                let expr = self.primary()?;
                Ok(UdqExpr::Binary {
                    op: UdqBinaryOp::Sub,
                    left: Box::new(UdqExpr::Number(0.0)),
                    right: Box::new(expr),
                })
            }
            Some(Token::Ident(ident)) => {
                let ident = ident.clone();
                // A function name followed by '(' is a call; any other
                // identifier is a vector reference, optionally followed
                // by a quoted selector.
                let is_call = self.peek() == Some(&Token::LParen)
                    && (functions::unary(&ident).is_some() || functions::is_aggregate(&ident));
                if is_call {
                    self.pos += 1;
                    let arg = self.expression(0)?;
                    match self.next() {
                        Some(Token::RParen) => {}
                        _ => return Err(malformed(self.name, "missing closing parenthesis")),
                    }
                    if functions::is_aggregate(&ident) {
                        Ok(UdqExpr::Aggregate {
                            func: ident,
                            arg: Box::new(arg),
                        })
                    } else {
                        Ok(UdqExpr::Unary {
                            func: ident,
                            arg: Box::new(arg),
                        })
                    }
                } else {
                    let selector = match self.peek() {
                        Some(Token::Quoted(text)) => {
                            let text = text.clone();
                            self.pos += 1;
                            Some(text)
                        }
                        _ => None,
                    };
                    Ok(UdqExpr::EclExpr {
                        var: ident,
                        selector,
                    })
                }
            }
            _ => Err(malformed(self.name, "expected an operand")),
        }
    }
}
