//! Expression parser.
//!
//! Precedence-climbing recursive descent over the lexer's token stream:
//!
//! ```text
//! expression  = logical_or
//! logical_or  = logical_and ( "OR" logical_and )*
//! logical_and = comparison ( "AND" comparison )*
//! comparison  = arithmetic ( (CMP_OP | CROSS_OP) arithmetic )?
//! arithmetic  = postfix ( ("*" | "/" | "+" | "-") postfix )*
//! postfix     = term ( "[" NUMBER "]" )?
//! term        = "(" expression ")" | BOOLEAN | NUMBER | PRICE_FIELD | function_call
//! ```
//!
//! Comparison is non-associative and arithmetic has a single left-to-right
//! precedence tier. Function calls are dispatched on the token kind to one
//! parse function per family; each enforces its own arity and parameter
//! rules so malformed calls never reach the evaluator.

use crate::domain::ast::{
    AggregateFunction, ArithmeticOp, AstNode, CompareOp, CrossDirection, IndicatorCall, LogicalOp,
    MathFunction, PriceField,
};
use crate::domain::error::ParseError;
use crate::domain::lexer::tokenize;
use crate::domain::token::{Token, TokenKind};

pub const DEFAULT_PROFILE_PERIOD: usize = 20;
pub const DEFAULT_STOCHASTIC_D: usize = 3;
pub const DEFAULT_OI_CHANGE_PERIOD: usize = 1;
pub const DEFAULT_STACK_LENGTH: usize = 3;

struct IndicatorRule {
    name: &'static str,
    min: usize,
    max: usize,
    /// Leading parameters that must be positive whole numbers.
    whole: usize,
    properties: &'static [&'static str],
}

const INDICATOR_RULES: &[IndicatorRule] = &[
    IndicatorRule { name: "SMA", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "EMA", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "WMA", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "RSI", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "ATR", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "ROC", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "STDDEV", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "CCI", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule { name: "WILLIAMS_R", min: 1, max: 1, whole: 1, properties: &[] },
    IndicatorRule {
        name: "MACD",
        min: 3,
        max: 3,
        whole: 3,
        properties: &["line", "signal", "histogram"],
    },
    IndicatorRule {
        name: "BBANDS",
        min: 2,
        max: 2,
        whole: 1,
        properties: &["upper", "middle", "lower"],
    },
    IndicatorRule {
        name: "STOCHASTIC",
        min: 1,
        max: 2,
        whole: 2,
        properties: &["k", "d"],
    },
];

fn indicator_rule(name: &str) -> Option<&'static IndicatorRule> {
    INDICATOR_RULES.iter().find(|rule| rule.name == name)
}

type ParseFn = fn(&mut Parser, Token) -> Result<AstNode, ParseError>;

/// A numeric call parameter with the offset it was written at.
#[derive(Debug, Clone, Copy)]
struct Param {
    value: f64,
    offset: usize,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// Offset of the current token, or the end of the last consumed token
    /// when the input ended early.
    fn error_position(&self) -> usize {
        let token = self.current();
        if token.kind == TokenKind::Eof && self.pos > 0 {
            self.tokens[self.pos - 1].end()
        } else {
            token.offset
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.error_position(),
        }
    }

    fn found(&self) -> String {
        let token = self.current();
        if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.text)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}, found {}", kind, self.found())))
        }
    }

    fn parse(&mut self) -> Result<AstNode, ParseError> {
        let node = self.parse_expression()?;
        if !self.check(TokenKind::Eof) {
            let token = self.current();
            return Err(ParseError {
                message: format!(
                    "unexpected token '{}' at position {}",
                    token.text, token.offset
                ),
                position: token.offset,
            });
        }
        Ok(node)
    }

    fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.check(TokenKind::Logical) && self.current().text == "OR" {
            self.advance();
            let right = self.parse_logical_and()?;
            left = AstNode::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.check(TokenKind::Logical) && self.current().text == "AND" {
            self.advance();
            let right = self.parse_comparison()?;
            left = AstNode::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<AstNode, ParseError> {
        let left = self.parse_arithmetic()?;

        if self.check(TokenKind::Operator) {
            let token = self.advance();
            let op = match token.text.as_str() {
                ">" => CompareOp::Greater,
                "<" => CompareOp::Less,
                ">=" => CompareOp::GreaterEqual,
                "<=" => CompareOp::LessEqual,
                "==" => CompareOp::Equal,
                other => unreachable!("lexer produced unknown operator '{}'", other),
            };
            let right = self.parse_arithmetic()?;
            return Ok(AstNode::Comparison {
                left: Box::new(left),
                op,
                right: Box::new(right),
            });
        }

        if self.check(TokenKind::CrossOperator) {
            let token = self.advance();
            let direction = if token.text == "crosses_above" {
                CrossDirection::Above
            } else {
                CrossDirection::Below
            };
            let right = self.parse_arithmetic()?;
            return Ok(AstNode::CrossComparison {
                left: Box::new(left),
                direction,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_arithmetic(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_postfix()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => ArithmeticOp::Add,
                TokenKind::Minus => ArithmeticOp::Subtract,
                TokenKind::Star => ArithmeticOp::Multiply,
                TokenKind::Slash => ArithmeticOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_postfix()?;
            left = AstNode::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let node = self.parse_term()?;
        if !self.check(TokenKind::LBracket) {
            return Ok(node);
        }
        if matches!(node, AstNode::NumberLiteral(_) | AstNode::BooleanLiteral(_)) {
            return Err(self.error("lookback is not allowed on a literal"));
        }
        self.advance();
        let token = self.expect(TokenKind::Number)?;
        let bars_ago = whole_number("lookback", "bar count", parse_number(&token)?, token.offset, true)?;
        self.expect(TokenKind::RBracket)?;
        Ok(AstNode::LookbackAccess {
            inner: Box::new(node),
            bars_ago,
        })
    }

    fn parse_term(&mut self) -> Result<AstNode, ParseError> {
        match self.current().kind {
            TokenKind::LParen => {
                self.advance();
                let node = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::Boolean => {
                let token = self.advance();
                Ok(AstNode::BooleanLiteral(token.text.eq_ignore_ascii_case("true")))
            }
            TokenKind::Number => {
                let token = self.advance();
                Ok(AstNode::NumberLiteral(parse_number(&token)?))
            }
            TokenKind::PriceField => {
                let token = self.advance();
                let field = match token.text.to_ascii_lowercase().as_str() {
                    "open" => PriceField::Open,
                    "high" => PriceField::High,
                    "low" => PriceField::Low,
                    "close" => PriceField::Close,
                    _ => PriceField::Volume,
                };
                Ok(AstNode::PriceReference(field))
            }
            _ => match dispatch(self.current().kind) {
                Some(parse_fn) => {
                    let token = self.advance();
                    tracing::trace!(family = %token.kind, name = %token.text, "parsing function call");
                    parse_fn(self, token)
                }
                None => Err(self.error(format!("expected expression, found {}", self.found()))),
            },
        }
    }

    /// `( NUMBER ("," NUMBER)* )` or `()`.
    fn parse_param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.check(TokenKind::RParen) {
            self.advance();
            return Ok(params);
        }
        loop {
            let token = self.expect(TokenKind::Number)?;
            params.push(Param {
                value: parse_number(&token)?,
                offset: token.offset,
            });
            if self.check(TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(params);
        }
    }

    fn parse_optional_params(&mut self) -> Result<Vec<Param>, ParseError> {
        if self.check(TokenKind::LParen) {
            self.parse_param_list()
        } else {
            Ok(Vec::new())
        }
    }

    fn reject_params(&self, name: &str) -> Result<(), ParseError> {
        if self.check(TokenKind::LParen) {
            return Err(self.error(format!("{} takes no parameters", name)));
        }
        Ok(())
    }

    fn check_arity(
        &self,
        name: &str,
        params: &[Param],
        min: usize,
        max: usize,
        at: &Token,
    ) -> Result<(), ParseError> {
        if params.len() >= min && params.len() <= max {
            return Ok(());
        }
        let expected = if min == max {
            format!(
                "exactly {} parameter{}",
                min,
                if min == 1 { "" } else { "s" }
            )
        } else {
            format!("{} to {} parameters", min, max)
        };
        Err(ParseError {
            message: format!("{} expects {}, got {}", name, expected, params.len()),
            position: at.offset,
        })
    }

    fn parse_indicator(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        let rule = indicator_rule(&name).ok_or_else(|| ParseError {
            message: format!("unknown indicator '{}'", name),
            position: token.offset,
        })?;
        if !self.check(TokenKind::LParen) {
            return Err(self.error(format!("expected '(' after {}", name)));
        }
        let params = self.parse_param_list()?;
        self.check_arity(&name, &params, rule.min, rule.max, &token)?;

        let mut values = Vec::with_capacity(rule.max);
        for (i, param) in params.iter().enumerate() {
            if i < rule.whole {
                whole_number(&name, "period", param.value, param.offset, false)?;
            } else {
                positive(&name, "multiplier", param)?;
            }
            values.push(param.value);
        }
        if name == "STOCHASTIC" && values.len() == 1 {
            values.push(DEFAULT_STOCHASTIC_D as f64);
        }
        let call = IndicatorCall {
            name: name.clone(),
            params: values,
        };

        if !self.check(TokenKind::Dot) {
            return Ok(AstNode::IndicatorCall(call));
        }
        if rule.properties.is_empty() {
            return Err(self.error(format!("{} has no properties", name)));
        }
        self.advance();
        if !self.check(TokenKind::Property) {
            return Err(self.error(format!(
                "expected property name after '.', found {}",
                self.found()
            )));
        }
        let property = self.advance();
        if !rule.properties.contains(&property.text.as_str()) {
            return Err(ParseError {
                message: format!(
                    "unknown property '{}' for {} (expected one of: {})",
                    property.text,
                    name,
                    rule.properties.join(", ")
                ),
                position: property.offset,
            });
        }
        Ok(AstNode::PropertyAccess {
            call,
            property: property.text,
        })
    }

    fn parse_range(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        let params = self.parse_optional_params()?;
        let max = if name == "RANGE_POSITION" { 2 } else { 1 };
        self.check_arity(&name, &params, 1, max, &token)?;
        let period = whole_number(&name, "period", params[0].value, params[0].offset, false)?;
        let skip = match params.get(1) {
            Some(p) => whole_number(&name, "skip", p.value, p.offset, true)?,
            None => 0,
        };
        Ok(AstNode::RangeCall { name, period, skip })
    }

    fn parse_volume(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        let params = self.parse_optional_params()?;
        self.check_arity(&name, &params, 1, 1, &token)?;
        let period = whole_number(&name, "period", params[0].value, params[0].offset, false)?;
        Ok(AstNode::VolumeCall { name, period })
    }

    fn parse_time(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::TimeCall(token.text))
    }

    fn parse_moon(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::MoonCall(token.text))
    }

    fn parse_holiday(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::HolidayCall(token.text))
    }

    fn parse_fomc(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::FomcCall(token.text))
    }

    fn parse_order_flow(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        match name.as_str() {
            "VWAP" | "DELTA" | "CUM_DELTA" | "TRADE_COUNT" => {
                self.reject_params(&name)?;
                Ok(AstNode::OrderFlowCall { name, param: None })
            }
            "POC" | "VAH" | "VAL" => {
                let params = self.parse_optional_params()?;
                self.check_arity(&name, &params, 0, 1, &token)?;
                let period = match params.first() {
                    Some(p) => whole_number(&name, "period", p.value, p.offset, false)?,
                    None => DEFAULT_PROFILE_PERIOD,
                };
                Ok(AstNode::OrderFlowCall {
                    name,
                    param: Some(period as f64),
                })
            }
            _ => {
                let params = self.parse_optional_params()?;
                if params.is_empty() {
                    return Err(ParseError {
                        message: format!("{} requires a threshold parameter", name),
                        position: token.offset,
                    });
                }
                self.check_arity(&name, &params, 1, 1, &token)?;
                positive(&name, "threshold", &params[0])?;
                Ok(AstNode::OrderFlowCall {
                    name,
                    param: Some(params[0].value),
                })
            }
        }
    }

    /// Shared shape for FUNDING/PREMIUM/EXCHANGE style families: the bare
    /// name takes nothing, the named variants take one period.
    fn parse_bare_or_period(
        &mut self,
        token: &Token,
        with_period: &[&str],
        default: Option<usize>,
    ) -> Result<Option<usize>, ParseError> {
        let name = token.text.as_str();
        if !with_period.contains(&name) {
            self.reject_params(name)?;
            return Ok(None);
        }
        let params = self.parse_optional_params()?;
        let min = if default.is_some() { 0 } else { 1 };
        self.check_arity(name, &params, min, 1, token)?;
        match params.first() {
            Some(p) => Ok(Some(whole_number(name, "period", p.value, p.offset, false)?)),
            None => Ok(default),
        }
    }

    fn parse_funding(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let period = self.parse_bare_or_period(&token, &["FUNDING_AVG"], None)?;
        Ok(AstNode::FundingCall {
            name: token.text,
            period,
        })
    }

    fn parse_premium(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let period = self.parse_bare_or_period(&token, &["PREMIUM_AVG"], None)?;
        Ok(AstNode::PremiumCall {
            name: token.text,
            period,
        })
    }

    fn parse_open_interest(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let period =
            self.parse_bare_or_period(&token, &["OI_CHANGE"], Some(DEFAULT_OI_CHANGE_PERIOD))?;
        Ok(AstNode::OpenInterestCall {
            name: token.text,
            period,
        })
    }

    fn parse_exchange(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let period = self.parse_bare_or_period(&token, &["EXCHANGE_SPREAD_Z"], None)?;
        Ok(AstNode::ExchangeCall {
            name: token.text,
            period,
        })
    }

    fn parse_session_order_flow(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::SessionOrderFlowCall(token.text))
    }

    fn parse_ohlcv_volume(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::OhlcvVolumeCall(token.text))
    }

    fn parse_ray(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        let count_style = name.ends_with("_COUNT") || name.ends_with("_RAYS_BROKEN");
        if !self.check(TokenKind::LParen) {
            return Err(self.error(format!("expected '(' after {}", name)));
        }
        let params = self.parse_param_list()?;
        if count_style {
            self.check_arity(&name, &params, 2, 2, &token)?;
            let lookback = whole_number(&name, "lookback", params[0].value, params[0].offset, false)?;
            let skip = whole_number(&name, "skip", params[1].value, params[1].offset, true)?;
            return Ok(AstNode::RayCall {
                name,
                ray: None,
                lookback,
                skip,
            });
        }
        self.check_arity(&name, &params, 3, 3, &token)?;
        if params[0].value < 1.0 {
            return Err(ParseError {
                message: format!("{} ray number must be >= 1", name),
                position: params[0].offset,
            });
        }
        let ray = whole_number(&name, "ray number", params[0].value, params[0].offset, false)?;
        let lookback = whole_number(&name, "lookback", params[1].value, params[1].offset, false)?;
        let skip = whole_number(&name, "skip", params[2].value, params[2].offset, true)?;
        Ok(AstNode::RayCall {
            name,
            ray: Some(ray),
            lookback,
            skip,
        })
    }

    fn parse_aggregate(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let function = match token.text.as_str() {
            "LOWEST" => AggregateFunction::Lowest,
            "HIGHEST" => AggregateFunction::Highest,
            _ => AggregateFunction::Percentile,
        };
        self.expect(TokenKind::LParen)?;
        let inner = self.parse_expression()?;
        if !self.check(TokenKind::Comma) {
            return Err(self.error(format!(
                "{} expects (expression, period), found {}",
                token.text,
                self.found()
            )));
        }
        self.advance();
        let period_token = self.expect(TokenKind::Number)?;
        let period = whole_number(
            &token.text,
            "period",
            parse_number(&period_token)?,
            period_token.offset,
            false,
        )?;
        self.expect(TokenKind::RParen)?;
        Ok(AstNode::AggregateCall {
            function,
            inner: Box::new(inner),
            period,
        })
    }

    fn parse_math(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let (function, arity) = match token.text.as_str() {
            "abs" => (MathFunction::Abs, 1),
            "min" => (MathFunction::Min, 2),
            _ => (MathFunction::Max, 2),
        };
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        if args.len() != arity {
            return Err(ParseError {
                message: format!(
                    "{} takes {} argument{}, got {}",
                    token.text,
                    arity,
                    if arity == 1 { "" } else { "s" },
                    args.len()
                ),
                position: token.offset,
            });
        }
        Ok(AstNode::MathCall { function, args })
    }

    fn parse_candle_pattern(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        let params = self.parse_optional_params()?;
        self.check_arity(&name, &params, 0, 1, &token)?;
        let ratio = match params.first() {
            Some(p) => positive(&name, "ratio", p)?,
            None => crate::domain::indicator::candle::default_ratio(&name),
        };
        Ok(AstNode::CandlePatternCall { name, ratio })
    }

    fn parse_candle_property(&mut self, token: Token) -> Result<AstNode, ParseError> {
        self.reject_params(&token.text)?;
        Ok(AstNode::CandlePropertyCall(token.text))
    }

    fn parse_footprint(&mut self, token: Token) -> Result<AstNode, ParseError> {
        let name = token.text.clone();
        let params = self.parse_optional_params()?;
        let values = if name == "ABSORPTION" {
            self.check_arity(&name, &params, 2, 2, &token)?;
            vec![
                positive(&name, "volume multiple", &params[0])?,
                positive(&name, "max range %", &params[1])?,
            ]
        } else {
            self.check_arity(&name, &params, 1, 2, &token)?;
            let ratio = positive(&name, "ratio", &params[0])?;
            let stack = match params.get(1) {
                Some(p) => whole_number(&name, "stack length", p.value, p.offset, false)?,
                None => DEFAULT_STACK_LENGTH,
            };
            vec![ratio, stack as f64]
        };
        Ok(AstNode::FootprintCall {
            name,
            params: values,
        })
    }
}

/// Token kind → family parse function. Kinds that cannot start a function
/// call map to `None`.
fn dispatch(kind: TokenKind) -> Option<ParseFn> {
    let parse_fn: ParseFn = match kind {
        TokenKind::Indicator => Parser::parse_indicator,
        TokenKind::Range => Parser::parse_range,
        TokenKind::Volume => Parser::parse_volume,
        TokenKind::Time => Parser::parse_time,
        TokenKind::Moon => Parser::parse_moon,
        TokenKind::Holiday => Parser::parse_holiday,
        TokenKind::Fomc => Parser::parse_fomc,
        TokenKind::OrderFlow => Parser::parse_order_flow,
        TokenKind::Funding => Parser::parse_funding,
        TokenKind::Premium => Parser::parse_premium,
        TokenKind::SessionOrderFlow => Parser::parse_session_order_flow,
        TokenKind::OhlcvVolume => Parser::parse_ohlcv_volume,
        TokenKind::OpenInterest => Parser::parse_open_interest,
        TokenKind::Ray => Parser::parse_ray,
        TokenKind::Aggregate => Parser::parse_aggregate,
        TokenKind::Math => Parser::parse_math,
        TokenKind::CandlePattern => Parser::parse_candle_pattern,
        TokenKind::CandleProperty => Parser::parse_candle_property,
        TokenKind::Footprint => Parser::parse_footprint,
        TokenKind::Exchange => Parser::parse_exchange,
        TokenKind::Operator
        | TokenKind::Logical
        | TokenKind::CrossOperator
        | TokenKind::LParen
        | TokenKind::RParen
        | TokenKind::Comma
        | TokenKind::Dot
        | TokenKind::LBracket
        | TokenKind::RBracket
        | TokenKind::Plus
        | TokenKind::Minus
        | TokenKind::Star
        | TokenKind::Slash
        | TokenKind::Number
        | TokenKind::Boolean
        | TokenKind::PriceField
        | TokenKind::Property
        | TokenKind::Eof => return None,
    };
    Some(parse_fn)
}

fn parse_number(token: &Token) -> Result<f64, ParseError> {
    token.text.parse::<f64>().map_err(|_| ParseError {
        message: format!("invalid number: {}", token.text),
        position: token.offset,
    })
}

fn whole_number(
    function: &str,
    what: &str,
    value: f64,
    offset: usize,
    allow_zero: bool,
) -> Result<usize, ParseError> {
    let valid = value.fract() == 0.0 && (value > 0.0 || (allow_zero && value == 0.0));
    if !valid {
        let expected = if allow_zero {
            "a non-negative whole number"
        } else {
            "a positive whole number"
        };
        return Err(ParseError {
            message: format!("{} {} must be {}, got {}", function, what, expected, value),
            position: offset,
        });
    }
    Ok(value as usize)
}

fn positive(function: &str, what: &str, param: &Param) -> Result<f64, ParseError> {
    if param.value > 0.0 {
        Ok(param.value)
    } else {
        Err(ParseError {
            message: format!("{} {} must be positive, got {}", function, what, param.value),
            position: param.offset,
        })
    }
}

pub fn parse(input: &str) -> Result<AstNode, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Box<AstNode> {
        Box::new(AstNode::NumberLiteral(v))
    }

    fn call(name: &str, params: &[f64]) -> IndicatorCall {
        IndicatorCall {
            name: name.into(),
            params: params.to_vec(),
        }
    }

    #[test]
    fn parse_rsi_comparison() {
        let ast = parse("RSI(14) > 70").unwrap();
        assert_eq!(
            ast,
            AstNode::Comparison {
                left: Box::new(AstNode::IndicatorCall(call("RSI", &[14.0]))),
                op: CompareOp::Greater,
                right: num(70.0),
            }
        );
    }

    #[test]
    fn parse_macd_histogram_cross() {
        let ast = parse("MACD(12,26,9).histogram crosses_above 0").unwrap();
        match ast {
            AstNode::CrossComparison {
                left,
                direction,
                right,
            } => {
                assert_eq!(direction, CrossDirection::Above);
                assert_eq!(
                    *left,
                    AstNode::PropertyAccess {
                        call: call("MACD", &[12.0, 26.0, 9.0]),
                        property: "histogram".into(),
                    }
                );
                assert_eq!(*right, AstNode::NumberLiteral(0.0));
            }
            other => panic!("expected CrossComparison, got {:?}", other),
        }
    }

    #[test]
    fn sma_has_no_properties() {
        let err = parse("SMA(20).signal > 0").unwrap_err();
        assert!(err.message.contains("SMA has no properties"), "{}", err.message);
        assert_eq!(err.position, 7);
    }

    #[test]
    fn unknown_property_lists_allowed() {
        let err = parse("MACD(12,26,9).upper > 0").unwrap_err();
        assert!(err.message.contains("line, signal, histogram"));
        assert_eq!(err.position, 14);
    }

    #[test]
    fn whale_delta_requires_threshold() {
        let err = parse("WHALE_DELTA() > 0").unwrap_err();
        assert!(err.message.contains("WHALE_DELTA requires a threshold parameter"));
        assert_eq!(err.position, 0);

        let err = parse("WHALE_DELTA > 0").unwrap_err();
        assert!(err.message.contains("threshold"));
    }

    #[test]
    fn whale_delta_with_threshold() {
        let ast = parse("WHALE_DELTA(50000) > 0").unwrap();
        assert!(matches!(
            ast,
            AstNode::Comparison { ref left, .. }
                if **left == AstNode::OrderFlowCall { name: "WHALE_DELTA".into(), param: Some(50000.0) }
        ));
    }

    #[test]
    fn chained_comparison_fails_at_second_operator() {
        let err = parse("close > open > high").unwrap_err();
        assert_eq!(err.position, 13);
        assert_eq!(err.message, "unexpected token '>' at position 13");
    }

    #[test]
    fn indicator_arity_errors_name_indicator() {
        let err = parse("MACD(12, 26) > 0").unwrap_err();
        assert_eq!(err.message, "MACD expects exactly 3 parameters, got 2");
        assert_eq!(err.position, 0);

        let err = parse("SMA(10, 20) > 0").unwrap_err();
        assert_eq!(err.message, "SMA expects exactly 1 parameter, got 2");

        let err = parse("BBANDS(20) > close").unwrap_err();
        assert_eq!(err.message, "BBANDS expects exactly 2 parameters, got 1");

        let err = parse("STOCHASTIC(14, 3, 3) > 80").unwrap_err();
        assert_eq!(err.message, "STOCHASTIC expects 1 to 2 parameters, got 3");
    }

    #[test]
    fn stochastic_default_d_period() {
        let ast = parse("STOCHASTIC(14).k").unwrap();
        assert_eq!(
            ast,
            AstNode::PropertyAccess {
                call: call("STOCHASTIC", &[14.0, 3.0]),
                property: "k".into(),
            }
        );
    }

    #[test]
    fn indicator_period_must_be_whole() {
        let err = parse("SMA(2.5) > 0").unwrap_err();
        assert!(err.message.contains("positive whole number"));
        assert_eq!(err.position, 4);

        let err = parse("EMA(0) > 0").unwrap_err();
        assert!(err.message.contains("positive whole number"));
    }

    #[test]
    fn bbands_multiplier_may_be_fractional() {
        let ast = parse("close > BBANDS(20, 2.5).upper").unwrap();
        match ast {
            AstNode::Comparison { right, .. } => assert_eq!(
                *right,
                AstNode::PropertyAccess {
                    call: call("BBANDS", &[20.0, 2.5]),
                    property: "upper".into(),
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn logical_precedence_and_binds_tighter() {
        let ast = parse("close > 1 OR close > 2 AND close > 3").unwrap();
        match ast {
            AstNode::Logical { op, right, .. } => {
                assert_eq!(op, LogicalOp::Or);
                assert!(matches!(*right, AstNode::Logical { op: LogicalOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn arithmetic_single_tier_left_to_right() {
        // 1 + 2 * 3 parses as (1 + 2) * 3
        let ast = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            ast,
            AstNode::Arithmetic {
                op: ArithmeticOp::Multiply,
                left: Box::new(AstNode::Arithmetic {
                    op: ArithmeticOp::Add,
                    left: num(1.0),
                    right: num(2.0),
                }),
                right: num(3.0),
            }
        );
    }

    #[test]
    fn parenthesized_arithmetic() {
        let ast = parse("1 + (2 * 3)").unwrap();
        assert!(matches!(ast, AstNode::Arithmetic { op: ArithmeticOp::Add, .. }));
    }

    #[test]
    fn lookback_on_indicator_and_property() {
        let ast = parse("ATR(14)[1]").unwrap();
        assert_eq!(
            ast,
            AstNode::LookbackAccess {
                inner: Box::new(AstNode::IndicatorCall(call("ATR", &[14.0]))),
                bars_ago: 1,
            }
        );

        let ast = parse("MACD(12,26,9).signal[2]").unwrap();
        assert!(matches!(ast, AstNode::LookbackAccess { bars_ago: 2, .. }));
    }

    #[test]
    fn lookback_on_candle_property() {
        let ast = parse("BODY_SIZE[1] > BODY_SIZE").unwrap();
        match ast {
            AstNode::Comparison { left, right, .. } => {
                assert_eq!(
                    *left,
                    AstNode::LookbackAccess {
                        inner: Box::new(AstNode::CandlePropertyCall("BODY_SIZE".into())),
                        bars_ago: 1,
                    }
                );
                assert_eq!(*right, AstNode::CandlePropertyCall("BODY_SIZE".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lookback_rejects_literals_and_fractions() {
        assert!(parse("5[1] > 0").is_err());
        let err = parse("close[1.5] > 0").unwrap_err();
        assert!(err.message.contains("non-negative whole number"));
    }

    #[test]
    fn range_functions() {
        assert_eq!(
            parse("HIGH_OF(20)").unwrap(),
            AstNode::RangeCall {
                name: "HIGH_OF".into(),
                period: 20,
                skip: 0
            }
        );
        assert_eq!(
            parse("RANGE_POSITION(20, 1)").unwrap(),
            AstNode::RangeCall {
                name: "RANGE_POSITION".into(),
                period: 20,
                skip: 1
            }
        );
        let err = parse("LOW_OF(20, 1)").unwrap_err();
        assert_eq!(err.message, "LOW_OF expects exactly 1 parameter, got 2");
    }

    #[test]
    fn profile_period_defaults_to_twenty() {
        assert_eq!(
            parse("POC").unwrap(),
            AstNode::OrderFlowCall {
                name: "POC".into(),
                param: Some(20.0)
            }
        );
        assert_eq!(
            parse("VAH(50)").unwrap(),
            AstNode::OrderFlowCall {
                name: "VAH".into(),
                param: Some(50.0)
            }
        );
    }

    #[test]
    fn zero_param_families_take_no_parentheses() {
        assert_eq!(
            parse("DELTA > 0").unwrap(),
            AstNode::Comparison {
                left: Box::new(AstNode::OrderFlowCall {
                    name: "DELTA".into(),
                    param: None
                }),
                op: CompareOp::Greater,
                right: num(0.0),
            }
        );
        let err = parse("HOUR() > 3").unwrap_err();
        assert_eq!(err.message, "HOUR takes no parameters");
        assert_eq!(err.position, 4);
        assert!(parse("IS_FOMC_DAY == 1").is_ok());
        assert!(parse("MOON_PHASE > 0.5").is_ok());
        assert!(parse("SESSION_DELTA > 0 AND BUY_VOLUME > SELL_VOLUME").is_ok());
    }

    #[test]
    fn aggregate_wraps_expression() {
        let ast = parse("LOWEST(RSI(14), 10) < 30").unwrap();
        match ast {
            AstNode::Comparison { left, .. } => assert_eq!(
                *left,
                AstNode::AggregateCall {
                    function: AggregateFunction::Lowest,
                    inner: Box::new(AstNode::IndicatorCall(call("RSI", &[14.0]))),
                    period: 10,
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("PERCENTILE(ATR(14) / close, 100) < 20").is_ok());
        let err = parse("HIGHEST(close) > 0").unwrap_err();
        assert!(err.message.contains("HIGHEST expects (expression, period)"));
    }

    #[test]
    fn ray_shapes() {
        assert_eq!(
            parse("RESISTANCE_RAYS_BROKEN(50, 0) > 0").ok().map(|_| ()),
            Some(())
        );
        assert_eq!(
            parse("SUPPORT_RAY(2, 100, 1)").unwrap(),
            AstNode::RayCall {
                name: "SUPPORT_RAY".into(),
                ray: Some(2),
                lookback: 100,
                skip: 1
            }
        );
        let err = parse("RESISTANCE_RAY_COUNT(1, 50, 0)").unwrap_err();
        assert_eq!(
            err.message,
            "RESISTANCE_RAY_COUNT expects exactly 2 parameters, got 3"
        );
        let err = parse("RESISTANCE_RAY(0, 50, 0)").unwrap_err();
        assert_eq!(err.message, "RESISTANCE_RAY ray number must be >= 1");
        assert_eq!(err.position, 15);
    }

    #[test]
    fn math_function_arity() {
        assert!(parse("abs(close - open) > 1").is_ok());
        assert!(parse("max(EMA(9), EMA(21)) > close").is_ok());
        let err = parse("min(close) > 0").unwrap_err();
        assert_eq!(err.message, "min takes 2 arguments, got 1");
        let err = parse("abs(close, open) > 0").unwrap_err();
        assert_eq!(err.message, "abs takes 1 argument, got 2");
    }

    #[test]
    fn candle_pattern_ratio_optional() {
        assert_eq!(
            parse("DOJI").unwrap(),
            AstNode::CandlePatternCall {
                name: "DOJI".into(),
                ratio: 0.1
            }
        );
        assert_eq!(
            parse("HAMMER(3)").unwrap(),
            AstNode::CandlePatternCall {
                name: "HAMMER".into(),
                ratio: 3.0
            }
        );
    }

    #[test]
    fn footprint_parameter_rules() {
        assert_eq!(
            parse("ABSORPTION(2, 0.5)").unwrap(),
            AstNode::FootprintCall {
                name: "ABSORPTION".into(),
                params: vec![2.0, 0.5]
            }
        );
        let err = parse("ABSORPTION(2)").unwrap_err();
        assert_eq!(err.message, "ABSORPTION expects exactly 2 parameters, got 1");
        let err = parse("STACKED_BUY_IMBALANCES").unwrap_err();
        assert_eq!(
            err.message,
            "STACKED_BUY_IMBALANCES expects 1 to 2 parameters, got 0"
        );
        assert_eq!(
            parse("STACKED_SELL_IMBALANCES(3)").unwrap(),
            AstNode::FootprintCall {
                name: "STACKED_SELL_IMBALANCES".into(),
                params: vec![3.0, 3.0]
            }
        );
    }

    #[test]
    fn exchange_functions() {
        assert_eq!(
            parse("EXCHANGE_DIVERGENCE").unwrap(),
            AstNode::ExchangeCall {
                name: "EXCHANGE_DIVERGENCE".into(),
                period: None
            }
        );
        assert!(parse("EXCHANGE_DIVERGENCE(3)").is_err());
        assert!(parse("EXCHANGE_SPREAD_Z").is_err());
        assert!(parse("EXCHANGE_SPREAD_Z(30) > 2").is_ok());
    }

    #[test]
    fn open_interest_change_default() {
        assert_eq!(
            parse("OI_CHANGE").unwrap(),
            AstNode::OpenInterestCall {
                name: "OI_CHANGE".into(),
                period: Some(1)
            }
        );
        assert_eq!(
            parse("OI").unwrap(),
            AstNode::OpenInterestCall {
                name: "OI".into(),
                period: None
            }
        );
    }

    #[test]
    fn spec_example_with_volume() {
        let ast = parse("RSI(14) crosses_above 70 AND VOLUME > AVG_VOLUME(20)").unwrap();
        assert!(matches!(ast, AstNode::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn trailing_tokens_rejected() {
        let err = parse("close > 5 open").unwrap_err();
        assert_eq!(err.message, "unexpected token 'open' at position 10");
    }

    #[test]
    fn unexpected_end_reports_last_position() {
        let err = parse("close >").unwrap_err();
        assert_eq!(err.position, 7);
        assert!(err.message.contains("end of input"));

        let err = parse("SMA(20").unwrap_err();
        assert_eq!(err.position, 6);
    }

    #[test]
    fn lex_errors_surface_through_parse() {
        let err = parse("close > foo").unwrap_err();
        assert_eq!(err.message, "unknown identifier 'foo'");
        assert_eq!(err.position, 8);
    }

    #[test]
    fn negative_literal_without_space_is_trailing() {
        let err = parse("close -5").unwrap_err();
        assert_eq!(err.position, 6);
        assert!(parse("close - 5").is_ok());
    }

    #[test]
    fn booleans_and_price_fields() {
        assert_eq!(parse("true").unwrap(), AstNode::BooleanLiteral(true));
        assert_eq!(parse("FALSE").unwrap(), AstNode::BooleanLiteral(false));
        assert_eq!(
            parse("CLOSE").unwrap(),
            AstNode::PriceReference(PriceField::Close)
        );
    }

    #[test]
    fn display_round_trip() {
        let sources = [
            "RSI(14) crosses_above 70 AND VOLUME > AVG_VOLUME(20)",
            "MACD(12,26,9).histogram crosses_below 0 OR close < BBANDS(20, 2).lower",
            "1 + 2 * 3 - close / open",
            "LOWEST(RSI(14), 10)[2] < 30",
            "abs(DELTA) > max(CUM_DELTA, 0) AND POC > VAL",
            "(close - open)[1] > 0",
            "SUPPORT_RAY_DISTANCE(1, 50, 0) < 2 AND DOJI == 1",
            "close > -5",
        ];
        for source in sources {
            let ast = parse(source).unwrap();
            let printed = ast.to_string();
            let reparsed = parse(&printed)
                .unwrap_or_else(|e| panic!("reparse of '{}' failed: {}", printed, e));
            assert_eq!(ast, reparsed, "round trip of '{}'", source);
        }
    }
}
