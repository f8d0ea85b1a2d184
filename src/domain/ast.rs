//! Expression AST.
//!
//! A closed node set built once by the parser and never mutated afterwards.
//! The `Display` impl prints canonical DSL text: every binary node is
//! parenthesized and defaulted parameters are spelled out, so printing and
//! re-parsing yields an equal tree.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunction {
    Abs,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Lowest,
    Highest,
    Percentile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCall {
    pub name: String,
    pub params: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Comparison {
        left: Box<AstNode>,
        op: CompareOp,
        right: Box<AstNode>,
    },
    CrossComparison {
        left: Box<AstNode>,
        direction: CrossDirection,
        right: Box<AstNode>,
    },
    Logical {
        op: LogicalOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    IndicatorCall(IndicatorCall),
    PropertyAccess {
        call: IndicatorCall,
        property: String,
    },
    PriceReference(PriceField),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    LookbackAccess {
        inner: Box<AstNode>,
        bars_ago: usize,
    },
    MathCall {
        function: MathFunction,
        args: Vec<AstNode>,
    },
    AggregateCall {
        function: AggregateFunction,
        inner: Box<AstNode>,
        period: usize,
    },
    RangeCall {
        name: String,
        period: usize,
        skip: usize,
    },
    VolumeCall {
        name: String,
        period: usize,
    },
    TimeCall(String),
    MoonCall(String),
    HolidayCall(String),
    FomcCall(String),
    OrderFlowCall {
        name: String,
        param: Option<f64>,
    },
    FundingCall {
        name: String,
        period: Option<usize>,
    },
    PremiumCall {
        name: String,
        period: Option<usize>,
    },
    SessionOrderFlowCall(String),
    OhlcvVolumeCall(String),
    OpenInterestCall {
        name: String,
        period: Option<usize>,
    },
    RayCall {
        name: String,
        ray: Option<usize>,
        lookback: usize,
        skip: usize,
    },
    CandlePatternCall {
        name: String,
        ratio: f64,
    },
    CandlePropertyCall(String),
    FootprintCall {
        name: String,
        params: Vec<f64>,
    },
    ExchangeCall {
        name: String,
        period: Option<usize>,
    },
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Greater => ">",
            CompareOp::Less => "<",
            CompareOp::GreaterEqual => ">=",
            CompareOp::LessEqual => "<=",
            CompareOp::Equal => "==",
        })
    }
}

impl fmt::Display for CrossDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CrossDirection::Above => "crosses_above",
            CrossDirection::Below => "crosses_below",
        })
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        })
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        })
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
        })
    }
}

impl fmt::Display for MathFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MathFunction::Abs => "abs",
            MathFunction::Min => "min",
            MathFunction::Max => "max",
        })
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateFunction::Lowest => "LOWEST",
            AggregateFunction::Highest => "HIGHEST",
            AggregateFunction::Percentile => "PERCENTILE",
        })
    }
}

impl fmt::Display for IndicatorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        write_list(f, &self.params)?;
        f.write_str(")")
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Comparison { left, op, right } => write!(f, "({} {} {})", left, op, right),
            AstNode::CrossComparison {
                left,
                direction,
                right,
            } => write!(f, "({} {} {})", left, direction, right),
            AstNode::Logical { op, left, right } => write!(f, "({} {} {})", left, op, right),
            AstNode::Arithmetic { op, left, right } => write!(f, "({} {} {})", left, op, right),
            AstNode::IndicatorCall(call) => write!(f, "{}", call),
            AstNode::PropertyAccess { call, property } => write!(f, "{}.{}", call, property),
            AstNode::PriceReference(field) => write!(f, "{}", field),
            AstNode::NumberLiteral(value) => write!(f, "{}", value),
            AstNode::BooleanLiteral(value) => write!(f, "{}", value),
            AstNode::LookbackAccess { inner, bars_ago } => match inner.as_ref() {
                AstNode::NumberLiteral(_)
                | AstNode::BooleanLiteral(_)
                | AstNode::LookbackAccess { .. } => write!(f, "({})[{}]", inner, bars_ago),
                _ => write!(f, "{}[{}]", inner, bars_ago),
            },
            AstNode::MathCall { function, args } => {
                write!(f, "{}(", function)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            AstNode::AggregateCall {
                function,
                inner,
                period,
            } => write!(f, "{}({}, {})", function, inner, period),
            AstNode::RangeCall { name, period, skip } => {
                if name == "RANGE_POSITION" {
                    write!(f, "{}({}, {})", name, period, skip)
                } else {
                    write!(f, "{}({})", name, period)
                }
            }
            AstNode::VolumeCall { name, period } => write!(f, "{}({})", name, period),
            AstNode::TimeCall(name)
            | AstNode::MoonCall(name)
            | AstNode::HolidayCall(name)
            | AstNode::FomcCall(name)
            | AstNode::SessionOrderFlowCall(name)
            | AstNode::OhlcvVolumeCall(name)
            | AstNode::CandlePropertyCall(name) => f.write_str(name),
            AstNode::OrderFlowCall { name, param } => match param {
                Some(p) => write!(f, "{}({})", name, p),
                None => f.write_str(name),
            },
            AstNode::FundingCall { name, period }
            | AstNode::PremiumCall { name, period }
            | AstNode::OpenInterestCall { name, period }
            | AstNode::ExchangeCall { name, period } => match period {
                Some(p) => write!(f, "{}({})", name, p),
                None => f.write_str(name),
            },
            AstNode::RayCall {
                name,
                ray,
                lookback,
                skip,
            } => match ray {
                Some(n) => write!(f, "{}({}, {}, {})", name, n, lookback, skip),
                None => write!(f, "{}({}, {})", name, lookback, skip),
            },
            AstNode::CandlePatternCall { name, ratio } => write!(f, "{}({})", name, ratio),
            AstNode::FootprintCall { name, params } => {
                write!(f, "{}(", name)?;
                write_list(f, params)?;
                f.write_str(")")
            }
        }
    }
}
