//! Achievements and the predicate language used to unlock them.
//!
//! An achievement's condition is a small boolean expression over a fixed
//! set of derived statistics, e.g. `capital >= 50000 and turn < 20`.
//! Conditions are parsed once, when the catalog is built, into a
//! [`Predicate`] tree; evaluation never touches anything but the
//! [`DerivedStats`] snapshot it is given.
//!
//! # Grammar
//!
//! ```text
//! expr       := or
//! or         := and (("or" | "||") and)*
//! and        := unary (("and" | "&&") unary)*
//! unary      := ("not" | "!") unary | primary
//! primary    := "(" expr ")" | comparison
//! comparison := stat op number | number op stat
//! op         := "<" | "<=" | ">" | ">=" | "==" | "!="
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Statistics an achievement condition may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Current turn number.
    Turn,
    /// Current capital.
    Capital,
    /// Number of buildings owned.
    BuildingsCount,
    /// Accumulated research points.
    ResearchPoints,
    /// Highest level among owned buildings (0 with no buildings).
    MaxBuildingLevel,
    /// Number of distinct building models owned.
    DistinctBuildingTypes,
}

impl Stat {
    /// All statistics, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Turn,
        Self::Capital,
        Self::BuildingsCount,
        Self::ResearchPoints,
        Self::MaxBuildingLevel,
        Self::DistinctBuildingTypes,
    ];

    /// Name used in condition text.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Turn => "turn",
            Self::Capital => "capital",
            Self::BuildingsCount => "buildings_count",
            Self::ResearchPoints => "research_points",
            Self::MaxBuildingLevel => "max_building_level",
            Self::DistinctBuildingTypes => "distinct_building_types",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stat| stat.name() == name)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl CmpOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Operator with its operands swapped (`a < b` ⇔ `b > a`).
    const fn flipped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
        }
    }

    #[allow(clippy::float_cmp)]
    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

/// Errors from parsing or evaluating a predicate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    /// Condition text could not be parsed.
    #[error("Invalid condition at offset {offset}: {message}")]
    Parse {
        /// Byte offset of the offending token.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// A comparison operand was NaN or infinite.
    #[error("Non-finite operand comparing {stat}")]
    NonFinite {
        /// The statistic being compared.
        stat: Stat,
    },
}

/// Boolean condition over [`DerivedStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Predicate {
    /// `stat op value`
    Compare {
        /// Left-hand statistic.
        stat: Stat,
        /// Operator.
        op: CmpOp,
        /// Right-hand literal.
        value: f64,
    },
    /// All sub-predicates hold.
    All(Vec<Predicate>),
    /// At least one sub-predicate holds.
    Any(Vec<Predicate>),
    /// Sub-predicate does not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Shorthand for a single comparison.
    #[must_use]
    pub const fn compare(stat: Stat, op: CmpOp, value: f64) -> Self {
        Self::Compare { stat, op, value }
    }

    /// Evaluate against a statistics snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::NonFinite`] if a compared value is NaN or
    /// infinite.
    pub fn evaluate(&self, stats: &DerivedStats) -> Result<bool, PredicateError> {
        match self {
            Self::Compare { stat, op, value } => {
                let lhs = stats.get(*stat);
                if !lhs.is_finite() || !value.is_finite() {
                    return Err(PredicateError::NonFinite { stat: *stat });
                }
                Ok(op.apply(lhs, *value))
            }
            Self::All(parts) => {
                for part in parts {
                    if !part.evaluate(stats)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(parts) => {
                for part in parts {
                    if part.evaluate(stats)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.evaluate(stats)?),
        }
    }

    const fn is_compound(&self) -> bool {
        matches!(self, Self::All(_) | Self::Any(_))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { stat, op, value } => write!(f, "{stat} {} {value}", op.symbol()),
            Self::All(parts) | Self::Any(parts) => {
                let joiner = if matches!(self, Self::All(_)) {
                    " and "
                } else {
                    " or "
                };
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    if part.is_compound() {
                        write!(f, "({part})")?;
                    } else {
                        write!(f, "{part}")?;
                    }
                }
                Ok(())
            }
            Self::Not(inner) => {
                if inner.is_compound() {
                    write!(f, "not ({inner})")
                } else {
                    write!(f, "not {inner}")
                }
            }
        }
    }
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end: s.len(),
        };
        let predicate = parser.parse_or()?;
        if let Some((offset, token)) = parser.peek() {
            return Err(PredicateError::Parse {
                offset,
                message: format!("unexpected {token}"),
            });
        }
        Ok(predicate)
    }
}

impl TryFrom<String> for Predicate {
    type Error = PredicateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Predicate> for String {
    fn from(value: Predicate) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Op(CmpOp),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "'{name}'"),
            Self::Number(n) => write!(f, "number {n}"),
            Self::Op(op) => write!(f, "'{}'", op.symbol()),
            Self::And => f.write_str("'and'"),
            Self::Or => f.write_str("'or'"),
            Self::Not => f.write_str("'not'"),
            Self::Open => f.write_str("'('"),
            Self::Close => f.write_str("')'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, PredicateError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'(' => {
                tokens.push((start, Token::Open));
                i += 1;
            }
            b')' => {
                tokens.push((start, Token::Close));
                i += 1;
            }
            b'<' | b'>' | b'=' | b'!' => {
                let next_is_eq = bytes.get(i + 1) == Some(&b'=');
                let token = match (c, next_is_eq) {
                    (b'<', true) => Token::Op(CmpOp::Le),
                    (b'<', false) => Token::Op(CmpOp::Lt),
                    (b'>', true) => Token::Op(CmpOp::Ge),
                    (b'>', false) => Token::Op(CmpOp::Gt),
                    (b'=', true) => Token::Op(CmpOp::Eq),
                    (b'!', true) => Token::Op(CmpOp::Ne),
                    (b'!', false) => Token::Not,
                    _ => {
                        return Err(PredicateError::Parse {
                            offset: start,
                            message: "expected '=='".to_string(),
                        })
                    }
                };
                i += if next_is_eq { 2 } else { 1 };
                tokens.push((start, token));
            }
            b'&' | b'|' => {
                if bytes.get(i + 1) != Some(&c) {
                    return Err(PredicateError::Parse {
                        offset: start,
                        message: format!("expected '{0}{0}'", c as char),
                    });
                }
                tokens.push((start, if c == b'&' { Token::And } else { Token::Or }));
                i += 2;
            }
            b'0'..=b'9' | b'.' | b'-' => {
                i += 1;
                while let Some(&b) = bytes.get(i) {
                    match b {
                        b'0'..=b'9' | b'.' | b'_' => i += 1,
                        b'e' | b'E' => {
                            i += 1;
                            if matches!(bytes.get(i), Some(b'+' | b'-')) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
                let literal = &input[start..i];
                let text: String = literal.chars().filter(|&ch| ch != '_').collect();
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| PredicateError::Parse {
                        offset: start,
                        message: format!("invalid number '{literal}'"),
                    })?;
                tokens.push((start, Token::Number(value)));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &input[start..i];
                let token = match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((start, token));
            }
            _ => {
                let ch = input[start..].chars().next().unwrap_or('?');
                return Err(PredicateError::Parse {
                    offset: start,
                    message: format!("unexpected character '{ch}'"),
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(usize, Token)],
    pos: usize,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<(usize, &Token)> {
        self.tokens.get(self.pos).map(|(offset, token)| (*offset, token))
    }

    fn next(&mut self) -> Result<(usize, Token), PredicateError> {
        let item = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| PredicateError::Parse {
                offset: self.end,
                message: "unexpected end of condition".to_string(),
            })?;
        self.pos += 1;
        Ok(item)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if matches!(self.peek(), Some((_, token)) if token == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, PredicateError> {
        let mut parts = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::Any(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Predicate, PredicateError> {
        let mut parts = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::All(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<Predicate, PredicateError> {
        if self.eat(&Token::Not) {
            return Ok(Predicate::Not(Box::new(self.parse_unary()?)));
        }
        if self.eat(&Token::Open) {
            let inner = self.parse_or()?;
            let (offset, token) = self.next()?;
            if token != Token::Close {
                return Err(PredicateError::Parse {
                    offset,
                    message: format!("expected ')', found {token}"),
                });
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Predicate, PredicateError> {
        let (lhs_offset, lhs) = self.next()?;
        let (op_offset, op) = self.next()?;
        let Token::Op(op) = op else {
            return Err(PredicateError::Parse {
                offset: op_offset,
                message: format!("expected comparison operator, found {op}"),
            });
        };
        let (rhs_offset, rhs) = self.next()?;

        match (lhs, rhs) {
            (Token::Ident(name), Token::Number(value)) => {
                let stat = Stat::from_name(&name).ok_or_else(|| unknown_stat(lhs_offset, &name))?;
                Ok(Predicate::compare(stat, op, value))
            }
            (Token::Number(value), Token::Ident(name)) => {
                let stat = Stat::from_name(&name).ok_or_else(|| unknown_stat(rhs_offset, &name))?;
                Ok(Predicate::compare(stat, op.flipped(), value))
            }
            (lhs, rhs) => Err(PredicateError::Parse {
                offset: lhs_offset,
                message: format!("comparison needs a statistic and a number, found {lhs} and {rhs}"),
            }),
        }
    }
}

fn unknown_stat(offset: usize, name: &str) -> PredicateError {
    PredicateError::Parse {
        offset,
        message: format!("unknown statistic '{name}'"),
    }
}

/// Snapshot of the statistics achievement conditions are evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Current turn number.
    pub turn: u64,
    /// Current capital.
    pub capital: f64,
    /// Number of buildings owned.
    pub buildings_count: u64,
    /// Accumulated research points.
    pub research_points: u64,
    /// Highest building level owned (0 with no buildings).
    pub max_building_level: u32,
    /// Number of distinct building models owned.
    pub distinct_building_types: u64,
}

impl DerivedStats {
    /// Value of a statistic as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Turn => self.turn as f64,
            Stat::Capital => self.capital,
            Stat::BuildingsCount => self.buildings_count as f64,
            Stat::ResearchPoints => self.research_points as f64,
            Stat::MaxBuildingLevel => f64::from(self.max_building_level),
            Stat::DistinctBuildingTypes => self.distinct_building_types as f64,
        }
    }
}

/// Catalog definition of an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDef {
    /// Unique identifier, also the save-file key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display text describing the goal.
    #[serde(default)]
    pub description: String,
    /// Unlock condition.
    pub condition: Predicate,
}

/// Unlock state of one achievement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AchievementStatus {
    /// Achievement identifier.
    pub id: String,
    /// Whether it has been unlocked.
    pub unlocked: bool,
    /// Turn it was unlocked on (0 while locked).
    pub unlocked_turn: u64,
}

impl AchievementStatus {
    /// A locked status for the given achievement.
    #[must_use]
    pub fn locked(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unlocked: false,
            unlocked_turn: 0,
        }
    }
}

/// An achievement unlocked during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    /// Achievement identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display text.
    pub description: String,
    /// Turn of unlock.
    pub turn: u64,
}

/// Evaluate every locked achievement and unlock those whose condition holds.
///
/// `statuses` is matched to `defs` by id; definitions without a status
/// entry are skipped. Unlocked achievements are never re-evaluated. A
/// condition that fails to evaluate counts as not satisfied.
pub fn evaluate_achievements(
    defs: &[AchievementDef],
    statuses: &mut [AchievementStatus],
    stats: &DerivedStats,
    turn: u64,
) -> Vec<UnlockedAchievement> {
    let mut unlocked = Vec::new();

    for status in statuses.iter_mut().filter(|s| !s.unlocked) {
        let Some(def) = defs.iter().find(|d| d.id == status.id) else {
            continue;
        };

        match def.condition.evaluate(stats) {
            Ok(true) => {
                status.unlocked = true;
                status.unlocked_turn = turn;
                unlocked.push(UnlockedAchievement {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    description: def.description.clone(),
                    turn,
                });
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(achievement = %def.id, error = %e, "Achievement condition failed");
            }
        }
    }

    unlocked
}
