use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = "+")]
    Add,
    #[serde(alias = "-", alias = "−")]
    Subtract,
    #[serde(alias = "*", alias = "×")]
    Multiply,
    #[serde(alias = "/", alias = "÷")]
    Divide,
}

impl Operator {
    /// Division by zero yields zero.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide if right == 0.0 => 0.0,
            Operator::Divide => left / right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EquationToken {
    #[serde(alias = "metric")]
    Operand(String),
    Operator(Operator),
    /// Stands in for a stored token that could not be decoded, so the
    /// tokens around it keep their positions. Reads as zero.
    #[serde(skip)]
    Unrecognized,
}

impl EquationToken {
    pub fn operand(key: impl Into<String>) -> Self {
        EquationToken::Operand(key.into())
    }

    /// Decodes stored tokens one by one; undecodable entries become
    /// [`EquationToken::Unrecognized`].
    pub fn decode_lenient(values: Vec<serde_json::Value>) -> Vec<EquationToken> {
        values
            .into_iter()
            .map(|value| {
                serde_json::from_value(value.clone()).unwrap_or_else(|err| {
                    log::warn!("unrecognized equation token {value}: {err}");
                    EquationToken::Unrecognized
                })
            })
            .collect()
    }

    fn operand_value(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        match self {
            EquationToken::Operand(key) => Some(snapshot.lookup(key)),
            EquationToken::Unrecognized => Some(0.0),
            EquationToken::Operator(_) => None,
        }
    }
}

/// Folds the tokens strictly left to right with no operator precedence:
/// `a * b + c` is `(a * b) + c`, and `a + b * c` is `(a + b) * c`.
///
/// Malformed input never fails. An empty equation is zero. A leading
/// operator is dropped and the fold starts from zero. Pairs that are not
/// `(operator, operand)` and a dangling last token are skipped. An
/// unrecognized token in operand position reads as zero.
pub fn evaluate_equation(tokens: &[EquationToken], snapshot: &MetricsSnapshot) -> f64 {
    let Some((first, rest)) = tokens.split_first() else {
        return 0.0;
    };

    let initial = first.operand_value(snapshot).unwrap_or_else(|| {
        log::debug!("equation starts with an operator; starting from zero");
        0.0
    });

    let result = rest.chunks(2).fold(initial, |accumulator, pair| {
        let step = match pair {
            [EquationToken::Operator(operator), operand] => operand
                .operand_value(snapshot)
                .map(|value| operator.apply(accumulator, value)),
            _ => None,
        };

        match step {
            Some(next) if next.is_finite() => next,
            Some(_) => 0.0,
            None => {
                log::debug!("skipping malformed equation segment {pair:?}");
                accumulator
            }
        }
    });

    if result.is_finite() {
        result
    } else {
        0.0
    }
}
