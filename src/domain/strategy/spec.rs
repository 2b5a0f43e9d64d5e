//! Strategy spec parser.
//!
//! Grammar (case-insensitive, whitespace ignored):
//!
//! ```text
//! spec     := "hodl" | "dca" | "tsmom" "(" int "," int ")" | "tsmom_d" "(" pair ("," pair)* ")"
//! pair     := int ":" int
//! ```

use super::{BuyAndHold, Diversified, DollarCostAverage, Momentum, Strategy};
use crate::domain::error::ParseError;

/// Upper bound on any day count: one hundred years.
pub const MAX_DAYS: i64 = 36_500;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{c}'"))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_word(&mut self) -> String {
        self.skip_whitespace();
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word.to_lowercase()
    }

    /// A day count in `1..=MAX_DAYS`.
    fn parse_days(&mut self) -> Result<i64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return Err(self.error(format!("expected integer, found {}", self.found())));
        }
        let value: i64 = self.input[start..self.pos].parse().map_err(|_| ParseError {
            message: "integer out of range".to_string(),
            position: start,
        })?;
        if value < 1 {
            return Err(ParseError {
                message: "day counts must be at least 1".to_string(),
                position: start,
            });
        }
        if value > MAX_DAYS {
            return Err(ParseError {
                message: format!("day counts must be at most {MAX_DAYS}"),
                position: start,
            });
        }
        Ok(value)
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error(format!("unexpected trailing input {}", self.found()))),
        }
    }
}

/// Parse a strategy spec; `asset` is the risk asset the strategy trades.
pub fn parse_strategy(input: &str, asset: &str) -> Result<Box<dyn Strategy>, ParseError> {
    let mut parser = Parser::new(input);
    let name_pos = {
        parser.skip_whitespace();
        parser.pos
    };
    let name = parser.parse_word();

    let strategy: Box<dyn Strategy> = match name.as_str() {
        "hodl" | "buy_and_hold" => Box::new(BuyAndHold::new(asset)),
        "dca" => Box::new(DollarCostAverage::new(asset)),
        "tsmom" => {
            parser.expect_char('(')?;
            let lookback = parser.parse_days()?;
            parser.expect_char(',')?;
            let rebalance = parser.parse_days()?;
            parser.expect_char(')')?;
            Box::new(Momentum::new(asset, lookback, rebalance))
        }
        "tsmom_d" => {
            parser.expect_char('(')?;
            let mut params = Vec::new();
            loop {
                let lookback = parser.parse_days()?;
                parser.expect_char(':')?;
                let rebalance = parser.parse_days()?;
                params.push((lookback, rebalance));
                if !parser.consume_char(',') {
                    break;
                }
            }
            parser.expect_char(')')?;
            Box::new(Diversified::momentum(asset, &params))
        }
        "" => {
            return Err(ParseError {
                message: "expected strategy name".to_string(),
                position: name_pos,
            });
        }
        other => {
            return Err(ParseError {
                message: format!("unknown strategy '{other}'"),
                position: name_pos,
            });
        }
    };

    parser.expect_end()?;
    Ok(strategy)
}
