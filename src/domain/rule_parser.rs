//! Rule DSL parser.
//!
//! Recursive descent parser for the factor rule grammar. Converts text to an
//! AST with error messages carrying the character offset and the
//! expected/found tokens.
//!
//! ```text
//! rule     := comparison | BETWEEN(operand, num, num)
//!           | AND(rule, rule, ...) | OR(rule, rule, ...) | NOT(rule)
//!           | CONSECUTIVE(rule, n) | ANY_OF(rule, n)
//! operand  := open | high | low | close | volume | number | indicator
//! ```

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{IndicatorField, IndicatorRef, Operand, Rule};

/// Indicators taking a single period argument.
const SINGLE_PERIOD: &[(&str, fn(usize) -> IndicatorType)] = &[
    ("SMA", IndicatorType::Sma),
    ("EMA", IndicatorType::Ema),
    ("WMA", IndicatorType::Wma),
    ("HMA", IndicatorType::Hma),
    ("DEMA", IndicatorType::Dema),
    ("TEMA", IndicatorType::Tema),
    ("RSI", IndicatorType::Rsi),
    ("ROC", IndicatorType::Roc),
    ("ATR", IndicatorType::Atr),
    ("STDDEV", IndicatorType::Stddev),
    ("CCI", IndicatorType::Cci),
    ("MFI", IndicatorType::Mfi),
    ("WILLIAMS_R", IndicatorType::WilliamsR),
    ("VWAP", IndicatorType::Vwap),
];

const MACD_FIELDS: &[(&str, IndicatorField)] = &[
    ("MACD_LINE", IndicatorField::MacdLine),
    ("MACD_SIGNAL", IndicatorField::MacdSignal),
    ("MACD_HISTOGRAM", IndicatorField::MacdHistogram),
];

const KDJ_FIELDS: &[(&str, IndicatorField)] = &[
    ("KDJ_K", IndicatorField::KdjK),
    ("KDJ_D", IndicatorField::KdjD),
    ("KDJ_J", IndicatorField::KdjJ),
];

const BOLLINGER_FIELDS: &[(&str, IndicatorField)] = &[
    ("BOLLINGER_UPPER", IndicatorField::BollingerUpper),
    ("BOLLINGER_MIDDLE", IndicatorField::BollingerMiddle),
    ("BOLLINGER_LOWER", IndicatorField::BollingerLower),
];

const COMPARISONS: &[(&str, fn(Operand, Operand) -> Rule)] = &[
    ("CROSS_ABOVE", |left, right| Rule::CrossAbove { left, right }),
    ("CROSS_BELOW", |left, right| Rule::CrossBelow { left, right }),
    ("ABOVE", |left, right| Rule::Above { left, right }),
    ("BELOW", |left, right| Rule::Below { left, right }),
    ("EQUALS", |left, right| Rule::Equals { left, right }),
];

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

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && (remaining.len() == keyword.len()
                || !remaining[keyword.len()..]
                    .chars()
                    .next()
                    .map(|c| c.is_alphanumeric() || c == '_')
                    .unwrap_or(false))
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            let found = self.peek_word();
            Err(ParseError {
                message: format!("expected '{}', found '{}'", keyword, found),
                position: self.pos,
            })
        }
    }

    fn peek_word(&self) -> String {
        let mut word = String::new();
        for ch in self.remaining().chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
            } else {
                break;
            }
        }
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_price_field(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();
        let operand = match word.as_str() {
            "open" => Operand::Open,
            "high" => Operand::High,
            "low" => Operand::Low,
            "close" => Operand::Close,
            "volume" => Operand::Volume,
            _ => {
                return Err(ParseError {
                    message: format!(
                        "expected price field (open, high, low, close, volume), found '{}'",
                        word
                    ),
                    position: self.pos,
                });
            }
        };
        self.pos += word.len();
        Ok(operand)
    }

    fn parse_period(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let period = self.parse_integer()?;
        if period == 0 {
            return Err(ParseError {
                message: "period must be positive".to_string(),
                position: start,
            });
        }
        Ok(period)
    }

    /// Parses `(a, b, c)` positive integer arguments.
    fn parse_triple(&mut self) -> Result<(usize, usize, usize), ParseError> {
        self.expect_char('(')?;
        let a = self.parse_period()?;
        self.expect_char(',')?;
        let b = self.parse_period()?;
        self.expect_char(',')?;
        let c = self.parse_period()?;
        self.expect_char(')')?;
        Ok((a, b, c))
    }

    fn parse_indicator(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();
        let start = self.pos;

        let field_of = |table: &[(&str, IndicatorField)]| {
            table
                .iter()
                .find(|(name, _)| *name == word)
                .map(|(_, field)| *field)
        };

        if let Some((_, ctor)) = SINGLE_PERIOD.iter().find(|(name, _)| *name == word) {
            self.pos += word.len();
            self.expect_char('(')?;
            let period = self.parse_period()?;
            self.expect_char(')')?;
            return Ok(indicator(ctor(period), IndicatorField::Value));
        }

        if word == "OBV" {
            self.pos += word.len();
            return Ok(indicator(IndicatorType::Obv, IndicatorField::Value));
        }

        if let Some(field) = field_of(MACD_FIELDS) {
            self.pos += word.len();
            let (fast, slow, signal) = self.parse_triple()?;
            if fast >= slow {
                return Err(ParseError {
                    message: format!("MACD fast period {} must be below slow {}", fast, slow),
                    position: start,
                });
            }
            return Ok(indicator(IndicatorType::Macd { fast, slow, signal }, field));
        }

        if let Some(field) = field_of(KDJ_FIELDS) {
            self.pos += word.len();
            let (period, m1, m2) = self.parse_triple()?;
            return Ok(indicator(IndicatorType::Kdj { period, m1, m2 }, field));
        }

        if let Some(field) = field_of(BOLLINGER_FIELDS) {
            self.pos += word.len();
            self.expect_char('(')?;
            let period = self.parse_period()?;
            self.expect_char(',')?;
            let mult_pos = self.pos;
            let mult = self.parse_number()?;
            if mult <= 0.0 {
                return Err(ParseError {
                    message: format!("band multiplier must be positive, found {}", mult),
                    position: mult_pos,
                });
            }
            self.expect_char(')')?;
            let indicator_type = IndicatorType::Bollinger {
                period,
                stddev_mult_x100: (mult * 100.0).round() as u32,
            };
            return Ok(indicator(indicator_type, field));
        }

        Err(ParseError {
            message: format!("expected indicator, found '{}'", word),
            position: start,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            let num = self.parse_number()?;
            return Ok(Operand::Constant(num));
        }

        let word = self.peek_word();
        match word.as_str() {
            "open" | "high" | "low" | "close" | "volume" => self.parse_price_field(),
            _ => self.parse_indicator(),
        }
    }

    fn parse_comparison(
        &mut self,
        keyword: &str,
        build: fn(Operand, Operand) -> Rule,
    ) -> Result<Rule, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(build(left, right))
    }

    fn parse_between(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("BETWEEN")?;
        self.expect_char('(')?;

        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let lower = self.parse_number()?;
        self.expect_char(',')?;
        let upper = self.parse_number()?;
        self.expect_char(')')?;

        Ok(Rule::Between {
            operand,
            lower,
            upper,
        })
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        for (keyword, build) in COMPARISONS {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword, *build);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }
        if self.peek_keyword("AND") {
            let rules = self.parse_variadic("AND")?;
            return Ok(Rule::And(rules));
        }
        if self.peek_keyword("OR") {
            let rules = self.parse_variadic("OR")?;
            return Ok(Rule::Or(rules));
        }
        if self.peek_keyword("NOT") {
            self.expect_keyword("NOT")?;
            self.expect_char('(')?;
            let rule = self.parse_rule()?;
            self.expect_char(')')?;
            return Ok(Rule::Not(Box::new(rule)));
        }
        if self.peek_keyword("CONSECUTIVE") {
            let (rule, count) = self.parse_counted("CONSECUTIVE")?;
            return Ok(Rule::Consecutive { rule, count });
        }
        if self.peek_keyword("ANY_OF") {
            let (rule, count) = self.parse_counted("ANY_OF")?;
            return Ok(Rule::AnyOf { rule, count });
        }

        let word = self.peek_word();
        Err(ParseError {
            message: format!("expected rule, found '{}'", word),
            position: self.pos,
        })
    }

    fn parse_variadic(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }

        if rules.len() < 2 {
            return Err(ParseError {
                message: format!("{} requires at least 2 rules", keyword),
                position: self.pos,
            });
        }
        Ok(rules)
    }

    fn parse_counted(&mut self, keyword: &str) -> Result<(Box<Rule>, usize), ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(',')?;
        self.skip_whitespace();
        let count_pos = self.pos;
        let count = self.parse_integer()?;
        if count == 0 {
            return Err(ParseError {
                message: format!("{} count must be positive", keyword),
                position: count_pos,
            });
        }
        self.expect_char(')')?;
        Ok((Box::new(rule), count))
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError {
                message: format!("unexpected input after rule: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(rule)
    }
}

fn indicator(indicator_type: IndicatorType, field: IndicatorField) -> Operand {
    Operand::Indicator(IndicatorRef {
        indicator_type,
        field,
    })
}

/// Parse a rule expression.
pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_above() {
        let rule = parse("ABOVE(close, 100)").unwrap();
        assert!(matches!(
            rule,
            Rule::Above {
                left: Operand::Close,
                right: Operand::Constant(100.0)
            }
        ));
    }

    #[test]
    fn parse_below_with_indicator() {
        let rule = parse("BELOW(SMA(20), SMA(50))").unwrap();
        match rule {
            Rule::Below { left, right } => {
                assert_eq!(left, indicator(IndicatorType::Sma(20), IndicatorField::Value));
                assert_eq!(right, indicator(IndicatorType::Sma(50), IndicatorField::Value));
            }
            _ => panic!("expected Below rule"),
        }
    }

    #[test]
    fn parse_crosses() {
        assert!(matches!(
            parse("CROSS_ABOVE(SMA(20), SMA(50))").unwrap(),
            Rule::CrossAbove { .. }
        ));
        assert!(matches!(
            parse("CROSS_BELOW(close, EMA(200))").unwrap(),
            Rule::CrossBelow { .. }
        ));
    }

    #[test]
    fn parse_ema_family_not_confused() {
        let rule = parse("ABOVE(DEMA(10), TEMA(10))").unwrap();
        assert_eq!(
            rule,
            Rule::Above {
                left: indicator(IndicatorType::Dema(10), IndicatorField::Value),
                right: indicator(IndicatorType::Tema(10), IndicatorField::Value),
            }
        );
    }

    #[test]
    fn parse_between() {
        let rule = parse("BETWEEN(close, 50, 150)").unwrap();
        match rule {
            Rule::Between {
                operand,
                lower,
                upper,
            } => {
                assert!(matches!(operand, Operand::Close));
                assert!((lower - 50.0).abs() < f64::EPSILON);
                assert!((upper - 150.0).abs() < f64::EPSILON);
            }
            _ => panic!("expected Between rule"),
        }
    }

    #[test]
    fn parse_composites() {
        match parse("AND(ABOVE(close, 100), BELOW(close, 150), ABOVE(volume, 0))").unwrap() {
            Rule::And(rules) => assert_eq!(rules.len(), 3),
            _ => panic!("expected And rule"),
        }
        match parse("OR(ABOVE(close, 100), BELOW(close, 50))").unwrap() {
            Rule::Or(rules) => assert_eq!(rules.len(), 2),
            _ => panic!("expected Or rule"),
        }
        assert!(matches!(
            parse("NOT(ABOVE(close, 100))").unwrap(),
            Rule::Not(_)
        ));
    }

    #[test]
    fn parse_temporal() {
        match parse("CONSECUTIVE(ABOVE(close, 100), 3)").unwrap() {
            Rule::Consecutive { count, .. } => assert_eq!(count, 3),
            _ => panic!("expected Consecutive rule"),
        }
        match parse("ANY_OF(ABOVE(close, 100), 5)").unwrap() {
            Rule::AnyOf { count, .. } => assert_eq!(count, 5),
            _ => panic!("expected AnyOf rule"),
        }
    }

    #[test]
    fn parse_deeply_nested() {
        let rule = parse(
            "NOT(AND(OR(ABOVE(close, 100), BELOW(close, 50)), CONSECUTIVE(ABOVE(volume, 1000), 3)))",
        )
        .unwrap();
        assert!(matches!(rule, Rule::Not(_)));
    }

    #[test]
    fn parse_whitespace_handling() {
        let rule = parse("  ABOVE  (  close  ,  100  )  ").unwrap();
        assert!(matches!(rule, Rule::Above { .. }));
    }

    #[test]
    fn parse_price_fields() {
        for (input, expected) in [
            ("ABOVE(open, 100)", Operand::Open),
            ("ABOVE(high, 100)", Operand::High),
            ("ABOVE(low, 100)", Operand::Low),
            ("ABOVE(close, 100)", Operand::Close),
            ("ABOVE(volume, 100)", Operand::Volume),
        ] {
            match parse(input).unwrap() {
                Rule::Above { left, .. } => assert_eq!(left, expected),
                _ => panic!("expected Above rule"),
            }
        }
    }

    #[test]
    fn parse_all_indicators() {
        for input in [
            "ABOVE(SMA(20), 100)",
            "ABOVE(EMA(20), 100)",
            "ABOVE(WMA(20), 100)",
            "ABOVE(HMA(16), 100)",
            "ABOVE(DEMA(10), 100)",
            "ABOVE(TEMA(10), 100)",
            "ABOVE(RSI(14), 50)",
            "ABOVE(ROC(10), 0)",
            "ABOVE(ATR(14), 1)",
            "ABOVE(STDDEV(20), 2)",
            "ABOVE(CCI(20), 100)",
            "ABOVE(MFI(14), 80)",
            "ABOVE(WILLIAMS_R(14), -20)",
            "ABOVE(VWAP(20), 100)",
            "ABOVE(OBV, 0)",
            "ABOVE(MACD_LINE(12,26,9), 0)",
            "ABOVE(MACD_SIGNAL(12,26,9), 0)",
            "ABOVE(MACD_HISTOGRAM(12,26,9), 0)",
            "ABOVE(KDJ_K(9,3,3), 50)",
            "ABOVE(KDJ_D(9,3,3), 50)",
            "ABOVE(KDJ_J(9,3,3), 50)",
            "ABOVE(BOLLINGER_UPPER(20,2), 100)",
            "ABOVE(BOLLINGER_MIDDLE(20,2), 100)",
            "ABOVE(BOLLINGER_LOWER(20,2), 100)",
        ] {
            assert!(parse(input).is_ok(), "{input}");
        }
    }

    #[test]
    fn parse_kdj_field() {
        match parse("CROSS_ABOVE(KDJ_K(9,3,3), KDJ_D(9,3,3))").unwrap() {
            Rule::CrossAbove {
                left: Operand::Indicator(left),
                right: Operand::Indicator(right),
            } => {
                assert_eq!(left.field, IndicatorField::KdjK);
                assert_eq!(right.field, IndicatorField::KdjD);
                assert_eq!(
                    left.indicator_type,
                    IndicatorType::Kdj {
                        period: 9,
                        m1: 3,
                        m2: 3
                    }
                );
            }
            _ => panic!("expected CrossAbove rule"),
        }
    }

    #[test]
    fn parse_negative_numbers() {
        match parse("ABOVE(close, -100.5)").unwrap() {
            Rule::Above {
                right: Operand::Constant(v),
                ..
            } => assert!((v - (-100.5)).abs() < f64::EPSILON),
            _ => panic!("expected Above rule"),
        }
    }

    #[test]
    fn parse_bollinger_with_float_multiplier() {
        match parse("ABOVE(BOLLINGER_UPPER(20, 2.5), 100)").unwrap() {
            Rule::Above {
                left: Operand::Indicator(ind_ref),
                ..
            } => assert_eq!(
                ind_ref.indicator_type,
                IndicatorType::Bollinger {
                    period: 20,
                    stddev_mult_x100: 250
                }
            ),
            _ => panic!("expected Above rule"),
        }
    }

    #[test]
    fn display_output_parses_back() {
        let text = "AND(CROSS_ABOVE(MACD_LINE(12,26,9), MACD_SIGNAL(12,26,9)), BELOW(KDJ_J(9,3,3), 20))";
        let rule = parse(text).unwrap();
        assert_eq!(parse(&rule.to_string()).unwrap(), rule);
    }

    #[test]
    fn errors_name_what_was_expected() {
        for (input, fragment, position) in [
            ("ABOVE(close, )", "expected", Some(13)),
            ("ABOVE(close, 100", "expected ')'", None),
            ("ABOVE(close 100)", "expected ','", None),
            ("INVALID(close, 100)", "expected rule", None),
            ("above(close, 100)", "expected rule", None),
            ("", "expected rule", Some(0)),
            ("ABOVE(PIVOT, 100)", "expected indicator", Some(6)),
            ("ABOVE(SMA(0), 100)", "period must be positive", Some(10)),
            ("ABOVE(MACD_LINE(26,12,9), 0)", "must be below slow", None),
            ("CONSECUTIVE(ABOVE(close, 100), 0)", "count must be positive", None),
            ("ABOVE(close, 100) garbage", "unexpected input", None),
            ("AND(ABOVE(close, 100))", "AND requires at least 2 rules", None),
            ("OR(ABOVE(close, 100))", "OR requires at least 2 rules", None),
        ] {
            let err = parse(input).unwrap_err();
            assert!(err.message.contains(fragment), "{input}: {}", err.message);
            if let Some(position) = position {
                assert_eq!(err.position, position, "{input}");
            }
        }
        assert!(parse("   ").is_err());
    }

    #[test]
    fn error_display_with_context() {
        let input = "CROSS_ABOVE(SMA(20), , SMA(50))";
        let err = parse(input).unwrap_err();
        let ctx = err.display_with_context(input);
        assert!(ctx.contains('^'));
        assert!(ctx.contains("position"));
    }
}
