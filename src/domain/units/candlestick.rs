//! Candlestick pattern detector.
//!
//! One unit answers for fourteen `cdl_*` capabilities. Every bar in the
//! context's lookback window is checked against every pattern; a match
//! becomes a Candlestick-family occurrence dated at the pattern's last bar.
//!
//! Reversal patterns carry the trend they expect to reverse. Strength is the
//! pattern's base, plus or minus the trend bonus depending on whether the
//! prevailing trend before the first bar is that setup. Hammer, hanging man
//! and shooting star share shapes, so they are only reported when the setup
//! trend is present.

use super::{
    LOCAL_TREND_LOOKBACK, clamp_strength, meta, prevailing_trend, setup_adjustment,
    unit_identity,
};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::output::{
    Context, Direction, Occurrence, PatternFamily, TrendDirection, UnitOutput,
};
use crate::domain::params::Params;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

#[derive(Debug, Clone, Copy)]
struct Candle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl Candle {
    fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    fn range(&self) -> f64 {
        self.high - self.low
    }

    fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    fn body_mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    fn upper_shadow(&self) -> f64 {
        self.high - self.body_top()
    }

    fn lower_shadow(&self) -> f64 {
        self.body_bottom() - self.low
    }

    fn bullish(&self) -> bool {
        self.close > self.open
    }

    fn bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body covers at least half the range.
    fn long(&self) -> bool {
        self.body() >= 0.5 * self.range()
    }
}

/// Shape thresholds taken from the unit parameters.
struct Shape {
    doji_ratio: f64,
    shadow_ratio: f64,
}

impl Shape {
    fn doji(&self, c: &Candle) -> bool {
        c.range() > 0.0 && c.body() <= self.doji_ratio * c.range()
    }

    /// Small body at the top of a long lower shadow.
    fn hammer(&self, c: &Candle) -> bool {
        c.body() > self.doji_ratio * c.range()
            && c.lower_shadow() >= self.shadow_ratio * c.body()
            && c.upper_shadow() <= c.body()
    }

    /// Small body at the bottom of a long upper shadow.
    fn inverted(&self, c: &Candle) -> bool {
        c.body() > self.doji_ratio * c.range()
            && c.upper_shadow() >= self.shadow_ratio * c.body()
            && c.lower_shadow() <= c.body()
    }
}

type Detect = fn(&[Candle], &Shape) -> bool;

struct Pattern {
    id: &'static str,
    name: &'static str,
    priority: Priority,
    base: f64,
    direction: Direction,
    /// Trend the pattern expects before its first bar.
    setup: Option<TrendDirection>,
    /// Shape alone is ambiguous; report only with the setup trend present.
    requires_setup: bool,
    bars: usize,
    detect: Detect,
}

fn doji(w: &[Candle], s: &Shape) -> bool {
    s.doji(&w[0])
}

fn hammer(w: &[Candle], s: &Shape) -> bool {
    s.hammer(&w[0])
}

fn shooting_star(w: &[Candle], s: &Shape) -> bool {
    s.inverted(&w[0])
}

fn bullish_engulfing(w: &[Candle], _: &Shape) -> bool {
    let (prev, curr) = (&w[0], &w[1]);
    prev.bearish()
        && curr.bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
        && curr.body() > prev.body()
}

fn bearish_engulfing(w: &[Candle], _: &Shape) -> bool {
    let (prev, curr) = (&w[0], &w[1]);
    prev.bullish()
        && curr.bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
        && curr.body() > prev.body()
}

fn inside_body(inner: &Candle, outer: &Candle) -> bool {
    inner.body_top() <= outer.body_top()
        && inner.body_bottom() >= outer.body_bottom()
        && inner.body() < outer.body()
}

fn bullish_harami(w: &[Candle], _: &Shape) -> bool {
    w[0].bearish() && w[1].bullish() && inside_body(&w[1], &w[0])
}

fn bearish_harami(w: &[Candle], _: &Shape) -> bool {
    w[0].bullish() && w[1].bearish() && inside_body(&w[1], &w[0])
}

fn piercing_line(w: &[Candle], _: &Shape) -> bool {
    let (prev, curr) = (&w[0], &w[1]);
    prev.bearish()
        && curr.bullish()
        && curr.open < prev.close
        && curr.close > prev.body_mid()
        && curr.close < prev.open
}

fn dark_cloud_cover(w: &[Candle], _: &Shape) -> bool {
    let (prev, curr) = (&w[0], &w[1]);
    prev.bullish()
        && curr.bearish()
        && curr.open > prev.close
        && curr.close < prev.body_mid()
        && curr.close > prev.open
}

fn small_middle(first: &Candle, middle: &Candle) -> bool {
    middle.body() <= 0.3 * first.body()
}

fn morning_star(w: &[Candle], _: &Shape) -> bool {
    let (a, b, c) = (&w[0], &w[1], &w[2]);
    a.bearish()
        && a.long()
        && small_middle(a, b)
        && b.body_top() <= a.close
        && c.bullish()
        && c.close > a.body_mid()
}

fn evening_star(w: &[Candle], _: &Shape) -> bool {
    let (a, b, c) = (&w[0], &w[1], &w[2]);
    a.bullish()
        && a.long()
        && small_middle(a, b)
        && b.body_bottom() >= a.close
        && c.bearish()
        && c.close < a.body_mid()
}

fn three_white_soldiers(w: &[Candle], _: &Shape) -> bool {
    w.iter().all(|c| c.bullish() && c.long())
        && w.windows(2).all(|p| {
            p[1].close > p[0].close && p[1].open >= p[0].open && p[1].open <= p[0].close
        })
}

fn three_black_crows(w: &[Candle], _: &Shape) -> bool {
    w.iter().all(|c| c.bearish() && c.long())
        && w.windows(2).all(|p| {
            p[1].close < p[0].close && p[1].open <= p[0].open && p[1].open >= p[0].close
        })
}

const PATTERNS: [Pattern; 14] = [
    Pattern {
        id: "cdl_doji",
        name: "Doji",
        priority: Priority::P2,
        base: 50.0,
        direction: Direction::Neutral,
        setup: None,
        requires_setup: false,
        bars: 1,
        detect: doji,
    },
    Pattern {
        id: "cdl_hammer",
        name: "Hammer",
        priority: Priority::P1,
        base: 60.0,
        direction: Direction::Bullish,
        setup: Some(TrendDirection::Down),
        requires_setup: true,
        bars: 1,
        detect: hammer,
    },
    Pattern {
        id: "cdl_hanging_man",
        name: "Hanging Man",
        priority: Priority::P1,
        base: 60.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: true,
        bars: 1,
        detect: hammer,
    },
    Pattern {
        id: "cdl_shooting_star",
        name: "Shooting Star",
        priority: Priority::P1,
        base: 60.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: true,
        bars: 1,
        detect: shooting_star,
    },
    Pattern {
        id: "cdl_bullish_engulfing",
        name: "Bullish Engulfing",
        priority: Priority::P1,
        base: 70.0,
        direction: Direction::Bullish,
        setup: Some(TrendDirection::Down),
        requires_setup: false,
        bars: 2,
        detect: bullish_engulfing,
    },
    Pattern {
        id: "cdl_bearish_engulfing",
        name: "Bearish Engulfing",
        priority: Priority::P1,
        base: 70.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: false,
        bars: 2,
        detect: bearish_engulfing,
    },
    Pattern {
        id: "cdl_bullish_harami",
        name: "Bullish Harami",
        priority: Priority::P2,
        base: 55.0,
        direction: Direction::Bullish,
        setup: Some(TrendDirection::Down),
        requires_setup: false,
        bars: 2,
        detect: bullish_harami,
    },
    Pattern {
        id: "cdl_bearish_harami",
        name: "Bearish Harami",
        priority: Priority::P2,
        base: 55.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: false,
        bars: 2,
        detect: bearish_harami,
    },
    Pattern {
        id: "cdl_piercing_line",
        name: "Piercing Line",
        priority: Priority::P2,
        base: 65.0,
        direction: Direction::Bullish,
        setup: Some(TrendDirection::Down),
        requires_setup: false,
        bars: 2,
        detect: piercing_line,
    },
    Pattern {
        id: "cdl_dark_cloud_cover",
        name: "Dark Cloud Cover",
        priority: Priority::P2,
        base: 65.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: false,
        bars: 2,
        detect: dark_cloud_cover,
    },
    Pattern {
        id: "cdl_morning_star",
        name: "Morning Star",
        priority: Priority::P1,
        base: 75.0,
        direction: Direction::Bullish,
        setup: Some(TrendDirection::Down),
        requires_setup: false,
        bars: 3,
        detect: morning_star,
    },
    Pattern {
        id: "cdl_evening_star",
        name: "Evening Star",
        priority: Priority::P1,
        base: 75.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: false,
        bars: 3,
        detect: evening_star,
    },
    Pattern {
        id: "cdl_three_white_soldiers",
        name: "Three White Soldiers",
        priority: Priority::P1,
        base: 70.0,
        direction: Direction::Bullish,
        setup: Some(TrendDirection::Down),
        requires_setup: false,
        bars: 3,
        detect: three_white_soldiers,
    },
    Pattern {
        id: "cdl_three_black_crows",
        name: "Three Black Crows",
        priority: Priority::P1,
        base: 70.0,
        direction: Direction::Bearish,
        setup: Some(TrendDirection::Up),
        requires_setup: false,
        bars: 3,
        detect: three_black_crows,
    },
];

pub struct Candlestick {
    meta: CapabilityMetadata,
}

impl Default for Candlestick {
    fn default() -> Self {
        Self {
            meta: meta(
                "candlestick",
                "Candlestick Patterns",
                Category::Kline,
                Priority::P1,
                3,
                &[
                    ("doji_ratio", 0.1),
                    ("shadow_ratio", 2.0),
                    ("trend_lookback", LOCAL_TREND_LOOKBACK as f64),
                ],
            ),
        }
    }
}

impl Candlestick {
    fn shape(params: &Params) -> Result<Shape, UnitError> {
        let doji_ratio = params.positive("doji_ratio")?;
        if doji_ratio >= 1.0 {
            return Err(UnitError::InvalidParameter {
                name: "doji_ratio".into(),
                reason: format!("{doji_ratio} must be below 1"),
            });
        }
        Ok(Shape {
            doji_ratio,
            shadow_ratio: params.positive("shadow_ratio")?,
        })
    }
}

impl Unit for Candlestick {
    unit_identity!(UnitKind::PatternDetector);

    fn capabilities(&self) -> Vec<CapabilityMetadata> {
        PATTERNS
            .iter()
            .map(|p| {
                CapabilityMetadata::new(
                    p.id,
                    p.name,
                    Category::Kline,
                    p.priority,
                    p.bars,
                    self.meta.default_params.clone(),
                )
            })
            .collect()
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        Self::shape(params)?;
        params.period("trend_lookback").map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let shape = Self::shape(params)?;
        let lookback = params.period("trend_lookback")?;
        let n = series.len();
        if n < self.min_data_points(params) {
            return Ok(UnitOutput::empty());
        }
        let candles: Vec<Candle> = (0..n)
            .map(|i| Candle {
                open: series.open[i],
                high: series.high[i],
                low: series.low[i],
                close: series.close[i],
            })
            .collect();

        let mut out = UnitOutput::empty();
        for idx in ctx.scan_start(n)..n {
            for pattern in &PATTERNS {
                if idx + 1 < pattern.bars {
                    continue;
                }
                let start = idx + 1 - pattern.bars;
                if !(pattern.detect)(&candles[start..=idx], &shape) {
                    continue;
                }
                let adjustment = match pattern.setup {
                    Some(setup) => {
                        let before = start.saturating_sub(1);
                        setup_adjustment(
                            prevailing_trend(ctx, &series.close, before, lookback),
                            setup,
                        )
                    }
                    None => 0.0,
                };
                if pattern.requires_setup && adjustment <= 0.0 {
                    continue;
                }
                out = out.occurrence(Occurrence {
                    pattern_id: pattern.id.to_string(),
                    name: pattern.name.to_string(),
                    family: PatternFamily::Candlestick,
                    direction: pattern.direction,
                    date: series.dates[idx],
                    index: idx,
                    strength: clamp_strength(pattern.base + adjustment),
                    description: format!(
                        "{} over {} bar(s) ending {}",
                        pattern.name, pattern.bars, series.dates[idx]
                    ),
                });
            }
        }
        Ok(out)
    }
}
