//! Signal synthesis from pattern occurrences.
//!
//! A directional candlestick occurrence of at least [`CANDLESTICK_CUTOFF`]
//! or chart occurrence of at least [`CHART_CUTOFF`] becomes a BUY/SELL
//! signal. Neutral occurrences never do.

use crate::domain::output::{Direction, Occurrence, PatternFamily, SignalLabel};

pub const CANDLESTICK_CUTOFF: f64 = 70.0;
pub const CHART_CUTOFF: f64 = 60.0;

/// Pattern id of every synthesized occurrence.
pub const PATTERN_SIGNAL: &str = "pattern_signal";

fn cutoff(family: PatternFamily) -> Option<f64> {
    match family {
        PatternFamily::Candlestick => Some(CANDLESTICK_CUTOFF),
        PatternFamily::Chart => Some(CHART_CUTOFF),
        PatternFamily::Rule | PatternFamily::Synthesized => None,
    }
}

fn action(direction: Direction) -> SignalLabel {
    match direction {
        Direction::Bullish => SignalLabel::Buy,
        Direction::Bearish => SignalLabel::Sell,
        Direction::Neutral => SignalLabel::Hold,
    }
}

pub fn synthesize<'a>(occurrences: impl IntoIterator<Item = &'a Occurrence>) -> Vec<Occurrence> {
    occurrences
        .into_iter()
        .filter(|o| o.direction != Direction::Neutral)
        .filter(|o| cutoff(o.family).is_some_and(|c| o.strength >= c))
        .map(|o| Occurrence {
            pattern_id: PATTERN_SIGNAL.to_string(),
            name: format!("{} signal", o.name),
            family: PatternFamily::Synthesized,
            direction: o.direction,
            date: o.date,
            index: o.index,
            strength: o.strength,
            description: format!("{} from {} ({})", action(o.direction), o.pattern_id, o.description),
        })
        .collect()
}

/// Overall label for the most recent bar carrying a synthesized signal.
/// Conflicting directions on that bar cancel out to HOLD.
pub fn pattern_label(signals: &[Occurrence]) -> SignalLabel {
    let Some(latest) = signals.iter().map(|o| o.index).max() else {
        return SignalLabel::Hold;
    };
    let mut directions = signals
        .iter()
        .filter(|o| o.index == latest)
        .map(|o| o.direction);
    let Some(first) = directions.next() else {
        return SignalLabel::Hold;
    };
    if directions.all(|d| d == first) {
        action(first)
    } else {
        SignalLabel::Hold
    }
}
