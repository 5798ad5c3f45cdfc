use crate::engine::market::PriceSource;
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trendline_execution::instrument::Direction;
use trendline_ta::snapshot::IndicatorSnapshot;

/// Volatility multipliers defining the signal bands.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct SignalConfig {
    /// Entry band: `|distance|` must strictly exceed this to enter.
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: Decimal,
    /// Extended adverse band of the short take-profit rule.
    #[serde(default = "default_extended_threshold")]
    pub extended_threshold: Decimal,
    /// Volatility units above the Long entry price that trigger the partial add.
    #[serde(default = "default_partial_add_volatility")]
    pub partial_add_volatility: Decimal,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            entry_threshold: default_entry_threshold(),
            extended_threshold: default_extended_threshold(),
            partial_add_volatility: default_partial_add_volatility(),
        }
    }
}

fn default_entry_threshold() -> Decimal {
    Decimal::new(15, 1)
}

fn default_extended_threshold() -> Decimal {
    Decimal::new(5, 0)
}

fn default_partial_add_volatility() -> Decimal {
    Decimal::new(5, 0)
}

/// Price used at each decision point of the position state machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PriceSources {
    /// Main per tick decision.
    #[serde(default = "default_decision_source")]
    pub decision: PriceSource,
    /// Single re-evaluation after a close.
    #[serde(default = "default_live_source")]
    pub reevaluation: PriceSource,
    /// Partial add trigger of an open Long.
    #[serde(default = "default_live_source")]
    pub partial_add: PriceSource,
}

impl Default for PriceSources {
    fn default() -> Self {
        Self {
            decision: default_decision_source(),
            reevaluation: default_live_source(),
            partial_add: default_live_source(),
        }
    }
}

fn default_decision_source() -> PriceSource {
    PriceSource::LastClosed
}

fn default_live_source() -> PriceSource {
    PriceSource::Live
}

/// Why a position should be closed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Display)]
pub enum ExitReason {
    /// Long closed because price fell below the trend average.
    #[display("price below trend average")]
    TrendBreak,
    /// Short closed because price rose above the trend average.
    #[display("price above trend average")]
    TrendReversal,
    /// Short closed defensively beyond the extended adverse band.
    #[display("extended band take-profit")]
    TakeProfit,
    /// Short force closed by the long-only override.
    #[display("long-only override")]
    LongOnly,
}

/// Recommended action. The evaluator never acts, policy is applied by the state machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum SignalAction {
    Enter(Direction),
    Exit(ExitReason),
    PartialAdd,
    Hold,
}

/// Output of the [`SignalEvaluator`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SignalDecision {
    pub action: SignalAction,
    /// Signed volatility units between the evaluated price and the trend average.
    pub distance: Decimal,
    pub price: Decimal,
    pub rationale: String,
}

/// Combines price, trend average and volatility into a normalised distance and a recommended
/// [`SignalAction`]. All band comparisons are strict.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Constructor)]
pub struct SignalEvaluator {
    pub config: SignalConfig,
}

impl SignalEvaluator {
    /// `(price − trend_average) / volatility`, or zero when volatility is zero.
    pub fn distance(snapshot: &IndicatorSnapshot, price: Decimal) -> Decimal {
        (price - snapshot.trend_average)
            .checked_div(snapshot.volatility)
            .unwrap_or(Decimal::ZERO)
    }

    /// Flat entry: bullish when above the trend average and beyond `+entry_threshold`, bearish
    /// when below the trend average and beyond `−entry_threshold`.
    pub fn entry(&self, snapshot: &IndicatorSnapshot, price: Decimal) -> SignalDecision {
        let distance = Self::distance(snapshot, price);
        let threshold = self.config.entry_threshold;

        if price > snapshot.trend_average && distance > threshold {
            decision(
                SignalAction::Enter(Direction::Long),
                distance,
                price,
                format!("distance {distance:.2} above +{threshold} entry band"),
            )
        } else if price < snapshot.trend_average && distance < -threshold {
            decision(
                SignalAction::Enter(Direction::Short),
                distance,
                price,
                format!("distance {distance:.2} below -{threshold} entry band"),
            )
        } else {
            hold(distance, price, "inside entry band")
        }
    }

    /// Long exit: price below the trend average.
    pub fn long_exit(&self, snapshot: &IndicatorSnapshot, price: Decimal) -> SignalDecision {
        let distance = Self::distance(snapshot, price);

        if price < snapshot.trend_average {
            decision(
                SignalAction::Exit(ExitReason::TrendBreak),
                distance,
                price,
                format!("price {price} below trend average {}", snapshot.trend_average),
            )
        } else {
            hold(distance, price, "long trend intact")
        }
    }

    /// Partial add: once per Long lifecycle, when price exceeds
    /// `entry_price + partial_add_volatility × volatility`.
    pub fn partial_add(
        &self,
        snapshot: &IndicatorSnapshot,
        price: Decimal,
        entry_price: Option<Decimal>,
        added_partial_once: bool,
    ) -> SignalDecision {
        let distance = Self::distance(snapshot, price);

        match entry_price {
            Some(entry) if !added_partial_once => {
                let trigger = entry + self.config.partial_add_volatility * snapshot.volatility;
                if price > trigger {
                    decision(
                        SignalAction::PartialAdd,
                        distance,
                        price,
                        format!("price {price} above partial add trigger {trigger}"),
                    )
                } else {
                    hold(distance, price, "partial add trigger not reached")
                }
            }
            Some(_) => hold(distance, price, "partial add already taken"),
            None => hold(distance, price, "entry price unknown"),
        }
    }

    /// Short exit, in priority order: extended band take-profit, then trend reversal.
    ///
    /// The long-only override is policy and applied by the state machine.
    pub fn short_exit(&self, snapshot: &IndicatorSnapshot, price: Decimal) -> SignalDecision {
        let distance = Self::distance(snapshot, price);
        let extended = self.config.extended_threshold;

        if distance < -extended {
            decision(
                SignalAction::Exit(ExitReason::TakeProfit),
                distance,
                price,
                format!("distance {distance:.2} beyond -{extended} extended band"),
            )
        } else if price > snapshot.trend_average {
            decision(
                SignalAction::Exit(ExitReason::TrendReversal),
                distance,
                price,
                format!("price {price} above trend average {}", snapshot.trend_average),
            )
        } else {
            hold(distance, price, "short trend intact")
        }
    }
}

fn decision(
    action: SignalAction,
    distance: Decimal,
    price: Decimal,
    rationale: String,
) -> SignalDecision {
    SignalDecision {
        action,
        distance,
        price,
        rationale,
    }
}

fn hold(distance: Decimal, price: Decimal, rationale: &str) -> SignalDecision {
    decision(SignalAction::Hold, distance, price, rationale.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(trend_average: Decimal, volatility: Decimal) -> IndicatorSnapshot {
        IndicatorSnapshot::new(trend_average, volatility)
    }

    #[test]
    fn test_distance() {
        assert_eq!(SignalEvaluator::distance(&snapshot(dec!(100), dec!(2)), dec!(97)), dec!(-1.5));
        assert_eq!(SignalEvaluator::distance(&snapshot(dec!(100), dec!(0)), dec!(150)), dec!(0));
    }

    #[test]
    fn test_entry() {
        struct TestCase {
            price: Decimal,
            expected: SignalAction,
        }

        let evaluator = SignalEvaluator::default();
        let snapshot = snapshot(dec!(100), dec!(2));

        let tests = vec![
            TestCase {
                // TC0: distance exactly -1.5 does not enter
                price: dec!(97),
                expected: SignalAction::Hold,
            },
            TestCase {
                // TC1: distance exactly +1.5 does not enter
                price: dec!(103),
                expected: SignalAction::Hold,
            },
            TestCase {
                // TC2: beyond the lower band
                price: dec!(96.9),
                expected: SignalAction::Enter(Direction::Short),
            },
            TestCase {
                // TC3: beyond the upper band
                price: dec!(103.1),
                expected: SignalAction::Enter(Direction::Long),
            },
            TestCase {
                // TC4: at the trend average
                price: dec!(100),
                expected: SignalAction::Hold,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = evaluator.entry(&snapshot, test.price);
            assert_eq!(actual.action, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_zero_volatility_never_enters() {
        let evaluator = SignalEvaluator::default();
        let decision = evaluator.entry(&snapshot(dec!(100), dec!(0)), dec!(500));
        assert_eq!(decision.action, SignalAction::Hold);
        assert_eq!(decision.distance, dec!(0));
    }

    #[test]
    fn test_partial_add() {
        struct TestCase {
            price: Decimal,
            entry_price: Option<Decimal>,
            added_partial_once: bool,
            expected: SignalAction,
        }

        let evaluator = SignalEvaluator::default();
        let snapshot = snapshot(dec!(90), dec!(2));

        let tests = vec![
            TestCase {
                // TC0: 100 + 5 * 2 + 1
                price: dec!(111),
                entry_price: Some(dec!(100)),
                added_partial_once: false,
                expected: SignalAction::PartialAdd,
            },
            TestCase {
                // TC1: exactly at the trigger
                price: dec!(110),
                entry_price: Some(dec!(100)),
                added_partial_once: false,
                expected: SignalAction::Hold,
            },
            TestCase {
                // TC2: already added this lifecycle
                price: dec!(120),
                entry_price: Some(dec!(100)),
                added_partial_once: true,
                expected: SignalAction::Hold,
            },
            TestCase {
                // TC3: entry price unknown after reconciliation
                price: dec!(120),
                entry_price: None,
                added_partial_once: false,
                expected: SignalAction::Hold,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = evaluator.partial_add(
                &snapshot,
                test.price,
                test.entry_price,
                test.added_partial_once,
            );
            assert_eq!(actual.action, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_short_exit() {
        struct TestCase {
            price: Decimal,
            expected: SignalAction,
        }

        let evaluator = SignalEvaluator::default();
        let snapshot = snapshot(dec!(100), dec!(1));

        let tests = vec![
            TestCase {
                // TC0: distance -6 beyond the extended band
                price: dec!(94),
                expected: SignalAction::Exit(ExitReason::TakeProfit),
            },
            TestCase {
                // TC1: distance exactly -5 holds
                price: dec!(95),
                expected: SignalAction::Hold,
            },
            TestCase {
                // TC2: price above trend average
                price: dec!(100.5),
                expected: SignalAction::Exit(ExitReason::TrendReversal),
            },
            TestCase {
                // TC3: price at trend average holds
                price: dec!(100),
                expected: SignalAction::Hold,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = evaluator.short_exit(&snapshot, test.price);
            assert_eq!(actual.action, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_signal_config_defaults() {
        let config: SignalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SignalConfig::new(dec!(1.5), dec!(5), dec!(5)));
    }
}
