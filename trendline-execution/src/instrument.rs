use crate::error::ClientError;
use derive_more::{Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;

/// Exchange `SmolStr` representation of a perpetual swap instrument, eg/ `BTC-USDT-SWAP`.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct InstrumentName(pub SmolStr);

impl InstrumentName {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Base asset of the instrument, eg/ `BTC` for `BTC-USDT-SWAP`.
    pub fn base_asset(&self) -> &str {
        self.0.split('-').next().unwrap_or(self.0.as_str())
    }

    /// Returns true if the provided operator alias names this instrument.
    ///
    /// Both the full exchange name and the base asset are accepted, ignoring case.
    pub fn matches_alias(&self, alias: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(alias) || self.base_asset().eq_ignore_ascii_case(alias)
    }
}

impl From<&str> for InstrumentName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for InstrumentName {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for InstrumentName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Direction of an open exchange position.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[display("long")]
    Long,
    #[display("short")]
    Short,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Contract specification of a perpetual swap, used to turn a desired notional value into a
/// lot-rounded number of contracts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ContractSpec {
    /// Quantity of the base asset represented by one contract.
    pub contract_value: Decimal,
    /// Contract quantity increment.
    pub lot_size: Decimal,
    /// Minimum contract quantity of an order.
    pub min_size: Decimal,
}

impl ContractSpec {
    pub fn new(contract_value: Decimal, lot_size: Decimal, min_size: Decimal) -> Self {
        Self {
            contract_value,
            lot_size,
            min_size,
        }
    }

    /// Number of contracts worth approximately `notional` quote units at `price`.
    ///
    /// `floor(notional / (contract_value × price) / lot_size) × lot_size`, raised to `min_size`
    /// and expressed with the precision of `lot_size`.
    pub fn contracts(&self, notional: Decimal, price: Decimal) -> Result<Decimal, ClientError> {
        if notional <= Decimal::ZERO {
            return Err(ClientError::Sizing(format!(
                "notional must be positive, received {notional}"
            )));
        }
        if price <= Decimal::ZERO {
            return Err(ClientError::Sizing(format!(
                "reference price must be positive, received {price}"
            )));
        }
        if self.contract_value <= Decimal::ZERO || self.lot_size <= Decimal::ZERO {
            return Err(ClientError::Sizing(format!(
                "invalid contract specification: {self:?}"
            )));
        }

        let raw = notional
            .checked_div(self.contract_value * price)
            .and_then(|contracts| contracts.checked_div(self.lot_size))
            .ok_or_else(|| ClientError::Sizing(format!("overflow sizing {notional} at {price}")))?;

        let contracts = (raw.floor() * self.lot_size).max(self.min_size);

        Ok(contracts.round_dp(self.lot_size.normalize().scale()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_instrument_name_aliases() {
        let btc = InstrumentName::from("BTC-USDT-SWAP");

        assert_eq!(btc.base_asset(), "BTC");
        assert!(btc.matches_alias("btc"));
        assert!(btc.matches_alias("btc-usdt-swap"));
        assert!(!btc.matches_alias("eth"));
        assert!(!btc.matches_alias("usdt"));
    }

    #[test]
    fn test_contract_spec_contracts() {
        struct TestCase {
            spec: ContractSpec,
            notional: Decimal,
            price: Decimal,
            expected: Decimal,
        }

        let btc = ContractSpec::new(dec!(0.01), dec!(0.01), dec!(0.01));
        let ada = ContractSpec::new(dec!(100), dec!(0.1), dec!(0.1));
        let hype = ContractSpec::new(dec!(0.1), dec!(1), dec!(1));

        let tests = vec![
            TestCase {
                // TC0: BTC rounds down to the lot size
                spec: btc,
                notional: dec!(7500),
                price: dec!(65000),
                expected: dec!(11.53),
            },
            TestCase {
                // TC1: ADA with fractional lot
                spec: ada,
                notional: dec!(5000),
                price: dec!(0.45),
                expected: dec!(111.1),
            },
            TestCase {
                // TC2: HYPE with whole contract lots
                spec: hype,
                notional: dec!(5000),
                price: dec!(30),
                expected: dec!(1666),
            },
            TestCase {
                // TC3: tiny notional is raised to the minimum size
                spec: btc,
                notional: dec!(1),
                price: dec!(65000),
                expected: dec!(0.01),
            },
            TestCase {
                // TC4: half notional partial add
                spec: btc,
                notional: dec!(3750),
                price: dec!(65000),
                expected: dec!(5.76),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.spec.contracts(test.notional, test.price).unwrap();
            assert_eq!(actual, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_contract_spec_rejects_invalid_inputs() {
        let btc = ContractSpec::new(dec!(0.01), dec!(0.01), dec!(0.01));

        assert!(matches!(btc.contracts(dec!(0), dec!(100)), Err(ClientError::Sizing(_))));
        assert!(matches!(btc.contracts(dec!(100), dec!(0)), Err(ClientError::Sizing(_))));
        assert!(matches!(
            ContractSpec::new(dec!(0), dec!(0.01), dec!(0.01)).contracts(dec!(100), dec!(1)),
            Err(ClientError::Sizing(_))
        ));
    }
}
