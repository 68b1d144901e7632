//! Core value types: state values, moves, units, state changes, origins.
//!
//! All of these are immutable values with construction-time invariants.
//! Constructors return `Result` rather than panicking; a value that
//! exists is a value that validates.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minicbor::{Decode, Encode};

use crate::decimal::Amount;
use crate::error::BuildError;
use crate::rules::TransferRule;

/// Reserved issuance/redemption endpoint, exempt from balance-range
/// checks. Always known to every ledger.
pub const SYSTEM_WALLET: &str = "SYSTEM_WALLET";

/// Ordered state mapping attached to a unit.
pub type UnitState = BTreeMap<String, StateValue>;

/// A canonicalizable state value. The closed set of shapes that may
/// appear in unit state, origins and event params.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub enum StateValue {
    #[n(0)]
    Null,
    #[n(1)]
    Bool(#[n(0)] bool),
    #[n(2)]
    Int(#[n(0)] i64),
    #[n(3)]
    Amount(#[n(0)] Amount),
    #[n(4)]
    Text(#[n(0)] String),
    #[n(5)]
    Map(#[n(0)] BTreeMap<String, StateValue>),
    #[n(6)]
    List(#[n(0)] Vec<StateValue>),
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Text(value.to_string())
    }
}

impl From<Amount> for StateValue {
    fn from(value: Amount) -> Self {
        StateValue::Amount(value)
    }
}

/// An atomic, signed transfer of one unit between two distinct wallets.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Move {
    #[n(0)]
    quantity: Amount,
    #[n(1)]
    unit_symbol: String,
    #[n(2)]
    source: String,
    #[n(3)]
    dest: String,
    #[n(4)]
    contract_id: Option<String>,
}

impl Move {
    pub fn new(
        quantity: Amount,
        unit_symbol: &str,
        source: &str,
        dest: &str,
    ) -> Result<Self, BuildError> {
        if quantity.is_zero() {
            return Err(BuildError::InvalidQuantity {
                value: quantity.canonical(),
                detail: "move quantity must be non-zero".to_string(),
            });
        }
        if unit_symbol.is_empty() {
            return Err(BuildError::EmptyIdentifier {
                field: "unit_symbol",
            });
        }
        if source.is_empty() {
            return Err(BuildError::EmptyIdentifier { field: "source" });
        }
        if dest.is_empty() {
            return Err(BuildError::EmptyIdentifier { field: "dest" });
        }
        if source == dest {
            return Err(BuildError::SameWallet {
                wallet: source.to_string(),
            });
        }

        Ok(Self {
            quantity,
            unit_symbol: unit_symbol.to_string(),
            source: source.to_string(),
            dest: dest.to_string(),
            contract_id: None,
        })
    }

    /// Tag the move with the contract that produced it.
    pub fn for_contract(mut self, contract_id: &str) -> Self {
        self.contract_id = Some(contract_id.to_string());
        self
    }

    pub fn quantity(&self) -> &Amount {
        &self.quantity
    }

    pub fn unit_symbol(&self) -> &str {
        &self.unit_symbol
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn contract_id(&self) -> Option<&str> {
        self.contract_id.as_deref()
    }
}

/// Immutable definition of an asset type.
///
/// State "mutates" by whole-map replacement through
/// [`UnitStateChange`]; the declarative fields never change after
/// registration.
#[derive(Clone)]
pub struct Unit {
    symbol: String,
    name: String,
    unit_type: String,
    min_balance: Amount,
    max_balance: Amount,
    decimal_places: Option<u32>,
    transfer_rule: Option<Arc<dyn TransferRule>>,
    state: UnitState,
}

impl Unit {
    pub fn new(
        symbol: &str,
        name: &str,
        unit_type: &str,
        min_balance: Amount,
        max_balance: Amount,
    ) -> Result<Self, BuildError> {
        if symbol.is_empty() {
            return Err(BuildError::EmptyIdentifier { field: "symbol" });
        }
        if min_balance > max_balance {
            return Err(BuildError::InvertedBounds {
                min: min_balance,
                max: max_balance,
            });
        }

        Ok(Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            unit_type: unit_type.to_string(),
            min_balance,
            max_balance,
            decimal_places: None,
            transfer_rule: None,
            state: UnitState::new(),
        })
    }

    /// Precision cap applied to accumulated balances during validation.
    /// Individual move quantities are never rounded.
    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = Some(places);
        self
    }

    pub fn with_transfer_rule(mut self, rule: Arc<dyn TransferRule>) -> Self {
        self.transfer_rule = Some(rule);
        self
    }

    pub fn with_state(mut self, state: UnitState) -> Self {
        self.state = state;
        self
    }

    pub fn with_state_entry(mut self, key: &str, value: StateValue) -> Self {
        self.state.insert(key.to_string(), value);
        self
    }

    /// New `Unit` with the state mapping replaced wholesale; every
    /// identity field is preserved.
    pub(crate) fn replace_state(&self, state: UnitState) -> Self {
        let mut next = self.clone();
        next.state = state;
        next
    }

    /// Content comparison used for conflict detection on registration.
    /// Transfer rules are behavior, not content, and are not compared.
    pub fn same_definition(&self, other: &Unit) -> bool {
        self.symbol == other.symbol
            && self.name == other.name
            && self.unit_type == other.unit_type
            && self.min_balance == other.min_balance
            && self.max_balance == other.max_balance
            && self.decimal_places == other.decimal_places
            && self.state == other.state
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_type(&self) -> &str {
        &self.unit_type
    }

    pub fn min_balance(&self) -> &Amount {
        &self.min_balance
    }

    pub fn max_balance(&self) -> &Amount {
        &self.max_balance
    }

    pub fn decimal_places(&self) -> Option<u32> {
        self.decimal_places
    }

    pub fn transfer_rule(&self) -> Option<Arc<dyn TransferRule>> {
        self.transfer_rule.clone()
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.same_definition(other)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("symbol", &self.symbol)
            .field("name", &self.name)
            .field("unit_type", &self.unit_type)
            .field("min_balance", &self.min_balance)
            .field("max_balance", &self.max_balance)
            .field("decimal_places", &self.decimal_places)
            .field("transfer_rule", &self.transfer_rule.is_some())
            .field("state", &self.state)
            .finish()
    }
}

// Only the declarative fields and state serialize; a transfer rule is a
// trait object the caller re-attaches after load.
impl<C> minicbor::Encode<C> for Unit {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(7)?;
        e.str(&self.symbol)?;
        e.str(&self.name)?;
        e.str(&self.unit_type)?;
        self.min_balance.encode(e, ctx)?;
        self.max_balance.encode(e, ctx)?;
        self.decimal_places.encode(e, ctx)?;
        self.state.encode(e, ctx)?;
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Unit {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(7) {
            return Err(minicbor::decode::Error::message(
                "expected a 7-element unit record",
            ));
        }

        let symbol = d.str()?.to_string();
        let name = d.str()?.to_string();
        let unit_type = d.str()?.to_string();
        let min_balance = Amount::decode(d, ctx)?;
        let max_balance = Amount::decode(d, ctx)?;
        let decimal_places = Option::<u32>::decode(d, ctx)?;
        let state = UnitState::decode(d, ctx)?;

        Ok(Unit {
            symbol,
            name,
            unit_type,
            min_balance,
            max_balance,
            decimal_places,
            transfer_rule: None,
            state,
        })
    }
}

/// Declarative whole-map replacement of a unit's state.
///
/// `old_state` is the proposer's belief at proposal time; the execution
/// core compares it against reality for stale-state detection, and the
/// unwind uses it to step backward.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct UnitStateChange {
    #[n(0)]
    unit_symbol: String,
    #[n(1)]
    old_state: UnitState,
    #[n(2)]
    new_state: UnitState,
}

impl UnitStateChange {
    pub fn new(
        unit_symbol: &str,
        old_state: UnitState,
        new_state: UnitState,
    ) -> Result<Self, BuildError> {
        if unit_symbol.is_empty() {
            return Err(BuildError::EmptyIdentifier {
                field: "unit_symbol",
            });
        }

        Ok(Self {
            unit_symbol: unit_symbol.to_string(),
            old_state,
            new_state,
        })
    }

    pub fn unit_symbol(&self) -> &str {
        &self.unit_symbol
    }

    pub fn old_state(&self) -> &UnitState {
        &self.old_state
    }

    pub fn new_state(&self) -> &UnitState {
        &self.new_state
    }
}

/// Opaque provenance carried by every transaction: who proposed it, the
/// seed that drove it (for simulation runs) and any calculation inputs
/// worth auditing later.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Origin {
    #[n(0)]
    source: String,
    #[n(1)]
    seed: Option<u64>,
    #[n(2)]
    inputs: BTreeMap<String, StateValue>,
}

impl Origin {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            seed: None,
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_input(mut self, key: &str, value: StateValue) -> Self {
        self.inputs.insert(key.to_string(), value);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn inputs(&self) -> &BTreeMap<String, StateValue> {
        &self.inputs
    }
}
